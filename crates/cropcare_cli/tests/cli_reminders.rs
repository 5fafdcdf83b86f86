use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("cropcare-{nanos}-{file_name}"))
}

struct Paths {
    local: PathBuf,
    remote: PathBuf,
    config: PathBuf,
}

impl Paths {
    fn new(name: &str) -> Self {
        Self {
            local: temp_path(&format!("{name}-local.json")),
            remote: temp_path(&format!("{name}-remote.json")),
            config: temp_path(&format!("{name}-config.json")),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_cropcare"));
        command
            .env("CROPCARE_STORE_PATH", &self.local)
            .env("CROPCARE_REMOTE_PATH", &self.remote)
            .env("CROPCARE_CONFIG_PATH", &self.config)
            .env("CROPCARE_DISABLE_NOTIFICATIONS", "1")
            .env("CROPCARE_USER", "farmer-1")
            .env_remove("CROPCARE_LOG");
        command
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command()
            .args(args)
            .output()
            .expect("failed to run cropcare")
    }

    fn run_interactive(&self, input: &str) -> Output {
        let mut child = self
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to spawn interactive session");

        {
            let stdin = child.stdin.as_mut().expect("stdin");
            stdin
                .write_all(input.as_bytes())
                .expect("failed to write to stdin");
        }

        child
            .wait_with_output()
            .expect("failed to read interactive output")
    }

    fn cleanup(&self) {
        for path in [&self.local, &self.remote, &self.config] {
            std::fs::remove_file(path).ok();
        }
    }
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn remind_queues_reminder_with_unit() {
    let paths = Paths::new("remind-unit");
    let queued = paths.run(&[
        "remind",
        "Irrigation",
        "Open the lower valves",
        "--in",
        "1",
        "--unit",
        "weeks",
        "--json",
    ]);
    let listed = paths.run(&["reminders", "--json"]);
    paths.cleanup();

    assert!(queued.status.success());
    assert_eq!(stdout_json(&queued)["seconds"], 604_800);

    let reminders = stdout_json(&listed);
    assert_eq!(reminders.as_array().map(Vec::len), Some(1));
    assert_eq!(reminders[0]["title"], "Irrigation");
    assert_eq!(reminders[0]["body"], "Open the lower valves");
    assert_eq!(reminders[0]["remaining"], 7);
    assert_eq!(reminders[0]["delivered"], false);
}

#[test]
fn remind_rejects_zero_delay_and_unknown_unit() {
    let paths = Paths::new("remind-invalid");
    let zero = paths.run(&["remind", "Irrigation", "Open the valves", "--in", "0"]);
    let unit = paths.run(&[
        "remind",
        "Irrigation",
        "Open the valves",
        "--in",
        "2",
        "--unit",
        "fortnights",
    ]);
    paths.cleanup();

    assert!(!zero.status.success());
    assert!(String::from_utf8_lossy(&zero.stderr).contains("ERROR: invalid_input"));
    assert!(!unit.status.success());
    assert!(String::from_utf8_lossy(&unit.stderr).contains("unknown time unit"));
}

#[test]
fn remind_with_notifications_off_reports_permission() {
    let paths = Paths::new("remind-denied");
    let output = paths.run(&[
        "remind",
        "Irrigation",
        "Open the valves",
        "--in",
        "30",
        "--config-override",
        "notifications=off",
    ]);
    paths.cleanup();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: permission_denied"));
}

#[test]
fn notify_delivers_past_reminders_once() {
    let paths = Paths::new("notify-once");
    let planned = paths.run(&[
        "plan",
        "Ibirayi",
        "--farm",
        "Karambi",
        "--planted",
        "2024-03-01",
        "--actions",
        "Weeding",
    ]);
    let first = paths.run(&["notify", "--json"]);
    let second = paths.run(&["notify"]);
    let listed = paths.run(&["reminders", "--json"]);
    paths.cleanup();

    assert!(planned.status.success());
    let delivered = stdout_json(&first);
    assert_eq!(delivered["delivered"].as_array().map(Vec::len), Some(19));
    assert_eq!(delivered["failures"].as_array().map(Vec::len), Some(0));
    assert!(String::from_utf8_lossy(&second.stdout).contains("No reminders due"));

    let reminders = stdout_json(&listed);
    assert!(
        reminders
            .as_array()
            .unwrap()
            .iter()
            .all(|reminder| reminder["delivered"] == true && reminder["remaining"] == "Expired")
    );
}

#[test]
fn reminders_plain_text_when_empty() {
    let paths = Paths::new("reminders-empty");
    let output = paths.run(&["reminders"]);
    paths.cleanup();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No reminders"));
}

#[test]
fn interactive_help_shows_usage() {
    let paths = Paths::new("interactive-help");
    let output = paths.run_interactive("help\nexit\n");
    paths.cleanup();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage") || stdout.contains("USAGE"));
}

#[test]
fn interactive_session_runs_commands_in_order() {
    let paths = Paths::new("interactive-flow");
    let output = paths.run_interactive(
        "plan Ibigori --farm \"Lower field\" --planted 2024-03-01 --actions Weeding\n\
         approve 1\n\
         list --json\n\
         quit\n",
    );
    paths.cleanup();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Planned Ibigori at Lower field"));
    assert!(stdout.contains("Approved entry 1"));
    assert!(stdout.contains("\"status\":\"Approved\""));
}

#[test]
fn interactive_invalid_command_prints_error() {
    let paths = Paths::new("interactive-invalid");
    let output = paths.run_interactive("nope\nexit\n");
    paths.cleanup();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR:"));
}
