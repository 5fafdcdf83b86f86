use clap::{CommandFactory, Parser};
use cropcare_cli::cli::{
    Basis, Cli, Command, collect_overrides, entry_index, parse_date, reminder_seconds,
};
use cropcare_core::config::{Config, load_config_with_fallback, merge_overrides};
use cropcare_core::crop_api::{self, Stores};
use cropcare_core::error::AppError;
use cropcare_core::identity::{ResolvedIdentity, require_user};
use cropcare_core::model::{CropTask, NewScheduleEntry, ScheduleEntry};
use cropcare_core::notify::notifier_from_env;
use cropcare_core::notify::queue::QueuedReminder;
use cropcare_core::projection::{ProjectedEntry, ProjectionBasis};
use cropcare_core::reminder_scheduler::ScheduleOutcome;
use serde_json::{Value, json};
use std::io::{self, BufRead};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "CROPCARE_LOG";

struct Session {
    stores: Stores,
    config: Config,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "#")]
    number: usize,
    crop: String,
    farm: String,
    planted: String,
    next_action: String,
    status: String,
    remaining: String,
}

#[derive(Tabled)]
struct TaskRow {
    day: u32,
    date: String,
    task: String,
}

#[derive(Tabled)]
struct ReminderRow {
    title: String,
    body: String,
    fires_at: String,
    remaining: String,
    delivered: String,
}

fn init_tracing(config: &Config) {
    let fallback = config.log_level.as_deref().unwrap_or("warn");
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn load_base_config() -> Config {
    let loaded = load_config_with_fallback();
    init_tracing(&loaded.config);
    if let Some(err) = loaded.error {
        warn!(error = %err, "config could not be loaded, using defaults");
    }
    loaded.config
}

fn print_table<R: Tabled>(rows: Vec<R>, empty: &str) {
    if rows.is_empty() {
        println!("{empty}");
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::modern());
    println!("{table}");
}

fn entry_rows(entries: &[ProjectedEntry]) -> Vec<EntryRow> {
    entries
        .iter()
        .enumerate()
        .map(|(index, projected)| EntryRow {
            number: index + 1,
            crop: projected.entry.crop_name.clone(),
            farm: projected.entry.farm_name.clone(),
            planted: projected.entry.planting_date.to_string(),
            next_action: projected.entry.planning_date.to_string(),
            status: projected.entry.status.label().to_string(),
            remaining: projected.remaining.to_string(),
        })
        .collect()
}

fn entries_json(entries: &[ProjectedEntry]) -> Result<Value, AppError> {
    let mut payload = Vec::with_capacity(entries.len());
    for (index, projected) in entries.iter().enumerate() {
        let mut value = serde_json::to_value(projected)?;
        value["number"] = json!(index + 1);
        payload.push(value);
    }
    Ok(Value::Array(payload))
}

fn outcome_json(outcome: &ScheduleOutcome) -> Value {
    json!({
        "scheduled": outcome.scheduled,
        "skipped": outcome.skipped,
        "permission_denied": outcome.permission_denied,
        "failures": outcome
            .failures
            .iter()
            .map(|failure| json!({ "title": failure.title, "error": failure.error.to_string() }))
            .collect::<Vec<_>>(),
    })
}

fn print_outcome_plain(outcome: &ScheduleOutcome) {
    if outcome.permission_denied {
        println!("Notifications are off; no reminders were scheduled.");
        return;
    }
    println!("Scheduled {} reminder(s)", outcome.scheduled);
    if outcome.skipped > 0 {
        println!("Skipped {} reminder(s) already scheduled", outcome.skipped);
    }
    for failure in &outcome.failures {
        eprintln!("WARN: reminder '{}' failed: {}", failure.title, failure.error);
    }
}

fn print_entry(entry: &ScheduleEntry, number: usize, verb: &str, as_json: bool) -> Result<(), AppError> {
    if as_json {
        let mut value = serde_json::to_value(entry)?;
        value["number"] = json!(number);
        println!("{value}");
    } else {
        println!(
            "{verb} entry {number}: {} at {} ({})",
            entry.crop_name,
            entry.farm_name,
            entry.status.label()
        );
    }
    Ok(())
}

fn print_tasks(tasks: &[CropTask], as_json: bool) -> Result<(), AppError> {
    if as_json {
        println!("{}", serde_json::to_value(tasks)?);
        return Ok(());
    }
    let rows = tasks
        .iter()
        .map(|task| TaskRow {
            day: task.offset_days,
            date: task.date.to_string(),
            task: task.description.clone(),
        })
        .collect();
    print_table(rows, "No tasks");
    Ok(())
}

fn print_reminders(reminders: &[QueuedReminder], as_json: bool) -> Result<(), AppError> {
    if as_json {
        println!("{}", serde_json::to_value(reminders)?);
        return Ok(());
    }
    let rows = reminders
        .iter()
        .map(|queued| ReminderRow {
            title: queued.reminder.title.clone(),
            body: queued.reminder.body.clone(),
            fires_at: queued.reminder.fire_at.to_string(),
            remaining: queued.remaining.to_string(),
            delivered: if queued.reminder.delivered { "yes" } else { "no" }.to_string(),
        })
        .collect();
    print_table(rows, "No reminders");
    Ok(())
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(current.clone());
                current.clear();
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn current_user_id(cli_user: Option<&String>, config: &Config) -> Result<String, AppError> {
    let identity = ResolvedIdentity::new(cli_user.cloned(), config.user_id.clone());
    Ok(require_user(&identity)?.id)
}

fn run_command(session: &Session, cli: Cli) -> Result<(), AppError> {
    let overrides = collect_overrides(&cli.config_override).map_err(AppError::invalid_input)?;
    let config = merge_overrides(&session.config, &overrides);
    let stores = &session.stores;
    let now = crop_api::now_local();

    match cli.command {
        Command::Plan {
            crop,
            farm,
            planted,
            actions,
            action_date,
        } => {
            let user_id = current_user_id(cli.user.as_ref(), &config)?;
            let planting_date = parse_date(&planted).map_err(AppError::invalid_input)?;
            let action_performed_date = match action_date {
                Some(raw) => parse_date(&raw).map_err(AppError::invalid_input)?,
                None => now.date(),
            };
            let draft = NewScheduleEntry {
                user_id,
                crop_name: crop,
                farm_name: farm,
                planting_date,
                performed_actions: actions,
                action_performed_date,
            };

            let outcome = crop_api::plan_crop(stores, &draft, &config)?;
            if cli.json {
                println!(
                    "{}",
                    json!({
                        "entry": outcome.entry,
                        "reminders": outcome_json(&outcome.reminders),
                    })
                );
            } else {
                println!(
                    "Planned {} at {} (planted {}, next action {})",
                    outcome.entry.crop_name,
                    outcome.entry.farm_name,
                    outcome.entry.planting_date,
                    outcome.entry.planning_date
                );
                print_outcome_plain(&outcome.reminders);
            }
        }
        Command::Tasks { crop, planted } => {
            let planting_date = parse_date(&planted).map_err(AppError::invalid_input)?;
            let tasks = crop_api::preview_tasks(&crop, planting_date, config.locale)?;
            print_tasks(&tasks, cli.json)?;
        }
        Command::List { basis } => {
            let user_id = current_user_id(cli.user.as_ref(), &config)?;
            let basis = match basis {
                Basis::Planting => ProjectionBasis::PlantingDate,
                Basis::NextAction => ProjectionBasis::NextAction,
            };
            let entries = crop_api::list_entries(stores, &user_id, basis, now)?;
            if cli.json {
                println!("{}", entries_json(&entries)?);
            } else {
                print_table(entry_rows(&entries), "No schedule entries");
            }
        }
        Command::Upcoming { days } => {
            let user_id = current_user_id(cli.user.as_ref(), &config)?;
            let within = days.unwrap_or(config.due_soon_days);
            if within < 0 {
                return Err(AppError::invalid_input("days must not be negative"));
            }
            let entries = crop_api::upcoming_entries(stores, &user_id, within, now)?;
            if cli.json {
                println!("{}", entries_json(&entries)?);
            } else {
                print_table(entry_rows(&entries), "Nothing planned in the next few days");
            }
        }
        Command::Approve { number } => {
            let user_id = current_user_id(cli.user.as_ref(), &config)?;
            let index = entry_index(number).map_err(AppError::invalid_input)?;
            let entry = crop_api::approve_entry(stores, &user_id, index)?;
            print_entry(&entry, number, "Approved", cli.json)?;
        }
        Command::Complete { number } => {
            let user_id = current_user_id(cli.user.as_ref(), &config)?;
            let index = entry_index(number).map_err(AppError::invalid_input)?;
            let entry = crop_api::complete_entry(stores, &user_id, index)?;
            print_entry(&entry, number, "Completed", cli.json)?;
        }
        Command::Delete { number } => {
            let user_id = current_user_id(cli.user.as_ref(), &config)?;
            let index = entry_index(number).map_err(AppError::invalid_input)?;
            let entry = crop_api::delete_entry(stores, &user_id, index)?;
            print_entry(&entry, number, "Deleted", cli.json)?;
        }
        Command::Sync => {
            let user_id = current_user_id(cli.user.as_ref(), &config)?;
            let entries = crop_api::sync_entries(stores, &user_id)?;
            if cli.json {
                println!("{}", serde_json::to_value(&entries)?);
            } else {
                println!("Synced {} entries", entries.len());
            }
        }
        Command::Reminders => {
            let reminders = crop_api::list_reminders(stores, now)?;
            print_reminders(&reminders, cli.json)?;
        }
        Command::Remind {
            title,
            body,
            amount,
            unit,
        } => {
            let seconds = reminder_seconds(amount, &unit).map_err(AppError::invalid_input)?;
            let outcome = crop_api::add_custom_reminder(stores, &title, &body, seconds, &config)?;
            if outcome.permission_denied {
                return Err(AppError::permission_denied("notifications are disabled"));
            }
            if let Some(failure) = outcome.failures.into_iter().next() {
                return Err(failure.error);
            }
            if cli.json {
                println!("{}", json!({ "title": title.trim(), "seconds": seconds }));
            } else {
                println!("Reminder '{}' queued in {} seconds", title.trim(), seconds);
            }
        }
        Command::Notify => {
            let notifier = notifier_from_env()?;
            let outcome = crop_api::dispatch_due_reminders(stores, now, notifier.as_ref())?;
            if cli.json {
                let failures: Vec<Value> = outcome
                    .failures
                    .iter()
                    .map(|failure| {
                        json!({ "id": failure.reminder_id, "error": failure.error.to_string() })
                    })
                    .collect();
                println!(
                    "{}",
                    json!({ "delivered": outcome.delivered, "failures": failures })
                );
            } else {
                for reminder in &outcome.delivered {
                    println!("{}: {}", reminder.title, reminder.body);
                }
                if outcome.delivered.is_empty() {
                    println!("No reminders due");
                }
                for failure in &outcome.failures {
                    eprintln!("WARN: reminder {} failed: {}", failure.reminder_id, failure.error);
                }
            }
        }
    }

    Ok(())
}

fn run_interactive(session: &Session) -> Result<(), AppError> {
    let mut watch = match current_user_id(None, &session.config) {
        Ok(user_id) => Some(crop_api::watch_entries(&session.stores, &user_id)?),
        Err(_) => None,
    };

    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        if let Some(subscription) = watch.as_mut() {
            for emission in subscription.by_ref() {
                match emission {
                    Ok(entries) => debug!(count = entries.len(), "schedule cache refreshed"),
                    Err(err) => warn!(error = %err, "live schedule updates stopped"),
                }
            }
        }

        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("cropcare".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = run_command(session, cli) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn open_session() -> Result<Session, AppError> {
    let config = load_base_config();
    let stores = Stores::from_env()?;
    Ok(Session { stores, config })
}

fn main() {
    let mut args = std::env::args_os();
    args.next();
    let interactive = args.next().is_none();

    let session = match open_session() {
        Ok(session) => session,
        Err(err) => {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
    };

    if interactive {
        if let Err(err) = run_interactive(&session) {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run_command(&session, cli) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
