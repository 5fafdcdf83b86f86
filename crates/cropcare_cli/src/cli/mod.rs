use clap::{Parser, Subcommand, ValueEnum};
use cropcare_core::config::{ConfigOverrides, canonical_key};
use cropcare_core::date_math::TimeUnit;
use time::Date;
use time::macros::format_description;

#[derive(Parser, Debug)]
#[command(name = "cropcare", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Act as this user instead of CROPCARE_USER or the configured user_id
    #[arg(long, global = true, value_name = "USER_ID")]
    pub user: Option<String>,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record a planting and schedule its reminders
    ///
    /// Example: cropcare plan Ibirayi --farm Karambi --planted 2024-03-01 --actions "Land preparation"
    Plan {
        crop: String,
        #[arg(long)]
        farm: String,
        #[arg(long, value_name = "YYYY-MM-DD")]
        planted: String,
        #[arg(long)]
        actions: String,
        /// Defaults to today
        #[arg(long = "action-date", value_name = "YYYY-MM-DD")]
        action_date: Option<String>,
    },
    /// Show the task list for a crop without saving anything
    ///
    /// Example: cropcare tasks Ibigori 2024-09-15
    Tasks {
        crop: String,
        #[arg(value_name = "YYYY-MM-DD")]
        planted: String,
    },
    /// List schedule entries with their remaining days
    ///
    /// Example: cropcare list
    /// Example: cropcare list --basis planting
    List {
        #[arg(long, value_enum, default_value_t = Basis::NextAction)]
        basis: Basis,
    },
    /// List plantings coming up within a few days
    ///
    /// Example: cropcare upcoming --days 5
    Upcoming {
        #[arg(long)]
        days: Option<i64>,
    },
    /// Approve an entry by its list number
    ///
    /// Example: cropcare approve 1
    Approve { number: usize },
    /// Mark an entry as completed
    ///
    /// Example: cropcare complete 2
    Complete { number: usize },
    /// Delete an entry
    ///
    /// Example: cropcare delete 1
    Delete { number: usize },
    /// Replace the local cache with the remote entries
    ///
    /// Example: cropcare sync
    Sync,
    /// Show queued reminders
    ///
    /// Example: cropcare reminders
    Reminders,
    /// Queue a one-off reminder
    ///
    /// Example: cropcare remind "Irrigation" "Open the lower valves" --in 30 --unit minutes
    Remind {
        title: String,
        body: String,
        #[arg(long = "in", value_name = "AMOUNT")]
        amount: u64,
        #[arg(long, default_value = "seconds")]
        unit: String,
    },
    /// Show reminders that are due
    ///
    /// Example: cropcare notify
    Notify,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Basis {
    Planting,
    NextAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub key: String,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let key = canonical_key(key_raw);
    if key.is_empty() {
        return Err("override key cannot be empty".to_string());
    }

    Ok(ParsedConfigOverride {
        key,
        value: value_raw.trim().to_string(),
    })
}

pub fn collect_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry)?;
        overrides
            .apply(&parsed.key, &parsed.value)
            .map_err(|err| err.message().to_string())?;
    }
    Ok(overrides)
}

pub fn parse_date(raw: &str) -> Result<Date, String> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(raw.trim(), format).map_err(|_| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}

pub fn reminder_seconds(amount: u64, unit: &str) -> Result<u64, String> {
    let unit = TimeUnit::parse(unit).ok_or_else(|| format!("unknown time unit '{unit}'"))?;
    let per_unit = u64::try_from(unit.seconds()).map_err(|_| "invalid time unit".to_string())?;
    amount
        .checked_mul(per_unit)
        .ok_or_else(|| "reminder delay is too large".to_string())
}

/// Turns a 1-based list number into an index.
pub fn entry_index(number: usize) -> Result<usize, String> {
    number
        .checked_sub(1)
        .ok_or_else(|| "entry numbers start at 1".to_string())
}
