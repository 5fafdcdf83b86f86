use serde::{Serialize, Serializer};
use std::fmt;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

const MILLIS_PER_DAY: i128 = 86_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Days,
    Weeks,
    Months,
}

impl TimeUnit {
    /// Months are a fixed 2,628,000 seconds, not calendar months. Reminders
    /// already handed to the notification primitive were computed with it.
    pub fn seconds(self) -> i64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Days => 86_400,
            Self::Weeks => 604_800,
            Self::Months => 2_628_000,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "second" | "seconds" => Some(Self::Seconds),
            "m" | "min" | "minute" | "minutes" => Some(Self::Minutes),
            "d" | "day" | "days" => Some(Self::Days),
            "w" | "week" | "weeks" => Some(Self::Weeks),
            "mo" | "month" | "months" => Some(Self::Months),
            _ => None,
        }
    }
}

pub fn add_offset(base: OffsetDateTime, amount: i64, unit: TimeUnit) -> OffsetDateTime {
    let seconds = amount.saturating_mul(unit.seconds());
    base.saturating_add(Duration::seconds(seconds))
}

pub fn add_days(date: Date, days: i64) -> Date {
    date.saturating_add(Duration::days(days))
}

/// Start of `date` in the offset of `reference`.
pub fn start_of_day(date: Date, reference: UtcOffset) -> OffsetDateTime {
    date.midnight().assume_offset(reference)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemainingDays {
    Days(i64),
    Expired,
}

impl RemainingDays {
    pub fn is_expired(self) -> bool {
        matches!(self, Self::Expired)
    }

    pub fn days(self) -> Option<i64> {
        match self {
            Self::Days(days) => Some(days),
            Self::Expired => None,
        }
    }
}

impl fmt::Display for RemainingDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Days(days) => write!(f, "{days} days remaining"),
            Self::Expired => f.write_str("Expired"),
        }
    }
}

impl Serialize for RemainingDays {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Days(days) => serializer.serialize_i64(*days),
            Self::Expired => serializer.serialize_str("Expired"),
        }
    }
}

pub fn remaining_days(target: OffsetDateTime, now: OffsetDateTime) -> RemainingDays {
    let millis = (target - now).whole_milliseconds();
    let mut days = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) != 0 {
        days += 1;
    }

    if days < 0 {
        RemainingDays::Expired
    } else {
        RemainingDays::Days(days as i64)
    }
}
