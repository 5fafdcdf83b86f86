//! Per-crop agronomic task tables.
//!
//! Offsets are fixed per crop and the descriptions are looked up separately
//! by `(crop, task kind, locale)`, so regenerating a schedule for the same
//! crop and planting date always yields the same list.

use crate::date_math::add_days;
use crate::model::{CropTask, CropType, Locale};
use time::Date;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Planting,
    Weeding,
    Fertilizing,
    SecondWeeding,
    Monitoring,
    Harvest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRule {
    pub offset_days: u32,
    pub kind: TaskKind,
}

const POTATO_RULES: [TaskRule; 6] = [
    TaskRule { offset_days: 0, kind: TaskKind::Planting },
    TaskRule { offset_days: 14, kind: TaskKind::Weeding },
    TaskRule { offset_days: 30, kind: TaskKind::Fertilizing },
    TaskRule { offset_days: 60, kind: TaskKind::SecondWeeding },
    TaskRule { offset_days: 90, kind: TaskKind::Monitoring },
    TaskRule { offset_days: 120, kind: TaskKind::Harvest },
];

const MAIZE_RULES: [TaskRule; 6] = [
    TaskRule { offset_days: 0, kind: TaskKind::Planting },
    TaskRule { offset_days: 15, kind: TaskKind::Weeding },
    TaskRule { offset_days: 30, kind: TaskKind::Fertilizing },
    TaskRule { offset_days: 60, kind: TaskKind::SecondWeeding },
    TaskRule { offset_days: 90, kind: TaskKind::Monitoring },
    TaskRule { offset_days: 120, kind: TaskKind::Harvest },
];

pub fn rule_table(crop: CropType) -> &'static [TaskRule] {
    match crop {
        CropType::Potatoes => &POTATO_RULES,
        CropType::Maize => &MAIZE_RULES,
    }
}

pub fn describe(crop: CropType, kind: TaskKind, locale: Locale) -> &'static str {
    use CropType::{Maize, Potatoes};
    use Locale::{English, Kinyarwanda};
    use TaskKind::*;

    match (locale, crop, kind) {
        (Kinyarwanda, Potatoes, Planting) => "Gutera Ibirayi",
        (Kinyarwanda, Maize, Planting) => "Gutera ibigori",
        (Kinyarwanda, _, Weeding) => "Gukuraho ibyatsi no kurwanya udukoko",
        (Kinyarwanda, _, Fertilizing) => "Gushyiraho ifumbire ya azote",
        (Kinyarwanda, _, SecondWeeding) => "Gukuraho ibyatsi no kurwanya udukoko bwa kabiri",
        (Kinyarwanda, Potatoes, Monitoring) => "Kugenzura indwara n’udukoko",
        (Kinyarwanda, Maize, Monitoring) => "Kongerera ibigori ibiribwa no kugenzura indwara",
        (Kinyarwanda, Potatoes, Harvest) => "Kwimbura Ibirayi",
        (Kinyarwanda, Maize, Harvest) => "Kwimbura ibigori",
        (English, Potatoes, Planting) => "Plant potatoes",
        (English, Maize, Planting) => "Plant maize",
        (English, _, Weeding) => "Remove weeds and control pests",
        (English, _, Fertilizing) => "Apply nitrogen fertilizer",
        (English, _, SecondWeeding) => "Second round of weeding and pest control",
        (English, Potatoes, Monitoring) => "Inspect for diseases and pests",
        (English, Maize, Monitoring) => "Top-dress maize and inspect for diseases",
        (English, Potatoes, Harvest) => "Harvest potatoes",
        (English, Maize, Harvest) => "Harvest maize",
    }
}

/// Unsupported crop names produce an empty list.
pub fn generate_tasks(crop_name: &str, planting_date: Date, locale: Locale) -> Vec<CropTask> {
    match CropType::parse(crop_name) {
        Some(crop) => tasks_for(crop, planting_date, locale),
        None => Vec::new(),
    }
}

pub fn tasks_for(crop: CropType, planting_date: Date, locale: Locale) -> Vec<CropTask> {
    rule_table(crop)
        .iter()
        .map(|rule| CropTask {
            offset_days: rule.offset_days,
            date: add_days(planting_date, i64::from(rule.offset_days)),
            description: describe(crop, rule.kind, locale).to_string(),
        })
        .collect()
}
