use serde::{Deserialize, Serialize};
use time::Date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CropType {
    #[serde(rename = "Ibigori")]
    Maize,
    #[serde(rename = "Ibirayi")]
    Potatoes,
}

impl CropType {
    pub const ALL: [CropType; 2] = [CropType::Maize, CropType::Potatoes];

    /// Accepts the stored Kinyarwanda names as well as the English labels
    /// used on the crop management screens.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ibigori" | "maize" | "corn" => Some(Self::Maize),
            "ibirayi" | "potatoes" | "potato" | "irish potatoes" => Some(Self::Potatoes),
            _ => None,
        }
    }

    /// Name written into schedule entries.
    pub fn stored_name(self) -> &'static str {
        match self {
            Self::Maize => "Ibigori",
            Self::Potatoes => "Ibirayi",
        }
    }

    pub fn english_name(self) -> &'static str {
        match self {
            Self::Maize => "maize",
            Self::Potatoes => "potatoes",
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "rw", alias = "kinyarwanda")]
    Kinyarwanda,
    #[serde(rename = "en", alias = "english")]
    English,
}

impl Locale {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rw" | "kinyarwanda" | "rw-rw" => Some(Self::Kinyarwanda),
            "en" | "english" | "en-us" | "en-gb" => Some(Self::English),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Kinyarwanda => "rw",
            Self::English => "en",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropTask {
    pub offset_days: u32,
    #[serde(with = "crate::model::iso_date")]
    pub date: Date,
    pub description: String,
}
