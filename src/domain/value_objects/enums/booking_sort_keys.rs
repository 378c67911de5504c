use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Columns a listing may be ordered by. Anything else is never passed to the store.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingSortKey {
    #[default]
    StartTime,
    TotalPrice,
    CreatedAt,
    Id,
}

impl BookingSortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingSortKey::StartTime => "start_time",
            BookingSortKey::TotalPrice => "total_price",
            BookingSortKey::CreatedAt => "created_at",
            BookingSortKey::Id => "id",
        }
    }

    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("start_time") => BookingSortKey::StartTime,
            Some("total_price") => BookingSortKey::TotalPrice,
            Some("created_at") => BookingSortKey::CreatedAt,
            Some("id") => BookingSortKey::Id,
            _ => BookingSortKey::default(),
        }
    }
}

impl Display for BookingSortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
