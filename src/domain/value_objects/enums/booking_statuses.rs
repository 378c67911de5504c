use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Active,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Active => "active",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Case- and whitespace-insensitive; `None` for anything outside the closed set.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(BookingStatus::Pending),
            "active" => Some(BookingStatus::Active),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

impl Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        assert_eq!(BookingStatus::parse("  ACTIVE \n"), Some(BookingStatus::Active));
        assert_eq!(BookingStatus::parse("Pending"), Some(BookingStatus::Pending));
        assert_eq!(BookingStatus::parse("cancelled"), Some(BookingStatus::Cancelled));
    }

    #[test]
    fn parse_rejects_unknown_values() {
        assert_eq!(BookingStatus::parse("completed"), None);
        assert_eq!(BookingStatus::parse(""), None);
    }

    #[test]
    fn display_matches_stored_value() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Active,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(BookingStatus::parse(&status.to_string()), Some(status));
        }
    }
}
