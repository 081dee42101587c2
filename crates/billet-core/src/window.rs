//! Time windows for analytics queries

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The dashboard time range selection
///
/// Every range except `All` resolves to an inclusive lower bound on
/// `invoices.invoice_date`. There is never an upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TimeRange {
    #[serde(rename = "7days")]
    Last7Days,
    #[default]
    #[serde(rename = "30days")]
    Last30Days,
    #[serde(rename = "90days")]
    Last90Days,
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    pub const ALL: [TimeRange; 4] = [
        TimeRange::Last7Days,
        TimeRange::Last30Days,
        TimeRange::Last90Days,
        TimeRange::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Last7Days => "7days",
            Self::Last30Days => "30days",
            Self::Last90Days => "90days",
            Self::All => "all",
        }
    }

    /// Human label, e.g. "30 Days" or "All Time"
    pub fn label(&self) -> &'static str {
        match self {
            Self::Last7Days => "7 Days",
            Self::Last30Days => "30 Days",
            Self::Last90Days => "90 Days",
            Self::All => "All Time",
        }
    }

    /// Length of the window in days, `None` for all time
    pub fn days(&self) -> Option<i64> {
        match self {
            Self::Last7Days => Some(7),
            Self::Last30Days => Some(30),
            Self::Last90Days => Some(90),
            Self::All => None,
        }
    }

    /// Resolve the inclusive lower bound relative to `now`
    pub fn lower_bound(&self, now: DateTime<Utc>) -> Option<NaiveDate> {
        self.days()
            .map(|days| (now - Duration::days(days)).date_naive())
    }

    /// Whether an invoice dated `date` falls inside the window
    pub fn admits(&self, date: &str, now: DateTime<Utc>) -> bool {
        match self.lower_bound(now) {
            Some(bound) => date >= bound.format("%Y-%m-%d").to_string().as_str(),
            None => true,
        }
    }
}

impl std::str::FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "7days" | "7d" | "last-7-days" => Ok(Self::Last7Days),
            "30days" | "30d" | "last-30-days" => Ok(Self::Last30Days),
            "90days" | "90d" | "last-90-days" => Ok(Self::Last90Days),
            "all" | "all-time" => Ok(Self::All),
            _ => Err(format!(
                "Unknown time range: {}. Available: 7days, 30days, 90days, all",
                s
            )),
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
