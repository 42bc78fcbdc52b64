use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resolution of the stamp embedded in artifact keys. Day-stamped keys are overwritten
/// by a re-run on the same day; second-stamped keys accumulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampGranularity {
    Second,
    Day,
}

impl TimestampGranularity {
    pub fn stamp(&self, at: DateTime<Utc>) -> String {
        match self {
            TimestampGranularity::Second => at.format("%Y%m%d_%H%M%S").to_string(),
            TimestampGranularity::Day => at.format("%Y%m%d").to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyLayout {
    /// `<prefix>/<report>_<ticker>_<stamp>.<ext>`
    Flat,
    /// `<prefix>/<ticker>/<report>_<ticker>_<stamp>.<ext>`
    PerIdentifier,
}

pub fn object_key(
    prefix: &str,
    report: &str,
    ticker: &str,
    stamp: &str,
    extension: &str,
    layout: KeyLayout,
) -> String {
    let file_name = format!("{report}_{ticker}_{stamp}.{extension}");
    let prefix = prefix.trim_end_matches('/');

    let mut key = String::with_capacity(prefix.len() + ticker.len() + file_name.len() + 2);
    if !prefix.is_empty() {
        key.push_str(prefix);
        key.push('/');
    }
    if layout == KeyLayout::PerIdentifier {
        key.push_str(ticker);
        key.push('/');
    }
    key.push_str(&file_name);
    key
}
