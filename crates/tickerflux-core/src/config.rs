//! Job configuration: static defaults, environment and TOML settings, and
//! per-invocation overrides.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::jobs::{descriptor, JobKind, UnknownJob};
use crate::naming::{KeyLayout, TimestampGranularity};
use crate::outputs::OutputFormat;

pub const DEFAULT_BUCKET: &str = "dat-lt";

pub const DEFAULT_TICKERS: [&str; 29] = [
    "CKV", "CMG", "CMT", "ELC", "FPT", "HIG", "HPT", "ICT", "ITD", "KST", "LTC", "ONE", "PMJ",
    "PMT", "POT", "SAM", "SBD", "SGT", "SMT", "SRA", "SRB", "ST8", "TST", "UNI", "VEC", "VIE",
    "VLA", "VTC", "VTE",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    UnknownJob(#[from] UnknownJob),
}

/// Everything one job run needs to know beyond its descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobConfig {
    pub tickers: Vec<String>,
    pub bucket: String,
    pub prefix: String,
    pub format: OutputFormat,
    pub timestamp: TimestampGranularity,
    pub layout: KeyLayout,
}

impl JobConfig {
    pub fn for_job(kind: JobKind) -> Self {
        let job = descriptor(kind);
        Self {
            tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            bucket: DEFAULT_BUCKET.to_string(),
            prefix: job.default_prefix.to_string(),
            format: job.format,
            timestamp: job.timestamp,
            layout: job.layout,
        }
    }

    pub fn with_overrides(mut self, overrides: &JobOverrides) -> Self {
        if let Some(tickers) = overrides.normalized_tickers() {
            self.tickers = tickers;
        }
        if let Some(bucket) = non_blank(overrides.bucket.as_deref()) {
            self.bucket = bucket.to_string();
        }
        if let Some(prefix) = non_blank(overrides.prefix.as_deref()) {
            self.prefix = prefix.to_string();
        }
        self
    }
}

/// Optional replacements for the ticker list, bucket and prefix. Blank values and
/// empty ticker lists count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobOverrides {
    pub tickers: Option<Vec<String>>,
    pub bucket: Option<String>,
    pub prefix: Option<String>,
}

impl JobOverrides {
    pub fn is_empty(&self) -> bool {
        self.normalized_tickers().is_none()
            && non_blank(self.bucket.as_deref()).is_none()
            && non_blank(self.prefix.as_deref()).is_none()
    }

    /// Later values win field by field.
    pub fn merge(&self, later: &JobOverrides) -> JobOverrides {
        JobOverrides {
            tickers: later
                .normalized_tickers()
                .or_else(|| self.normalized_tickers()),
            bucket: non_blank(later.bucket.as_deref())
                .or(non_blank(self.bucket.as_deref()))
                .map(str::to_string),
            prefix: non_blank(later.prefix.as_deref())
                .or(non_blank(self.prefix.as_deref()))
                .map(str::to_string),
        }
    }

    fn normalized_tickers(&self) -> Option<Vec<String>> {
        let tickers: Vec<String> = self
            .tickers
            .as_ref()?
            .iter()
            .map(|ticker| ticker.trim().to_ascii_uppercase())
            .filter(|ticker| !ticker.is_empty())
            .collect();
        (!tickers.is_empty()).then_some(tickers)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Process-wide settings. Built from the environment, optionally overlaid with a
/// TOML file of the form:
///
/// ```toml
/// bucket = "dat-lt"
/// provider_url = "https://apipubaws.tcbs.com.vn"
///
/// [jobs.price_stock]
/// tickers = ["FPT", "VTC"]
/// prefix = "raw/prices"
/// ```
///
/// Job table names go through `JobKind::from_str`, so `[jobs.price-stock]` and
/// `[jobs.Price_Stock]` address the same job as `[jobs.price_stock]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub bucket: Option<String>,
    pub provider_url: Option<String>,
    pub jobs: BTreeMap<JobKind, JobOverrides>,
}

/// On-disk shape of `Settings`, before job names are resolved.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    bucket: Option<String>,
    provider_url: Option<String>,
    jobs: BTreeMap<String, JobOverrides>,
}

impl Settings {
    /// Reads `TICKERFLUX_BUCKET` and `TICKERFLUX_PROVIDER_URL`.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| env::var(key).ok().filter(|value| !value.trim().is_empty());
        Self {
            bucket: non_empty("TICKERFLUX_BUCKET"),
            provider_url: non_empty("TICKERFLUX_PROVIDER_URL"),
            jobs: BTreeMap::new(),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: SettingsFile = toml::from_str(raw)?;

        let mut jobs: BTreeMap<JobKind, JobOverrides> = BTreeMap::new();
        for (name, overrides) in file.jobs {
            let kind: JobKind = name.parse()?;
            let merged = match jobs.get(&kind) {
                Some(existing) => existing.merge(&overrides),
                None => overrides,
            };
            jobs.insert(kind, merged);
        }

        Ok(Self {
            bucket: file.bucket,
            provider_url: file.provider_url,
            jobs,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Values present in `other` replace ours; job tables merge per field.
    pub fn overlay(mut self, other: Settings) -> Self {
        if other.bucket.is_some() {
            self.bucket = other.bucket;
        }
        if other.provider_url.is_some() {
            self.provider_url = other.provider_url;
        }
        for (kind, overrides) in other.jobs {
            let merged = match self.jobs.get(&kind) {
                Some(existing) => existing.merge(&overrides),
                None => overrides,
            };
            self.jobs.insert(kind, merged);
        }
        self
    }

    /// Defaults for `kind`, then the global bucket, then the job's own table.
    pub fn job_config(&self, kind: JobKind) -> JobConfig {
        let global = JobOverrides {
            bucket: self.bucket.clone(),
            ..JobOverrides::default()
        };
        let mut config = JobConfig::for_job(kind).with_overrides(&global);
        if let Some(overrides) = self.jobs.get(&kind) {
            config = config.with_overrides(overrides);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_descriptor() {
        let config = JobConfig::for_job(JobKind::BalanceSheet);
        assert_eq!(config.bucket, "dat-lt");
        assert_eq!(config.prefix, "raw/balance_sheet");
        assert_eq!(config.tickers.len(), 29);
        assert_eq!(config.tickers.first().map(String::as_str), Some("CKV"));
        assert_eq!(config.format, OutputFormat::Parquet);
        assert_eq!(config.layout, KeyLayout::PerIdentifier);

        let ratio = JobConfig::for_job(JobKind::Ratio);
        assert_eq!(ratio.timestamp, TimestampGranularity::Day);
        assert_eq!(ratio.format, OutputFormat::Json);
    }

    #[test]
    fn overrides_normalize_and_skip_blanks() {
        let overrides = JobOverrides {
            tickers: Some(vec![" fpt ".into(), "".into(), "vtc".into()]),
            bucket: Some("  ".into()),
            prefix: Some("staging/ratio".into()),
        };
        let config = JobConfig::for_job(JobKind::Ratio).with_overrides(&overrides);
        assert_eq!(config.tickers, vec!["FPT".to_string(), "VTC".to_string()]);
        assert_eq!(config.bucket, DEFAULT_BUCKET);
        assert_eq!(config.prefix, "staging/ratio");
    }

    #[test]
    fn empty_ticker_list_keeps_defaults() {
        let overrides = JobOverrides {
            tickers: Some(vec![]),
            ..JobOverrides::default()
        };
        assert!(overrides.is_empty());
        let config = JobConfig::for_job(JobKind::Cashflow).with_overrides(&overrides);
        assert_eq!(config.tickers.len(), DEFAULT_TICKERS.len());
    }

    #[test]
    fn toml_settings_apply_per_job() {
        let settings = Settings::from_toml_str(
            r#"
            bucket = "lake"

            [jobs.price_stock]
            tickers = ["fpt"]
            prefix = "raw/prices/"
            "#,
        )
        .unwrap();

        let price = settings.job_config(JobKind::PriceStock);
        assert_eq!(price.bucket, "lake");
        assert_eq!(price.tickers, vec!["FPT".to_string()]);
        assert_eq!(price.prefix, "raw/prices/");

        let ratio = settings.job_config(JobKind::Ratio);
        assert_eq!(ratio.bucket, "lake");
        assert_eq!(ratio.prefix, "raw/ratio");
    }

    #[test]
    fn unknown_job_tables_are_rejected() {
        let err = Settings::from_toml_str("[jobs.dividends]\nbucket = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownJob(_)));
    }

    #[test]
    fn job_table_aliases_resolve_to_the_job() {
        let settings = Settings::from_toml_str("[jobs.price-stock]\ntickers = [\"FPT\"]\n").unwrap();
        assert_eq!(
            settings.job_config(JobKind::PriceStock).tickers,
            vec!["FPT".to_string()]
        );

        let ratio = Settings::from_toml_str("[jobs.Ratio]\nprefix = \"alt/ratio\"\n").unwrap();
        assert_eq!(ratio.job_config(JobKind::Ratio).prefix, "alt/ratio");
    }

    #[test]
    fn aliased_tables_merge_with_canonical_ones() {
        let settings = Settings::from_toml_str(
            r#"
            [jobs.price_stock]
            tickers = ["FPT"]

            [jobs.price-stock]
            prefix = "raw/prices"
            "#,
        )
        .unwrap();
        assert_eq!(settings.jobs.len(), 1);

        let price = settings.job_config(JobKind::PriceStock);
        assert_eq!(price.tickers, vec!["FPT".to_string()]);
        assert_eq!(price.prefix, "raw/prices");

        let merged = Settings::default().overlay(settings).overlay(
            Settings::from_toml_str("[jobs.PRICE_STOCK]\nbucket = \"lake\"\n").unwrap(),
        );
        let price = merged.job_config(JobKind::PriceStock);
        assert_eq!(price.bucket, "lake");
        assert_eq!(price.prefix, "raw/prices");
    }

    #[test]
    fn overlay_prefers_later_values() {
        let base = Settings {
            bucket: Some("env-bucket".into()),
            provider_url: Some("http://env".into()),
            jobs: BTreeMap::from([(
                JobKind::Ratio,
                JobOverrides {
                    tickers: Some(vec!["FPT".into()]),
                    prefix: Some("env/ratio".into()),
                    ..JobOverrides::default()
                },
            )]),
        };
        let file = Settings {
            bucket: None,
            provider_url: Some("http://file".into()),
            jobs: BTreeMap::from([(
                JobKind::Ratio,
                JobOverrides {
                    prefix: Some("file/ratio".into()),
                    ..JobOverrides::default()
                },
            )]),
        };

        let merged = base.overlay(file);
        assert_eq!(merged.bucket.as_deref(), Some("env-bucket"));
        assert_eq!(merged.provider_url.as_deref(), Some("http://file"));
        let ratio = merged.job_config(JobKind::Ratio);
        assert_eq!(ratio.tickers, vec!["FPT".to_string()]);
        assert_eq!(ratio.prefix, "file/ratio");
    }
}
