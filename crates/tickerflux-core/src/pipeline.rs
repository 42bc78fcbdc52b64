//! Fetch, reshape, serialize and upload every ticker of one job.

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::bucket::BucketStore;
use crate::config::JobConfig;
use crate::error::JobError;
use crate::jobs::JobDescriptor;
use crate::naming::object_key;
use crate::outputs::serialize;
use crate::provider::{DateRange, ProviderError, ReportProvider, ReportQuery};
use crate::reshape::reshape;

/// What a successful ticker left behind in the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_key: String,
    pub records_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TickerOutcome {
    Success {
        ticker: String,
        file_key: String,
        records_count: usize,
    },
    Error {
        ticker: String,
        error: String,
    },
}

impl TickerOutcome {
    pub fn from_result(ticker: &str, result: Result<Artifact, JobError>) -> Self {
        match result {
            Ok(artifact) => TickerOutcome::Success {
                ticker: ticker.to_string(),
                file_key: artifact.file_key,
                records_count: artifact.records_count,
            },
            Err(err) => TickerOutcome::Error {
                ticker: ticker.to_string(),
                error: format!("processing failed for {ticker}: {err}"),
            },
        }
    }

    pub fn ticker(&self) -> &str {
        match self {
            TickerOutcome::Success { ticker, .. } | TickerOutcome::Error { ticker, .. } => ticker,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TickerOutcome::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub processed_tickers: usize,
    pub successful: usize,
    pub failed: usize,
    pub details: Vec<TickerOutcome>,
}

impl JobSummary {
    pub fn from_outcomes(details: Vec<TickerOutcome>) -> Self {
        let successful = details.iter().filter(|o| o.is_success()).count();
        Self {
            processed_tickers: details.len(),
            successful,
            failed: details.len() - successful,
            details,
        }
    }
}

/// Provider query for `ticker`. Jobs with a history start request the range from
/// January 1st of that year through `today`.
pub fn build_query(
    job: &JobDescriptor,
    ticker: &str,
    today: NaiveDate,
) -> Result<ReportQuery, ProviderError> {
    let history = match job.history_start_year {
        Some(year) => {
            let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| {
                ProviderError::InvalidQuery {
                    ticker: ticker.to_string(),
                    message: format!("invalid history start year {year}"),
                }
            })?;
            Some(DateRange { start, end: today })
        }
        None => None,
    };

    Ok(ReportQuery {
        ticker: ticker.to_string(),
        source: job.source,
        period: job.period,
        history,
    })
}

pub async fn process_ticker(
    job: &JobDescriptor,
    config: &JobConfig,
    provider: &dyn ReportProvider,
    store: &dyn BucketStore,
    ticker: &str,
    invoked_at: DateTime<Utc>,
) -> Result<Artifact, JobError> {
    let query = build_query(job, ticker, invoked_at.date_naive())?;
    let raw = provider.fetch(&query).await?;
    let shaped = reshape(&raw, ticker, &job.reshape)?;
    let bytes = serialize(&shaped, config.format)?;

    let file_key = object_key(
        &config.prefix,
        job.report_name,
        ticker,
        &config.timestamp.stamp(invoked_at),
        config.format.extension(),
        config.layout,
    );
    store
        .put_object(
            &config.bucket,
            &file_key,
            Bytes::from(bytes),
            config.format.content_type(),
        )
        .await?;
    info!(job = %job.kind, ticker, bucket = %config.bucket, key = %file_key, "uploaded artifact");

    Ok(Artifact {
        file_key,
        records_count: shaped.height(),
    })
}

/// Runs every configured ticker in order. A failing ticker is logged and recorded;
/// the rest still run.
pub async fn run_job(
    job: &JobDescriptor,
    config: &JobConfig,
    provider: &dyn ReportProvider,
    store: &dyn BucketStore,
    invoked_at: DateTime<Utc>,
) -> JobSummary {
    let mut outcomes = Vec::with_capacity(config.tickers.len());

    for ticker in &config.tickers {
        info!(job = %job.kind, ticker = %ticker, provider = provider.name(), "processing ticker");
        let result = process_ticker(job, config, provider, store, ticker, invoked_at).await;
        if let Err(err) = &result {
            error!(job = %job.kind, ticker = %ticker, stage = err.stage(), "{err}");
        }
        outcomes.push(TickerOutcome::from_result(ticker, result));
    }

    let summary = JobSummary::from_outcomes(outcomes);
    info!(
        job = %job.kind,
        processed = summary.processed_tickers,
        successful = summary.successful,
        failed = summary.failed,
        "job finished"
    );
    summary
}
