//! The serverless-style entry contract: an optional event in, `{statusCode, body}` out.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::bucket::BucketStore;
use crate::config::{JobOverrides, Settings};
use crate::jobs::{descriptor, JobKind};
use crate::pipeline::{run_job, JobSummary};
use crate::provider::ReportProvider;

/// Trigger payload. Every field is optional; `{}` or no event at all runs the job
/// with its configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvocationEvent {
    pub tickers: Option<Vec<String>>,
    pub bucket: Option<String>,
    pub prefix: Option<String>,
}

impl InvocationEvent {
    /// `null` and empty payloads mean "no overrides".
    pub fn from_json(raw: &[u8]) -> Result<Self, serde_json::Error> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        match serde_json::from_slice::<Value>(raw)? {
            Value::Null => Ok(Self::default()),
            value => serde_json::from_value(value),
        }
    }

    pub fn overrides(&self) -> JobOverrides {
        JobOverrides {
            tickers: self.tickers.clone(),
            bucket: self.bucket.clone(),
            prefix: self.prefix.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// The serialized `JobSummary`.
    pub body: String,
}

impl InvocationResponse {
    pub fn from_summary(summary: &JobSummary) -> Result<Self, serde_json::Error> {
        Ok(Self {
            status_code: 200,
            body: serde_json::to_string(summary)?,
        })
    }

    pub fn summary(&self) -> Result<JobSummary, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Runs `kind` once. The response is 200 even when every ticker failed; per-ticker
/// failures live in the body. Only a summary that cannot be encoded is an error.
pub async fn handle(
    kind: JobKind,
    event: &InvocationEvent,
    settings: &Settings,
    provider: &dyn ReportProvider,
    store: &dyn BucketStore,
) -> Result<InvocationResponse, serde_json::Error> {
    let invoked_at = Utc::now();
    let config = settings.job_config(kind).with_overrides(&event.overrides());
    let summary = run_job(descriptor(kind), &config, provider, store, invoked_at).await;
    InvocationResponse::from_summary(&summary).inspect_err(|err| {
        error!(job = %kind, processed = summary.processed_tickers, "failed to encode job summary: {err}");
    })
}
