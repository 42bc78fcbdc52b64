use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tickerflux_core::invocation::{handle, InvocationEvent, InvocationResponse};
use tickerflux_core::jobs::{all_job_descriptors, JobDescriptor, JobKind};
use tickerflux_core::naming::{KeyLayout, TimestampGranularity};
use tickerflux_core::outputs::OutputFormat;
use tracing::{info, warn};

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct JobInfo {
    pub code: &'static str,
    pub description: &'static str,
    pub format: OutputFormat,
    pub layout: KeyLayout,
    pub timestamp: TimestampGranularity,
    pub default_prefix: &'static str,
}

impl From<&JobDescriptor> for JobInfo {
    fn from(job: &JobDescriptor) -> Self {
        Self {
            code: job.kind.code(),
            description: job.description,
            format: job.format,
            layout: job.layout,
            timestamp: job.timestamp,
            default_prefix: job.default_prefix,
        }
    }
}

pub async fn list_jobs() -> Json<Vec<JobInfo>> {
    Json(all_job_descriptors().iter().map(JobInfo::from).collect())
}

/// The body is an optional JSON event; an empty body runs with defaults.
pub async fn invoke_job(
    State(state): State<AppState>,
    Path(job): Path<String>,
    body: Bytes,
) -> Result<Json<InvocationResponse>, (StatusCode, String)> {
    let kind: JobKind = job
        .parse()
        .map_err(|err| (StatusCode::NOT_FOUND, format!("{err}")))?;

    let event = InvocationEvent::from_json(&body).map_err(|err| {
        warn!(job = %kind, "rejected invocation event: {err}");
        (StatusCode::BAD_REQUEST, format!("invalid event: {err}"))
    })?;

    info!(job = %kind, "invoking job over http");
    let response = handle(
        kind,
        &event,
        &state.settings,
        state.provider.as_ref(),
        state.store.as_ref(),
    )
    .await
    .map_err(|err| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode job summary: {err}"),
        )
    })?;
    Ok(Json(response))
}
