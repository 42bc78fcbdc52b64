use thiserror::Error;

use crate::bucket::BucketError;
use crate::outputs::OutputError;
use crate::provider::ProviderError;
use crate::reshape::ReshapeError;

/// Failure of a single ticker inside a job. The batch records it and moves on.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("fetch failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("reshape failed: {0}")]
    Reshape(#[from] ReshapeError),

    #[error("serialization failed: {0}")]
    Serialize(#[from] OutputError),

    #[error("upload failed: {0}")]
    Upload(#[from] BucketError),
}

impl JobError {
    pub fn stage(&self) -> &'static str {
        match self {
            JobError::Provider(_) => "fetch",
            JobError::Reshape(_) => "reshape",
            JobError::Serialize(_) => "serialize",
            JobError::Upload(_) => "upload",
        }
    }
}

pub type Result<T> = std::result::Result<T, JobError>;
