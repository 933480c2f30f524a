use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures surfaced by the photo pipeline.
///
/// A missing face is not an error: the photo passes through unchanged.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The detector model could not be loaded. Aborts the run.
    #[error("failed to load detector model {}", path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    /// Settings that no run can honour. Aborts the run.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The photo could not be read or decoded.
    #[error("failed to decode {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    /// The classifier backend failed on this photo.
    #[error("face detection failed")]
    Detection(#[source] anyhow::Error),
    /// The operator chose to leave this photo out.
    #[error("photo skipped by operator")]
    InteractiveSkip,
    /// Talking to the operator failed.
    #[error("interactive prompt failed")]
    Presenter(#[from] io::Error),
}

impl PipelineError {
    /// True for errors that must stop the whole batch.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::ModelLoad { .. } | PipelineError::InvalidConfig(_)
        )
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, PipelineError::InteractiveSkip)
    }
}
