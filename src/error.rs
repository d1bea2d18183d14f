//! Error taxonomy for a harness run.
//!
//! Every variant is fatal for the run. Nothing is retried; the pipeline
//! releases the workspace and surfaces the error as the single failure.
use std::path::PathBuf;
use thiserror::Error;

pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// The toolchain could not be spawned or exited nonzero.
    #[error("build failed: {command}\n{output}\n{detail}")]
    Build {
        command: String,
        output: String,
        detail: String,
    },

    /// Listing the suite source directory failed.
    #[error("list test definitions in {}: {source}", dir.display())]
    Discovery {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Materializing the runtime support library failed.
    #[error("runtime library: {detail}")]
    Library { detail: String },

    /// The fixture could not be started or exited unsuccessfully.
    #[error("fixture run failed: {detail}")]
    Execution { detail: String },

    #[error("running the fixture on {os} is not implemented")]
    UnsupportedPlatform { os: &'static str },

    #[error("run cancelled before {stage}")]
    Cancelled { stage: &'static str },

    #[error("invalid configuration: {detail}")]
    Config { detail: String },
}

impl HarnessError {
    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        HarnessError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Short stable label used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            HarnessError::Build { .. } => "build",
            HarnessError::Discovery { .. } => "discovery",
            HarnessError::Io { .. } => "io",
            HarnessError::Library { .. } => "library",
            HarnessError::Execution { .. } => "execution",
            HarnessError::UnsupportedPlatform { .. } => "unsupported_platform",
            HarnessError::Cancelled { .. } => "cancelled",
            HarnessError::Config { .. } => "config",
        }
    }
}
