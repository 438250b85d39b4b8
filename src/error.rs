use std::path::PathBuf;
use thiserror::Error;

/// Session-level errors. Per-job runtime failures are not represented here:
/// they live in `JobStatus::Failed` together with the diagnostic tail, so
/// one job's failure never aborts the session.
#[derive(Debug, Error)]
pub enum AppError {
    /// Neither the env override nor PATH nor the conventional locations
    /// yielded the binary. Fatal for the whole session.
    #[error("{tool} not found. Set {env_var} or install FFmpeg.")]
    ToolNotFound {
        tool: &'static str,
        env_var: &'static str,
    },

    #[error("failed to probe {path}: {reason}")]
    Probe { path: PathBuf, reason: String },

    /// Input has neither an audio nor a video stream.
    #[error("{0} has no audio or video streams")]
    NoUsableStreams(PathBuf),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<toml::ser::Error> for AppError {
    fn from(e: toml::ser::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(e: toml::de::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl AppError {
    pub fn probe(path: &std::path::Path, reason: impl Into<String>) -> Self {
        AppError::Probe {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}
