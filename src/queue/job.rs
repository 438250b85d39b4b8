use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

pub type JobId = Uuid;

/// Slowing 2× back to 1× doubles the stream duration; ffmpeg reports
/// output timestamps, so progress is measured against this multiple of the
/// probed input duration.
pub const OUTPUT_DURATION_FACTOR: f64 = 2.0;

/// Status of a conversion job.
///
/// Legal transitions: Pending → Running, Pending → Canceled,
/// Pending → Failed (launch failure), Running ⇄ Paused,
/// Running → Completed | Failed | Canceled, Paused → Canceled.
/// Completed, Failed and Canceled are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Waiting for a free worker slot
    Pending,
    /// External process is running
    Running,
    /// External process is suspended
    Paused,
    /// Process exited cleanly
    Completed,
    /// Launch or runtime failure; reason carries the diagnostic tail
    Failed { reason: String },
    /// Stopped on request; partial output is left on disk
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed { .. } | JobStatus::Canceled
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Running => "Running",
            JobStatus::Paused => "Paused",
            JobStatus::Completed => "Completed",
            JobStatus::Failed { .. } => "Failed",
            JobStatus::Canceled => "Canceled",
        }
    }

    fn allows(&self, next: &JobStatus) -> bool {
        match (self, next) {
            (
                JobStatus::Pending,
                JobStatus::Running | JobStatus::Canceled | JobStatus::Failed { .. },
            ) => true,
            (
                JobStatus::Running,
                JobStatus::Paused
                | JobStatus::Completed
                | JobStatus::Failed { .. }
                | JobStatus::Canceled,
            ) => true,
            (JobStatus::Paused, JobStatus::Running | JobStatus::Canceled) => true,
            _ => false,
        }
    }
}

/// One file's conversion task.
#[derive(Debug)]
pub struct Job {
    pub id: JobId,
    pub source: PathBuf,
    pub dest: PathBuf,
    /// Probed input duration, when the container reported one.
    pub duration_secs: Option<f64>,
    /// Full command line including the program, fixed at preparation time.
    pub command: Vec<String>,
    pub status: JobStatus,
    /// Last known completion fraction; None while indeterminate.
    pub progress: Option<f32>,
    pub eta: Option<Duration>,
    pub pid: Option<u32>,
    /// Whether the launched process supports suspension. None until launch.
    pub pausable: Option<bool>,
}

impl Job {
    pub fn new(
        source: PathBuf,
        dest: PathBuf,
        duration_secs: Option<f64>,
        command: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            dest,
            duration_secs,
            command,
            status: JobStatus::Pending,
            progress: None,
            eta: None,
            pid: None,
            pausable: None,
        }
    }

    /// Expected duration of the retimed output stream.
    pub fn expected_output_secs(&self) -> Option<f64> {
        self.duration_secs.map(|d| d * OUTPUT_DURATION_FACTOR)
    }

    /// Apply a status change if the edge is legal. Illegal transitions are
    /// refused and logged rather than panicking, so a late worker event can
    /// never corrupt a terminal state.
    pub fn transition(&mut self, next: JobStatus) -> bool {
        if !self.status.allows(&next) {
            warn!(
                "refused {} -> {} for {}",
                self.status.label(),
                next.label(),
                self.filename()
            );
            return false;
        }
        if next == JobStatus::Completed {
            self.progress = Some(1.0);
            self.eta = None;
        }
        self.status = next;
        true
    }

    pub fn filename(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Check if a path has a recognized media extension.
pub fn is_media_file(path: &Path) -> bool {
    const MEDIA_EXTENSIONS: [&str; 5] = ["mp4", "mkv", "mov", "m4a", "wav"];

    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| MEDIA_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}
