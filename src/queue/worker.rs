use super::job::JobId;
use super::process::SharedChild;
use crate::ffmpeg::progress::{ProgressParser, ProgressUpdate};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::process::{ChildStderr, ExitStatus};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How many trailing diagnostic lines are kept as the failure reason.
const DIAGNOSTIC_TAIL_LINES: usize = 10;

/// Time allowed between cooperative termination (or stream EOF) and the
/// forceful kill.
const EXIT_GRACE: Duration = Duration::from_secs(5);

/// Phrases that mark a run as failed even on a zero exit code.
const ERROR_MARKERS: &[&str] = &[
    "Conversion failed!",
    "Invalid data found when processing input",
    "Error while decoding",
];

/// Messages sent from worker threads to the pool's coordinating thread.
pub enum WorkerEvent {
    Progress { id: JobId, update: ProgressUpdate },
    Diagnostic { id: JobId, line: String },
    Exited { id: JobId, outcome: ExitOutcome },
}

/// Terminal classification of one external process run.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitOutcome {
    Completed,
    Failed { reason: String },
    Canceled,
}

/// Everything one worker thread owns for its job.
pub(crate) struct WorkerContext {
    pub id: JobId,
    pub child: SharedChild,
    pub stderr: ChildStderr,
    pub total_output_secs: Option<f64>,
    pub cancel: Arc<AtomicBool>,
    pub events: Sender<WorkerEvent>,
}

/// Drain the process's diagnostic stream, then classify its exit.
///
/// The worker never deletes the output file: partial results from a failed
/// or canceled run stay on disk for inspection.
pub(crate) fn run_worker(ctx: WorkerContext) {
    let mut parser = ProgressParser::new(ctx.total_output_secs);
    let mut tail: VecDeque<String> = VecDeque::with_capacity(DIAGNOSTIC_TAIL_LINES);

    let mut reader = BufReader::new(ctx.stderr);
    let mut buf = Vec::new();

    // ffmpeg separates status updates with carriage returns and everything
    // else with newlines, so read up to either and split the chunk.
    loop {
        buf.clear();
        match reader.read_until(b'\r', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("stderr read ended: {}", e);
                break;
            }
        }

        let chunk = String::from_utf8_lossy(&buf);
        for line in chunk.split(['\r', '\n']) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            push_tail(&mut tail, line);
            let _ = ctx.events.send(WorkerEvent::Diagnostic {
                id: ctx.id,
                line: line.to_string(),
            });

            if let Some(update) = parser.push_line(line) {
                let _ = ctx.events.send(WorkerEvent::Progress {
                    id: ctx.id,
                    update,
                });
            }
        }

        if ctx.cancel.load(Ordering::Relaxed) {
            break;
        }
    }

    let status = wait_with_grace(&ctx.child, EXIT_GRACE);

    let outcome = if ctx.cancel.load(Ordering::Relaxed) {
        ExitOutcome::Canceled
    } else {
        classify_exit(status, &tail)
    };

    let _ = ctx.events.send(WorkerEvent::Exited {
        id: ctx.id,
        outcome,
    });
}

fn push_tail(tail: &mut VecDeque<String>, line: &str) {
    if tail.len() == DIAGNOSTIC_TAIL_LINES {
        tail.pop_front();
    }
    tail.push_back(line.to_string());
}

/// Wait for the child to exit, escalating to a forceful kill once the
/// grace period runs out.
fn wait_with_grace(child: &SharedChild, grace: Duration) -> Option<ExitStatus> {
    let deadline = Instant::now() + grace;

    loop {
        if let Ok(mut guard) = child.lock() {
            match guard.try_wait() {
                Ok(Some(status)) => return Some(status),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        warn!("process outlived grace period, killing");
                        let _ = guard.kill();
                        return guard.wait().ok();
                    }
                }
                Err(e) => {
                    warn!("failed to poll process: {}", e);
                    return None;
                }
            }
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

fn classify_exit(status: Option<ExitStatus>, tail: &VecDeque<String>) -> ExitOutcome {
    let Some(status) = status else {
        return ExitOutcome::Failed {
            reason: "process status could not be determined".to_string(),
        };
    };

    if status.success() && !tail_has_error(tail) {
        return ExitOutcome::Completed;
    }

    let excerpt = tail.iter().cloned().collect::<Vec<_>>().join("\n");
    let reason = if excerpt.is_empty() {
        format!("ffmpeg exited with {status}")
    } else {
        format!("ffmpeg exited with {status}:\n{excerpt}")
    };
    ExitOutcome::Failed { reason }
}

fn tail_has_error(tail: &VecDeque<String>) -> bool {
    tail.iter()
        .any(|line| ERROR_MARKERS.iter().any(|marker| line.contains(marker)))
}
