use super::job::{Job, JobId, JobStatus};
use super::process::{ProcessControl, control_for};
use super::registry::JobRegistry;
use super::worker::{ExitOutcome, WorkerContext, WorkerEvent, run_worker};
use crate::ffmpeg::progress::ProgressUpdate;
use std::collections::HashMap;
use std::process::{Command, Stdio};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Time between the cooperative terminate and the forceful kill of a
/// canceled process.
const CANCEL_GRACE: Duration = Duration::from_secs(5);

/// Notifications for whatever presentation layer is attached. The core
/// never talks to a UI toolkit directly.
#[derive(Debug, Clone)]
pub enum JobEvent {
    StatusChanged { id: JobId, status: JobStatus },
    Progress { id: JobId, update: ProgressUpdate },
    Diagnostic { id: JobId, line: String },
}

struct ActiveWorker {
    control: Box<dyn ProcessControl>,
    cancel: Arc<AtomicBool>,
    thread: JoinHandle<()>,
    suspended: bool,
    cancel_requested_at: Option<Instant>,
    killed: bool,
}

/// Bounded-concurrency scheduler over the job registry.
///
/// Workers run one thread per active external process and report back over
/// an internal channel; all registry mutation happens on the thread that
/// calls [`WorkerPool::pump`], so job state never races.
pub struct WorkerPool {
    limit: usize,
    queue_paused: bool,
    registry: JobRegistry,
    active: HashMap<JobId, ActiveWorker>,
    worker_tx: Sender<WorkerEvent>,
    worker_rx: Receiver<WorkerEvent>,
    notify: Sender<JobEvent>,
}

impl WorkerPool {
    pub fn new(limit: usize, notify: Sender<JobEvent>) -> Self {
        let (worker_tx, worker_rx) = channel();
        Self {
            limit: limit.max(1),
            queue_paused: false,
            registry: JobRegistry::new(),
            active: HashMap::new(),
            worker_tx,
            worker_rx,
            notify,
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut JobRegistry {
        &mut self.registry
    }

    pub fn running_count(&self) -> usize {
        self.active.len()
    }

    /// No live workers and nothing admissible left.
    pub fn is_idle(&self) -> bool {
        self.active.is_empty() && self.registry.next_pending().is_none()
    }

    pub fn set_concurrency(&mut self, limit: usize) {
        self.limit = limit.max(1);
        self.dispatch();
    }

    /// Add a prepared job and admit it right away if capacity allows.
    pub fn enqueue(&mut self, job: Job) -> JobId {
        let id = self.registry.add(job);
        self.dispatch();
        id
    }

    /// Stop admitting new jobs. Already-running processes are unaffected.
    pub fn pause_queue(&mut self) {
        self.queue_paused = true;
    }

    /// Resume admissions and wake any suspended jobs.
    pub fn resume_queue(&mut self) {
        self.queue_paused = false;
        let suspended: Vec<JobId> = self
            .active
            .iter()
            .filter(|(_, w)| w.suspended)
            .map(|(id, _)| *id)
            .collect();
        for id in suspended {
            self.resume_job(id);
        }
        self.dispatch();
    }

    /// Suspend one running job's process. On platforms without suspension
    /// the job is left running and stays flagged non-pausable.
    pub fn pause_job(&mut self, id: JobId) {
        let Some(worker) = self.active.get_mut(&id) else {
            return;
        };
        if worker.suspended {
            return;
        }
        if !worker.control.supports_suspend() {
            warn!("job {} cannot be paused on this platform", id);
            return;
        }
        if worker.control.suspend() {
            worker.suspended = true;
            self.apply_transition(id, JobStatus::Paused);
        }
    }

    pub fn resume_job(&mut self, id: JobId) {
        let Some(worker) = self.active.get_mut(&id) else {
            return;
        };
        if worker.suspended && worker.control.resume() {
            worker.suspended = false;
            self.apply_transition(id, JobStatus::Running);
        }
    }

    /// Cancel a job. Pending jobs are dequeued; running ones get a
    /// cooperative terminate, escalated to a forceful kill after the grace
    /// period. The partial output file is left in place.
    pub fn cancel(&mut self, id: JobId) {
        if let Some(worker) = self.active.get_mut(&id) {
            worker.cancel.store(true, Ordering::Relaxed);
            if worker.suspended {
                // A stopped process cannot act on SIGTERM.
                worker.control.resume();
                worker.suspended = false;
            }
            worker.control.terminate();
            worker.cancel_requested_at.get_or_insert_with(Instant::now);
            return;
        }

        if let Some(job) = self.registry.get_mut(id)
            && job.status == JobStatus::Pending
        {
            self.apply_transition(id, JobStatus::Canceled);
            self.dispatch();
        }
    }

    pub fn cancel_all(&mut self) {
        let ids: Vec<JobId> = self
            .registry
            .jobs()
            .iter()
            .filter(|j| !j.status.is_terminal())
            .map(|j| j.id)
            .collect();
        for id in ids {
            self.cancel(id);
        }
    }

    /// Process worker events and fill freed slots. Blocks up to `wait` for
    /// the first event, then drains whatever else arrived.
    pub fn pump(&mut self, wait: Duration) {
        match self.worker_rx.recv_timeout(wait) {
            Ok(event) => {
                self.apply(event);
                while let Ok(event) = self.worker_rx.try_recv() {
                    self.apply(event);
                }
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {}
        }
        self.escalate_cancellations();
        self.dispatch();
    }

    /// Force-kill canceled processes that ignored the cooperative
    /// terminate, so a blocked stream read always unblocks.
    fn escalate_cancellations(&mut self) {
        for worker in self.active.values_mut() {
            if let Some(requested) = worker.cancel_requested_at
                && !worker.killed
                && requested.elapsed() >= CANCEL_GRACE
            {
                warn!("cancellation grace expired, killing process");
                worker.control.kill();
                worker.killed = true;
            }
        }
    }

    fn apply(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Progress { id, update } => {
                if let Some(job) = self.registry.get_mut(id) {
                    job.progress = update.fraction;
                    job.eta = update.eta;
                }
                let _ = self.notify.send(JobEvent::Progress { id, update });
            }
            WorkerEvent::Diagnostic { id, line } => {
                debug!(job = %id, "{}", line);
                let _ = self.notify.send(JobEvent::Diagnostic { id, line });
            }
            WorkerEvent::Exited { id, outcome } => {
                if let Some(worker) = self.active.remove(&id) {
                    let _ = worker.thread.join();
                }
                let status = match outcome {
                    ExitOutcome::Completed => JobStatus::Completed,
                    ExitOutcome::Failed { reason } => JobStatus::Failed { reason },
                    ExitOutcome::Canceled => JobStatus::Canceled,
                };
                self.apply_transition(id, status);
            }
        }
    }

    fn apply_transition(&mut self, id: JobId, status: JobStatus) {
        if let Some(job) = self.registry.get_mut(id)
            && job.transition(status.clone())
        {
            info!("{} -> {}", job.filename(), status.label());
            let _ = self.notify.send(JobEvent::StatusChanged { id, status });
        }
    }

    /// FIFO admission up to the concurrency bound.
    fn dispatch(&mut self) {
        if self.queue_paused {
            return;
        }
        while self.active.len() < self.limit {
            let Some(id) = self.registry.next_pending() else {
                break;
            };
            self.launch(id);
        }
    }

    fn launch(&mut self, id: JobId) {
        let Some(job) = self.registry.get(id) else {
            return;
        };
        let command = job.command.clone();
        let total_output_secs = job.expected_output_secs();
        let filename = job.filename();

        let Some((program, args)) = command.split_first() else {
            self.apply_transition(
                id,
                JobStatus::Failed {
                    reason: "empty command line".to_string(),
                },
            );
            return;
        };

        let spawned = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                warn!("failed to start {}: {}", program, e);
                self.apply_transition(
                    id,
                    JobStatus::Failed {
                        reason: format!("failed to start {program}: {e}"),
                    },
                );
                return;
            }
        };

        let pid = child.id();
        let stderr = child.stderr.take().expect("stderr was piped");
        let shared = Arc::new(Mutex::new(child));
        let control = control_for(shared.clone(), pid);
        let cancel = Arc::new(AtomicBool::new(false));

        if let Some(job) = self.registry.get_mut(id) {
            job.pid = Some(pid);
            job.pausable = Some(control.supports_suspend());
        }

        debug!("launching {} (pid {})", filename, pid);

        let ctx = WorkerContext {
            id,
            child: shared,
            stderr,
            total_output_secs,
            cancel: cancel.clone(),
            events: self.worker_tx.clone(),
        };
        let thread = std::thread::spawn(move || run_worker(ctx));

        self.active.insert(
            id,
            ActiveWorker {
                control,
                cancel,
                thread,
                suspended: false,
                cancel_requested_at: None,
                killed: false,
            },
        );
        self.apply_transition(id, JobStatus::Running);
    }
}
