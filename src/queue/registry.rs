use super::job::{Job, JobId, JobStatus};

/// Ordered set of jobs for the session. Mutated only by the pool's
/// coordinating thread; jobs leave the registry on explicit clear, never
/// implicitly.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Vec<Job>,
}

/// Aggregate counts for display.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySummary {
    pub pending: usize,
    pub running: usize,
    pub paused: usize,
    pub completed: usize,
    pub failed: usize,
    pub canceled: usize,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, job: Job) -> JobId {
        let id = job.id;
        self.jobs.push(job);
        id
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    /// Oldest pending job, in insertion order.
    pub fn next_pending(&self) -> Option<JobId> {
        self.jobs
            .iter()
            .find(|j| j.status == JobStatus::Pending)
            .map(|j| j.id)
    }

    pub fn all_terminal(&self) -> bool {
        self.jobs.iter().all(|j| j.status.is_terminal())
    }

    pub fn summary(&self) -> RegistrySummary {
        let mut s = RegistrySummary::default();
        for job in &self.jobs {
            match job.status {
                JobStatus::Pending => s.pending += 1,
                JobStatus::Running => s.running += 1,
                JobStatus::Paused => s.paused += 1,
                JobStatus::Completed => s.completed += 1,
                JobStatus::Failed { .. } => s.failed += 1,
                JobStatus::Canceled => s.canceled += 1,
            }
        }
        s
    }

    /// Re-run a failed or canceled job as a fresh pending entry. The old
    /// entry keeps its state so the history of attempts stays visible.
    pub fn requeue(&mut self, id: JobId) -> Option<JobId> {
        let source = self.get(id)?;
        if !matches!(source.status, JobStatus::Failed { .. } | JobStatus::Canceled) {
            return None;
        }

        let fresh = Job::new(
            source.source.clone(),
            source.dest.clone(),
            source.duration_secs,
            source.command.clone(),
        );
        Some(self.add(fresh))
    }

    /// Drop terminal entries. Returns how many were removed.
    pub fn clear_terminal(&mut self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|j| !j.status.is_terminal());
        before - self.jobs.len()
    }
}
