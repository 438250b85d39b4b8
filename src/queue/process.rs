use std::process::Child;
use std::sync::{Arc, Mutex};
use tracing::warn;

pub type SharedChild = Arc<Mutex<Child>>;

/// Control surface over a launched external process.
///
/// Suspension is platform-dependent; where it is unavailable the
/// implementation reports `supports_suspend() == false` and the scheduler
/// leaves the job running instead of branching on the platform itself.
pub trait ProcessControl: Send {
    /// Ask the process to stop (SIGTERM where available). The worker
    /// escalates to `kill` after a grace period.
    fn terminate(&self);
    /// Stop the process immediately.
    fn kill(&self);
    fn supports_suspend(&self) -> bool;
    /// Returns false when suspension is unsupported or failed.
    fn suspend(&self) -> bool;
    fn resume(&self) -> bool;
}

/// Portable fallback: termination is always forceful, suspension is a
/// no-op.
pub struct BasicControl {
    child: SharedChild,
}

impl BasicControl {
    pub fn new(child: SharedChild) -> Self {
        Self { child }
    }
}

impl ProcessControl for BasicControl {
    fn terminate(&self) {
        self.kill();
    }

    fn kill(&self) {
        if let Ok(mut child) = self.child.lock()
            && let Err(e) = child.kill()
        {
            warn!("failed to kill process: {}", e);
        }
    }

    fn supports_suspend(&self) -> bool {
        false
    }

    fn suspend(&self) -> bool {
        false
    }

    fn resume(&self) -> bool {
        false
    }
}

#[cfg(unix)]
mod unix {
    use super::{ProcessControl, SharedChild};
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;
    use tracing::warn;

    /// Unix control: cooperative SIGTERM, forceful SIGKILL, and
    /// SIGSTOP/SIGCONT suspension.
    pub struct SignalControl {
        pid: Pid,
        child: SharedChild,
    }

    impl SignalControl {
        pub fn new(child: SharedChild, pid: u32) -> Self {
            Self {
                pid: Pid::from_raw(pid as i32),
                child,
            }
        }

        fn signal(&self, sig: Signal) -> bool {
            // Skip signalling once the child has been reaped; the pid may
            // have been reused.
            if let Ok(mut child) = self.child.lock()
                && matches!(child.try_wait(), Ok(None))
            {
                if let Err(e) = kill(self.pid, sig) {
                    warn!("{} to pid {} failed: {}", sig, self.pid, e);
                    return false;
                }
                return true;
            }
            false
        }
    }

    impl ProcessControl for SignalControl {
        fn terminate(&self) {
            self.signal(Signal::SIGTERM);
        }

        fn kill(&self) {
            self.signal(Signal::SIGKILL);
        }

        fn supports_suspend(&self) -> bool {
            true
        }

        fn suspend(&self) -> bool {
            self.signal(Signal::SIGSTOP)
        }

        fn resume(&self) -> bool {
            self.signal(Signal::SIGCONT)
        }
    }
}

#[cfg(unix)]
pub use unix::SignalControl;

/// Build the control surface appropriate for this platform.
pub fn control_for(child: SharedChild, pid: u32) -> Box<dyn ProcessControl> {
    #[cfg(unix)]
    {
        Box::new(SignalControl::new(child, pid))
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        Box::new(BasicControl::new(child))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    fn spawn_sleep() -> SharedChild {
        let child = Command::new("sleep")
            .arg("5")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn sleep");
        Arc::new(Mutex::new(child))
    }

    #[test]
    fn basic_control_reports_unsupported_suspend() {
        let child = spawn_sleep();
        let control = BasicControl::new(child.clone());

        assert!(!control.supports_suspend());
        assert!(!control.suspend());
        control.kill();
        let _ = child.lock().unwrap().wait();
    }

    #[test]
    fn signal_control_terminates_promptly() {
        let child = spawn_sleep();
        let control = control_for(child.clone(), child.lock().unwrap().id());

        assert!(control.supports_suspend());
        control.terminate();

        let status = child.lock().unwrap().wait().expect("wait");
        assert!(!status.success());
    }

    #[test]
    fn signalling_a_reaped_child_is_a_no_op() {
        let child = spawn_sleep();
        let pid = child.lock().unwrap().id();
        let control = SignalControl::new(child.clone(), pid);

        control.kill();
        let _ = child.lock().unwrap().wait();

        // Child is reaped now; no signal should be attempted or reported
        // as delivered.
        assert!(!control.suspend());
    }
}
