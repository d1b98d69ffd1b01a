//! Dedicated-thread callback executor for desktop hosts

use bridge_traits::background::{CallbackExecutor, Job};
use bridge_traits::error::{BridgeError, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Runs submitted jobs one at a time, in submission order, on a single named
/// thread.
///
/// This is the desktop stand-in for a UI event loop: callbacks delivered
/// through it never run on the transport's runtime threads. A panicking job
/// is logged and does not stop the thread.
pub struct ThreadCallbackExecutor {
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_name: String,
}

impl ThreadCallbackExecutor {
    /// Spawn the executor thread with the default name
    pub fn new() -> Result<Self> {
        Self::named("cloud-sdk-callbacks")
    }

    /// Spawn the executor thread with a custom name
    pub fn named(name: impl Into<String>) -> Result<Self> {
        let thread_name = name.into();
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                while let Some(job) = receiver.blocking_recv() {
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        warn!("Callback panicked; executor keeps running");
                    }
                }
                debug!("Callback executor drained");
            })
            .map_err(|e| {
                BridgeError::NotAvailable(format!("failed to spawn callback thread: {}", e))
            })?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
            thread_name,
        })
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Stop the thread after running everything already queued, and join it.
    ///
    /// Jobs submitted afterwards run inline on the submitting thread. Must not
    /// be called from a job running on this executor.
    pub fn shutdown(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        let handle = self.handle.lock().ok().and_then(|mut h| h.take());
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                warn!("shutdown called from the callback thread; not joining");
                return;
            }
            if handle.join().is_err() {
                warn!("Callback executor thread terminated abnormally");
            }
        }
    }
}

impl CallbackExecutor for ThreadCallbackExecutor {
    fn execute(&self, job: Job) {
        let rejected = match self.sender.lock() {
            Ok(sender) => match sender.as_ref() {
                Some(sender) => sender.send(job).err().map(|e| e.0),
                None => Some(job),
            },
            Err(_) => Some(job),
        };
        // Jobs must still run exactly once after shutdown.
        if let Some(job) = rejected {
            debug!(thread = %self.thread_name, "Executor is shut down; running callback inline");
            if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                warn!("Callback panicked");
            }
        }
    }
}

impl Drop for ThreadCallbackExecutor {
    fn drop(&mut self) {
        // Close the channel; the thread exits once the queue drains.
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    #[test]
    fn test_jobs_run_in_order_on_named_thread() {
        let executor = ThreadCallbackExecutor::named("test-callbacks").unwrap();
        let seen = Arc::new(StdMutex::new(Vec::new()));

        for i in 0..5 {
            let seen = seen.clone();
            executor.execute(Box::new(move || {
                let name = thread::current().name().map(str::to_string);
                seen.lock().unwrap().push((i, name));
            }));
        }
        executor.shutdown();

        let seen = seen.lock().unwrap();
        let order: Vec<_> = seen.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        assert!(seen
            .iter()
            .all(|(_, name)| name.as_deref() == Some("test-callbacks")));
    }

    #[test]
    fn test_panicking_job_does_not_stop_executor() {
        let executor = ThreadCallbackExecutor::new().unwrap();
        let ran = Arc::new(StdMutex::new(false));

        executor.execute(Box::new(|| panic!("boom")));
        let r = ran.clone();
        executor.execute(Box::new(move || *r.lock().unwrap() = true));
        executor.shutdown();

        assert!(*ran.lock().unwrap());
    }

    #[test]
    fn test_execute_after_shutdown_runs_inline() {
        let executor = ThreadCallbackExecutor::named("stopped-callbacks").unwrap();
        executor.shutdown();

        let ran_on = Arc::new(StdMutex::new(None));
        let r = ran_on.clone();
        executor.execute(Box::new(move || {
            *r.lock().unwrap() = Some(thread::current().id());
        }));

        assert_eq!(*ran_on.lock().unwrap(), Some(thread::current().id()));
    }
}
