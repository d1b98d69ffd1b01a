//! Callback Execution
//!
//! Host applications usually want completion and progress callbacks delivered
//! on a context they control (a UI thread, a dedicated worker) rather than on
//! the transport's I/O threads. The [`CallbackExecutor`] contract is that
//! dispatch point.

/// Unit of work submitted to an executor
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Callback executor trait
///
/// Implementations decide where and when a submitted job runs. Each job must
/// run exactly once; jobs submitted from one thread should run in submission
/// order so progress notifications stay monotonic.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::background::CallbackExecutor;
/// use std::sync::Arc;
///
/// let executor: Arc<dyn CallbackExecutor> = Arc::new(ImmediateExecutor);
/// executor.execute(Box::new(|| println!("delivered")));
/// ```
pub trait CallbackExecutor: Send + Sync {
    /// Submit a job for execution
    fn execute(&self, job: Job);
}

impl<F> CallbackExecutor for F
where
    F: Fn(Job) + Send + Sync,
{
    fn execute(&self, job: Job) {
        self(job)
    }
}

/// Runs every job inline on the submitting thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateExecutor;

impl CallbackExecutor for ImmediateExecutor {
    fn execute(&self, job: Job) {
        job()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_immediate_executor_runs_inline() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();

        ImmediateExecutor.execute(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_closure_executor() {
        let submitted = Arc::new(AtomicUsize::new(0));
        let s = submitted.clone();
        let executor = move |job: Job| {
            s.fetch_add(1, Ordering::SeqCst);
            job();
        };

        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();
        executor.execute(Box::new(move || {
            r.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(submitted.load(Ordering::SeqCst), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
