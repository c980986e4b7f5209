//! Shared timer scheduler.
//!
//! Every delayed delivery of a registry (field debounce windows and the
//! `debounce` operator) runs on one rxrust thread-pool scheduler. The pool
//! starts on first use, so a registry without debounced fields or debounce
//! operators spawns no threads at all.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use rxrust::prelude::{FuturesThreadPoolScheduler, NormalReturn, OnceTask, Scheduler, TaskHandle};
use rxrust::subscription::Subscription as _;

/// Thread name prefix used when none is configured.
pub const DEFAULT_NAME_PREFIX: &str = "reactive-debounce";

type Job = Box<dyn FnOnce() + Send>;

fn run_job(job: Job) -> NormalReturn<()> {
    job();
    NormalReturn::new(())
}

/// A scheduled job that has not necessarily run yet.
pub(crate) struct TimerHandle(TaskHandle<NormalReturn<()>>);

impl TimerHandle {
    /// Stop the job from running if it has not started.
    pub(crate) fn cancel(self) {
        self.0.unsubscribe();
    }
}

struct SchedulerInner {
    name_prefix: String,
    threads: usize,
    pool: OnceLock<Option<FuturesThreadPoolScheduler>>,
}

/// Cancellable delayed execution shared by every debouncer of a registry.
///
/// Cloning yields another handle to the same pool.
#[derive(Clone)]
pub struct TimerScheduler {
    inner: Arc<SchedulerInner>,
}

impl TimerScheduler {
    /// A scheduler whose pool threads are named `{name_prefix}-{n}`.
    #[must_use]
    pub fn new(name_prefix: impl Into<String>, threads: usize) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                name_prefix: name_prefix.into(),
                threads: threads.max(1),
                pool: OnceLock::new(),
            }),
        }
    }

    #[must_use]
    pub fn name_prefix(&self) -> &str {
        &self.inner.name_prefix
    }

    /// True once the pool has been started.
    #[must_use]
    pub fn is_started(&self) -> bool {
        matches!(self.inner.pool.get(), Some(Some(_)))
    }

    /// Run `job` on the pool once `delay` has passed.
    ///
    /// Returns `None` when the pool could not be started; the caller decides
    /// how to deliver without a timer.
    pub(crate) fn schedule<F>(&self, delay: Duration, job: F) -> Option<TimerHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let pool = self.pool()?;
        let job: Job = Box::new(job);
        let task = OnceTask::new(run_job as fn(Job) -> NormalReturn<()>, job);
        Some(TimerHandle(pool.schedule(task, Some(delay))))
    }

    fn pool(&self) -> Option<&FuturesThreadPoolScheduler> {
        self.inner
            .pool
            .get_or_init(|| {
                let built = FuturesThreadPoolScheduler::builder()
                    .pool_size(self.inner.threads)
                    .name_prefix(format!("{}-", self.inner.name_prefix))
                    .create();
                match built {
                    Ok(pool) => {
                        tracing::debug!(
                            name_prefix = %self.inner.name_prefix,
                            threads = self.inner.threads,
                            "timer scheduler started"
                        );
                        Some(pool)
                    }
                    Err(err) => {
                        tracing::error!(
                            name_prefix = %self.inner.name_prefix,
                            error = %err,
                            "failed to start timer scheduler"
                        );
                        None
                    }
                }
            })
            .as_ref()
    }
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_NAME_PREFIX, 1)
    }
}

impl fmt::Debug for TimerScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerScheduler")
            .field("name_prefix", &self.inner.name_prefix)
            .field("threads", &self.inner.threads)
            .field("started", &self.is_started())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use crossbeam_channel::bounded;

    use super::*;

    #[test]
    fn pool_starts_lazily() {
        let scheduler = TimerScheduler::new("sched-test", 1);
        assert!(!scheduler.is_started());

        let (tx, rx) = bounded(1);
        let _timer = scheduler.schedule(Duration::from_millis(10), move || {
            let _ = tx.send(thread::current().name().map(str::to_string));
        });
        assert!(scheduler.is_started());

        let name = rx.recv_timeout(Duration::from_secs(2)).unwrap().unwrap();
        assert!(name.starts_with("sched-test-"), "unexpected thread name {name}");
    }

    #[test]
    fn cancelled_job_never_runs() {
        let scheduler = TimerScheduler::new("sched-test", 1);
        let (tx, rx) = bounded::<()>(1);
        let timer = scheduler
            .schedule(Duration::from_millis(50), move || {
                let _ = tx.send(());
            })
            .unwrap();
        timer.cancel();
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn many_timers_share_the_pool() {
        let scheduler = TimerScheduler::new("sched-test", 2);
        let (tx, rx) = crossbeam_channel::unbounded();
        let timers: Vec<_> = (0..200)
            .map(|i| {
                let tx = tx.clone();
                scheduler.schedule(Duration::from_millis(20), move || {
                    let _ = tx.send((i, thread::current().name().map(str::to_string)));
                })
            })
            .collect();
        assert!(timers.iter().all(Option::is_some));

        let mut names = std::collections::HashSet::new();
        for _ in 0..200 {
            let (_, name) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            names.insert(name);
        }
        assert!(names.len() <= 2);
    }
}
