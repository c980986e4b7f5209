//! Debounce state driven by the shared timer scheduler.
//!
//! Each pushed item folds into a pending accumulator and reschedules a single
//! timer on the [`TimerScheduler`]. When the window elapses with no newer
//! item, the accumulator is handed to `fire` on a scheduler thread. A timer
//! superseded by a later push is cancelled, and one that was already running
//! is skipped by generation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::scheduler::{TimerHandle, TimerScheduler};

struct State<A> {
    pending: Option<A>,
    generation: u64,
    timer: Option<TimerHandle>,
    cancelled: bool,
}

type Merge<T, A> = Box<dyn Fn(Option<A>, T) -> A + Send + Sync>;
type Fire<A> = Box<dyn Fn(A) + Send + Sync>;

struct Shared<T, A> {
    state: Mutex<State<A>>,
    merge: Merge<T, A>,
    fire: Fire<A>,
}

impl<T, A> Shared<T, A> {
    fn lock(&self) -> MutexGuard<'_, State<A>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire_if_current(&self, generation: u64) {
        let pending = {
            let mut state = self.lock();
            if state.cancelled || state.generation != generation {
                return;
            }
            state.timer = None;
            state.pending.take()
        };
        if let Some(acc) = pending {
            (self.fire)(acc);
        }
    }
}

/// Coalesces pushed items into one delayed delivery.
pub(crate) struct Debouncer<T, A = T> {
    shared: Arc<Shared<T, A>>,
    scheduler: TimerScheduler,
    window: Duration,
}

impl<T, A> Debouncer<T, A>
where
    T: Send + 'static,
    A: Send + 'static,
{
    /// `merge` folds each pushed item into the pending accumulator; `fire`
    /// receives the accumulator once the window is quiet.
    pub(crate) fn new<M, F>(scheduler: TimerScheduler, window: Duration, merge: M, fire: F) -> Self
    where
        M: Fn(Option<A>, T) -> A + Send + Sync + 'static,
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    pending: None,
                    generation: 0,
                    timer: None,
                    cancelled: false,
                }),
                merge: Box::new(merge),
                fire: Box::new(fire),
            }),
            scheduler,
            window,
        }
    }

    pub(crate) fn push(&self, item: T) {
        let (generation, stale) = {
            let mut state = self.shared.lock();
            if state.cancelled {
                return;
            }
            let acc = (self.shared.merge)(state.pending.take(), item);
            state.pending = Some(acc);
            state.generation += 1;
            (state.generation, state.timer.take())
        };
        if let Some(stale) = stale {
            stale.cancel();
        }

        let shared = Arc::clone(&self.shared);
        match self
            .scheduler
            .schedule(self.window, move || shared.fire_if_current(generation))
        {
            Some(timer) => {
                let mut state = self.shared.lock();
                if state.generation == generation && state.pending.is_some() {
                    state.timer = Some(timer);
                } else {
                    drop(state);
                    timer.cancel();
                }
            }
            None => {
                tracing::warn!("no timer scheduler; delivering without debounce");
                self.flush();
            }
        }
    }

    /// Fire any pending accumulator now, on the calling thread.
    ///
    /// Returns true if something was pending.
    pub(crate) fn flush(&self) -> bool {
        let (pending, timer) = {
            let mut state = self.shared.lock();
            state.generation += 1;
            (state.pending.take(), state.timer.take())
        };
        if let Some(timer) = timer {
            timer.cancel();
        }
        match pending {
            Some(acc) => {
                (self.shared.fire)(acc);
                true
            }
            None => false,
        }
    }

    /// Drop any pending accumulator and ignore later pushes.
    pub(crate) fn cancel(&self) {
        let timer = {
            let mut state = self.shared.lock();
            state.cancelled = true;
            state.pending = None;
            state.timer.take()
        };
        if let Some(timer) = timer {
            timer.cancel();
        }
    }
}
