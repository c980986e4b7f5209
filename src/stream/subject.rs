//! Synchronous multicast subject.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::diagnostics::Diagnostics;
use crate::error::SubscriberError;

use super::{Sink, Stream, Subscription, TimerScheduler};

struct Entry<T> {
    id: u64,
    active: AtomicBool,
    sink: Sink<T>,
}

struct SubjectInner<T> {
    label: String,
    entries: RwLock<Vec<Arc<Entry<T>>>>,
    next_id: AtomicU64,
    diagnostics: Arc<Diagnostics>,
    scheduler: TimerScheduler,
}

/// Multicast emission point.
///
/// `emit` delivers to every current subscriber on the calling thread, in
/// registration order. No lock is held while subscribers run, so they may
/// emit, subscribe or unsubscribe re-entrantly.
pub struct Subject<T> {
    inner: Arc<SubjectInner<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("label", &self.inner.label)
            .field(
                "subscribers",
                &self.inner.entries.read().unwrap_or_else(PoisonError::into_inner).len(),
            )
            .finish()
    }
}

impl<T: Send + Sync + 'static> Subject<T> {
    /// A subject with its own diagnostic sink and timer scheduler.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_context(label, Arc::new(Diagnostics::new()), TimerScheduler::default())
    }

    /// A subject that reports failures to `diagnostics` and runs the timed
    /// operators of its streams on `scheduler`.
    #[must_use]
    pub fn with_context(label: impl Into<String>, diagnostics: Arc<Diagnostics>, scheduler: TimerScheduler) -> Self {
        Self {
            inner: Arc::new(SubjectInner {
                label: label.into(),
                entries: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(0),
                diagnostics,
                scheduler,
            }),
        }
    }

    /// Deliver `item` to every current subscriber and return how many
    /// received it without failing.
    pub fn emit(&self, item: &T) -> usize {
        let entries: Vec<Arc<Entry<T>>> = self
            .inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut delivered = 0;
        for entry in &entries {
            // Unsubscribed while an earlier subscriber was running.
            if !entry.active.load(Ordering::Acquire) {
                continue;
            }
            match deliver(&entry.sink, item) {
                Ok(()) => delivered += 1,
                Err(err) => self.inner.diagnostics.record(&self.inner.label, err),
            }
        }
        delivered
    }

    /// A live view of this subject.
    #[must_use]
    pub fn stream(&self) -> Stream<T> {
        let subject = self.clone();
        Stream::from_source(
            Arc::clone(&self.inner.diagnostics),
            self.inner.scheduler.clone(),
            move |sink| subject.attach(sink),
        )
    }

    pub(crate) fn attach(&self, sink: Sink<T>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(Entry {
            id,
            active: AtomicBool::new(true),
            sink,
        });
        self.inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&entry));
        tracing::trace!(channel = %self.inner.label, subscriber = id, "subscriber attached");

        let weak: Weak<SubjectInner<T>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            entry.active.store(false, Ordering::Release);
            if let Some(inner) = weak.upgrade() {
                inner
                    .entries
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|e| e.id != entry.id);
                tracing::trace!(channel = %inner.label, subscriber = entry.id, "subscriber detached");
            }
        })
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_observed(&self) -> bool {
        self.subscriber_count() > 0
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.inner.diagnostics
    }

    #[must_use]
    pub fn scheduler(&self) -> &TimerScheduler {
        &self.inner.scheduler
    }

    /// True if both handles refer to the same subject.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Invoke a sink, converting a panic into a `SubscriberError`.
pub(crate) fn deliver<T>(sink: &Sink<T>, item: &T) -> Result<(), SubscriberError> {
    match panic::catch_unwind(AssertUnwindSafe(|| sink(item))) {
        Ok(result) => result,
        Err(payload) => Err(SubscriberError::Panicked {
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
