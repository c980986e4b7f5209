//! Push-based streams over a registry's master channels.
//!
//! A `Subject` is the emission point; a `Stream` is a composable, cold view
//! over one. Subscribing walks the operator chain back to the subject and
//! registers one sink there, so operators add no emissions of their own.
//! Every handle returned by `subscribe` cancels on drop. Timed operators run
//! on the rxrust scheduler the stream inherits from its subject.

/// Debounce state.
pub(crate) mod debounce;
/// Blocking receiver adapter.
pub mod listener;
/// Shared timer scheduler.
pub mod scheduler;
/// Multicast subject.
pub mod subject;
/// Subscription handle.
pub mod subscription;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::diagnostics::Diagnostics;
use crate::error::SubscriberError;

pub use listener::Listener;
pub use scheduler::TimerScheduler;
pub use subject::Subject;
pub use subscription::Subscription;

use debounce::Debouncer;
use subject::deliver;

/// Type-erased observer callback.
pub(crate) type Sink<T> = Arc<dyn Fn(&T) -> Result<(), SubscriberError> + Send + Sync>;

type Source<T> = Arc<dyn Fn(Sink<T>) -> Subscription + Send + Sync>;

/// A transformation from one stream into another.
///
/// Implemented by the named operators and by any
/// `FnOnce(Stream<T>) -> Stream<U>` closure.
pub trait Operator<T> {
    /// Item type of the resulting stream.
    type Output;

    /// Build the derived stream.
    fn apply(self, input: Stream<T>) -> Stream<Self::Output>;
}

impl<T, U, F> Operator<T> for F
where
    F: FnOnce(Stream<T>) -> Stream<U>,
{
    type Output = U;

    fn apply(self, input: Stream<T>) -> Stream<U> {
        self(input)
    }
}

/// A live, composable view of events.
pub struct Stream<T> {
    source: Source<T>,
    diagnostics: Arc<Diagnostics>,
    scheduler: TimerScheduler,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            diagnostics: Arc::clone(&self.diagnostics),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream").finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> Stream<T> {
    pub(crate) fn from_source<S>(diagnostics: Arc<Diagnostics>, scheduler: TimerScheduler, source: S) -> Self
    where
        S: Fn(Sink<T>) -> Subscription + Send + Sync + 'static,
    {
        Self {
            source: Arc::new(source),
            diagnostics,
            scheduler,
        }
    }

    pub(crate) fn attach(&self, sink: Sink<T>) -> Subscription {
        (self.source)(sink)
    }

    /// Sink that receives subscriber failures raised on this stream.
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    /// Scheduler that runs this stream's timed operators.
    #[must_use]
    pub fn scheduler(&self) -> &TimerScheduler {
        &self.scheduler
    }

    /// Observe every item.
    pub fn subscribe<F>(&self, on_next: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.attach(Arc::new(move |item: &T| {
            on_next(item);
            Ok(())
        }))
    }

    /// Observe every item with a fallible callback. Errors are isolated and
    /// reported to the diagnostic sink.
    pub fn try_subscribe<F, E>(&self, on_next: F) -> Subscription
    where
        F: Fn(&T) -> Result<(), E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        self.attach(Arc::new(move |item: &T| {
            on_next(item).map_err(|e| SubscriberError::failed(e.to_string()))
        }))
    }

    /// Queue items for blocking consumption.
    #[must_use]
    pub fn listen(&self) -> Listener<T>
    where
        T: Clone,
    {
        Listener::new(self)
    }

    /// Apply an operator.
    #[must_use]
    pub fn pipe<Op>(self, op: Op) -> Stream<Op::Output>
    where
        Op: Operator<T>,
    {
        op.apply(self)
    }

    #[must_use]
    pub fn filter<P>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        let source = self.source;
        Self::from_source(self.diagnostics, self.scheduler, move |downstream: Sink<T>| {
            let predicate = Arc::clone(&predicate);
            source(Arc::new(move |item: &T| {
                if predicate(item) {
                    downstream(item)
                } else {
                    Ok(())
                }
            }))
        })
    }

    #[must_use]
    pub fn map<U, F>(self, f: F) -> Stream<U>
    where
        U: Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        self.filter_map(move |item| Some(f(item)))
    }

    #[must_use]
    pub fn filter_map<U, F>(self, f: F) -> Stream<U>
    where
        U: Send + Sync + 'static,
        F: Fn(&T) -> Option<U> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let source = self.source;
        Stream::from_source(self.diagnostics, self.scheduler, move |downstream: Sink<U>| {
            let f = Arc::clone(&f);
            source(Arc::new(move |item: &T| match f(item) {
                Some(mapped) => downstream(&mapped),
                None => Ok(()),
            }))
        })
    }

    /// Forward an item only after `window` passes with no newer item.
    ///
    /// Timers run on the stream's shared scheduler. Unsubscribing cancels
    /// any pending item.
    #[must_use]
    pub fn debounce(self, window: Duration) -> Self
    where
        T: Clone,
    {
        let source = self.source;
        let diagnostics = Arc::clone(&self.diagnostics);
        let scheduler = self.scheduler.clone();
        Self::from_source(self.diagnostics, self.scheduler, move |downstream: Sink<T>| {
            let fire_diag = Arc::clone(&diagnostics);
            let debouncer = Arc::new(Debouncer::new(
                scheduler.clone(),
                window,
                |_, item: T| item,
                move |item: T| {
                    if let Err(err) = deliver(&downstream, &item) {
                        fire_diag.record("debounce", err);
                    }
                },
            ));
            let feed = Arc::clone(&debouncer);
            source(Arc::new(move |item: &T| {
                feed.push(item.clone());
                Ok(())
            }))
            .and_then(move || debouncer.cancel())
        })
    }

    /// Group items into batches of `size` (at least one).
    #[must_use]
    pub fn buffer(self, size: usize) -> Stream<Vec<T>>
    where
        T: Clone,
    {
        let size = size.max(1);
        let source = self.source;
        Stream::from_source(self.diagnostics, self.scheduler, move |downstream: Sink<Vec<T>>| {
            let batch: Mutex<Vec<T>> = Mutex::new(Vec::with_capacity(size));
            source(Arc::new(move |item: &T| {
                let full = {
                    let mut batch = batch.lock().unwrap_or_else(PoisonError::into_inner);
                    batch.push(item.clone());
                    if batch.len() >= size {
                        Some(std::mem::replace(&mut *batch, Vec::with_capacity(size)))
                    } else {
                        None
                    }
                };
                match full {
                    Some(full) => downstream(&full),
                    None => Ok(()),
                }
            }))
        })
    }

    /// Drop items equal to the previously forwarded one.
    #[must_use]
    pub fn distinct_until_changed(self) -> Self
    where
        T: Clone + PartialEq,
    {
        let source = self.source;
        Self::from_source(self.diagnostics, self.scheduler, move |downstream: Sink<T>| {
            let last: Mutex<Option<T>> = Mutex::new(None);
            source(Arc::new(move |item: &T| {
                {
                    let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
                    if last.as_ref() == Some(item) {
                        return Ok(());
                    }
                    *last = Some(item.clone());
                }
                downstream(item)
            }))
        })
    }

    /// Interleave items from both streams in emission order.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        let left = self.source;
        let right = other.source;
        Self::from_source(self.diagnostics, self.scheduler, move |downstream: Sink<T>| {
            let mut subscription = left(Arc::clone(&downstream));
            subscription.add(right(downstream));
            subscription
        })
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn collect<T: Clone + Send + Sync + 'static>(stream: &Stream<T>) -> (Subscription, Arc<Mutex<Vec<T>>>) {
        let out = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&out);
        let sub = stream.subscribe(move |item: &T| sink.lock().unwrap().push(item.clone()));
        (sub, out)
    }

    #[test]
    fn filter_and_map_compose() {
        let subject = Subject::<i32>::new("test");
        let stream = subject.stream().filter(|v| v % 2 == 0).map(|v| v * 10);
        let (_sub, out) = collect(&stream);

        for v in 1..=4 {
            subject.emit(&v);
        }
        assert_eq!(*out.lock().unwrap(), vec![20, 40]);
    }

    #[test]
    fn derived_stream_registers_one_sink() {
        let subject = Subject::<i32>::new("test");
        let stream = subject.stream().filter(|_| true).map(|v| *v).filter(|_| true);
        let _sub = stream.subscribe(|_| {});
        assert_eq!(subject.subscriber_count(), 1);
    }

    #[test]
    fn buffer_emits_full_batches() {
        let subject = Subject::<i32>::new("test");
        let (_sub, out) = collect(&subject.stream().buffer(2));
        for v in 1..=5 {
            subject.emit(&v);
        }
        assert_eq!(*out.lock().unwrap(), vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn distinct_until_changed_skips_repeats() {
        let subject = Subject::<i32>::new("test");
        let (_sub, out) = collect(&subject.stream().distinct_until_changed());
        for v in [1, 1, 2, 2, 1] {
            subject.emit(&v);
        }
        assert_eq!(*out.lock().unwrap(), vec![1, 2, 1]);
    }

    #[test]
    fn merge_interleaves_sources() {
        let left = Subject::<i32>::new("left");
        let right = Subject::<i32>::new("right");
        let (sub, out) = collect(&left.stream().merge(right.stream()));

        left.emit(&1);
        right.emit(&2);
        left.emit(&3);
        assert_eq!(*out.lock().unwrap(), vec![1, 2, 3]);

        sub.unsubscribe();
        assert_eq!(left.subscriber_count(), 0);
        assert_eq!(right.subscriber_count(), 0);
    }

    #[test]
    fn debounce_forwards_last_of_burst() {
        let subject = Subject::<i32>::new("test");
        let listener = subject.stream().debounce(Duration::from_millis(50)).listen();

        subject.emit(&1);
        subject.emit(&2);
        subject.emit(&3);

        assert_eq!(listener.recv_timeout(Duration::from_secs(2)).unwrap(), 3);
        assert!(listener.recv_timeout(Duration::from_millis(150)).is_err());
    }

    #[test]
    fn unsubscribed_debounce_never_fires() {
        let subject = Subject::<i32>::new("test");
        let (sub, out) = collect(&subject.stream().debounce(Duration::from_millis(30)));
        subject.emit(&1);
        sub.unsubscribe();
        thread::sleep(Duration::from_millis(100));
        assert!(out.lock().unwrap().is_empty());
    }

    #[test]
    fn debounce_runs_on_inherited_scheduler() {
        let subject = Subject::<i32>::with_context(
            "test",
            Arc::new(Diagnostics::new()),
            TimerScheduler::new("ops-debounce", 1),
        );
        let stream = subject.stream().debounce(Duration::from_millis(20));
        assert_eq!(stream.scheduler().name_prefix(), "ops-debounce");

        let names = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&names);
        let _sub = stream.subscribe(move |_| {
            sink.lock()
                .unwrap()
                .push(thread::current().name().map(str::to_string));
        });
        subject.emit(&1);
        thread::sleep(Duration::from_millis(200));

        let names = names.lock().unwrap();
        assert_eq!(names.len(), 1);
        assert!(names[0].as_deref().unwrap_or("").starts_with("ops-debounce-"));
    }

    #[test]
    fn pipe_applies_operator() {
        let subject = Subject::<i32>::new("test");
        let stream = subject.stream().pipe(|s: Stream<i32>| s.map(|v| v + 1));
        let (_sub, out) = collect(&stream);
        subject.emit(&1);
        assert_eq!(*out.lock().unwrap(), vec![2]);
    }
}
