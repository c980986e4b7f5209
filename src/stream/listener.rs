use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, TryRecvError};

use crate::error::{ReactiveResult, StreamError, SubscriberError};

use super::{Stream, Subscription};

/// Blocking receiver over a stream.
///
/// Items are queued on a crossbeam channel as they are delivered, so a
/// thread can wait for events instead of registering a callback. Dropping
/// the listener unsubscribes.
#[derive(Debug)]
pub struct Listener<T> {
    rx: Receiver<T>,
    subscription: Subscription,
}

impl<T: Clone + Send + Sync + 'static> Listener<T> {
    pub(crate) fn new(stream: &Stream<T>) -> Self {
        let (tx, rx) = unbounded::<T>();
        let subscription = stream.attach(std::sync::Arc::new(move |item: &T| {
            tx.send(item.clone())
                .map_err(|_| SubscriberError::failed("listener receiver dropped"))
        }));
        Self { rx, subscription }
    }
}

impl<T> Listener<T> {
    /// Receive the next item (blocking).
    pub fn recv(&self) -> ReactiveResult<T> {
        self.rx.recv().map_err(|_| {
            StreamError::Disconnected {
                path: "listener".to_string(),
            }
            .into()
        })
    }

    /// Receive the next item with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> ReactiveResult<T> {
        self.rx.recv_timeout(timeout).map_err(|err| {
            match err {
                RecvTimeoutError::Timeout => StreamError::Timeout {
                    duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                },
                RecvTimeoutError::Disconnected => StreamError::Disconnected {
                    path: "listener".to_string(),
                },
            }
            .into()
        })
    }

    /// Next queued item, if any, without blocking.
    pub fn try_recv(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Take every item queued so far.
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Stop receiving; already queued items stay readable.
    pub fn unsubscribe(&mut self) {
        std::mem::replace(&mut self.subscription, Subscription::empty()).unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::super::Subject;
    use super::*;

    #[test]
    fn recv_timeout_reports_timeout() {
        let subject = Subject::<i32>::new("test");
        let listener = subject.stream().listen();
        let err = listener.recv_timeout(Duration::from_millis(10)).unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn queued_items_arrive_in_order() {
        let subject = Subject::<i32>::new("test");
        let listener = subject.stream().listen();
        subject.emit(&1);
        subject.emit(&2);
        assert_eq!(listener.len(), 2);
        assert_eq!(listener.drain(), vec![1, 2]);
        assert!(listener.is_empty());
    }

    #[test]
    fn unsubscribe_stops_queueing() {
        let subject = Subject::<i32>::new("test");
        let mut listener = subject.stream().listen();
        subject.emit(&1);
        listener.unsubscribe();
        subject.emit(&2);
        assert_eq!(listener.drain(), vec![1]);
        assert_eq!(subject.subscriber_count(), 0);
    }
}
