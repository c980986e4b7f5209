use std::fmt;

type Teardown = Box<dyn FnOnce() + Send>;

/// Handle for an active subscription.
///
/// Dropping the handle unsubscribes. Teardowns run in the order they were
/// added, so an upstream registration is always removed before the
/// downstream stages it feeds.
#[must_use = "dropping a Subscription unsubscribes it immediately"]
pub struct Subscription {
    teardowns: Vec<Teardown>,
    closed: bool,
}

impl Subscription {
    pub(crate) fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            teardowns: vec![Box::new(teardown)],
            closed: false,
        }
    }

    /// A subscription with nothing to tear down.
    pub fn empty() -> Self {
        Self {
            teardowns: Vec::new(),
            closed: false,
        }
    }

    /// Tear `other` down together with this subscription, after the
    /// teardowns already registered here.
    pub(crate) fn add(&mut self, mut other: Self) {
        self.teardowns.append(&mut other.teardowns);
        other.closed = true;
    }

    pub(crate) fn and_then(mut self, teardown: impl FnOnce() + Send + 'static) -> Self {
        self.teardowns.push(Box::new(teardown));
        self
    }

    /// Stop delivery. Idempotent; also performed on drop.
    pub fn unsubscribe(mut self) {
        self.close();
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for teardown in self.teardowns.drain(..) {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("teardowns", &self.teardowns.len())
            .field("closed", &self.closed)
            .finish()
    }
}
