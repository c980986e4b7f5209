//! Registered model types and their master channels.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::diagnostics::Diagnostics;
use crate::error::RegistrationError;
use crate::event::{Event, InstanceId, ObservedEvent};
use crate::schema::{FieldSpec, ModelSchema};
use crate::stream::{Sink, Stream, Subject, TimerScheduler};

use super::channel::ChannelKey;
use super::RegistryConfig;

struct ModelTypeInner {
    schema: ModelSchema,
    master: Subject<Event>,
    scopes: Mutex<HashMap<ChannelKey, usize>>,
    config: Arc<RegistryConfig>,
}

/// Handle to a registered model type.
///
/// Owns the type's master channel: every event any instance of the type
/// produces is emitted here exactly once, and every scoped view is a filter
/// over it. Cloning is cheap and yields the same channel.
#[derive(Clone)]
pub struct ModelType {
    inner: Arc<ModelTypeInner>,
}

/// The handle `register_model_type` returns.
pub type MasterChannelHandle = ModelType;

impl ModelType {
    pub(crate) fn new(
        schema: ModelSchema,
        config: Arc<RegistryConfig>,
        diagnostics: Arc<Diagnostics>,
        scheduler: TimerScheduler,
    ) -> Self {
        let master = Subject::with_context(schema.name().to_string(), diagnostics, scheduler);
        Self {
            inner: Arc::new(ModelTypeInner {
                schema,
                master,
                scopes: Mutex::new(HashMap::new()),
                config,
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.schema.name()
    }

    #[must_use]
    pub fn schema(&self) -> &ModelSchema {
        &self.inner.schema
    }

    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        self.inner.master.diagnostics()
    }

    /// Scheduler shared by every debounce timer of the registry.
    #[must_use]
    pub fn scheduler(&self) -> &TimerScheduler {
        self.inner.master.scheduler()
    }

    /// Deliver `event` to every subscriber of this type, synchronously and in
    /// registration order. Returns how many subscribers accepted it.
    pub fn emit(&self, event: &Event) -> usize {
        tracing::trace!(
            model_type = %self.name(),
            event_id = %event.event_id(),
            event_type = event.event_type().as_str(),
            "emit"
        );
        self.inner.master.emit(event)
    }

    /// Unfiltered view of every event of this type.
    #[must_use]
    pub fn master_stream(&self) -> Stream<Event> {
        self.inner.master.stream()
    }

    /// Live subscribers on the master channel, across all scopes.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.master.subscriber_count()
    }

    #[must_use]
    pub fn is_observed(&self) -> bool {
        self.inner.master.is_observed()
    }

    /// Live subscribers that came in through exactly `key`.
    #[must_use]
    pub fn scope_subscribers(&self, key: &ChannelKey) -> usize {
        self.inner
            .scopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Live subscribers on any channel scoped to `instance`.
    #[must_use]
    pub fn instance_subscribers(&self, instance: InstanceId) -> usize {
        self.inner
            .scopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(key, _)| key.instance_id() == Some(instance))
            .map(|(_, count)| *count)
            .sum()
    }

    /// True if both handles refer to the same registration.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn require_field(&self, field: &str) -> Result<&FieldSpec, RegistrationError> {
        self.inner
            .schema
            .field(field)
            .ok_or_else(|| RegistrationError::UnknownField {
                model_type: self.name().to_string(),
                field: field.to_string(),
            })
    }

    /// A view of the master channel narrowed to `key`.
    ///
    /// Each subscription registers one filtering sink on the master channel
    /// and is counted under `key` until it is torn down.
    pub(crate) fn scoped(&self, key: ChannelKey) -> Stream<Event> {
        let master = self.inner.master.clone();
        let weak: Weak<ModelTypeInner> = Arc::downgrade(&self.inner);
        let diagnostics = Arc::clone(master.diagnostics());
        let scheduler = master.scheduler().clone();

        Stream::from_source(diagnostics, scheduler, move |downstream: Sink<Event>| {
            let filter = key.clone();
            let subscription = master.attach(Arc::new(move |event: &Event| {
                if filter.matches(event) {
                    downstream(event)
                } else {
                    Ok(())
                }
            }));

            if let Some(inner) = weak.upgrade() {
                *inner
                    .scopes
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(key.clone())
                    .or_insert(0) += 1;
            }
            tracing::debug!(channel = %key, "subscribed");

            let weak = Weak::clone(&weak);
            let key = key.clone();
            subscription.and_then(move || {
                if let Some(inner) = weak.upgrade() {
                    let mut scopes = inner.scopes.lock().unwrap_or_else(PoisonError::into_inner);
                    if let Some(count) = scopes.get_mut(&key) {
                        *count = count.saturating_sub(1);
                        if *count == 0 {
                            scopes.remove(&key);
                        }
                    }
                }
                tracing::debug!(channel = %key, "unsubscribed");
            })
        })
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("name", &self.name())
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}
