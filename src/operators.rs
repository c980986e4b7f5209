//! Operator library.
//!
//! Named operators applied with [`Stream::pipe`]. They work on any stream of
//! [`ObservedEvent`]s, so the same operator composes with `observe_model`
//! and `observe_field` streams alike.
//!
//! ```
//! use std::time::Duration;
//! use reactive_models::operators::{debounce_changes, map_to_value, where_field};
//! use reactive_models::{FieldSpec, FieldType, ModelSchema, Registry};
//!
//! let registry = Registry::new();
//! let user = registry.register_model_type(
//!     ModelSchema::builder("User")
//!         .field(FieldSpec::new("email", FieldType::String).default_value(""))
//!         .build()?,
//! )?;
//!
//! let emails = user
//!     .observe_model()
//!     .pipe(where_field("email"))
//!     .pipe(debounce_changes(Duration::from_millis(50)))
//!     .pipe(map_to_value());
//! let _sub = emails.subscribe(|v| println!("email is now {v}"));
//! # Ok::<(), reactive_models::ReactiveError>(())
//! ```

use std::time::Duration;

use crate::event::{EventType, InstanceId, ObservedEvent};
use crate::stream::{Operator, Stream};
use crate::value::Value;

/// See [`where_field`].
#[derive(Debug, Clone)]
pub struct WhereField {
    field: String,
}

/// See [`where_model`].
#[derive(Debug, Clone, Copy)]
pub struct WhereModel {
    instance: InstanceId,
}

/// See [`where_event_type`].
#[derive(Debug, Clone, Copy)]
pub struct WhereEventType {
    event_type: EventType,
}

/// See [`map_to_value`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MapToValue;

/// See [`debounce_changes`].
#[derive(Debug, Clone, Copy)]
pub struct DebounceChanges {
    window: Duration,
}

/// See [`buffer_changes`].
#[derive(Debug, Clone, Copy)]
pub struct BufferChanges {
    size: usize,
}

/// Keep events that refer to `field`.
///
/// Lifecycle events carry no field and are always dropped.
#[must_use]
pub fn where_field(field: impl Into<String>) -> WhereField {
    WhereField { field: field.into() }
}

/// Keep events of one instance.
#[must_use]
pub const fn where_model(instance: InstanceId) -> WhereModel {
    WhereModel { instance }
}

/// Keep events of one type.
#[must_use]
pub const fn where_event_type(event_type: EventType) -> WhereEventType {
    WhereEventType { event_type }
}

/// Project field changes to their new value; other events are dropped.
#[must_use]
pub const fn map_to_value() -> MapToValue {
    MapToValue
}

/// Forward only the last event of each burst, once `window` has passed with
/// no newer event. Independent of any field-level debounce upstream.
#[must_use]
pub const fn debounce_changes(window: Duration) -> DebounceChanges {
    DebounceChanges { window }
}

/// Group every `size` events into one batch. A size of zero is treated as one.
#[must_use]
pub const fn buffer_changes(size: usize) -> BufferChanges {
    BufferChanges { size }
}

impl<E: ObservedEvent> Operator<E> for WhereField {
    type Output = E;

    fn apply(self, input: Stream<E>) -> Stream<E> {
        input.filter(move |event: &E| event.field_name() == Some(self.field.as_str()))
    }
}

impl<E: ObservedEvent> Operator<E> for WhereModel {
    type Output = E;

    fn apply(self, input: Stream<E>) -> Stream<E> {
        input.filter(move |event: &E| event.instance_id() == self.instance)
    }
}

impl<E: ObservedEvent> Operator<E> for WhereEventType {
    type Output = E;

    fn apply(self, input: Stream<E>) -> Stream<E> {
        input.filter(move |event: &E| event.event_type() == self.event_type)
    }
}

impl<E: ObservedEvent> Operator<E> for MapToValue {
    type Output = Value;

    fn apply(self, input: Stream<E>) -> Stream<Value> {
        input.filter_map(|event: &E| event.new_value().cloned())
    }
}

impl<E: ObservedEvent> Operator<E> for DebounceChanges {
    type Output = E;

    fn apply(self, input: Stream<E>) -> Stream<E> {
        input.debounce(self.window)
    }
}

impl<E: ObservedEvent> Operator<E> for BufferChanges {
    type Output = Vec<E>;

    fn apply(self, input: Stream<E>) -> Stream<Vec<E>> {
        input.buffer(self.size)
    }
}
