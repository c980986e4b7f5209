//! Event model.
//!
//! Every observable thing that happens to a model instance is one of three
//! immutable event variants: a committed field change, a lifecycle phase, or
//! a validation outcome. Events carry a process-wide monotonic `EventId`;
//! emission order is `EventId` order.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::Value;

static NEXT_EVENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide monotonic event identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(u64);

impl EventId {
    /// Takes the next id from the process-wide counter.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_EVENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of a model instance.
///
/// Assigned once at construction and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Creates a new random instance id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse event classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    FieldChange,
    Lifecycle,
    Validation,
}

/// Fine-grained event classification, one per observable outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    FieldChanged,
    ModelCreated,
    ModelUpdated,
    ModelDeleted,
    ValidationSuccess,
    ValidationFailure,
}

impl EventType {
    /// The coarse kind this type belongs to.
    #[must_use]
    pub const fn kind(self) -> EventKind {
        match self {
            Self::FieldChanged => EventKind::FieldChange,
            Self::ModelCreated | Self::ModelUpdated | Self::ModelDeleted => EventKind::Lifecycle,
            Self::ValidationSuccess | Self::ValidationFailure => EventKind::Validation,
        }
    }

    /// Wire name, e.g. `"model_created"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FieldChanged => "field_changed",
            Self::ModelCreated => "model_created",
            Self::ModelUpdated => "model_updated",
            Self::ModelDeleted => "model_deleted",
            Self::ValidationSuccess => "validation_success",
            Self::ValidationFailure => "validation_failure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Created,
    /// Reserved for application-marked batches; never emitted by this crate.
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    Success,
    Failure,
}

/// Fields shared by every event variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventHeader {
    event_id: EventId,
    timestamp: DateTime<Utc>,
    model_type: String,
    instance_id: InstanceId,
}

impl EventHeader {
    fn stamp(model_type: impl Into<String>, instance_id: InstanceId) -> Self {
        Self {
            event_id: EventId::next(),
            timestamp: Utc::now(),
            model_type: model_type.into(),
            instance_id,
        }
    }

    #[must_use]
    pub const fn event_id(&self) -> EventId {
        self.event_id
    }

    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    #[must_use]
    pub const fn instance_id(&self) -> InstanceId {
        self.instance_id
    }
}

/// A committed field value change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChangeEvent {
    #[serde(flatten)]
    header: EventHeader,
    field_name: String,
    old_value: Value,
    new_value: Value,
}

impl FieldChangeEvent {
    #[must_use]
    pub fn new(
        model_type: impl Into<String>,
        instance_id: InstanceId,
        field_name: impl Into<String>,
        old_value: Value,
        new_value: Value,
    ) -> Self {
        Self {
            header: EventHeader::stamp(model_type, instance_id),
            field_name: field_name.into(),
            old_value,
            new_value,
        }
    }

    #[must_use]
    pub const fn header(&self) -> &EventHeader {
        &self.header
    }

    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    #[must_use]
    pub const fn old_value(&self) -> &Value {
        &self.old_value
    }

    #[must_use]
    pub const fn new_value(&self) -> &Value {
        &self.new_value
    }
}

/// A model instance entered a lifecycle phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    #[serde(flatten)]
    header: EventHeader,
    phase: LifecyclePhase,
}

impl LifecycleEvent {
    #[must_use]
    pub fn new(model_type: impl Into<String>, instance_id: InstanceId, phase: LifecyclePhase) -> Self {
        Self {
            header: EventHeader::stamp(model_type, instance_id),
            phase,
        }
    }

    #[must_use]
    pub const fn header(&self) -> &EventHeader {
        &self.header
    }

    #[must_use]
    pub const fn phase(&self) -> LifecyclePhase {
        self.phase
    }
}

/// Outcome of validating a candidate field value.
///
/// `error_detail` is present iff the outcome is a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationEvent {
    #[serde(flatten)]
    header: EventHeader,
    field_name: String,
    outcome: ValidationOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_detail: Option<String>,
}

impl ValidationEvent {
    #[must_use]
    pub fn success(model_type: impl Into<String>, instance_id: InstanceId, field_name: impl Into<String>) -> Self {
        Self {
            header: EventHeader::stamp(model_type, instance_id),
            field_name: field_name.into(),
            outcome: ValidationOutcome::Success,
            error_detail: None,
        }
    }

    #[must_use]
    pub fn failure(
        model_type: impl Into<String>,
        instance_id: InstanceId,
        field_name: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            header: EventHeader::stamp(model_type, instance_id),
            field_name: field_name.into(),
            outcome: ValidationOutcome::Failure,
            error_detail: Some(detail.into()),
        }
    }

    #[must_use]
    pub const fn header(&self) -> &EventHeader {
        &self.header
    }

    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    #[must_use]
    pub const fn outcome(&self) -> ValidationOutcome {
        self.outcome
    }

    #[must_use]
    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }
}

/// Any event emitted on a model type's master channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    FieldChange(FieldChangeEvent),
    Lifecycle(LifecycleEvent),
    Validation(ValidationEvent),
}

impl Event {
    #[must_use]
    pub const fn header(&self) -> &EventHeader {
        match self {
            Self::FieldChange(e) => &e.header,
            Self::Lifecycle(e) => &e.header,
            Self::Validation(e) => &e.header,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::FieldChange(_) => EventKind::FieldChange,
            Self::Lifecycle(_) => EventKind::Lifecycle,
            Self::Validation(_) => EventKind::Validation,
        }
    }

    #[must_use]
    pub const fn as_field_change(&self) -> Option<&FieldChangeEvent> {
        match self {
            Self::FieldChange(e) => Some(e),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_lifecycle(&self) -> Option<&LifecycleEvent> {
        match self {
            Self::Lifecycle(e) => Some(e),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_validation(&self) -> Option<&ValidationEvent> {
        match self {
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }

    /// Consumes the event, keeping it only if it is a field change.
    #[must_use]
    pub fn into_field_change(self) -> Option<FieldChangeEvent> {
        match self {
            Self::FieldChange(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FieldChangeEvent> for Event {
    fn from(e: FieldChangeEvent) -> Self {
        Self::FieldChange(e)
    }
}

impl From<LifecycleEvent> for Event {
    fn from(e: LifecycleEvent) -> Self {
        Self::Lifecycle(e)
    }
}

impl From<ValidationEvent> for Event {
    fn from(e: ValidationEvent) -> Self {
        Self::Validation(e)
    }
}

/// Uniform read access used by the operator library.
///
/// Implemented by `Event` and each concrete variant so the same operators
/// apply to `observe_model` and `observe_field` streams alike.
pub trait ObservedEvent: Clone + Send + Sync + 'static {
    fn header(&self) -> &EventHeader;

    fn event_type(&self) -> EventType;

    /// Field the event refers to; lifecycle events have none.
    fn field_name(&self) -> Option<&str> {
        None
    }

    /// Committed value; only field changes carry one.
    fn new_value(&self) -> Option<&Value> {
        None
    }

    fn event_id(&self) -> EventId {
        self.header().event_id()
    }

    fn instance_id(&self) -> InstanceId {
        self.header().instance_id()
    }
}

impl ObservedEvent for FieldChangeEvent {
    fn header(&self) -> &EventHeader {
        &self.header
    }

    fn event_type(&self) -> EventType {
        EventType::FieldChanged
    }

    fn field_name(&self) -> Option<&str> {
        Some(&self.field_name)
    }

    fn new_value(&self) -> Option<&Value> {
        Some(&self.new_value)
    }
}

impl ObservedEvent for LifecycleEvent {
    fn header(&self) -> &EventHeader {
        &self.header
    }

    fn event_type(&self) -> EventType {
        match self.phase {
            LifecyclePhase::Created => EventType::ModelCreated,
            LifecyclePhase::Updated => EventType::ModelUpdated,
            LifecyclePhase::Deleted => EventType::ModelDeleted,
        }
    }
}

impl ObservedEvent for ValidationEvent {
    fn header(&self) -> &EventHeader {
        &self.header
    }

    fn event_type(&self) -> EventType {
        match self.outcome {
            ValidationOutcome::Success => EventType::ValidationSuccess,
            ValidationOutcome::Failure => EventType::ValidationFailure,
        }
    }

    fn field_name(&self) -> Option<&str> {
        Some(&self.field_name)
    }
}

impl ObservedEvent for Event {
    fn header(&self) -> &EventHeader {
        Self::header(self)
    }

    fn event_type(&self) -> EventType {
        match self {
            Self::FieldChange(e) => e.event_type(),
            Self::Lifecycle(e) => e.event_type(),
            Self::Validation(e) => e.event_type(),
        }
    }

    fn field_name(&self) -> Option<&str> {
        match self {
            Self::FieldChange(e) => Some(&e.field_name),
            Self::Validation(e) => Some(&e.field_name),
            Self::Lifecycle(_) => None,
        }
    }

    fn new_value(&self) -> Option<&Value> {
        match self {
            Self::FieldChange(e) => Some(&e.new_value),
            _ => None,
        }
    }
}
