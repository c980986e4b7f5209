//! Interception layer.
//!
//! A `Model` is one instance of a registered model type. Reads pass straight
//! through. Every write runs validate, commit, emit:
//!
//! 1. the schema's validator checks (and may coerce) the candidate and a
//!    validation event reports the outcome;
//! 2. the accepted value replaces the stored one;
//! 3. if it differs from the previous value, one field change event goes out
//!    on the type's master channel, directly or through the field's
//!    debouncer on the registry's timer scheduler.
//!
//! Construction emits `created` once all initial values are committed, and
//! dropping the last handle flushes pending debounced changes and emits
//! `deleted`.

/// Snapshots of instance state.
pub mod dump;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{ReactiveResult, ValidationError};
use crate::event::{Event, FieldChangeEvent, InstanceId, LifecycleEvent, LifecyclePhase, ValidationEvent};
use crate::registry::ModelType;
use crate::schema::FieldSpec;
use crate::stream::debounce::Debouncer;
use crate::value::Value;

pub use dump::{ReactiveDump, ReactiveMeta, SubscriberCounts};

type LastEmitted = Arc<Mutex<HashMap<String, DateTime<Utc>>>>;

struct ModelInner {
    id: InstanceId,
    model_type: ModelType,
    values: Mutex<Vec<Value>>,
    last_emitted: LastEmitted,
    debouncers: HashMap<String, Debouncer<(Value, Value)>>,
}

/// An observable model instance.
///
/// Cloning yields another handle to the same instance. The instance is torn
/// down when the last handle drops; use [`Model::downgrade`] from
/// subscribers that need to reach their own instance.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

/// Non-owning handle to a `Model`.
#[derive(Clone)]
pub struct WeakModel {
    inner: Weak<ModelInner>,
}

impl WeakModel {
    /// The instance, if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Model> {
        self.inner.upgrade().map(|inner| Model { inner })
    }
}

impl fmt::Debug for WeakModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakModel")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl ModelType {
    /// Construct an instance from initial values.
    ///
    /// Every supplied value is validated; undeclared fields and required
    /// fields left out are rejected. Nothing is emitted unless construction
    /// succeeds, in which case a single `created` lifecycle event follows.
    pub fn create<I, K, V>(&self, values: I) -> ReactiveResult<Model>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let schema = self.schema();
        let mut supplied: Vec<Option<Value>> = vec![None; schema.fields().len()];

        for (name, value) in values {
            let name = name.as_ref();
            let (index, spec) = field_index(self, name)?;
            let accepted = schema.validator().validate(spec, value.into())?;
            supplied[index] = Some(accepted);
        }

        let mut committed = Vec::with_capacity(supplied.len());
        for (spec, value) in schema.fields().iter().zip(supplied) {
            match value.or_else(|| spec.initial_value()) {
                Some(value) => committed.push(value),
                None => {
                    return Err(ValidationError::MissingField {
                        field: spec.name().to_string(),
                    }
                    .into())
                }
            }
        }

        let id = InstanceId::new();
        let last_emitted: LastEmitted = Arc::new(Mutex::new(HashMap::new()));

        let mut debouncers = HashMap::new();
        for spec in schema.fields() {
            let Some(window) = spec.debounce().filter(|_| spec.is_reactive()) else {
                continue;
            };
            let debouncer = field_debouncer(self, id, spec, window, Arc::clone(&last_emitted));
            debouncers.insert(spec.name().to_string(), debouncer);
        }

        let model = Model {
            inner: Arc::new(ModelInner {
                id,
                model_type: self.clone(),
                values: Mutex::new(committed),
                last_emitted,
                debouncers,
            }),
        };

        tracing::debug!(model_type = %self.name(), instance_id = %id, "instance created");
        self.emit(&LifecycleEvent::new(self.name(), id, LifecyclePhase::Created).into());
        Ok(model)
    }

    /// Construct an instance with every field at its default.
    pub fn create_default(&self) -> ReactiveResult<Model> {
        self.create(std::iter::empty::<(&str, Value)>())
    }
}

impl Model {
    #[must_use]
    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    #[must_use]
    pub fn model_type(&self) -> &ModelType {
        &self.inner.model_type
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakModel {
        WeakModel {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// True if both handles refer to the same instance.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Current value of `field`. Emits nothing.
    pub fn get(&self, field: &str) -> Result<Value, ValidationError> {
        let (index, _) = field_index(&self.inner.model_type, field)?;
        Ok(self.lock_values()[index].clone())
    }

    /// Validate, commit and publish a new value for `field`.
    ///
    /// On rejection the stored value is untouched, a failure validation
    /// event is emitted and the error is returned. Writing the current value
    /// again commits nothing new and emits no field change.
    pub fn set(&self, field: &str, value: impl Into<Value>) -> Result<(), ValidationError> {
        let model_type = &self.inner.model_type;
        let (index, spec) = field_index(model_type, field)?;
        let reactive = spec.is_reactive();

        let accepted = match model_type.schema().validator().validate(spec, value.into()) {
            Ok(accepted) => accepted,
            Err(err) => {
                if reactive {
                    self.emit(ValidationEvent::failure(model_type.name(), self.inner.id, field, err.to_string()));
                }
                tracing::debug!(model_type = %model_type.name(), field, error = %err, "write rejected");
                return Err(err);
            }
        };

        if reactive && self.wants_validation_success() {
            self.emit(ValidationEvent::success(model_type.name(), self.inner.id, field));
        }

        let old = std::mem::replace(&mut self.lock_values()[index], accepted.clone());

        if !reactive || old == accepted {
            return Ok(());
        }

        match self.inner.debouncers.get(field) {
            Some(debouncer) => debouncer.push((old, accepted)),
            None => emit_field_change(model_type, self.inner.id, field, old, accepted, &self.inner.last_emitted),
        }
        Ok(())
    }

    /// Every field value, keyed by name.
    #[must_use]
    pub fn values(&self) -> Vec<(String, Value)> {
        let values = self.lock_values();
        self.inner
            .model_type
            .schema()
            .fields()
            .iter()
            .zip(values.iter())
            .map(|(spec, value)| (spec.name().to_string(), value.clone()))
            .collect()
    }

    pub(crate) fn last_emitted(&self) -> HashMap<String, DateTime<Utc>> {
        self.inner
            .last_emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn wants_validation_success(&self) -> bool {
        let config = self.inner.model_type.config();
        config.emit_validation_success && !(config.skip_unobserved_validation && !self.inner.model_type.is_observed())
    }

    fn emit(&self, event: impl Into<Event>) {
        self.inner.model_type.emit(&event.into());
    }

    fn lock_values(&self) -> MutexGuard<'_, Vec<Value>> {
        self.inner.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("model_type", &self.inner.model_type.name())
            .field("id", &self.inner.id)
            .field("values", &self.values())
            .finish()
    }
}

impl Drop for ModelInner {
    fn drop(&mut self) {
        for (field, debouncer) in &self.debouncers {
            if debouncer.flush() {
                tracing::debug!(
                    model_type = %self.model_type.name(),
                    instance_id = %self.id,
                    field = %field,
                    "flushed pending debounced change on teardown"
                );
            }
        }

        self.model_type
            .emit(&LifecycleEvent::new(self.model_type.name(), self.id, LifecyclePhase::Deleted).into());
        tracing::debug!(model_type = %self.model_type.name(), instance_id = %self.id, "instance dropped");
    }
}

fn field_index<'a>(model_type: &'a ModelType, field: &str) -> Result<(usize, &'a FieldSpec), ValidationError> {
    model_type
        .schema()
        .fields()
        .iter()
        .enumerate()
        .find(|(_, spec)| spec.name() == field)
        .ok_or_else(|| ValidationError::UnknownField {
            model_type: model_type.name().to_string(),
            field: field.to_string(),
        })
}

fn emit_field_change(
    model_type: &ModelType,
    id: InstanceId,
    field: &str,
    old: Value,
    new: Value,
    last_emitted: &Mutex<HashMap<String, DateTime<Utc>>>,
) {
    let event = FieldChangeEvent::new(model_type.name(), id, field, old, new);
    last_emitted
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(field.to_string(), event.header().timestamp());
    model_type.emit(&event.into());
}

/// A burst keeps the first old value and the last new value; a burst that
/// lands back on its start emits nothing.
fn field_debouncer(
    model_type: &ModelType,
    id: InstanceId,
    spec: &FieldSpec,
    window: Duration,
    last_emitted: LastEmitted,
) -> Debouncer<(Value, Value)> {
    let owner = model_type.clone();
    let field = spec.name().to_string();

    Debouncer::new(
        model_type.scheduler().clone(),
        window,
        |pending: Option<(Value, Value)>, (old, new): (Value, Value)| match pending {
            Some((first_old, _)) => (first_old, new),
            None => (old, new),
        },
        move |(old, new): (Value, Value)| {
            if old != new {
                emit_field_change(&owner, id, &field, old, new, &last_emitted);
            }
        },
    )
}
