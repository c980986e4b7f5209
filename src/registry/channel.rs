//! Channel keys.
//!
//! A channel is never a separate emission point. It is a key over the
//! master stream of one model type, narrowed by field and/or instance.

use std::fmt;

use crate::event::{Event, InstanceId};

/// Routing key `(model_type, field | *, instance | *)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    model_type: String,
    field: Option<String>,
    instance: Option<InstanceId>,
}

impl ChannelKey {
    /// Every event of a model type.
    #[must_use]
    pub fn model(model_type: impl Into<String>) -> Self {
        Self {
            model_type: model_type.into(),
            field: None,
            instance: None,
        }
    }

    /// Field changes of one field across all instances.
    #[must_use]
    pub fn field(model_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            model_type: model_type.into(),
            field: Some(field.into()),
            instance: None,
        }
    }

    /// Every event of one instance.
    #[must_use]
    pub fn instance(model_type: impl Into<String>, instance: InstanceId) -> Self {
        Self {
            model_type: model_type.into(),
            field: None,
            instance: Some(instance),
        }
    }

    /// Field changes of one field on one instance.
    #[must_use]
    pub fn instance_field(model_type: impl Into<String>, instance: InstanceId, field: impl Into<String>) -> Self {
        Self {
            model_type: model_type.into(),
            field: Some(field.into()),
            instance: Some(instance),
        }
    }

    #[must_use]
    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    #[must_use]
    pub fn field_name(&self) -> Option<&str> {
        self.field.as_deref()
    }

    #[must_use]
    pub const fn instance_id(&self) -> Option<InstanceId> {
        self.instance
    }

    /// Whether `event` belongs on this channel.
    ///
    /// Field-scoped keys only match field changes; validation events carry a
    /// field name too but are visible on model and instance channels only.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        let header = event.header();
        if header.model_type() != self.model_type {
            return false;
        }
        if let Some(instance) = self.instance {
            if header.instance_id() != instance {
                return false;
            }
        }
        match &self.field {
            None => true,
            Some(field) => event.as_field_change().is_some_and(|c| c.field_name() == field),
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.model_type, self.field.as_deref().unwrap_or("*"))?;
        match self.instance {
            Some(id) => write!(f, "@{id}"),
            None => write!(f, "@*"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{FieldChangeEvent, LifecycleEvent, LifecyclePhase, ValidationEvent};
    use crate::value::Value;

    fn change(model: &str, id: InstanceId, field: &str) -> Event {
        FieldChangeEvent::new(model, id, field, Value::Int(1), Value::Int(2)).into()
    }

    #[test]
    fn field_key_matches_only_that_field() {
        let id = InstanceId::new();
        let key = ChannelKey::field("User", "name");
        assert!(key.matches(&change("User", id, "name")));
        assert!(!key.matches(&change("User", id, "age")));
        assert!(!key.matches(&change("Order", id, "name")));
    }

    #[test]
    fn field_key_ignores_validation_events() {
        let id = InstanceId::new();
        let key = ChannelKey::field("User", "name");
        assert!(!key.matches(&ValidationEvent::success("User", id, "name").into()));
    }

    #[test]
    fn instance_key_matches_every_kind_for_that_instance() {
        let id = InstanceId::new();
        let other = InstanceId::new();
        let key = ChannelKey::instance("User", id);
        assert!(key.matches(&change("User", id, "name")));
        assert!(key.matches(&LifecycleEvent::new("User", id, LifecyclePhase::Created).into()));
        assert!(!key.matches(&change("User", other, "name")));
    }

    #[test]
    fn display_uses_wildcards() {
        assert_eq!(ChannelKey::field("User", "name").to_string(), "User.name@*");
        assert_eq!(ChannelKey::model("User").to_string(), "User.*@*");
    }
}
