//! Subscription API.
//!
//! Four entry points, one per channel scope. Each returns a live stream
//! derived from the model type's master channel; none of them replays past
//! events or emits anything by itself.
//!
//! | scope            | entry point                           | items              |
//! |------------------|---------------------------------------|--------------------|
//! | type + field     | [`ModelType::observe_field`]          | `FieldChangeEvent` |
//! | type             | [`ModelType::observe_model`]          | `Event`            |
//! | instance         | [`Model::observe_instance`]           | `Event`            |
//! | instance + field | [`Model::observe_instance_field`]     | `FieldChangeEvent` |
//!
//! The registry offers the type-scoped pair by name.

use crate::error::RegistrationError;
use crate::event::{Event, FieldChangeEvent};
use crate::model::Model;
use crate::registry::{ChannelKey, ModelType, Registry};
use crate::stream::Stream;

fn field_changes(stream: Stream<Event>) -> Stream<FieldChangeEvent> {
    stream.filter_map(|event: &Event| event.as_field_change().cloned())
}

impl ModelType {
    /// Changes of `field` on every instance of this type.
    pub fn observe_field(&self, field: &str) -> Result<Stream<FieldChangeEvent>, RegistrationError> {
        self.require_field(field)?;
        Ok(field_changes(self.scoped(ChannelKey::field(self.name(), field))))
    }

    /// Every event of every instance of this type.
    #[must_use]
    pub fn observe_model(&self) -> Stream<Event> {
        self.scoped(ChannelKey::model(self.name()))
    }
}

impl Model {
    /// Every event of this instance, including its `deleted` lifecycle event.
    #[must_use]
    pub fn observe_instance(&self) -> Stream<Event> {
        let model_type = self.model_type();
        model_type.scoped(ChannelKey::instance(model_type.name(), self.id()))
    }

    /// Changes of `field` on this instance only.
    pub fn observe_instance_field(&self, field: &str) -> Result<Stream<FieldChangeEvent>, RegistrationError> {
        let model_type = self.model_type();
        model_type.require_field(field)?;
        Ok(field_changes(
            model_type.scoped(ChannelKey::instance_field(model_type.name(), self.id(), field)),
        ))
    }
}

impl Registry {
    /// [`ModelType::observe_field`] by type name.
    pub fn observe_field(&self, model_type: &str, field: &str) -> Result<Stream<FieldChangeEvent>, RegistrationError> {
        self.model_type(model_type)?.observe_field(field)
    }

    /// [`ModelType::observe_model`] by type name.
    pub fn observe_model(&self, model_type: &str) -> Result<Stream<Event>, RegistrationError> {
        Ok(self.model_type(model_type)?.observe_model())
    }
}
