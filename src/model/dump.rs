use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::event::InstanceId;
use crate::registry::ChannelKey;
use crate::value::Value;

use super::Model;

/// Live subscriber counts for one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriberCounts {
    /// Every subscriber on the type's master channel.
    pub total: usize,
    /// Subscribers of the whole model type (`observe_model`).
    pub model: usize,
    /// Subscribers of each reactive field across instances (`observe_field`).
    pub fields: BTreeMap<String, usize>,
    /// Subscribers scoped to this instance, with or without a field.
    pub instance: usize,
}

/// Reactive metadata attached to a dump.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactiveMeta {
    pub model_type: String,
    pub instance_id: InstanceId,
    pub reactive_fields: Vec<String>,
    pub subscribers: SubscriberCounts,
    /// When each field last emitted a change; fields that never did are absent.
    pub last_emitted: BTreeMap<String, DateTime<Utc>>,
}

/// Field values plus reactive metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactiveDump {
    /// Current value of every field.
    #[serde(flatten)]
    pub values: BTreeMap<String, Value>,
    /// Serialized under `_reactive_meta` so it cannot clash with a field.
    #[serde(rename = "_reactive_meta")]
    pub meta: ReactiveMeta,
}

impl Model {
    /// Current value of every field. Emits nothing.
    #[must_use]
    pub fn dump(&self) -> BTreeMap<String, Value> {
        self.values().into_iter().collect()
    }

    /// Values plus a snapshot of the instance's reactive wiring.
    #[must_use]
    pub fn dump_reactive(&self) -> ReactiveDump {
        let model_type = self.model_type();
        let name = model_type.name();
        let reactive_fields: Vec<String> = model_type.schema().reactive_fields().map(str::to_string).collect();

        let fields = reactive_fields
            .iter()
            .map(|field| {
                let count = model_type.scope_subscribers(&ChannelKey::field(name, field.as_str()));
                (field.clone(), count)
            })
            .collect();

        let subscribers = SubscriberCounts {
            total: model_type.subscriber_count(),
            model: model_type.scope_subscribers(&ChannelKey::model(name)),
            fields,
            instance: model_type.instance_subscribers(self.id()),
        };

        ReactiveDump {
            values: self.dump(),
            meta: ReactiveMeta {
                model_type: name.to_string(),
                instance_id: self.id(),
                reactive_fields,
                subscribers,
                last_emitted: self.last_emitted().into_iter().collect(),
            },
        }
    }
}
