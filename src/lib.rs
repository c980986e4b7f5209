//! # reactive-models - Observable structured data models
//!
//! Declared models whose field writes become discrete, subscribable events.
//! A write is validated, committed and then published once on the model
//! type's master channel; per-type, per-field, per-instance and
//! per-instance-field views all filter that one emission.
//!
//! ## Core Concepts
//!
//! - **ModelSchema**: declaration of a model type (fields, types, defaults, constraints)
//! - **Registry**: context object mapping model types to their master channels
//! - **Model**: an instance; `get` passes through, `set` runs validate, commit, emit
//! - **Event**: field change, lifecycle or validation outcome
//! - **Stream**: live view of events, composed with operators
//! - **TimerScheduler**: the registry's rxrust scheduler behind every debounce
//!
//! ## Usage
//!
//! ```rust
//! use reactive_models::{FieldSpec, FieldType, ModelSchema, Registry};
//!
//! let registry = Registry::new();
//! let user_type = registry.register_model_type(
//!     ModelSchema::builder("User")
//!         .field(FieldSpec::new("name", FieldType::String).default_value(""))
//!         .field(FieldSpec::new("age", FieldType::Int).default_value(0).ge(0.0))
//!         .build()?,
//! )?;
//!
//! let names = user_type.observe_field("name")?.listen();
//!
//! let user = user_type.create([("name", "Alice")])?;
//! user.set("name", "Alice Smith")?;
//! assert!(user.set("age", -1).is_err());
//!
//! let change = names.try_recv().expect("one change");
//! assert_eq!(change.old_value().as_string(), Some("Alice"));
//! assert_eq!(change.new_value().as_string(), Some("Alice Smith"));
//! # Ok::<(), reactive_models::ReactiveError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod schema;
pub mod validation;
pub mod value;

// Channels and streams
pub mod registry;
pub mod stream;

// Models and the subscription surface
pub mod model;
pub mod observe;
pub mod operators;

// Re-export primary types at crate root for convenience
pub use diagnostics::Diagnostics;
pub use error::{ReactiveError, ReactiveResult, RegistrationError, StreamError, SubscriberError, ValidationError};
pub use event::{
    Event, EventHeader, EventId, EventKind, EventType, FieldChangeEvent, InstanceId, LifecycleEvent, LifecyclePhase,
    ObservedEvent, ValidationEvent, ValidationOutcome,
};
pub use model::{Model, ReactiveDump, ReactiveMeta, SubscriberCounts, WeakModel};
pub use registry::{ChannelKey, MasterChannelHandle, ModelType, Registry, RegistryConfig};
pub use schema::{Constraint, FieldSpec, FieldType, ModelSchema, ModelSchemaBuilder};
pub use stream::{Listener, Operator, Stream, Subject, Subscription, TimerScheduler};
pub use validation::{SchemaValidator, Validator};
pub use value::Value;
