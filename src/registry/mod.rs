//! Channel registry.
//!
//! The registry maps model type names to their master channels. It is an
//! explicit context object rather than a global: applications usually keep
//! one for the life of the process, tests build a fresh one (or `reset`) for
//! isolation. Every handle it gives out shares its configuration and
//! diagnostic sink.

/// Channel routing keys.
pub mod channel;
/// Registered model types.
pub mod model_type;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::diagnostics::Diagnostics;
use crate::error::RegistrationError;
use crate::event::Event;
use crate::schema::ModelSchema;
use crate::stream::scheduler::DEFAULT_NAME_PREFIX;
use crate::stream::{Stream, TimerScheduler};

pub use channel::ChannelKey;
pub use model_type::{MasterChannelHandle, ModelType};

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Emit a validation event for accepted writes, not only rejected ones.
    pub emit_validation_success: bool,
    /// Skip success validation events while nobody observes the model type.
    pub skip_unobserved_validation: bool,
    /// Thread name prefix for the debounce scheduler.
    pub worker_name_prefix: String,
    /// Threads in the debounce scheduler pool.
    pub scheduler_threads: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            emit_validation_success: true,
            skip_unobserved_validation: true,
            worker_name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            scheduler_threads: 1,
        }
    }
}

struct RegistryInner {
    config: Arc<RegistryConfig>,
    diagnostics: Arc<Diagnostics>,
    scheduler: TimerScheduler,
    types: RwLock<HashMap<String, ModelType>>,
}

/// Registry of model types and their master channels.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        let scheduler = TimerScheduler::new(config.worker_name_prefix.clone(), config.scheduler_threads);
        Self {
            inner: Arc::new(RegistryInner {
                config: Arc::new(config),
                diagnostics: Arc::new(Diagnostics::new()),
                scheduler,
                types: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register a model type and return its master channel handle.
    ///
    /// Idempotent: registering the same schema again returns the existing
    /// handle. Registering a different schema under a taken name fails.
    pub fn register_model_type(&self, schema: ModelSchema) -> Result<ModelType, RegistrationError> {
        let mut types = self.inner.types.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = types.get(schema.name()) {
            if existing.schema() == &schema {
                return Ok(existing.clone());
            }
            return Err(RegistrationError::SchemaMismatch {
                model_type: schema.name().to_string(),
            });
        }

        let name = schema.name().to_string();
        let fields = schema.fields().len();
        let handle = ModelType::new(
            schema,
            Arc::clone(&self.inner.config),
            Arc::clone(&self.inner.diagnostics),
            self.inner.scheduler.clone(),
        );
        types.insert(name.clone(), handle.clone());
        tracing::debug!(model_type = %name, fields, "registered model type");
        Ok(handle)
    }

    /// Deliver `event` on the master channel of `handle`.
    pub fn emit(&self, handle: &ModelType, event: &Event) -> usize {
        handle.emit(event)
    }

    /// Unfiltered stream of every event of `handle`'s type.
    #[must_use]
    pub fn get_master_stream(&self, handle: &ModelType) -> Stream<Event> {
        handle.master_stream()
    }

    /// Look up a registered model type by name.
    pub fn model_type(&self, name: &str) -> Result<ModelType, RegistrationError> {
        self.inner
            .types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| RegistrationError::UnknownModelType {
                model_type: name.to_string(),
            })
    }

    /// Names of all registered model types, sorted.
    #[must_use]
    pub fn model_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Forget every registration and clear the diagnostic sink.
    ///
    /// Handles obtained earlier keep working on their own, but are no longer
    /// reachable by name.
    pub fn reset(&self) {
        let dropped = {
            let mut types = self.inner.types.write().unwrap_or_else(PoisonError::into_inner);
            let n = types.len();
            types.clear();
            n
        };
        self.inner.diagnostics.reset();
        tracing::debug!(dropped, "registry reset");
    }

    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.inner.diagnostics
    }

    /// Scheduler running every debounce timer of this registry.
    #[must_use]
    pub fn scheduler(&self) -> &TimerScheduler {
        &self.inner.scheduler
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.inner.config)
            .field("model_types", &self.model_types())
            .finish()
    }
}
