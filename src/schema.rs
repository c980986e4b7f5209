//! Model declarations.
//!
//! A `ModelSchema` binds field names to a type, an optional default, value
//! constraints and reactive settings. Schemas are plain data; the registry
//! turns one into a live model type.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RegistrationError;
use crate::validation::{SchemaValidator, Validator};
use crate::value::Value;

/// Declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Any,
    Bool,
    Int,
    Float,
    String,
    List,
    Structured,
}

impl FieldType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::List => "list",
            Self::Structured => "structured",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value constraint checked by the default validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Constraint {
    /// Numeric value must be strictly greater.
    Gt(f64),
    /// Numeric value must be greater or equal.
    Ge(f64),
    /// Numeric value must be strictly less.
    Lt(f64),
    /// Numeric value must be less or equal.
    Le(f64),
    /// String (chars) or list length lower bound.
    MinLength(usize),
    /// String (chars) or list length upper bound.
    MaxLength(usize),
    /// Value must equal one of these.
    OneOf(Vec<Value>),
}

/// Declaration of one model field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    name: String,
    field_type: FieldType,
    #[serde(default)]
    nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    constraints: Vec<Constraint>,
    #[serde(default = "default_reactive")]
    reactive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    debounce: Option<Duration>,
}

const fn default_reactive() -> bool {
    true
}

impl FieldSpec {
    /// A required, reactive, non-nullable field.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
            default: None,
            constraints: Vec::new(),
            reactive: true,
            debounce: None,
        }
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Accept `Value::Null`; the default becomes `Null` unless one is set.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    #[must_use]
    pub fn gt(self, bound: f64) -> Self {
        self.constraint(Constraint::Gt(bound))
    }

    #[must_use]
    pub fn ge(self, bound: f64) -> Self {
        self.constraint(Constraint::Ge(bound))
    }

    #[must_use]
    pub fn lt(self, bound: f64) -> Self {
        self.constraint(Constraint::Lt(bound))
    }

    #[must_use]
    pub fn le(self, bound: f64) -> Self {
        self.constraint(Constraint::Le(bound))
    }

    #[must_use]
    pub fn min_length(self, len: usize) -> Self {
        self.constraint(Constraint::MinLength(len))
    }

    #[must_use]
    pub fn max_length(self, len: usize) -> Self {
        self.constraint(Constraint::MaxLength(len))
    }

    /// Writes to this field are stored and validated but never emit events.
    #[must_use]
    pub const fn non_reactive(mut self) -> Self {
        self.reactive = false;
        self
    }

    /// Coalesce change notifications for this field within `ms` milliseconds.
    /// Zero means no debounce.
    #[must_use]
    pub const fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce = if ms == 0 { None } else { Some(Duration::from_millis(ms)) };
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        self.field_type
    }

    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[must_use]
    pub const fn is_reactive(&self) -> bool {
        self.reactive
    }

    /// Debounce window, if any. A zero window reads as none.
    #[must_use]
    pub const fn debounce(&self) -> Option<Duration> {
        match self.debounce {
            Some(window) if !window.is_zero() => Some(window),
            _ => None,
        }
    }

    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The value a new instance starts with when none is supplied.
    #[must_use]
    pub fn initial_value(&self) -> Option<Value> {
        match (&self.default, self.nullable) {
            (Some(v), _) => Some(v.clone()),
            (None, true) => Some(Value::Null),
            (None, false) => None,
        }
    }
}

/// Declaration of a model type.
#[derive(Clone)]
pub struct ModelSchema {
    name: String,
    fields: Vec<FieldSpec>,
    validator: Arc<dyn Validator>,
}

impl ModelSchema {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ModelSchemaBuilder {
        ModelSchemaBuilder::new(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Names of fields that emit events.
    pub fn reactive_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter(|f| f.reactive).map(|f| f.name.as_str())
    }

    #[must_use]
    pub fn validator(&self) -> &Arc<dyn Validator> {
        &self.validator
    }
}

impl fmt::Debug for ModelSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSchema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Schemas compare by name and field declarations; the validator is opaque.
impl PartialEq for ModelSchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fields == other.fields
    }
}

/// Builder for `ModelSchema`.
pub struct ModelSchemaBuilder {
    name: String,
    fields: Vec<FieldSpec>,
    validator: Option<Arc<dyn Validator>>,
}

impl ModelSchemaBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            validator: None,
        }
    }

    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Replace the default constraint validator.
    #[must_use]
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Build the schema.
    ///
    /// Rejects empty names, duplicate fields, and defaults that fail their
    /// own field's validation.
    pub fn build(self) -> Result<ModelSchema, RegistrationError> {
        let invalid = |reason: String| RegistrationError::InvalidSchema {
            model_type: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("model type name cannot be empty".to_string()));
        }

        let mut seen = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(invalid("field name cannot be empty".to_string()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(invalid(format!("duplicate field '{}'", field.name)));
            }
        }

        let validator: Arc<dyn Validator> = self
            .validator
            .clone()
            .unwrap_or_else(|| Arc::new(SchemaValidator));

        for field in &self.fields {
            if let Some(default) = &field.default {
                if let Err(err) = validator.validate(field, default.clone()) {
                    return Err(invalid(format!("default for '{}' is invalid: {err}", field.name)));
                }
            }
        }

        Ok(ModelSchema {
            name: self.name,
            fields: self.fields,
            validator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_schema() -> ModelSchema {
        ModelSchema::builder("User")
            .field(FieldSpec::new("name", FieldType::String).default_value(""))
            .field(FieldSpec::new("age", FieldType::Int).default_value(0).ge(0.0))
            .field(FieldSpec::new("note", FieldType::String).nullable().non_reactive())
            .build()
            .unwrap()
    }

    #[test]
    fn schema_keeps_declaration_order() {
        let schema = user_schema();
        let names: Vec<&str> = schema.fields().iter().map(FieldSpec::name).collect();
        assert_eq!(names, vec!["name", "age", "note"]);
    }

    #[test]
    fn reactive_fields_skip_non_reactive() {
        let schema = user_schema();
        let reactive: Vec<&str> = schema.reactive_fields().collect();
        assert_eq!(reactive, vec!["name", "age"]);
    }

    #[test]
    fn nullable_field_starts_null() {
        let schema = user_schema();
        assert_eq!(schema.field("note").and_then(FieldSpec::initial_value), Some(Value::Null));
        assert!(FieldSpec::new("x", FieldType::Int).initial_value().is_none());
    }

    #[test]
    fn duplicate_field_is_rejected() {
        let err = ModelSchema::builder("Dup")
            .field(FieldSpec::new("a", FieldType::Int))
            .field(FieldSpec::new("a", FieldType::String))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidSchema { .. }));
    }

    #[test]
    fn invalid_default_is_rejected() {
        let err = ModelSchema::builder("Bad")
            .field(FieldSpec::new("price", FieldType::Float).default_value(-1.0).gt(0.0))
            .build()
            .unwrap_err();
        assert!(format!("{err}").contains("price"));
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(ModelSchema::builder("  ").build().is_err());
    }

    #[test]
    fn schemas_compare_by_declaration() {
        assert_eq!(user_schema(), user_schema());
        let other = ModelSchema::builder("User")
            .field(FieldSpec::new("name", FieldType::String))
            .build()
            .unwrap();
        assert_ne!(user_schema(), other);
    }

    #[test]
    fn debounce_is_recorded() {
        let spec = FieldSpec::new("price", FieldType::Float).debounce_ms(100);
        assert_eq!(spec.debounce(), Some(Duration::from_millis(100)));
        assert_eq!(spec.debounce_ms(0).debounce(), None);
    }
}
