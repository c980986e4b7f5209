//! Validation seam.
//!
//! The interception layer hands every candidate value to a `Validator` before
//! committing it. Validators are synchronous and never emit events; emitting
//! the outcome is the model's job.

use crate::error::ValidationError;
use crate::schema::{Constraint, FieldSpec, FieldType};
use crate::value::Value;

/// Accepts (possibly coerced) or rejects a candidate field value.
pub trait Validator: Send + Sync {
    fn validate(&self, field: &FieldSpec, candidate: Value) -> Result<Value, ValidationError>;
}

impl<F> Validator for F
where
    F: Fn(&FieldSpec, Value) -> Result<Value, ValidationError> + Send + Sync,
{
    fn validate(&self, field: &FieldSpec, candidate: Value) -> Result<Value, ValidationError> {
        self(field, candidate)
    }
}

/// Default validator: type check with lax numeric coercion, then constraints.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl Validator for SchemaValidator {
    fn validate(&self, field: &FieldSpec, candidate: Value) -> Result<Value, ValidationError> {
        if candidate.is_null() {
            if field.is_nullable() || field.field_type() == FieldType::Any {
                return Ok(candidate);
            }
            return Err(type_mismatch(field, &candidate));
        }

        let value = coerce(field, candidate)?;
        for constraint in field.constraints() {
            check_constraint(field, constraint, &value)?;
        }
        Ok(value)
    }
}

fn type_mismatch(field: &FieldSpec, actual: &Value) -> ValidationError {
    ValidationError::TypeMismatch {
        field: field.name().to_string(),
        expected: field.field_type().to_string(),
        actual: actual.type_name().to_string(),
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn coerce(field: &FieldSpec, candidate: Value) -> Result<Value, ValidationError> {
    match (field.field_type(), candidate) {
        (FieldType::Any, v) => Ok(v),
        (FieldType::Bool, v @ Value::Bool(_))
        | (FieldType::Int, v @ Value::Int(_))
        | (FieldType::Float, v @ Value::Float(_))
        | (FieldType::String, v @ Value::String(_))
        | (FieldType::List, v @ Value::List(_))
        | (FieldType::Structured, v @ Value::Structured(_)) => Ok(v),
        (FieldType::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
        (FieldType::Int, Value::Float(f)) if f.fract() == 0.0 && f.is_finite() => float_to_int(field, f),
        (FieldType::Float | FieldType::Int, Value::String(s)) => {
            parse_numeric(field, s.trim()).ok_or_else(|| type_mismatch(field, &Value::String(s)))
        }
        (_, other) => Err(type_mismatch(field, &other)),
    }
}

// i64::MIN is exact as a float; 2^63 is the first float past i64::MAX.
const I64_FLOOR: f64 = -9_223_372_036_854_775_808.0;
const I64_CEILING: f64 = 9_223_372_036_854_775_808.0;

#[allow(clippy::cast_possible_truncation)]
fn float_to_int(field: &FieldSpec, f: f64) -> Result<Value, ValidationError> {
    if (I64_FLOOR..I64_CEILING).contains(&f) {
        Ok(Value::Int(f as i64))
    } else {
        Err(ValidationError::OutOfRange {
            field: field.name().to_string(),
            detail: format!("{f} does not fit in a 64-bit integer"),
        })
    }
}

fn parse_numeric(field: &FieldSpec, text: &str) -> Option<Value> {
    match field.field_type() {
        FieldType::Int => text.parse::<i64>().ok().map(Value::Int),
        FieldType::Float => text.parse::<f64>().ok().filter(|f| f.is_finite()).map(Value::Float),
        _ => None,
    }
}

fn check_constraint(field: &FieldSpec, constraint: &Constraint, value: &Value) -> Result<(), ValidationError> {
    let out_of_range = |detail: String| ValidationError::OutOfRange {
        field: field.name().to_string(),
        detail,
    };

    match constraint {
        Constraint::Gt(bound) => match value.as_float() {
            Some(v) if v > *bound => Ok(()),
            Some(v) => Err(out_of_range(format!("{v} must be > {bound}"))),
            None => Ok(()),
        },
        Constraint::Ge(bound) => match value.as_float() {
            Some(v) if v >= *bound => Ok(()),
            Some(v) => Err(out_of_range(format!("{v} must be >= {bound}"))),
            None => Ok(()),
        },
        Constraint::Lt(bound) => match value.as_float() {
            Some(v) if v < *bound => Ok(()),
            Some(v) => Err(out_of_range(format!("{v} must be < {bound}"))),
            None => Ok(()),
        },
        Constraint::Le(bound) => match value.as_float() {
            Some(v) if v <= *bound => Ok(()),
            Some(v) => Err(out_of_range(format!("{v} must be <= {bound}"))),
            None => Ok(()),
        },
        Constraint::MinLength(min) => match value.len() {
            Some(len) if len < *min => Err(ValidationError::InvalidLength {
                field: field.name().to_string(),
                actual: len,
                detail: format!(">= {min}"),
            }),
            _ => Ok(()),
        },
        Constraint::MaxLength(max) => match value.len() {
            Some(len) if len > *max => Err(ValidationError::InvalidLength {
                field: field.name().to_string(),
                actual: len,
                detail: format!("<= {max}"),
            }),
            _ => Ok(()),
        },
        Constraint::OneOf(allowed) => {
            if allowed.contains(value) {
                Ok(())
            } else {
                Err(ValidationError::Rejected {
                    field: field.name().to_string(),
                    detail: format!("{value} is not an allowed value"),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_is_coerced_into_float_field() {
        let field = FieldSpec::new("price", FieldType::Float);
        assert_eq!(SchemaValidator.validate(&field, Value::Int(10)), Ok(Value::Float(10.0)));
    }

    #[test]
    fn numeric_string_is_coerced() {
        let field = FieldSpec::new("age", FieldType::Int);
        assert_eq!(SchemaValidator.validate(&field, Value::from(" 42 ")), Ok(Value::Int(42)));

        let err = SchemaValidator.validate(&field, Value::from("forty")).unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { .. }));
    }

    #[test]
    fn fractional_float_is_not_an_int() {
        let field = FieldSpec::new("age", FieldType::Int);
        assert_eq!(SchemaValidator.validate(&field, Value::Float(3.0)), Ok(Value::Int(3)));
        assert!(SchemaValidator.validate(&field, Value::Float(3.5)).is_err());
    }

    #[test]
    fn float_outside_int_range_is_rejected() {
        let field = FieldSpec::new("age", FieldType::Int).ge(0.0);
        let err = SchemaValidator.validate(&field, Value::Float(1e20)).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
        assert!(SchemaValidator.validate(&field, Value::Float(9_223_372_036_854_775_808.0)).is_err());

        let signed = FieldSpec::new("offset", FieldType::Int);
        assert_eq!(
            SchemaValidator.validate(&signed, Value::Float(-9_223_372_036_854_775_808.0)),
            Ok(Value::Int(i64::MIN))
        );
        assert!(SchemaValidator.validate(&signed, Value::Float(-1e19)).is_err());
    }

    #[test]
    fn negative_value_fails_ge_zero() {
        let field = FieldSpec::new("age", FieldType::Int).ge(0.0);
        let err = SchemaValidator.validate(&field, Value::Int(-1)).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
        assert!(format!("{err}").contains(">= 0"));
    }

    #[test]
    fn gt_rejects_bound_itself() {
        let field = FieldSpec::new("price", FieldType::Float).gt(0.0);
        assert!(SchemaValidator.validate(&field, Value::Float(0.0)).is_err());
        assert!(SchemaValidator.validate(&field, Value::Float(0.01)).is_ok());
    }

    #[test]
    fn min_length_applies_to_strings_and_lists() {
        let name = FieldSpec::new("name", FieldType::String).min_length(3);
        assert!(SchemaValidator.validate(&name, Value::from("AB")).is_err());
        assert!(SchemaValidator.validate(&name, Value::from("ABC")).is_ok());

        let tags = FieldSpec::new("tags", FieldType::List).max_length(1);
        assert!(SchemaValidator.validate(&tags, Value::from(vec!["a", "b"])).is_err());
    }

    #[test]
    fn null_requires_nullable() {
        let strict = FieldSpec::new("customer_id", FieldType::String);
        assert!(SchemaValidator.validate(&strict, Value::Null).is_err());

        let optional = FieldSpec::new("customer_id", FieldType::String).nullable();
        assert_eq!(SchemaValidator.validate(&optional, Value::Null), Ok(Value::Null));
    }

    #[test]
    fn one_of_rejects_other_values() {
        let field = FieldSpec::new("status", FieldType::String)
            .constraint(Constraint::OneOf(vec![Value::from("open"), Value::from("closed")]));
        assert!(SchemaValidator.validate(&field, Value::from("open")).is_ok());
        assert!(SchemaValidator.validate(&field, Value::from("pending")).is_err());
    }

    #[test]
    fn closures_are_validators() {
        let upper = |_: &FieldSpec, v: Value| -> Result<Value, ValidationError> {
            Ok(v.as_string().map_or(v.clone(), |s| Value::from(s.to_uppercase())))
        };
        let field = FieldSpec::new("code", FieldType::String);
        assert_eq!(upper.validate(&field, Value::from("ab")), Ok(Value::from("AB")));
    }
}
