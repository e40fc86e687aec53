//! Validation Gate
//!
//! Wraps an injected payload validator with a uniform contract. The crate
//! does not define a schema language: anything implementing [`PayloadSchema`]
//! can guard an operation's input or output slot. A missing schema is a
//! pass-through.

use std::fmt;

use serde_json::Value;

use crate::error::OpError;

// == Schema Violation ==
/// Description of a failed validation, carried inside `OpError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Name of the schema that rejected the value
    pub schema: String,
    /// Human-readable reason
    pub message: String,
}

impl SchemaViolation {
    /// Creates a new violation record.
    pub fn new(schema: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema '{}': {}", self.schema, self.message)
    }
}

// == Payload Schema Trait ==
/// Shape contract for a JSON payload.
///
/// Implementations decide validity with a boolean-success contract: return
/// `Ok(())` for a conforming value, or the violation otherwise. They must
/// not mutate the value.
pub trait PayloadSchema: Send + Sync {
    /// Validates a payload against this schema.
    fn validate(&self, value: &Value) -> Result<(), SchemaViolation>;

    /// Name used in violation messages and logs.
    fn name(&self) -> &str {
        "anonymous"
    }
}

// == Closure Adapter ==
/// Adapts a plain closure into a [`PayloadSchema`].
///
/// Covers the common case where the validator is supplied by an external
/// schema library and only its boolean outcome matters here.
pub struct SchemaFn {
    name: String,
    check: Box<dyn Fn(&Value) -> Result<(), String> + Send + Sync>,
}

impl SchemaFn {
    /// Creates a named schema from a closure returning `Err(reason)` on
    /// rejection.
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }

    /// Schema requiring a JSON object containing every listed field.
    pub fn object_with(name: impl Into<String>, fields: &[&str]) -> Self {
        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        Self::new(name, move |value| {
            let obj = value
                .as_object()
                .ok_or_else(|| "expected an object".to_string())?;
            for field in &fields {
                if !obj.contains_key(field) {
                    return Err(format!("missing field '{}'", field));
                }
            }
            Ok(())
        })
    }
}

impl PayloadSchema for SchemaFn {
    fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        (self.check)(value).map_err(|message| SchemaViolation::new(&self.name, message))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// == Gate Functions ==
/// Applies the input-slot gate. `None` always passes.
pub fn check_input(schema: Option<&dyn PayloadSchema>, value: &Value) -> Result<(), OpError> {
    match schema {
        Some(schema) => schema.validate(value).map_err(OpError::InvalidInput),
        None => Ok(()),
    }
}

/// Applies the output-slot gate. `None` always passes.
///
/// Used for both freshly executed results and cache hits: cached data can
/// become stale relative to an evolved schema, so a hit is not exempt.
pub fn check_output(schema: Option<&dyn PayloadSchema>, value: &Value) -> Result<(), OpError> {
    match schema {
        Some(schema) => schema.validate(value).map_err(OpError::InvalidOutput),
        None => Ok(()),
    }
}
