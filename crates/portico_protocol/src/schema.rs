//! Per-method parameter schemas.
//!
//! Every protocol method has an ordered list of positional [`ParamType`]s and
//! an optional variadic tail. Validation is exact: `"1"` is not an
//! [`Integer`](ParamType::Integer) and `1.5` is not either.

use core::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::ProtocolError;
use crate::method;

/// JSON type expected at a parameter position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// JSON string.
    String,
    /// JSON number without a fractional part.
    Integer,
    /// Any JSON number.
    Number,
    /// JSON boolean.
    Boolean,
    /// Any JSON array.
    Array,
    /// JSON object.
    Object,
    /// JSON array whose elements are all strings.
    StringArray,
    /// Any value, including `null`.
    Any,
}

impl ParamType {
    /// Returns true if `value` has this type.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::StringArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            Self::Any => true,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::StringArray => "string[]",
            Self::Any => "any",
        };
        f.write_str(name)
    }
}

/// JSON type name of a value, for error messages.
#[must_use]
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Positional parameter types for one method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSchema {
    params: Vec<ParamType>,
    variadic: Option<ParamType>,
}

impl MethodSchema {
    /// A schema with exactly these positional parameters.
    #[must_use]
    pub fn new(params: impl IntoIterator<Item = ParamType>) -> Self {
        Self {
            params: params.into_iter().collect(),
            variadic: None,
        }
    }

    /// Accepts any number of trailing parameters of type `tail`.
    #[must_use]
    pub fn with_variadic(mut self, tail: ParamType) -> Self {
        self.variadic = Some(tail);
        self
    }

    /// Declared positional parameters.
    #[must_use]
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Declared variadic tail, if any.
    #[must_use]
    pub fn variadic(&self) -> Option<ParamType> {
        self.variadic
    }

    /// Checks `params` against this schema, reporting the first violation.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::SchemaMismatch`] for a wrongly typed, missing
    /// or surplus parameter.
    pub fn validate(&self, method: &str, params: &[Value]) -> Result<(), ProtocolError> {
        let mismatch = |index: usize, expected: Option<ParamType>, found: &'static str| {
            ProtocolError::SchemaMismatch {
                method: method.to_string(),
                index,
                expected,
                found,
            }
        };

        for (index, expected) in self.params.iter().copied().enumerate() {
            match params.get(index) {
                None => return Err(mismatch(index, Some(expected), "missing")),
                Some(value) if !expected.matches(value) => {
                    return Err(mismatch(index, Some(expected), json_type_name(value)));
                }
                Some(_) => {}
            }
        }

        let surplus = params.iter().enumerate().skip(self.params.len());
        for (index, value) in surplus {
            match self.variadic {
                Some(tail) if tail.matches(value) => {}
                Some(tail) => return Err(mismatch(index, Some(tail), json_type_name(value))),
                None => return Err(mismatch(index, None, json_type_name(value))),
            }
        }
        Ok(())
    }
}

/// Method name → schema lookup.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    methods: IndexMap<String, MethodSchema>,
}

impl SchemaRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry for every inbound and outbound console method.
    #[must_use]
    pub fn console() -> Self {
        use ParamType::{Any, Array, Object, String, StringArray};

        let mut registry = Self::new();
        // Browser -> server
        registry.register(method::CONSOLE_READY, MethodSchema::new([]));
        registry.register(method::KEEP_ALIVE, MethodSchema::new([]));
        registry.register(method::ADD_COMPONENT, MethodSchema::new([String, Object]));
        registry.register(
            method::RENDER_COMPONENT,
            MethodSchema::new([String, StringArray]),
        );
        registry.register(
            method::UPDATE_COMPONENT,
            MethodSchema::new([String, String]).with_variadic(Any),
        );
        registry.register(method::DELETE_COMPONENT, MethodSchema::new([String]));
        registry.register(method::SET_LOCALE, MethodSchema::new([String]));
        // Server -> browser
        registry.register(method::RESOURCES_TO_LOAD, MethodSchema::new([Array]));
        registry.register(method::RESOURCE_LOAD_FAILED, MethodSchema::new([String]));
        registry.register(
            method::ADD_COMPONENT_TYPE,
            MethodSchema::new([String, String, StringArray]),
        );
        registry.register(
            method::UPDATE_COMPONENT_TYPE,
            MethodSchema::new([String, StringArray]),
        );
        registry.register(
            method::COMPONENT_ADDED,
            MethodSchema::new([String, StringArray]),
        );
        registry.register(
            method::COMPONENT_RENDERED,
            MethodSchema::new([String, String, String]),
        );
        registry.register(
            method::NOTIFY_VIEW,
            MethodSchema::new([String, String]).with_variadic(Any),
        );
        registry.register(method::COMPONENT_DELETED, MethodSchema::new([String]));
        registry.register(
            method::DISPLAY_NOTIFICATION,
            MethodSchema::new([String, Object]),
        );
        registry.register(method::OPEN_MODAL_DIALOG, MethodSchema::new([String, Object]));
        registry
    }

    /// Registers or replaces a method schema.
    pub fn register(&mut self, method: impl Into<String>, schema: MethodSchema) -> &mut Self {
        self.methods.insert(method.into(), schema);
        self
    }

    /// Schema for `method`, if registered.
    #[must_use]
    pub fn get(&self, method: &str) -> Option<&MethodSchema> {
        self.methods.get(method)
    }

    /// Returns true if `method` is registered.
    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    /// Registered method names in registration order.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Validates `params` for `method`. Unregistered methods pass; dispatch
    /// rejects them later with [`ProtocolError::UnknownMethod`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::SchemaMismatch`] on the first violation.
    pub fn validate(&self, method: &str, params: &[Value]) -> Result<(), ProtocolError> {
        match self.get(method) {
            Some(schema) => schema.validate(method, params),
            None => Ok(()),
        }
    }

    /// Parses a frame and validates its parameters.
    ///
    /// Unknown methods decode successfully.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedEnvelope`] or
    /// [`ProtocolError::SchemaMismatch`].
    pub fn decode(&self, text: &str) -> Result<Envelope, ProtocolError> {
        let envelope = Envelope::parse(text)?;
        if !self.contains(&envelope.method) {
            tracing::trace!(method = %envelope.method, "decoded envelope for unregistered method");
        }
        self.validate(&envelope.method, &envelope.params)?;
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mismatch_at(err: ProtocolError) -> (usize, Option<ParamType>, &'static str) {
        match err {
            ProtocolError::SchemaMismatch {
                index,
                expected,
                found,
                ..
            } => (index, expected, found),
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn integer_does_not_coerce() {
        assert!(ParamType::Integer.matches(&json!(3)));
        assert!(!ParamType::Integer.matches(&json!(1.5)));
        assert!(!ParamType::Integer.matches(&json!("1")));
        assert!(ParamType::Number.matches(&json!(1.5)));
    }

    #[test]
    fn string_array_requires_all_strings() {
        assert!(ParamType::StringArray.matches(&json!([])));
        assert!(ParamType::StringArray.matches(&json!(["a", "b"])));
        assert!(!ParamType::StringArray.matches(&json!(["a", 1])));
        assert!(!ParamType::StringArray.matches(&json!("a")));
    }

    #[test]
    fn first_violation_is_reported() {
        let schema = MethodSchema::new([ParamType::String, ParamType::Integer, ParamType::Boolean]);
        let err = schema
            .validate("m", &[json!("ok"), json!("2"), json!(1)])
            .unwrap_err();
        assert_eq!(mismatch_at(err), (1, Some(ParamType::Integer), "string"));
    }

    #[test]
    fn missing_parameter_is_a_mismatch() {
        let schema = MethodSchema::new([ParamType::String, ParamType::Object]);
        let err = schema.validate("m", &[json!("x")]).unwrap_err();
        assert_eq!(mismatch_at(err), (1, Some(ParamType::Object), "missing"));
    }

    #[test]
    fn surplus_without_variadic_is_a_mismatch() {
        let schema = MethodSchema::new([ParamType::String]);
        let err = schema.validate("m", &[json!("x"), json!(null)]).unwrap_err();
        assert_eq!(mismatch_at(err), (1, None, "null"));
    }

    #[test]
    fn variadic_tail_is_checked() {
        let schema = MethodSchema::new([ParamType::String]).with_variadic(ParamType::Integer);
        assert!(schema.validate("m", &[json!("x"), json!(1), json!(2)]).is_ok());
        let err = schema
            .validate("m", &[json!("x"), json!(1), json!(2.5)])
            .unwrap_err();
        assert_eq!(mismatch_at(err), (2, Some(ParamType::Integer), "number"));
    }

    #[test]
    fn console_registry_covers_both_directions() {
        let registry = SchemaRegistry::console();
        for method in method::INBOUND.iter().chain(method::OUTBOUND.iter()) {
            assert!(registry.contains(method), "{method} is not registered");
        }
        assert_eq!(
            registry.methods().count(),
            method::INBOUND.len() + method::OUTBOUND.len()
        );
    }

    #[test]
    fn unknown_methods_validate() {
        let registry = SchemaRegistry::console();
        assert!(registry.validate("somethingElse", &[json!(1)]).is_ok());
    }

    #[test]
    fn error_message_names_surplus() {
        let err = MethodSchema::new([])
            .validate("keepAlive", &[json!(1)])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema mismatch in 'keepAlive' at parameter 0: expected no parameter, found integer"
        );
    }
}
