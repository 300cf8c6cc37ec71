//! CEL expression compilation and evaluation
//!
//! Wraps the CEL interpreter behind a fixed, narrow evaluation context:
//! every expression sees exactly two top-level entries, `claims` (the raw
//! identity-provider claim set) and `variables` (previously bound derived
//! values). Expressions are compiled once at startup and are safe for
//! concurrent read-only use.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use cel_interpreter::extractors::This;
use cel_interpreter::objects::Key;
use cel_interpreter::{Context, ExecutionError, Program, Value};
use serde_json::Map as JsonMap;

use crate::error::{Error, Result};

/// A compiled CEL expression together with its source text
pub struct Expression {
    /// Original expression text, kept for error reporting
    source: String,
    /// Compiled program
    program: Program,
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("source", &self.source)
            .finish()
    }
}

impl Expression {
    /// Compile an expression, surfacing the offending text on parse failure
    pub fn compile(source: &str) -> Result<Self> {
        let program = Program::compile(source).map_err(|e| {
            Error::Config(format!("failed to compile expression {source:?}: {e}"))
        })?;

        Ok(Self {
            source: source.to_string(),
            program,
        })
    }

    /// The source text this expression was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against the `claims`/`variables` context
    fn execute(
        &self,
        claims: &JsonMap<String, serde_json::Value>,
        variables: &JsonMap<String, serde_json::Value>,
    ) -> Result<Value> {
        let mut context = Context::default();
        context.add_function("split", split);
        context.add_function("lowerAscii", lower_ascii);
        context.add_function("upperAscii", upper_ascii);
        context.add_variable_from_value("claims", json_object_to_cel(claims));
        context.add_variable_from_value("variables", json_object_to_cel(variables));

        self.program.execute(&context).map_err(|e| Error::Evaluation {
            expression: self.source.clone(),
            cause: e.to_string(),
        })
    }

    /// Evaluate to an arbitrary JSON-like value
    ///
    /// Used for variable binding, where the result is stored back into the
    /// `variables` map for subsequent expressions to reference.
    pub fn eval(
        &self,
        claims: &JsonMap<String, serde_json::Value>,
        variables: &JsonMap<String, serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let value = self.execute(claims, variables)?;
        cel_to_json(&value).map_err(|cause| Error::Evaluation {
            expression: self.source.clone(),
            cause,
        })
    }

    /// Evaluate to a string; any other result type is an error
    pub fn eval_string(
        &self,
        claims: &JsonMap<String, serde_json::Value>,
        variables: &JsonMap<String, serde_json::Value>,
    ) -> Result<String> {
        match self.execute(claims, variables)? {
            Value::String(s) => Ok((*s).clone()),
            other => Err(self.type_mismatch("string", &other)),
        }
    }

    /// Evaluate to a boolean; any other result type is an error
    pub fn eval_bool(
        &self,
        claims: &JsonMap<String, serde_json::Value>,
        variables: &JsonMap<String, serde_json::Value>,
    ) -> Result<bool> {
        match self.execute(claims, variables)? {
            Value::Bool(b) => Ok(b),
            other => Err(self.type_mismatch("bool", &other)),
        }
    }

    /// Evaluate to a list of strings; any other result type is an error
    pub fn eval_string_list(
        &self,
        claims: &JsonMap<String, serde_json::Value>,
        variables: &JsonMap<String, serde_json::Value>,
    ) -> Result<Vec<String>> {
        match self.execute(claims, variables)? {
            Value::List(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok((*s).as_str().to_string()),
                    other => Err(self.type_mismatch("list of strings", other)),
                })
                .collect(),
            other => Err(self.type_mismatch("list of strings", &other)),
        }
    }

    /// Build a type-mismatch evaluation error
    fn type_mismatch(&self, expected: &str, got: &Value) -> Error {
        Error::Evaluation {
            expression: self.source.clone(),
            cause: format!("expected {expected} result, got {}", value_kind(got)),
        }
    }
}

/// `"a@b".split('@')` -> `["a", "b"]`
///
/// String helper from the CEL strings extension, registered on every
/// evaluation context alongside the builtin set.
fn split(
    This(value): This<Arc<String>>,
    separator: Arc<String>,
) -> std::result::Result<Value, ExecutionError> {
    let parts = value
        .split(separator.as_str())
        .map(|part| Value::String(Arc::new(part.to_string())))
        .collect();
    Ok(Value::List(Arc::new(parts)))
}

/// `"Ab".lowerAscii()` -> `"ab"`
fn lower_ascii(This(value): This<Arc<String>>) -> std::result::Result<Value, ExecutionError> {
    Ok(Value::String(Arc::new(value.to_ascii_lowercase())))
}

/// `"Ab".upperAscii()` -> `"AB"`
fn upper_ascii(This(value): This<Arc<String>>) -> std::result::Result<Value, ExecutionError> {
    Ok(Value::String(Arc::new(value.to_ascii_uppercase())))
}

/// Human-readable kind of a CEL value, for error messages
fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Bool(_) => "bool",
        Value::Int(_) | Value::UInt(_) => "int",
        Value::Float(_) => "double",
        Value::List(_) => "list",
        Value::Map(_) => "map",
        Value::Bytes(_) => "bytes",
        Value::Null => "null",
        _ => "value",
    }
}

/// Convert a JSON object into a CEL map value
fn json_object_to_cel(object: &JsonMap<String, serde_json::Value>) -> Value {
    let map: HashMap<String, Value> = object
        .iter()
        .map(|(key, value)| (key.clone(), json_to_cel(value)))
        .collect();
    Value::from(map)
}

/// Convert a JSON value into a CEL value
fn json_to_cel(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt(u)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::String(Arc::new(s.clone())),
        serde_json::Value::Array(items) => {
            Value::List(Arc::new(items.iter().map(json_to_cel).collect()))
        }
        serde_json::Value::Object(fields) => json_object_to_cel(fields),
    }
}

/// Convert a CEL result back into a JSON value
///
/// Only JSON-representable results are supported; exotic result types
/// (functions, durations, timestamps) are evaluation errors because they
/// cannot be stored in the `variables` map.
fn cel_to_json(value: &Value) -> std::result::Result<serde_json::Value, String> {
    match value {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Int(i) => Ok(serde_json::Value::from(*i)),
        Value::UInt(u) => Ok(serde_json::Value::from(*u)),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or_else(|| "non-finite number result".to_string()),
        Value::String(s) => Ok(serde_json::Value::String((**s).clone())),
        Value::List(items) => items
            .iter()
            .map(cel_to_json)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(serde_json::Value::Array),
        Value::Map(map) => {
            let mut object = JsonMap::new();
            for (key, entry) in map.map.iter() {
                match key {
                    Key::String(name) => {
                        object.insert((**name).clone(), cel_to_json(entry)?);
                    }
                    _ => return Err("unsupported non-string map key in result".to_string()),
                }
            }
            Ok(serde_json::Value::Object(object))
        }
        _ => Err("unsupported result type".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: serde_json::Value) -> JsonMap<String, serde_json::Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_compile_failure_names_expression() {
        let err = Expression::compile("claims.").unwrap_err();
        assert!(err.to_string().contains("failed to compile expression"));
        assert!(err.to_string().contains("claims."));
    }

    #[test]
    fn test_eval_string_from_claims() {
        let expr = Expression::compile("claims.sub").unwrap();
        let result = expr
            .eval_string(&claims(json!({"sub": "user123"})), &JsonMap::new())
            .unwrap();
        assert_eq!(result, "user123");
    }

    #[test]
    fn test_eval_string_type_mismatch() {
        let expr = Expression::compile("claims.count").unwrap();
        let err = expr
            .eval_string(&claims(json!({"count": 42})), &JsonMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("expected string result"));
    }

    #[test]
    fn test_eval_string_explicit_conversion() {
        let expr = Expression::compile("string(claims.count)").unwrap();
        let result = expr
            .eval_string(&claims(json!({"count": 42})), &JsonMap::new())
            .unwrap();
        assert_eq!(result, "42");
    }

    #[test]
    fn test_eval_bool() {
        let expr = Expression::compile("claims.email.endsWith('@example.com')").unwrap();
        let result = expr
            .eval_bool(
                &claims(json!({"email": "jane@example.com"})),
                &JsonMap::new(),
            )
            .unwrap();
        assert!(result);
    }

    #[test]
    fn test_eval_bool_type_mismatch() {
        let expr = Expression::compile("claims.sub").unwrap();
        let err = expr
            .eval_bool(&claims(json!({"sub": "user123"})), &JsonMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("expected bool result"));
    }

    #[test]
    fn test_eval_string_list() {
        let expr = Expression::compile("claims.groups").unwrap();
        let result = expr
            .eval_string_list(
                &claims(json!({"groups": ["dev", "ops"]})),
                &JsonMap::new(),
            )
            .unwrap();
        assert_eq!(result, vec!["dev", "ops"]);
    }

    #[test]
    fn test_eval_string_list_rejects_mixed_elements() {
        let expr = Expression::compile("claims.groups").unwrap();
        let err = expr
            .eval_string_list(&claims(json!({"groups": ["dev", 7]})), &JsonMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("expected list of strings"));
    }

    #[test]
    fn test_eval_split_and_index() {
        let expr = Expression::compile("claims.email.split('@')[1]").unwrap();
        let result = expr
            .eval_string(
                &claims(json!({"email": "johndoe@trusted.com"})),
                &JsonMap::new(),
            )
            .unwrap();
        assert_eq!(result, "trusted.com");
    }

    #[test]
    fn test_eval_ternary() {
        let expr =
            Expression::compile("claims.admin ? ['admin'] : ['user']").unwrap();
        let result = expr
            .eval_string_list(&claims(json!({"admin": true})), &JsonMap::new())
            .unwrap();
        assert_eq!(result, vec!["admin"]);
    }

    #[test]
    fn test_eval_case_conversion() {
        let expr = Expression::compile("claims.email.lowerAscii()").unwrap();
        let result = expr
            .eval_string(&claims(json!({"email": "Jane@Example.COM"})), &JsonMap::new())
            .unwrap();
        assert_eq!(result, "jane@example.com");
    }

    #[test]
    fn test_eval_missing_claim_is_error() {
        let expr = Expression::compile("claims.missing").unwrap();
        let err = expr
            .eval_string(&claims(json!({"sub": "user123"})), &JsonMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("failed to evaluate expression"));
    }

    #[test]
    fn test_eval_sees_bound_variables() {
        let expr = Expression::compile("variables.domain == 'trusted.com'").unwrap();
        let mut variables = JsonMap::new();
        variables.insert("domain".to_string(), json!("trusted.com"));
        let result = expr
            .eval_bool(&claims(json!({})), &variables)
            .unwrap();
        assert!(result);
    }

    #[test]
    fn test_eval_has_check() {
        let expr = Expression::compile("has(claims.email)").unwrap();
        assert!(expr
            .eval_bool(&claims(json!({"email": "x@y.z"})), &JsonMap::new())
            .unwrap());
        assert!(!expr
            .eval_bool(&claims(json!({"sub": "abc"})), &JsonMap::new())
            .unwrap());
    }

    #[test]
    fn test_eval_returns_json_for_variables() {
        let expr = Expression::compile("claims.email.split('@')[1]").unwrap();
        let result = expr
            .eval(&claims(json!({"email": "a@b.io"})), &JsonMap::new())
            .unwrap();
        assert_eq!(result, json!("b.io"));
    }
}
