//! Data tree values used during rendering
//!
//! Caller data arrives as arbitrary JSON. It is converted once into a tagged
//! variant so scope resolution and loop expansion can match exhaustively.

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Field name -> value bindings at one level of the tree
pub type Scope = BTreeMap<String, Value>;

/// A leaf value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Scalar {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Text substituted into the document for this scalar
    pub fn to_string_value(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            Scalar::Number(n) => {
                // Format integers without decimal places
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Scalar::Text(s) => s.clone(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Null => false,
            Scalar::Bool(b) => *b,
            Scalar::Number(n) => *n != 0.0,
            Scalar::Text(s) => !s.is_empty(),
        }
    }
}

/// A node of the data tree
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Object(Scope),
    Collection(Vec<Value>),
}

impl Value {
    pub fn null() -> Self {
        Value::Scalar(Scalar::Null)
    }

    /// Convert a JSON value into the tagged tree
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Scalar(Scalar::Null),
            JsonValue::Bool(b) => Value::Scalar(Scalar::Bool(*b)),
            JsonValue::Number(n) => Value::Scalar(Scalar::Number(n.as_f64().unwrap_or_default())),
            JsonValue::String(s) => Value::Scalar(Scalar::Text(s.clone())),
            JsonValue::Array(items) => Value::Collection(items.iter().map(Value::from_json).collect()),
            JsonValue::Object(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))).collect(),
            ),
        }
    }

    /// Convert a JSON document into a root scope.
    ///
    /// A non-object root is bound under the name `data`.
    pub fn root_scope(json: &JsonValue) -> Scope {
        match Value::from_json(json) {
            Value::Object(scope) => scope,
            Value::Scalar(Scalar::Null) => Scope::new(),
            other => {
                tracing::debug!("non-object data root bound as `data`");
                let mut scope = Scope::new();
                scope.insert("data".to_string(), other);
                scope
            }
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Scalar(Scalar::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Scope> {
        match self {
            Value::Object(scope) => Some(scope),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&[Value]> {
        match self {
            Value::Collection(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Scalar(s) => s.is_truthy(),
            Value::Object(scope) => !scope.is_empty(),
            Value::Collection(items) => !items.is_empty(),
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(Scalar::Text(s))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(Scalar::Text(s.to_string()))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Scalar(Scalar::Number(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Scalar(Scalar::Number(n as f64))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Scalar(Scalar::Number(n as f64))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Scalar(Scalar::Number(n as f64))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(Scalar::Bool(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_to_string() {
        assert_eq!(Scalar::Text("hello".into()).to_string_value(), "hello");
        assert_eq!(Scalar::Number(42.0).to_string_value(), "42");
        assert_eq!(Scalar::Number(3.14).to_string_value(), "3.14");
        assert_eq!(Scalar::Bool(true).to_string_value(), "true");
        assert_eq!(Scalar::Null.to_string_value(), "");
    }

    #[test]
    fn test_from_json_nested() {
        let v = Value::from_json(&json!({
            "name": "Line 3",
            "stations": [{"name": "WS-01"}, {"name": "WS-02"}],
            "active": true
        }));
        let scope = v.as_object().unwrap();
        assert_eq!(scope.get("name").unwrap().as_text(), Some("Line 3"));
        assert_eq!(scope.get("stations").unwrap().as_collection().unwrap().len(), 2);
        assert!(scope.get("active").unwrap().is_truthy());
    }

    #[test]
    fn test_root_scope_variants() {
        assert!(Value::root_scope(&json!(null)).is_empty());
        let scope = Value::root_scope(&json!([1, 2]));
        assert!(scope.contains_key("data"));
        let scope = Value::root_scope(&json!({"a": 1}));
        assert!(scope.contains_key("a"));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::null().is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from(0_i64).is_truthy());
        assert!(!Value::Collection(vec![]).is_truthy());
        assert!(Value::from("x").is_truthy());
    }
}
