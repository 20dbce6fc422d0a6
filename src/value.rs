//! Value Model
//!
//! A tagged union of scalar/list/map/callable/opaque-host values (§3).

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::errors::ShellResult;
use crate::session::Session;

/// A callable host value: `invoke(session, args) -> Value | Error` (§6).
///
/// `Send + Sync` because pipeline stages (§4.4) run callables concurrently
/// on dedicated OS threads; a `Session` is shared across those threads as
/// `Arc<Session>`, so every `Value` it can hold must cross thread boundaries.
pub trait Callable: fmt::Debug + Send + Sync {
    fn invoke(&self, session: &Session, args: Vec<Value>) -> ShellResult<Value>;
}

/// An opaque host-object handle; method dispatch is delegated to the host's
/// `invoke` (§4.3). The evaluator never reflects into it itself.
pub trait HostObject: fmt::Debug {
    fn type_name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Callable(Arc<dyn Callable>),
    Opaque(Arc<dyn HostObject + Send + Sync>),
    /// The inherited `parms` sentinel (§3, §9 "parameters as a sentinel
    /// list"), produced only by a closure frame's `args` lookup. Statement
    /// evaluation splices its elements into the surrounding argument list
    /// instead of nesting it as a single value.
    Splice(Arc<Vec<Value>>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    /// Stringify for display/joining purposes (used by `parms`, xtrace, etc).
    pub fn display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::List(items) => items
                .iter()
                .map(Value::display_string)
                .collect::<Vec<_>>()
                .join(" "),
            Value::Map(m) => {
                let parts: Vec<String> = m
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v.display_string()))
                    .collect();
                parts.join(" ")
            }
            Value::Callable(_) => "<closure>".to_string(),
            Value::Opaque(obj) => format!("<{}>", obj.type_name()),
            Value::Splice(items) => items
                .iter()
                .map(Value::display_string)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// The typed-token-from-text ladder (§4.1, §9): null -> bool -> float ->
    /// int -> text. Order matters: float-parse is attempted before int-parse
    /// so that "3.5" becomes Float while "3" narrows to Int.
    pub fn from_text_ladder(text: &str) -> Value {
        match text {
            "null" => return Value::Null,
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }
        if let Ok(i) = text.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = text.parse::<f64>() {
            return Value::Float(f);
        }
        Value::Text(text.to_string())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Splice(a), Value::Splice(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_orders_float_before_int() {
        assert_eq!(Value::from_text_ladder("3"), Value::Int(3));
        assert_eq!(Value::from_text_ladder("3.5"), Value::Float(3.5));
    }

    #[test]
    fn ladder_recognises_null_and_bools() {
        assert_eq!(Value::from_text_ladder("null"), Value::Null);
        assert_eq!(Value::from_text_ladder("true"), Value::Bool(true));
        assert_eq!(Value::from_text_ladder("false"), Value::Bool(false));
    }

    #[test]
    fn ladder_falls_back_to_text() {
        assert_eq!(Value::from_text_ladder("hello"), Value::Text("hello".into()));
    }

    #[test]
    fn round_trip_scalars_through_display_and_ladder() {
        for v in [Value::Bool(true), Value::Bool(false), Value::Null, Value::Int(42), Value::Float(3.5)] {
            let text = v.display_string();
            assert_eq!(Value::from_text_ladder(&text), v);
        }
    }

    #[test]
    fn display_joins_list_with_single_spaces() {
        let v = Value::List(vec![Value::text("a"), Value::Int(1), Value::text("b")]);
        assert_eq!(v.display_string(), "a 1 b");
    }
}
