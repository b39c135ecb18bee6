use indexmap::IndexMap;
use std::fmt;

/// An object still owned by the engine.
///
/// Dropping the handle releases the engine-side reference, so a handle that
/// is converted and then dropped never leaks, even if a later decode step
/// fails.
pub trait ForeignHandle: Send + fmt::Debug {
    /// Converts the object into host-shaped collections, or `None` when it
    /// has no collection form.
    fn to_native(&self) -> Option<EngineValue>;

    /// The object's own formatted representation.
    fn repr(&self) -> String;
}

/// A value crossing the engine boundary, in either direction.
#[derive(Debug)]
pub enum EngineValue {
    Null,
    Bool(bool),
    /// A boolean carried across the boundary as the scalar 0 or 1
    Bit(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<EngineValue>),
    Map(IndexMap<String, EngineValue>),
    /// An engine object known only by its formatted representation
    Opaque(String),
    Handle(Box<dyn ForeignHandle>),
}

impl EngineValue {
    /// The 0/1 scalar of a [`EngineValue::Bit`]
    pub fn as_bit(&self) -> Option<i64> {
        match self {
            EngineValue::Bit(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn is_handle(&self) -> bool {
        matches!(self, EngineValue::Handle(_))
    }

    /// Short type name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            EngineValue::Null => "null",
            EngineValue::Bool(_) => "bool",
            EngineValue::Bit(_) => "bit",
            EngineValue::Int(_) => "int",
            EngineValue::Float(_) => "float",
            EngineValue::Str(_) => "str",
            EngineValue::List(_) => "list",
            EngineValue::Map(_) => "map",
            EngineValue::Opaque(_) => "opaque",
            EngineValue::Handle(_) => "handle",
        }
    }
}

// Handles compare unequal: identity lives on the engine side.
impl PartialEq for EngineValue {
    fn eq(&self, other: &Self) -> bool {
        use EngineValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Bit(a), Bit(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Opaque(a), Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for EngineValue {
    fn from(b: bool) -> Self {
        EngineValue::Bool(b)
    }
}

impl From<i64> for EngineValue {
    fn from(i: i64) -> Self {
        EngineValue::Int(i)
    }
}

impl From<f64> for EngineValue {
    fn from(f: f64) -> Self {
        EngineValue::Float(f)
    }
}

impl From<&str> for EngineValue {
    fn from(s: &str) -> Self {
        EngineValue::Str(s.to_string())
    }
}

impl From<String> for EngineValue {
    fn from(s: String) -> Self {
        EngineValue::Str(s)
    }
}

impl<T: Into<EngineValue>> From<Vec<T>> for EngineValue {
    fn from(items: Vec<T>) -> Self {
        EngineValue::List(items.into_iter().map(Into::into).collect())
    }
}
