//! Best-effort decoding of engine objects known only by their formatted text.
//!
//! Some engine results (configurations, most notably) do not convert into
//! collections and only offer a representation such as
//! `Configuration(elements={'A': True, 'B': False})`. [`TextualRecord`] turns
//! that text into a map by rewriting it into JSON:
//!
//! 1. strip the tag prefix and the closing delimiter,
//! 2. replace `True`/`False`/`None` with `true`/`false`/`null`,
//! 3. replace single quotes with double quotes,
//! 4. parse the result as a JSON object.
//!
//! This is fragile. A name containing a quote, a parenthesis that shifts the
//! delimiters, or the words `True`/`False`/`None` inside string data will be
//! mangled or rejected. Prefer a structured conversion whenever the engine
//! offers one; this path only exists behind [`RecordDecoder`] so it can be
//! replaced without touching the dispatcher.

use serde_json::Value;

/// Decodes formatted engine output into a structured value
pub trait RecordDecoder: Send + Sync {
    /// Whether `repr` looks like a record this decoder handles
    fn recognizes(&self, repr: &str) -> bool;

    /// Parse a recognized record
    fn parse(&self, repr: &str) -> Result<Value, String>;
}

/// A `Tag(...)` record whose body is a literal map
#[derive(Debug, Clone, Copy)]
pub struct TextualRecord {
    prefix: &'static str,
    suffix: &'static str,
}

/// The record form of a flamapy configuration
pub const CONFIGURATION_RECORD: TextualRecord = TextualRecord::new("Configuration(elements=", ")");

impl TextualRecord {
    pub const fn new(prefix: &'static str, suffix: &'static str) -> Self {
        Self { prefix, suffix }
    }

    fn normalize(&self, repr: &str) -> Option<String> {
        let body = repr
            .trim()
            .strip_prefix(self.prefix)?
            .strip_suffix(self.suffix)?;

        Some(
            body.replace("True", "true")
                .replace("False", "false")
                .replace("None", "null")
                .replace('\'', "\""),
        )
    }
}

impl RecordDecoder for TextualRecord {
    fn recognizes(&self, repr: &str) -> bool {
        repr.trim_start().starts_with(self.prefix)
    }

    fn parse(&self, repr: &str) -> Result<Value, String> {
        let json = self
            .normalize(repr)
            .ok_or_else(|| format!("missing `{}` delimiter", self.suffix))?;

        match serde_json::from_str::<Value>(&json) {
            Ok(Value::Object(map)) => Ok(Value::Object(map)),
            Ok(other) => Err(format!("record body is not a map: {}", other)),
            Err(e) => Err(e.to_string()),
        }
    }
}
