//! Conversion between host values and engine values.
//!
//! Host values are `serde_json::Value`s. On the way in every boolean becomes
//! an [`EngineValue::Bit`], which crosses the boundary as the scalar 0 or 1;
//! the engine's marshalling confuses `true`/`false` with `1`/`0` once they
//! are mixed with integers. On the way out bits and engine booleans both
//! decode to JSON booleans, collections are converted and their foreign
//! handles released, and objects known only by their text are handed to the
//! [`RecordDecoder`].

pub mod record;

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use std::hash::Hash;

use flamapy_embed::EngineValue;

pub use record::{RecordDecoder, TextualRecord, CONFIGURATION_RECORD};

pub struct Codec {
    records: Box<dyn RecordDecoder>,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(Box::new(CONFIGURATION_RECORD))
    }
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec").finish_non_exhaustive()
    }
}

impl Codec {
    pub fn new(records: Box<dyn RecordDecoder>) -> Self {
        Self { records }
    }

    /// Rewrite a host value for the engine, recursively
    pub fn encode(value: &Value) -> EngineValue {
        match value {
            Value::Null => EngineValue::Null,
            Value::Bool(b) => EngineValue::Bit(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    EngineValue::Int(i)
                } else {
                    EngineValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => EngineValue::Str(s.clone()),
            Value::Array(items) => EngineValue::List(items.iter().map(Self::encode).collect()),
            Value::Object(fields) => EngineValue::Map(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::encode(v)))
                    .collect(),
            ),
        }
    }

    pub fn encode_args(args: &[Value]) -> Vec<EngineValue> {
        args.iter().map(Self::encode).collect()
    }

    pub fn encode_kwargs<K>(kwargs: &IndexMap<K, Value>) -> IndexMap<K, EngineValue>
    where
        K: Clone + Eq + Hash,
    {
        kwargs
            .iter()
            .map(|(k, v)| (k.clone(), Self::encode(v)))
            .collect()
    }

    /// Turn an engine value into its canonical host form, releasing any
    /// foreign handle it holds.
    pub fn decode(&self, value: EngineValue) -> Value {
        match value {
            EngineValue::Null => Value::Null,
            EngineValue::Bool(b) | EngineValue::Bit(b) => Value::Bool(b),
            EngineValue::Int(i) => Value::Number(i.into()),
            EngineValue::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
            EngineValue::Str(s) => Value::String(s),
            EngineValue::List(items) => {
                Value::Array(items.into_iter().map(|item| self.decode(item)).collect())
            }
            EngineValue::Map(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, self.decode(v)))
                    .collect::<Map<String, Value>>(),
            ),
            EngineValue::Opaque(repr) => self.decode_text(repr),
            EngineValue::Handle(handle) => {
                let copied = handle.to_native().ok_or_else(|| handle.repr());
                // The engine reference is released before the copy is decoded
                drop(handle);

                match copied {
                    Ok(native) => self.decode(native),
                    Err(repr) => self.decode_text(repr),
                }
            }
        }
    }

    fn decode_text(&self, repr: String) -> Value {
        if !self.records.recognizes(&repr) {
            return Value::String(repr);
        }

        match self.records.parse(&repr) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Could not decode record {:?}: {}", repr, e);
                Value::String(repr)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flamapy_embed::ForeignHandle;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct CountedHandle {
        native: Option<Vec<&'static str>>,
        repr: &'static str,
        released: Arc<AtomicUsize>,
    }

    impl ForeignHandle for CountedHandle {
        fn to_native(&self) -> Option<EngineValue> {
            self.native.clone().map(EngineValue::from)
        }

        fn repr(&self) -> String {
            self.repr.to_string()
        }
    }

    impl Drop for CountedHandle {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_boolean_round_trip() {
        let codec = Codec::default();
        assert_eq!(codec.decode(Codec::encode(&json!(true))), json!(true));
        assert_eq!(codec.decode(Codec::encode(&json!(false))), json!(false));
    }

    #[test]
    fn test_booleans_cross_as_bits() {
        let encoded = Codec::encode(&json!({"a": true, "b": [false, 1]}));

        let EngineValue::Map(fields) = &encoded else {
            panic!("expected a map");
        };
        assert_eq!(fields["a"].as_bit(), Some(1));
        let EngineValue::List(items) = &fields["b"] else {
            panic!("expected a list");
        };
        assert_eq!(items[0].as_bit(), Some(0));
        assert_eq!(items[1], EngineValue::Int(1));
    }

    #[test]
    fn test_encode_passes_other_values_through() {
        assert_eq!(Codec::encode(&json!("Security")), EngineValue::Str("Security".into()));
        assert_eq!(Codec::encode(&json!(2.5)), EngineValue::Float(2.5));
        assert_eq!(Codec::encode(&json!(null)), EngineValue::Null);
    }

    #[test]
    fn test_encode_kwargs() {
        let mut kwargs = IndexMap::new();
        kwargs.insert("full_configuration".to_string(), json!(true));
        kwargs.insert("configuration_path".to_string(), json!("config.csvconf"));

        let encoded = Codec::encode_kwargs(&kwargs);
        assert_eq!(encoded["full_configuration"], EngineValue::Bit(true));
        assert_eq!(
            encoded.keys().collect::<Vec<_>>(),
            vec!["full_configuration", "configuration_path"]
        );
    }

    #[test]
    fn test_decode_scalars() {
        let codec = Codec::default();
        assert_eq!(codec.decode(EngineValue::Int(80)), json!(80));
        assert_eq!(codec.decode(EngineValue::Float(2.6)), json!(2.6));
        assert_eq!(codec.decode(EngineValue::Float(f64::NAN)), json!(null));
        assert!(codec.decode(EngineValue::Float(1180591620717411303424.0)).is_number());
        assert_eq!(codec.decode(EngineValue::Bool(true)), json!(true));
        assert_eq!(codec.decode(EngineValue::Str("x".into())), json!("x"));
    }

    #[test]
    fn test_decode_releases_converted_handle() {
        let released = Arc::new(AtomicUsize::new(0));
        let handle = CountedHandle {
            native: Some(vec!["Security", "Orders"]),
            repr: "['Security', 'Orders']",
            released: released.clone(),
        };

        let value = Codec::default().decode(EngineValue::Handle(Box::new(handle)));
        assert_eq!(value, json!(["Security", "Orders"]));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_decode_handle_without_collection_form() {
        let released = Arc::new(AtomicUsize::new(0));
        let handle = CountedHandle {
            native: None,
            repr: "Configuration(elements={'A': True, 'B': False})",
            released: released.clone(),
        };

        let value = Codec::default().decode(EngineValue::Handle(Box::new(handle)));
        assert_eq!(value, json!({"A": true, "B": false}));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_decode_records_inside_lists() {
        let value = EngineValue::List(vec![
            EngineValue::Opaque("Configuration(elements={'A': True})".into()),
            EngineValue::Opaque("Configuration(elements={'A': False})".into()),
            EngineValue::Opaque("SomethingElse".into()),
        ]);

        assert_eq!(
            Codec::default().decode(value),
            json!([{"A": true}, {"A": false}, "SomethingElse"])
        );
    }

    #[test]
    fn test_malformed_record_falls_back_to_text() {
        let value = EngineValue::Opaque("Configuration(elements={'A': ".into());
        assert_eq!(
            Codec::default().decode(value),
            json!("Configuration(elements={'A': ")
        );
    }

    #[test]
    fn test_custom_record_decoder() {
        struct Upper;

        impl RecordDecoder for Upper {
            fn recognizes(&self, _repr: &str) -> bool {
                true
            }

            fn parse(&self, repr: &str) -> Result<Value, String> {
                Ok(Value::String(repr.to_uppercase()))
            }
        }

        let codec = Codec::new(Box::new(Upper));
        assert_eq!(codec.decode(EngineValue::Opaque("abc".into())), json!("ABC"));
    }
}
