use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// A typed field value.
///
/// The variant set is closed so that every target can encode a record without
/// reflection. Serialises untagged, i.e. to the plain JSON shape of the
/// contained value. Integers above `i64::MAX` deserialise to `UInt`. JSON has
/// no NaN or infinity, so non-finite floats are written as the strings
/// `"NaN"`, `"inf"` and `"-inf"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    #[serde(serialize_with = "serialize_float")]
    Float(f64),
    String(String),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the contained string, if this is a `String` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

fn serialize_float<S: Serializer>(v: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if v.is_finite() {
        serializer.serialize_f64(*v)
    } else {
        serializer.collect_str(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
            Value::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        i64::try_from(u).map_or(Value::UInt(u), Value::Int)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

/// A single key / value pair attached to a log record.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    pub value: Value,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_picks_natural_variant() {
        let v: Value = serde_json::from_str("true").unwrap();
        assert_eq!(v, Value::Bool(true));

        let v: Value = serde_json::from_str("42").unwrap();
        assert_eq!(v, Value::Int(42));

        let v: Value = serde_json::from_str("-7").unwrap();
        assert_eq!(v, Value::Int(-7));

        let v: Value = serde_json::from_str("2.5").unwrap();
        assert_eq!(v, Value::Float(2.5));

        let v: Value = serde_json::from_str(r#""hello""#).unwrap();
        assert_eq!(v, Value::String("hello".into()));
    }

    #[test]
    fn large_integers_stay_exact() {
        let v: Value = serde_json::from_str("18446744073709551615").unwrap();
        assert_eq!(v, Value::UInt(u64::MAX));
        assert_eq!(serde_json::to_string(&v).unwrap(), "18446744073709551615");

        assert_eq!(Value::from(7_u64), Value::Int(7));
        assert_eq!(Value::from(u64::MAX).to_string(), "18446744073709551615");
    }

    #[test]
    fn non_finite_floats_serialise_as_strings() {
        assert_eq!(serde_json::to_string(&Value::Float(f64::NAN)).unwrap(), r#""NaN""#);
        assert_eq!(
            serde_json::to_string(&Value::Float(f64::INFINITY)).unwrap(),
            r#""inf""#
        );
        assert_eq!(
            serde_json::to_value(Value::Float(f64::NEG_INFINITY)).unwrap(),
            serde_json::json!("-inf")
        );
        assert_eq!(serde_json::to_string(&Value::Float(1.5)).unwrap(), "1.5");
    }

    #[test]
    fn nested_map_round_trips_through_json() {
        let v: Value = serde_json::from_str(r#"{"team": "core", "count": 3}"#).unwrap();
        let Value::Map(map) = &v else {
            panic!("expected map, got {v:?}");
        };
        assert_eq!(map.get("team"), Some(&Value::String("core".into())));
        assert_eq!(map.get("count"), Some(&Value::Int(3)));

        // BTreeMap keys serialise in sorted order.
        assert_eq!(
            serde_json::to_string(&v).unwrap(),
            r#"{"count":3,"team":"core"}"#
        );
    }

    #[test]
    fn arrays_and_null_are_rejected() {
        assert!(serde_json::from_str::<Value>("[1, 2]").is_err());
        assert!(serde_json::from_str::<Value>("null").is_err());
    }

    #[test]
    fn display_renders_scalars_plainly() {
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::from(12_i64).to_string(), "12");
        assert_eq!(Value::from(false).to_string(), "false");

        let mut map = BTreeMap::new();
        map.insert("k".to_string(), Value::from(1_i64));
        assert_eq!(Value::Map(map).to_string(), r#"{"k":1}"#);
    }

    #[test]
    fn field_new_converts_value() {
        let f = Field::new("user-id", "u1");
        assert_eq!(f.key, "user-id");
        assert_eq!(f.value.as_str(), Some("u1"));
    }
}
