//! Line encodings used by the built-in targets.

use std::collections::HashSet;
use std::fmt::Write as _;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::field::Value;
use crate::record::LogRec;

/// Keys written ahead of the record's own fields.
pub const KEY_TIMESTAMP: &str = "timestamp";
pub const KEY_LEVEL: &str = "level";
pub const KEY_MSG: &str = "msg";

/// Prefix given to a field whose key is already taken in the same line.
pub const DUPLICATE_KEY_PREFIX: &str = "fields.";

/// How a target turns a [`LogRec`] into bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// One JSON object per line: `timestamp`, `level`, `msg`, then the
    /// record fields in order.
    #[default]
    Json,
    /// `<rfc3339> <level> <msg> key=value ...`, one record per line.
    Plain,
}

/// Earlier keys always win. A later field with a taken key is written
/// under [`DUPLICATE_KEY_PREFIX`]`<key>`, with `.2`, `.3`, ... appended if
/// that is taken too.
fn free_key(key: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(key) {
        return key.to_string();
    }
    let base = format!("{DUPLICATE_KEY_PREFIX}{key}");
    if !taken(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}.{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

impl Format {
    /// Encode `rec` as a single newline-terminated line.
    pub fn encode(&self, rec: &LogRec) -> Result<Vec<u8>, serde_json::Error> {
        let timestamp = rec.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        match self {
            Format::Json => {
                let mut obj = serde_json::Map::new();
                obj.insert(KEY_TIMESTAMP.to_string(), timestamp.into());
                obj.insert(KEY_LEVEL.to_string(), rec.level.name.into());
                obj.insert(KEY_MSG.to_string(), rec.msg.clone().into());
                for field in &rec.fields {
                    let key = free_key(&field.key, |k| obj.contains_key(k));
                    obj.insert(key, serde_json::to_value(&field.value)?);
                }
                let mut line = serde_json::to_vec(&obj)?;
                line.push(b'\n');
                Ok(line)
            }
            Format::Plain => {
                let mut line = format!("{timestamp} {} {}", rec.level, rec.msg);
                let mut seen = HashSet::with_capacity(rec.fields.len());
                for field in &rec.fields {
                    let key = free_key(&field.key, |k| seen.contains(k));
                    // Writing into a String cannot fail.
                    let _ = write!(line, " {}={}", key, plain_value(&field.value));
                    seen.insert(key);
                }
                line.push('\n');
                Ok(line.into_bytes())
            }
        }
    }
}

/// Quote strings that would otherwise break `key=value` tokenisation.
fn plain_value(value: &Value) -> String {
    match value {
        Value::String(s)
            if s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '=' || c == '"') =>
        {
            format!("{s:?}")
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::level::Level;

    fn sample() -> LogRec {
        LogRec::new(
            Level::AUDIT_API,
            "",
            vec![
                Field::new("api-path", "/api/v4/users"),
                Field::new("status", "success"),
                Field::new("count", 3_i64),
            ],
        )
    }

    #[test]
    fn json_line_keeps_field_order() {
        let line = Format::Json.encode(&sample()).unwrap();
        assert_eq!(line.last(), Some(&b'\n'));

        let obj: serde_json::Map<String, serde_json::Value> =
            serde_json::from_slice(&line).unwrap();
        let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["timestamp", "level", "msg", "api-path", "status", "count"]
        );
        assert_eq!(obj["level"], "audit-api");
        assert_eq!(obj["msg"], "");
        assert_eq!(obj["count"], 3);
    }

    #[test]
    fn json_line_never_overwrites_earlier_keys() {
        let rec = LogRec::new(
            Level::AUDIT_API,
            "",
            vec![
                Field::new("user-id", "real-user"),
                Field::new("user-id", "spoofed"),
                Field::new("level", "info"),
                Field::new("level", "again"),
                Field::new("msg", "injected"),
            ],
        );
        let line = Format::Json.encode(&rec).unwrap();
        let obj: serde_json::Map<String, serde_json::Value> =
            serde_json::from_slice(&line).unwrap();

        assert_eq!(obj.len(), 3 + 5);
        assert_eq!(obj["level"], "audit-api");
        assert_eq!(obj["msg"], "");
        assert_eq!(obj["user-id"], "real-user");
        assert_eq!(obj["fields.user-id"], "spoofed");
        assert_eq!(obj["fields.level"], "info");
        assert_eq!(obj["fields.level.2"], "again");
        assert_eq!(obj["fields.msg"], "injected");
    }

    #[test]
    fn plain_line_renames_repeated_keys() {
        let rec = LogRec::new(
            Level::INFO,
            "m",
            vec![Field::new("status", "success"), Field::new("status", "fail")],
        );
        let line = String::from_utf8(Format::Plain.encode(&rec).unwrap()).unwrap();
        assert!(line.contains(" status=success "), "unexpected line: {line}");
        assert!(line.contains(" fields.status=fail"), "unexpected line: {line}");
    }

    #[test]
    fn plain_line_quotes_awkward_strings() {
        let rec = LogRec::new(
            Level::INFO,
            "hello",
            vec![
                Field::new("event", "login"),
                Field::new("client", "Mozilla 5.0"),
                Field::new("session-id", ""),
            ],
        );
        let line = String::from_utf8(Format::Plain.encode(&rec).unwrap()).unwrap();
        assert!(line.ends_with('\n'));
        assert!(line.contains(" info hello "), "unexpected line: {line}");
        assert!(line.contains(" event=login"), "unexpected line: {line}");
        assert!(line.contains(r#" client="Mozilla 5.0""#), "unexpected line: {line}");
        assert!(line.contains(r#" session-id="""#), "unexpected line: {line}");
    }

    #[test]
    fn format_deserializes_snake_case() {
        let f: Format = serde_yml::from_str("plain").unwrap();
        assert_eq!(f, Format::Plain);
        assert_eq!(Format::default(), Format::Json);
    }
}
