use std::collections::BTreeMap;

use log_engine::{Field, Value};
use serde::{Deserialize, Serialize};

pub const KEY_API_PATH: &str = "api-path";
pub const KEY_EVENT: &str = "event";
pub const KEY_STATUS: &str = "status";
pub const KEY_USER_ID: &str = "user-id";
pub const KEY_SESSION_ID: &str = "session-id";
pub const KEY_CLIENT: &str = "client";
pub const KEY_IP_ADDRESS: &str = "ip-address";

/// Common status values.
pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ATTEMPT: &str = "attempt";
pub const STATUS_FAIL: &str = "fail";

/// Additional audit metadata. Keys are unique and emitted in sorted order.
pub type Meta = BTreeMap<String, Value>;

/// A structured audit event: who did what, via which API, with what outcome.
///
/// Serialises with the same kebab-case keys that [`Record::fields`] emits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Record {
    pub api_path: String,
    pub event: String,
    pub status: String,
    pub user_id: String,
    pub session_id: String,
    pub client: String,
    pub ip_address: String,
    pub meta: Meta,
}

impl Record {
    /// Record with the minimum required information; client, IP address and
    /// metadata start out empty.
    pub fn new(
        api_path: impl Into<String>,
        event: impl Into<String>,
        status: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            api_path: api_path.into(),
            event: event.into(),
            status: status.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = client.into();
        self
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = ip_address.into();
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Flatten into log fields: the seven fixed keys in a stable order,
    /// followed by one field per metadata entry.
    pub fn fields(&self) -> Vec<Field> {
        let mut fields = Vec::with_capacity(7 + self.meta.len());
        fields.extend([
            Field::new(KEY_API_PATH, self.api_path.as_str()),
            Field::new(KEY_EVENT, self.event.as_str()),
            Field::new(KEY_STATUS, self.status.as_str()),
            Field::new(KEY_USER_ID, self.user_id.as_str()),
            Field::new(KEY_SESSION_ID, self.session_id.as_str()),
            Field::new(KEY_CLIENT, self.client.as_str()),
            Field::new(KEY_IP_ADDRESS, self.ip_address.as_str()),
        ]);
        fields.extend(
            self.meta
                .iter()
                .map(|(key, value)| Field::new(key.as_str(), value.clone())),
        );
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_fields_come_first_in_order() {
        let rec = Record::new("/api/v4/users/login", "login", STATUS_SUCCESS, "u1", "s1")
            .with_client("mobile")
            .with_ip_address("10.0.0.7");
        let fields = rec.fields();

        let keys: Vec<&str> = fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(
            keys,
            [
                "api-path",
                "event",
                "status",
                "user-id",
                "session-id",
                "client",
                "ip-address"
            ]
        );
        let values: Vec<&str> = fields.iter().filter_map(|f| f.value.as_str()).collect();
        assert_eq!(
            values,
            [
                "/api/v4/users/login",
                "login",
                "success",
                "u1",
                "s1",
                "mobile",
                "10.0.0.7"
            ]
        );
    }

    #[test]
    fn one_field_per_meta_entry() {
        let rec = Record::new("/api/v4/channels", "createChannel", STATUS_ATTEMPT, "u1", "s1")
            .with_meta("channel", "town-square")
            .with_meta("private", false)
            .with_meta("members", 12_i64);
        let fields = rec.fields();

        assert_eq!(fields.len(), 7 + 3);
        let meta: Vec<(&str, &Value)> = fields[7..]
            .iter()
            .map(|f| (f.key.as_str(), &f.value))
            .collect();
        assert_eq!(
            meta,
            [
                ("channel", &Value::from("town-square")),
                ("members", &Value::Int(12)),
                ("private", &Value::Bool(false)),
            ]
        );
    }

    #[test]
    fn empty_record_still_has_fixed_fields() {
        let fields = Record::default().fields();
        assert_eq!(fields.len(), 7);
        assert!(fields.iter().all(|f| f.value.as_str() == Some("")));
    }

    #[test]
    fn meta_keys_are_emitted_verbatim() {
        let rec = Record::default().with_meta("Weird Key!", 1_i64);
        assert_eq!(rec.fields()[7].key, "Weird Key!");
    }

    #[test]
    fn deserialize_from_kebab_case_json() {
        let json = r#"{
            "api-path": "/api/v4/posts",
            "event": "createPost",
            "status": "fail",
            "user-id": "u9",
            "ip-address": "192.168.1.4",
            "meta": {"post_id": "p1", "retries": 2}
        }"#;
        let rec: Record = serde_json::from_str(json).unwrap();
        assert_eq!(rec.api_path, "/api/v4/posts");
        assert_eq!(rec.user_id, "u9");
        assert_eq!(rec.session_id, "");
        assert_eq!(rec.client, "");
        assert_eq!(rec.meta.get("retries"), Some(&Value::Int(2)));
    }
}
