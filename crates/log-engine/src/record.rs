use chrono::{DateTime, Utc};

use crate::field::{Field, Value};
use crate::level::Level;

/// A single record travelling through the logger queues.
///
/// Fields keep the order in which they were submitted; targets emit them in
/// that order.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRec {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub msg: String,
    pub fields: Vec<Field>,
}

impl LogRec {
    /// Create a record stamped with the current UTC time.
    pub fn new(level: Level, msg: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            msg: msg.into(),
            fields,
        }
    }

    /// Value of the first field named `key`.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.key == key).map(|f| &f.value)
    }
}
