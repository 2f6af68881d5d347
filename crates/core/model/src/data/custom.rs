//! Opaque user-defined data

use std::{collections::BTreeMap, fmt};

use common::UnixNanos;
use serde::{Deserialize, Serialize};

use super::HasTsInit;

/// Names a data stream: a type name plus optional metadata
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataType {
    /// Type name, e.g. `GreeksData`
    pub type_name: String,
    /// Optional key/value qualifiers
    pub metadata: Option<BTreeMap<String, String>>,
}

impl DataType {
    /// Creates a data type
    #[must_use]
    pub fn new(type_name: &str, metadata: Option<BTreeMap<String, String>>) -> Self {
        Self {
            type_name: type_name.to_string(),
            metadata,
        }
    }

    /// Stable topic suffix: `type_name` followed by `.key=value` pairs in key order
    #[must_use]
    pub fn topic(&self) -> String {
        let mut topic = self.type_name.clone();
        if let Some(metadata) = &self.metadata {
            for (key, value) in metadata {
                topic.push('.');
                topic.push_str(key);
                topic.push('=');
                topic.push_str(value);
            }
        }
        topic
    }

    /// Metadata value for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .map(String::as_str)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.topic())
    }
}

/// A custom payload tagged with its [`DataType`]
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomData {
    /// Stream the payload belongs to
    pub data_type: DataType,
    /// Opaque encoded payload
    pub payload: Vec<u8>,
    /// Event time
    pub ts_event: UnixNanos,
    /// Receipt time
    pub ts_init: UnixNanos,
}

impl HasTsInit for CustomData {
    fn ts_init(&self) -> UnixNanos {
        self.ts_init
    }
}
