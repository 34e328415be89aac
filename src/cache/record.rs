//! Cache records and the patch applied on update.

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A single tag or image entry.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub key: String,

    /// Text content for tags, generated file id for images.
    pub value: String,

    /// Id of the user who last touched the record.
    #[serde(rename = "user")]
    pub owner: String,

    /// Creation or last modification time (ms).
    #[serde(rename = "accessed")]
    pub accessed_at: i64,

    /// Link attached to a text tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Record {
    /// Create a record stamped with the current time.
    pub fn new(key: &str, value: &str, owner: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            owner: owner.to_string(),
            accessed_at: now_ms(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    /// Stamp the record with a new owner and the current time.
    pub fn touch(&mut self, owner: &str) {
        self.owner = owner.to_string();
        self.accessed_at = now_ms();
    }

    /// Merge the known optional fields of `patch` into this record.
    pub fn apply(&mut self, patch: RecordPatch) {
        if let Some(key) = patch.key {
            self.key = key;
        }
        if let Some(value) = patch.value {
            self.value = value;
        }
        if let Some(url) = patch.url {
            self.url = Some(url);
        }
        self.touch(&patch.owner);
    }

    /// Milliseconds elapsed since the record was last modified.
    pub fn age_ms(&self) -> i64 {
        (now_ms() - self.accessed_at).max(0)
    }
}

/// Fields an update may change. Owner and timestamp are always refreshed.
#[derive(Clone, Debug, Default)]
pub struct RecordPatch {
    pub key: Option<String>,
    pub value: Option<String>,
    pub url: Option<String>,
    pub owner: String,
}

impl RecordPatch {
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            ..Default::default()
        }
    }

    pub fn key(mut self, key: Option<String>) -> Self {
        self.key = key;
        self
    }

    pub fn value(mut self, value: Option<String>) -> Self {
        self.value = value;
        self
    }

    pub fn url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }
}

/// Whether a record is live or waiting to be purged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordState {
    Active,
    Deleted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_on_disk_field_names() {
        let mut record = Record::new("hello", "world", "42");
        record.accessed_at = 1_700_000_000_000;

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["user"], "42");
        assert_eq!(json["accessed"], 1_700_000_000_000i64);
        assert!(json.get("url").is_none());
        assert!(json.get("owner").is_none());
    }

    #[test]
    fn reads_records_without_url() {
        let raw = r#"{"key":"a","value":"b","user":"1","accessed":5}"#;
        let record: Record = serde_json::from_str(raw).unwrap();
        assert_eq!(record.url, None);
        assert_eq!(record.accessed_at, 5);
    }

    #[test]
    fn patch_keeps_unset_fields() {
        let mut record = Record::new("old", "content", "1").with_url(Some("https://a".into()));
        record.accessed_at = 0;

        record.apply(RecordPatch::new("2").key(Some("new".into())));

        assert_eq!(record.key, "new");
        assert_eq!(record.value, "content");
        assert_eq!(record.url.as_deref(), Some("https://a"));
        assert_eq!(record.owner, "2");
        assert!(record.accessed_at > 0);
    }
}
