//! JSON persistence for record arrays.

use std::path::Path;

use super::record::Record;
use super::StoreError;

/// Load a record array, falling back to an empty one.
///
/// A missing, unreadable or corrupt file is replaced with `[]` so the cache
/// stays available. Failure to write that replacement is only logged.
pub fn load(path: &Path) -> Vec<Record> {
    if !path.exists() {
        reset(path);
        return Vec::new();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}, starting empty", path.display(), e);
            reset(path);
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<Record>>(&content) {
        Ok(records) => {
            tracing::debug!("Loaded {} records from {}", records.len(), path.display());
            records
        }
        Err(e) => {
            tracing::warn!("Corrupt cache file {}: {}, starting empty", path.display(), e);
            reset(path);
            Vec::new()
        }
    }
}

/// Overwrite `path` with the pretty-printed records.
pub fn save(path: &Path, records: &[Record]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, to_pretty_json(records)?)?;
    Ok(())
}

fn reset(path: &Path) {
    if let Err(e) = save(path, &[]) {
        tracing::warn!("Failed to initialize {}: {}", path.display(), e);
    }
}

/// Serialize with a 4-space indent.
fn to_pretty_json(records: &[Record]) -> Result<Vec<u8>, StoreError> {
    use serde::Serialize;

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut ser)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_empty_and_is_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tags.json");

        assert!(load(&path).is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn corrupt_file_is_replaced_with_empty_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tags.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(load(&path).is_empty());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<Vec<Record>>(&content).unwrap().is_empty());
    }

    #[test]
    fn save_then_load_keeps_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("tags.json");
        let records = vec![
            Record::new("b", "second", "1"),
            Record::new("a", "first", "2").with_url(Some("https://example.com".into())),
        ];

        save(&path, &records).unwrap();
        assert_eq!(load(&path), records);
    }

    #[test]
    fn save_uses_four_space_indent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tags.json");

        save(&path, &[Record::new("k", "v", "u")]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n    {\n        \"key\": \"k\""));
    }
}
