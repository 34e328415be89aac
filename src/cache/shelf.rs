//! In-memory record collection for one domain, mirrored to two JSON files.
//!
//! Active and deleted records live in one ordered list tagged with their
//! state. The split into `storage/*.json` and `deleted/*.json` only happens
//! when persisting.

use std::collections::HashMap;
use std::path::PathBuf;

use super::persist;
use super::record::{Record, RecordPatch, RecordState};
use super::{Kind, StoreError};

#[derive(Debug, Clone)]
struct Entry {
    record: Record,
    state: RecordState,
}

#[derive(Debug)]
pub struct Shelf {
    kind: Kind,
    active_path: PathBuf,
    deleted_path: PathBuf,
    entries: Vec<Entry>,
    /// Active key -> position in `entries`.
    index: HashMap<String, usize>,
}

impl Shelf {
    /// Load both files for `kind`. Missing or corrupt files start empty.
    pub fn load(kind: Kind, active_path: PathBuf, deleted_path: PathBuf) -> Self {
        let active = persist::load(&active_path);
        let deleted = persist::load(&deleted_path);

        let entries = active
            .into_iter()
            .map(|record| Entry {
                record,
                state: RecordState::Active,
            })
            .chain(deleted.into_iter().map(|record| Entry {
                record,
                state: RecordState::Deleted,
            }))
            .collect();

        let mut shelf = Self {
            kind,
            active_path,
            deleted_path,
            entries,
            index: HashMap::new(),
        };
        shelf.reindex();
        shelf
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.index.get(key).map(|&i| &self.entries[i].record)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Active records in insertion order.
    pub fn active(&self) -> impl Iterator<Item = &Record> {
        self.in_state(RecordState::Active)
    }

    /// Soft-deleted records in deletion order.
    pub fn deleted(&self) -> impl Iterator<Item = &Record> {
        self.in_state(RecordState::Deleted)
    }

    /// Fail if `key` is already active.
    pub fn ensure_vacant(&self, key: &str) -> Result<(), StoreError> {
        if self.contains(key) {
            return Err(StoreError::AlreadyExists(self.kind));
        }
        Ok(())
    }

    /// Fail if renaming `key` to `new_key` would collide with another record.
    /// No new key, or the same key, never collides.
    pub fn ensure_renamable(&self, key: &str, new_key: Option<&str>) -> Result<(), StoreError> {
        match new_key {
            Some(new_key) if new_key != key && self.contains(new_key) => {
                Err(StoreError::RenameConflict(self.kind))
            }
            _ => Ok(()),
        }
    }

    /// Append a new active record and persist.
    pub fn insert(&mut self, record: Record) -> Result<(), StoreError> {
        self.ensure_vacant(&record.key)?;
        let mut entries = self.entries.clone();
        entries.push(Entry {
            record,
            state: RecordState::Active,
        });
        self.commit(entries)
    }

    /// Apply `patch` to the active record `key`, move it to the end and persist.
    pub fn update(&mut self, key: &str, patch: RecordPatch) -> Result<Record, StoreError> {
        self.ensure_renamable(key, patch.key.as_deref())?;
        let pos = self.position(key)?;

        let mut entries = self.entries.clone();
        let mut entry = entries.remove(pos);
        entry.record.apply(patch);
        let updated = entry.record.clone();
        entries.push(entry);

        self.commit(entries)?;
        Ok(updated)
    }

    /// Move the active record `key` to the deleted set and persist.
    pub fn remove(&mut self, key: &str, owner: &str) -> Result<Record, StoreError> {
        let pos = self.position(key)?;

        let mut entries = self.entries.clone();
        let mut entry = entries.remove(pos);
        entry.record.touch(owner);
        entry.state = RecordState::Deleted;
        let removed = entry.record.clone();
        entries.push(entry);

        self.commit(entries)?;
        Ok(removed)
    }

    /// Drop every deleted record, persist, and return what was dropped.
    pub fn purge(&mut self) -> Result<Vec<Record>, StoreError> {
        let (purged, kept): (Vec<Entry>, Vec<Entry>) = self
            .entries
            .iter()
            .cloned()
            .partition(|e| e.state == RecordState::Deleted);

        self.commit(kept)?;
        Ok(purged.into_iter().map(|e| e.record).collect())
    }

    /// Rewrite both backing files.
    pub fn persist(&self) -> Result<(), StoreError> {
        self.write(&self.entries)
    }

    /// Write `entries` and only then make them the current state.
    /// A failed write leaves memory untouched.
    fn commit(&mut self, entries: Vec<Entry>) -> Result<(), StoreError> {
        self.write(&entries)?;
        self.entries = entries;
        self.reindex();
        Ok(())
    }

    fn write(&self, entries: &[Entry]) -> Result<(), StoreError> {
        let split = |state: RecordState| {
            entries
                .iter()
                .filter(|e| e.state == state)
                .map(|e| e.record.clone())
                .collect::<Vec<_>>()
        };
        persist::save(&self.active_path, &split(RecordState::Active))?;
        persist::save(&self.deleted_path, &split(RecordState::Deleted))?;
        Ok(())
    }

    fn position(&self, key: &str) -> Result<usize, StoreError> {
        self.index
            .get(key)
            .copied()
            .ok_or(StoreError::NotFound(self.kind))
    }

    fn in_state(&self, state: RecordState) -> impl Iterator<Item = &Record> {
        self.entries
            .iter()
            .filter(move |e| e.state == state)
            .map(|e| &e.record)
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.state == RecordState::Active {
                // First occurrence wins if a hand-edited file holds duplicates.
                self.index.entry(entry.record.key.clone()).or_insert(i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn shelf(dir: &TempDir) -> Shelf {
        Shelf::load(
            Kind::Tag,
            dir.path().join("storage").join("tags.json"),
            dir.path().join("deleted").join("tags.json"),
        )
    }

    fn keys<'a>(records: impl Iterator<Item = &'a Record>) -> Vec<String> {
        records.map(|r| r.key.clone()).collect()
    }

    #[test]
    fn update_moves_record_to_end() {
        let dir = TempDir::new().unwrap();
        let mut shelf = shelf(&dir);
        shelf.insert(Record::new("a", "1", "u")).unwrap();
        shelf.insert(Record::new("b", "2", "u")).unwrap();

        shelf
            .update("a", RecordPatch::new("v").value(Some("3".into())))
            .unwrap();

        assert_eq!(keys(shelf.active()), vec!["b", "a"]);
        assert_eq!(shelf.get("a").unwrap().value, "3");
        assert_eq!(shelf.get("a").unwrap().owner, "v");
    }

    #[test]
    fn removed_records_leave_the_index() {
        let dir = TempDir::new().unwrap();
        let mut shelf = shelf(&dir);
        shelf.insert(Record::new("a", "1", "u")).unwrap();

        let removed = shelf.remove("a", "deleter").unwrap();

        assert_eq!(removed.owner, "deleter");
        assert!(shelf.get("a").is_none());
        assert_eq!(keys(shelf.deleted()), vec!["a"]);
        // The key is free again.
        shelf.insert(Record::new("a", "again", "u")).unwrap();
        assert_eq!(shelf.get("a").unwrap().value, "again");
    }

    #[test]
    fn reload_restores_both_sets() {
        let dir = TempDir::new().unwrap();
        {
            let mut shelf = shelf(&dir);
            shelf.insert(Record::new("a", "1", "u")).unwrap();
            shelf.insert(Record::new("b", "2", "u")).unwrap();
            shelf.insert(Record::new("c", "3", "u")).unwrap();
            shelf.remove("b", "u").unwrap();
        }

        let shelf = shelf(&dir);
        assert_eq!(keys(shelf.active()), vec!["a", "c"]);
        assert_eq!(keys(shelf.deleted()), vec!["b"]);
    }

    #[test]
    fn rename_to_same_key_is_allowed() {
        let dir = TempDir::new().unwrap();
        let mut shelf = shelf(&dir);
        shelf.insert(Record::new("a", "1", "u")).unwrap();

        assert!(shelf.ensure_renamable("a", Some("a")).is_ok());
        assert!(shelf.ensure_renamable("a", None).is_ok());
    }

    #[test]
    fn failed_write_leaves_state_untouched() {
        let dir = TempDir::new().unwrap();
        let mut shelf = shelf(&dir);
        shelf.insert(Record::new("a", "1", "u")).unwrap();
        shelf.remove("a", "u").unwrap();
        shelf.insert(Record::new("b", "2", "u")).unwrap();

        let active = dir.path().join("storage").join("tags.json");
        std::fs::remove_file(&active).unwrap();
        std::fs::create_dir(&active).unwrap();

        assert!(matches!(
            shelf.insert(Record::new("ghost", "x", "u")),
            Err(StoreError::Io(_))
        ));
        assert!(shelf.get("ghost").is_none());
        assert!(shelf.update("b", RecordPatch::new("v").key(Some("c".into()))).is_err());
        assert_eq!(shelf.get("b").unwrap().value, "2");
        assert!(shelf.remove("b", "v").is_err());
        assert!(shelf.get("b").is_some());
        assert!(shelf.purge().is_err());
        assert_eq!(keys(shelf.deleted()), vec!["a"]);

        std::fs::remove_dir(&active).unwrap();
        shelf.insert(Record::new("ghost", "x", "u")).unwrap();
        assert_eq!(keys(shelf.active()), vec!["b", "ghost"]);
    }
}
