//! On-disk result accumulator.
//!
//! Results of the different tools end up in one JSON object keyed by
//! section name (`individual`, `corporate`, `ages`, `git`, ...). Each run
//! replaces the sections it computed and leaves the others alone, so
//! `ml-stat` and `git-stat` can write to the same file in either order.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::StatError;
use crate::history::{AgeRecord, MaintainerStats};
use crate::models::Identity;
use crate::stats::StatMap;

#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
    data: Map<String, Value>,
}

impl ResultStore {
    /// Load `path`, or start empty if it does not exist yet.
    pub fn open(path: &Path) -> Result<Self, StatError> {
        let data = match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Value>(&raw)? {
                Value::Object(map) => map,
                _ => {
                    return Err(StatError::NotAnObject {
                        path: path.to_path_buf(),
                    });
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Map::new(),
            Err(source) => {
                return Err(StatError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace a whole section.
    pub fn set_section<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        value: &T,
    ) -> Result<(), StatError> {
        self.data.insert(name.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Merge an object into a section key by key.
    ///
    /// A missing or non-object section is replaced.
    pub fn merge_section<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        value: &T,
    ) -> Result<(), StatError> {
        let Value::Object(incoming) = serde_json::to_value(value)? else {
            return Err(StatError::InvalidInput(format!(
                "section `{}` can only be merged with an object",
                name
            )));
        };

        match self.data.get_mut(name) {
            Some(Value::Object(existing)) => existing.extend(incoming),
            _ => {
                self.data.insert(name.to_string(), Value::Object(incoming));
            }
        }
        Ok(())
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Deserialize a section, `None` if absent.
    pub fn section_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StatError> {
        self.data
            .get(name)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(StatError::from)
    }

    pub fn save(&self) -> Result<(), StatError> {
        let raw = serde_json::to_string(&self.data)?;
        fs::write(&self.path, raw).map_err(|source| StatError::Io {
            path: self.path.clone(),
            source,
        })?;
        log::info!(
            "wrote {} sections to {}",
            self.data.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// One run as read back from a result file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub individual: StatMap,
    pub corporate: StatMap,
    pub count: usize,
    pub first_date: Option<DateTime<Utc>>,
    pub last_date: Option<DateTime<Utc>>,
    /// Present once `git-stat` wrote into the same file
    pub git: Option<MaintainerStats>,
    pub ages: BTreeMap<Identity, AgeRecord>,
}

impl Snapshot {
    /// Read the sections written by `ml-stat` and, if present, `git-stat`.
    pub fn load(store: &ResultStore) -> Result<Self, StatError> {
        let required = |name: &str| {
            StatError::InvalidInput(format!(
                "{} has no `{}` section",
                store.path().display(),
                name
            ))
        };

        Ok(Self {
            individual: store
                .section_as("individual")?
                .ok_or_else(|| required("individual"))?,
            corporate: store
                .section_as("corporate")?
                .ok_or_else(|| required("corporate"))?,
            count: store.section_as("count")?.unwrap_or(0),
            first_date: store
                .section_as::<Option<DateTime<Utc>>>("first_date")?
                .flatten(),
            last_date: store
                .section_as::<Option<DateTime<Utc>>>("last_date")?
                .flatten(),
            git: store.section_as("git")?,
            ages: store.section_as("ages")?.unwrap_or_default(),
        })
    }

    /// Whole days between the first and the last message, at least one.
    pub fn days(&self) -> Option<i64> {
        let (first, last) = (self.first_date?, self.last_date?);
        Some(((last - first).num_seconds() as f64 / 86_400.0).round().max(1.0) as i64)
    }

    /// Whole weeks between the first and the last message, at least one.
    pub fn weeks(&self) -> Option<i64> {
        let (first, last) = (self.first_date?, self.last_date?);
        Some(((last - first).num_seconds() as f64 / 604_800.0).round().max(1.0) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_sections_survive_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");

        let mut store = ResultStore::open(&path).unwrap();
        store.set_section("count", &42).unwrap();
        store.save().unwrap();

        let mut store = ResultStore::open(&path).unwrap();
        store.set_section("first_date", "2024-01-01T10:00:00Z").unwrap();
        store.save().unwrap();

        let store = ResultStore::open(&path).unwrap();
        assert_eq!(store.section("count"), Some(&json!(42)));
        assert!(store.section("first_date").is_some());
    }

    #[test]
    fn test_merge_is_key_wise() {
        let dir = TempDir::new().unwrap();
        let mut store = ResultStore::open(&dir.path().join("r.json")).unwrap();

        let first: BTreeMap<&str, Option<&str>> = BTreeMap::from([("a", Some("2010")), ("b", None)]);
        let second: BTreeMap<&str, Option<&str>> = BTreeMap::from([("b", Some("2012"))]);
        store.merge_section("ages", &first).unwrap();
        store.merge_section("ages", &second).unwrap();

        assert_eq!(
            store.section("ages"),
            Some(&json!({"a": "2010", "b": "2012"}))
        );
    }

    #[test]
    fn test_snapshot_reads_both_tools() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("r.json");
        fs::write(
            &path,
            r#"{
                "individual": {"Ann <ann@a.org>": {
                    "author": {"cs": 1, "thr": 1, "msg": 2},
                    "reviewer": {"cs": 0, "thr": 0, "msg": 0},
                    "score": {"positive": -6, "negative": 6}}},
                "corporate": {},
                "count": 300,
                "first_date": "2024-01-01T00:00:00Z",
                "last_date": "2024-01-29T12:00:00Z",
                "git": {"direct_commits": 12, "direct_test_commits": 2,
                        "reviews": {"any": {"reviewed": 6, "pct": 50.0},
                                    "x-company": {"reviewed": 3, "pct": 25.0}},
                        "commit_authors": {}, "test_commit_authors": {}},
                "ages": {"Ann <ann@a.org>": "2019-05-01T00:00:00Z", "Bob <bob@b.org>": null}
            }"#,
        )
        .unwrap();

        let snapshot = Snapshot::load(&ResultStore::open(&path).unwrap()).unwrap();

        assert_eq!(snapshot.count, 300);
        assert_eq!(snapshot.individual["Ann <ann@a.org>"].author.msg, 2);
        assert_eq!(snapshot.days(), Some(29));
        assert_eq!(snapshot.weeks(), Some(4));
        assert_eq!(snapshot.git.map(|git| git.direct_test_commits), Some(2));
        assert_eq!(snapshot.ages.len(), 2);
        assert_eq!(snapshot.ages["Bob <bob@b.org>"], None);
    }

    #[test]
    fn test_snapshot_needs_statistics() {
        let dir = TempDir::new().unwrap();
        let mut store = ResultStore::open(&dir.path().join("r.json")).unwrap();
        store.set_section("count", &3).unwrap();

        assert!(matches!(
            Snapshot::load(&store),
            Err(StatError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_object_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("r.json");
        fs::write(&path, "[1, 2]").unwrap();

        assert!(matches!(
            ResultStore::open(&path),
            Err(StatError::NotAnObject { .. })
        ));
    }
}
