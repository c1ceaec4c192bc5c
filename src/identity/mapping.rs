//! Mapping database: ordered substring rewrite tables.
//!
//! The database is a JSON object with two tables:
//!
//! ```json
//! {
//!   "mailmap": [["jdoe@old.example", "John Doe <john@example.com>"]],
//!   "corpmap": [["@example.com", "Example Corp"]]
//! }
//! ```
//!
//! Each entry is a `(raw-substring, canonical-target)` pair. A table is
//! applied by scanning its rules in order; the first rule whose substring
//! occurs anywhere in the input fires and ends the scan. Matching is plain
//! substring search, so short keys can over-match. That fuzziness is part of
//! the contract and is relied upon by existing databases.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while loading the mapping database.
///
/// All of them are fatal: statistics computed with a half-loaded table
/// would silently attribute activity to the wrong people.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("failed to read mapping database {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("mapping database is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("mapping database has no `{0}` table")]
    MissingTable(&'static str),
    #[error("`{0}` table must be an array of pairs")]
    NotATable(&'static str),
    #[error("`{table}` entry {index} must be a pair of strings, found {found}")]
    MalformedEntry {
        table: &'static str,
        index: usize,
        found: String,
    },
}

/// A single `(raw-substring, canonical-target)` rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MappingRule {
    pub raw: String,
    pub target: String,
}

impl MappingRule {
    pub fn new(raw: impl Into<String>, target: impl Into<String>) -> Self {
        MappingRule {
            raw: raw.into(),
            target: target.into(),
        }
    }

    /// Whether the rule fires for `input`.
    pub fn matches(&self, input: &str) -> bool {
        input.contains(self.raw.as_str())
    }

    /// Render the rule the way it is written in the database.
    pub fn to_json_entry(&self) -> String {
        serde_json::to_string(&[&self.raw, &self.target])
            .unwrap_or_else(|_| format!("[\"{}\", \"{}\"]", self.raw, self.target))
    }
}

/// Ordered rule list with first-match-wins semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    rules: Vec<MappingRule>,
}

impl MappingTable {
    pub fn new(rules: Vec<MappingRule>) -> Self {
        MappingTable { rules }
    }

    /// Build a table from `(raw, target)` pairs, mostly for tests and tools.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        MappingTable {
            rules: pairs
                .into_iter()
                .map(|(raw, target)| MappingRule::new(raw, target))
                .collect(),
        }
    }

    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn push(&mut self, rule: MappingRule) {
        self.rules.push(rule);
    }

    /// First rule firing for `input`.
    pub fn first_match(&self, input: &str) -> Option<&MappingRule> {
        self.rules.iter().find(|rule| rule.matches(input))
    }

    /// Rewrite `input` with the first firing rule, or return it unchanged.
    pub fn apply(&self, input: &str) -> String {
        match self.first_match(input) {
            Some(rule) => rule.target.clone(),
            None => input.to_string(),
        }
    }

    /// Whether `identity` is already the target of some rule.
    pub fn is_target(&self, identity: &str) -> bool {
        self.rules.iter().any(|rule| rule.target == identity)
    }
}

/// The two mapping tables of one database.
///
/// `corpmap` already contains the derived rules (see [`MappingDb::from_value`]).
#[derive(Debug, Clone, Default)]
pub struct MappingDb {
    pub mailmap: MappingTable,
    pub corpmap: MappingTable,
}

impl MappingDb {
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let raw = fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self::from_json_str(&raw)?;
        log::info!(
            "loaded mapping database {}: {} mailmap rules, {} corpmap rules",
            path.display(),
            db.mailmap.len(),
            db.corpmap.len()
        );
        Ok(db)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, MappingError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(&value)
    }

    /// Validate both tables and extend the corpmap.
    ///
    /// For every mailmap rule whose target contains a corpmap key, a derived
    /// `(mailmap raw, organization)` rule is appended to the corpmap. A
    /// misspelled personal address then resolves straight to its company
    /// without first being rewritten to the canonical identity.
    pub fn from_value(value: &Value) -> Result<Self, MappingError> {
        let mailmap = parse_table(value, "mailmap")?;
        let mut corpmap = parse_table(value, "corpmap")?;

        let derived: Vec<MappingRule> = mailmap
            .rules()
            .iter()
            .filter_map(|rule| {
                corpmap
                    .rules()
                    .iter()
                    .find(|corp| rule.target.contains(corp.raw.as_str()))
                    .map(|corp| MappingRule::new(rule.raw.clone(), corp.target.clone()))
            })
            .collect();

        log::debug!("derived {} corpmap rules from the mailmap", derived.len());
        for rule in derived {
            corpmap.push(rule);
        }

        Ok(MappingDb { mailmap, corpmap })
    }

    /// Tables used for per-person statistics.
    pub fn person_tables(&self) -> Vec<MappingTable> {
        vec![self.mailmap.clone()]
    }

    /// Tables used for per-organization statistics.
    pub fn corporate_tables(&self) -> Vec<MappingTable> {
        vec![self.mailmap.clone(), self.corpmap.clone()]
    }
}

fn parse_table(value: &Value, table: &'static str) -> Result<MappingTable, MappingError> {
    let entries = value
        .get(table)
        .ok_or(MappingError::MissingTable(table))?
        .as_array()
        .ok_or(MappingError::NotATable(table))?;

    let mut rules = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let pair = match entry.as_array() {
            Some(pair) if pair.len() == 2 => pair,
            _ => {
                return Err(MappingError::MalformedEntry {
                    table,
                    index,
                    found: entry.to_string(),
                });
            }
        };
        match (pair[0].as_str(), pair[1].as_str()) {
            (Some(raw), Some(target)) => rules.push(MappingRule::new(raw, target)),
            _ => {
                return Err(MappingError::MalformedEntry {
                    table,
                    index,
                    found: entry.to_string(),
                });
            }
        }
    }

    Ok(MappingTable::new(rules))
}
