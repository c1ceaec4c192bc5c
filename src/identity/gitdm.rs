//! Corporate affiliation lookup backed by a gitdm developer database.
//!
//! The `alldevs` export is tab separated, one developer per line:
//! `corp \t email \t name \t stat`, with `!` standing in for `@` in the
//! address. Entries attributed to placeholder organizations are skipped at
//! load time and never proposed.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::identity::audit::split_identity;
use crate::identity::mapping::MappingRule;

/// Organizations gitdm uses when it does not actually know the employer.
const PLACEHOLDER_CORPS: &[&str] = &["(Unknown)", "Independent", "NotFound"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitdmEntry {
    pub corp: String,
    /// Address in gitdm form (`user!example.com`)
    pub email: String,
    pub name: String,
    pub stat: String,
}

#[derive(Debug, Clone, Default)]
pub struct GitdmDb {
    known: HashMap<String, GitdmEntry>,
    /// Entries dropped for a placeholder organization
    skipped: usize,
}

impl GitdmDb {
    /// Read an `alldevs` file. Invalid UTF-8 is replaced rather than rejected.
    pub fn load(path: &Path) -> io::Result<Self> {
        let raw = fs::read(path)?;
        let db = Self::parse(&String::from_utf8_lossy(&raw));
        log::info!(
            "loaded gitdm database {}: {} affiliated, {} placeholder entries skipped",
            path.display(),
            db.known.len(),
            db.skipped
        );
        Ok(db)
    }

    pub fn parse(raw: &str) -> Self {
        let mut db = GitdmDb::default();

        for (lineno, line) in raw.lines().enumerate() {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 4 {
                if !line.trim().is_empty() {
                    log::warn!("gitdm line {} has {} fields, skipping", lineno + 1, fields.len());
                }
                continue;
            }

            let entry = GitdmEntry {
                corp: fields[0].to_string(),
                email: fields[1].to_string(),
                name: fields[2].to_string(),
                stat: fields[3].trim_end().to_string(),
            };
            if PLACEHOLDER_CORPS.contains(&entry.corp.as_str()) {
                db.skipped += 1;
                continue;
            }
            db.known.insert(entry.email.to_lowercase(), entry);
        }

        db
    }

    /// Affiliation of a plain email address, if gitdm knows a real one.
    pub fn lookup(&self, email: &str) -> Option<&GitdmEntry> {
        self.known.get(&email.to_lowercase().replace('@', "!"))
    }

    /// Corpmap rules for identities that still look like people.
    ///
    /// Keys without `@` are assumed to be organization names already.
    pub fn propose<'a>(&self, identities: impl IntoIterator<Item = &'a str>) -> Vec<MappingRule> {
        identities
            .into_iter()
            .filter(|identity| identity.contains('@'))
            .filter_map(|identity| {
                let (_, email) = split_identity(identity)?;
                let entry = self.lookup(&email)?;
                Some(MappingRule::new(format!("<{}>", email), entry.corp.clone()))
            })
            .collect()
    }
}
