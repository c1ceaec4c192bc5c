//! Contributor tenure from commit history.
//!
//! Two indexes are built from the commit log, oldest commit first: earliest
//! date by committer name and earliest date by committer email. People
//! change addresses and spell their names differently over the years, so an
//! alias seen on only one side inherits the date already known for the
//! other side instead of starting a new record.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::history::commits::CommitRecord;
use crate::identity::MappingTable;
use crate::models::Identity;

/// Earliest commit date of an identity; `None` means no commit was ever seen.
pub type AgeRecord = Option<DateTime<Utc>>;

static IDENTITY_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_identity_regex() -> &'static Regex {
    IDENTITY_REGEX
        .get_or_init(|| Regex::new(r"^\s*(.*?)\s*<([^<>]*)>\s*$").expect("Invalid identity regex"))
}

/// Split `Name <email>` or `<email>` into name and lower-cased email.
pub fn split_name_email(identity: &str) -> Option<(String, String)> {
    let caps = get_identity_regex().captures(identity)?;
    let name = caps.get(1)?.as_str().to_string();
    let email = caps.get(2)?.as_str().trim().to_lowercase();
    if email.is_empty() {
        return None;
    }
    Some((name, email))
}

#[derive(Debug, Clone, Default)]
pub struct AuthorHistory {
    by_name: HashMap<String, DateTime<Utc>>,
    by_email: HashMap<String, DateTime<Utc>>,
}

impl AuthorHistory {
    /// Index committers of `commits`, which must be ordered oldest first.
    ///
    /// Names and emails go through the mailmap first so that the keys line
    /// up with message identities.
    pub fn build<'a>(
        commits: impl IntoIterator<Item = &'a CommitRecord>,
        mailmap: &MappingTable,
    ) -> Self {
        let mut history = AuthorHistory::default();
        let mut seen = 0usize;

        for commit in commits {
            let (name, email) = substitute(&commit.committer_name, &commit.committer_email, mailmap);
            history.record(&name, &email, commit.time);
            seen += 1;
        }

        log::info!(
            "author history: {} commits, {} names, {} emails",
            seen,
            history.by_name.len(),
            history.by_email.len()
        );
        history
    }

    /// Register one sighting of `name`/`email` at `when`.
    pub fn record(&mut self, name: &str, email: &str, when: DateTime<Utc>) {
        let email = email.to_lowercase();
        let name_known = !name.is_empty() && self.by_name.contains_key(name);
        let email_known = self.by_email.contains_key(&email);

        match (name_known, email_known) {
            (true, false) => {
                let date = self.by_name[name];
                self.by_email.insert(email, date);
            }
            (false, true) => {
                let date = self.by_email[&email];
                if !name.is_empty() {
                    self.by_name.insert(name.to_string(), date);
                }
            }
            (false, false) => {
                if !name.is_empty() {
                    self.by_name.insert(name.to_string(), when);
                }
                self.by_email.insert(email, when);
            }
            (true, true) => {}
        }
    }

    /// Tenure of one identity.
    ///
    /// ## Returns
    ///
    /// `None` if the identity is not a `Name <email>` string, otherwise the
    /// earliest of the name and email dates that exist.
    pub fn age_of(&self, identity: &str) -> Option<AgeRecord> {
        let (name, email) = split_name_email(identity)?;
        let by_name = if name.is_empty() {
            None
        } else {
            self.by_name.get(&name).copied()
        };
        let by_email = self.by_email.get(&email).copied();

        Some(match (by_name, by_email) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        })
    }
}

/// Apply the first mailmap rule matching either the name or the email.
fn substitute(name: &str, email: &str, mailmap: &MappingTable) -> (String, String) {
    let rule = mailmap
        .rules()
        .iter()
        .find(|rule| name.contains(rule.raw.as_str()) || email.contains(rule.raw.as_str()));

    match rule.and_then(|rule| split_name_email(&rule.target)) {
        Some((name, email)) => (name, email),
        None => (name.to_string(), email.to_string()),
    }
}

/// Ages for every parseable identity; unparseable ones are left out.
pub fn resolve_ages<'a>(
    identities: impl IntoIterator<Item = &'a str>,
    history: &AuthorHistory,
) -> BTreeMap<Identity, AgeRecord> {
    identities
        .into_iter()
        .filter_map(|identity| Some((identity.to_string(), history.age_of(identity)?)))
        .collect()
}
