//! Identity ambiguity auditor.
//!
//! Finds statistics keys that probably denote the same person but are not
//! unified by the mailmap yet, and walks the operator through them. The
//! outcome is a list of proposed mailmap rules; the database itself is never
//! modified here.
//!
//! ## Candidate detection
//!
//! Identities are grouped three ways:
//!
//! - by email address (lower-cased),
//! - by display name,
//! - by case-folded display name.
//!
//! Any group holding more than one distinct identity is a candidate.
//!
//! ## Seeding
//!
//! The first identity of a group is the proposed canonical target. Identities
//! that are already mailmap targets go first, then identities carrying a
//! display name, then everything else in lexicographic order.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::io;

use serde::Serialize;

use crate::identity::choices::{OperatorChoice, OperatorChoices};
use crate::identity::mapping::{MappingRule, MappingTable};
use crate::models::Identity;

/// Which attribute a candidate group shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupingKind {
    Email,
    Name,
    FoldedName,
}

impl fmt::Display for GroupingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupingKind::Email => write!(f, "email"),
            GroupingKind::Name => write!(f, "name"),
            GroupingKind::FoldedName => write!(f, "case-folded name"),
        }
    }
}

/// Identities that share one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateGroup {
    pub kind: GroupingKind,
    pub key: String,
    /// Seeded order; the first entry is the proposed canonical target
    pub identities: Vec<Identity>,
}

/// Split `Name <email>` into its display name and lower-cased address.
///
/// Returns `None` for keys without an angle-bracketed address, which is what
/// organization names look like.
pub fn split_identity(identity: &str) -> Option<(&str, String)> {
    let open = identity.rfind('<')?;
    let close = identity[open..].find('>')? + open;
    let email = identity[open + 1..close].trim().to_lowercase();
    if email.is_empty() {
        return None;
    }
    Some((identity[..open].trim(), email))
}

/// Collect candidate groups over a set of identities.
///
/// Groups come out ordered by kind, then key. Groups whose identity set was
/// already produced by an earlier grouping are dropped so the operator sees
/// each set once.
pub fn find_candidates<'a>(
    identities: impl IntoIterator<Item = &'a str>,
    mailmap: &MappingTable,
) -> Vec<CandidateGroup> {
    let mut by_email: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    let mut by_name: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    let mut by_folded: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();

    for identity in identities {
        let Some((name, email)) = split_identity(identity) else {
            continue;
        };
        by_email.entry(email).or_default().insert(identity);
        if !name.is_empty() {
            by_name.entry(name.to_string()).or_default().insert(identity);
            by_folded.entry(name.to_lowercase()).or_default().insert(identity);
        }
    }

    let mut seen: HashSet<BTreeSet<&str>> = HashSet::new();
    let mut groups = Vec::new();

    for (kind, grouping) in [
        (GroupingKind::Email, by_email),
        (GroupingKind::Name, by_name),
        (GroupingKind::FoldedName, by_folded),
    ] {
        for (key, members) in grouping {
            if members.len() < 2 || !seen.insert(members.clone()) {
                continue;
            }
            groups.push(CandidateGroup {
                kind,
                key,
                identities: seed_order(members, mailmap),
            });
        }
    }

    groups
}

fn seed_order(members: BTreeSet<&str>, mailmap: &MappingTable) -> Vec<Identity> {
    let mut ordered: Vec<&str> = members.into_iter().collect();
    ordered.sort_by_key(|identity| {
        let is_target = mailmap.is_target(identity);
        let has_name = split_identity(identity)
            .map(|(name, _)| !name.is_empty())
            .unwrap_or(false);
        (!is_target, !has_name, *identity)
    });
    ordered.into_iter().map(str::to_string).collect()
}

/// Keep only the first identity for each email address.
fn strip_email_duplicates(identities: &mut Vec<Identity>) {
    let mut emails = HashSet::new();
    identities.retain(|identity| match split_identity(identity) {
        Some((_, email)) => emails.insert(email),
        None => true,
    });
}

/// Result of a reconciliation session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditOutcome {
    pub proposals: Vec<MappingRule>,
    pub accepted: usize,
    pub ignored: usize,
}

/// Walk the operator through `groups`, collecting proposed mailmap rules.
///
/// Identities that already became the source of a proposal are removed from
/// later groups; a group left with fewer than two identities is skipped
/// without asking.
pub fn reconcile(
    groups: &[CandidateGroup],
    choices: &mut dyn OperatorChoices,
) -> io::Result<AuditOutcome> {
    let mut outcome = AuditOutcome::default();
    let mut resolved: HashSet<Identity> = HashSet::new();

    for group in groups {
        let mut current = group.clone();

        loop {
            current.identities.retain(|identity| !resolved.contains(identity));
            if current.identities.len() < 2 {
                break;
            }

            match choices.next_operator_choice(&current)? {
                OperatorChoice::Accept => {
                    let target = current.identities[0].clone();
                    for other in &current.identities[1..] {
                        log::debug!("proposing {} -> {}", other, target);
                        outcome.proposals.push(MappingRule::new(other.clone(), target.clone()));
                        resolved.insert(other.clone());
                    }
                    outcome.accepted += 1;
                    break;
                }
                OperatorChoice::Rotate => current.identities.rotate_left(1),
                OperatorChoice::Strip => strip_email_duplicates(&mut current.identities),
                OperatorChoice::Ignore => {
                    outcome.ignored += 1;
                    break;
                }
            }
        }
    }

    log::info!(
        "audit finished: {} groups accepted, {} ignored, {} rules proposed",
        outcome.accepted,
        outcome.ignored,
        outcome.proposals.len()
    );

    Ok(outcome)
}
