//! Change-sets: successive postings of the same patch or series.
//!
//! Revisions of a series are separate threads that share their subject once
//! the bracket tag (`[PATCH net-next v3 0/4]`) is removed. Only threads
//! classified as patches take part.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::identity::Normalizer;
use crate::models::Identity;
use crate::threading::thread::Thread;

/// Subject with everything up to and including the last `]` removed.
pub fn change_set_key(subject: &str) -> &str {
    match subject.rfind(']') {
        Some(end) => subject[end + 1..].trim(),
        None => subject.trim(),
    }
}

/// Threads sharing one change-set key.
#[derive(Debug, Clone)]
pub struct ChangeSet<'a> {
    pub key: String,
    /// Member threads ordered by root id
    pub threads: Vec<&'a Thread>,
}

impl<'a> ChangeSet<'a> {
    pub fn revisions(&self) -> usize {
        self.threads.len()
    }

    pub fn patch_count(&self) -> usize {
        self.threads.iter().map(|thread| thread.patch_count()).sum()
    }

    /// No member thread carries an actual patch.
    pub fn is_anomalous(&self) -> bool {
        self.patch_count() == 0
    }

    pub fn authors(&self, normalizer: &Normalizer) -> BTreeSet<Identity> {
        self.threads
            .iter()
            .flat_map(|thread| thread.authors(normalizer).into_keys())
            .collect()
    }

    pub fn participants(&self, normalizer: &Normalizer) -> BTreeSet<Identity> {
        self.threads
            .iter()
            .flat_map(|thread| thread.participants(normalizer).into_keys())
            .collect()
    }

    /// Participants that authored nothing in any revision.
    pub fn reviewers(&self, normalizer: &Normalizer) -> BTreeSet<Identity> {
        let authors = self.authors(normalizer);
        self.participants(normalizer)
            .into_iter()
            .filter(|person| !authors.contains(person))
            .collect()
    }
}

/// Group patch threads into change-sets, ordered by key.
pub fn group_change_sets<'a>(threads: impl IntoIterator<Item = &'a Thread>) -> Vec<ChangeSet<'a>> {
    let mut by_key: BTreeMap<String, Vec<&'a Thread>> = BTreeMap::new();
    for thread in threads {
        if !thread.is_patch() {
            continue;
        }
        by_key
            .entry(change_set_key(thread.root_subject()).to_string())
            .or_default()
            .push(thread);
    }

    by_key
        .into_iter()
        .map(|(key, mut threads)| {
            threads.sort_by(|a, b| a.root_id().cmp(b.root_id()));
            ChangeSet { key, threads }
        })
        .collect()
}

/// Revision statistics over a set of change-sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSetSummary {
    pub total: usize,
    pub anomalies: usize,
    /// Threads per non-anomalous change-set
    pub revisions_avg: f64,
    /// Patches per thread of non-anomalous change-sets
    pub patches_avg: f64,
}

pub fn summarize(change_sets: &[ChangeSet<'_>]) -> ChangeSetSummary {
    let mut summary = ChangeSetSummary {
        total: change_sets.len(),
        ..Default::default()
    };

    let mut counted = 0usize;
    let mut revisions = 0usize;
    let mut patches = 0usize;
    for change_set in change_sets {
        if change_set.is_anomalous() {
            log::debug!("anomalous change-set without patches: {}", change_set.key);
            summary.anomalies += 1;
            continue;
        }
        counted += 1;
        revisions += change_set.revisions();
        patches += change_set.patch_count();
    }

    if counted > 0 {
        summary.revisions_avg = revisions as f64 / counted as f64;
    }
    if revisions > 0 {
        summary.patches_avg = patches as f64 / revisions as f64;
    }
    summary
}
