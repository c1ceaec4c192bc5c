//! Author/reviewer tallies over threads and change-sets.
//!
//! For every thread the authors are the senders of the root and of any patch
//! or pull-request message; every other participant is a reviewer of that
//! thread. Change-sets apply the same split over the union of their threads.

use std::collections::BTreeMap;

use crate::config::ScoreWeights;
use crate::identity::Normalizer;
use crate::stats::person::{PersonStat, StatMap};
use crate::threading::{ChangeSet, Thread};

pub struct Aggregator<'n> {
    normalizer: &'n Normalizer,
    weights: ScoreWeights,
}

impl<'n> Aggregator<'n> {
    pub fn new(normalizer: &'n Normalizer, weights: ScoreWeights) -> Self {
        Self {
            normalizer,
            weights,
        }
    }

    /// Tally threads and change-sets, then score everyone.
    pub fn aggregate<'a>(
        &self,
        threads: impl IntoIterator<Item = &'a Thread>,
        change_sets: &[ChangeSet<'_>],
    ) -> StatMap {
        let mut stats = StatMap::new();

        let mut thread_count = 0usize;
        for thread in threads {
            self.tally_thread(thread, &mut stats);
            thread_count += 1;
        }
        for change_set in change_sets {
            self.tally_change_set(change_set, &mut stats);
        }

        for stat in stats.values_mut() {
            stat.rescore(&self.weights);
        }

        log::info!(
            "aggregated {} threads and {} change-sets into {} identities",
            thread_count,
            change_sets.len(),
            stats.len()
        );
        stats
    }

    fn tally_thread(&self, thread: &Thread, stats: &mut StatMap) {
        let authors = thread.authors(self.normalizer);
        let participants = thread.participants(self.normalizer);

        for (person, sent) in participants {
            let entry = stats.entry(person.clone()).or_insert_with(PersonStat::default);
            match authors.get(&person) {
                Some(authored) => {
                    entry.author.thr += 1;
                    entry.author.msg += authored;
                }
                None => {
                    entry.reviewer.thr += 1;
                    entry.reviewer.msg += sent;
                }
            }
        }
    }

    fn tally_change_set(&self, change_set: &ChangeSet<'_>, stats: &mut StatMap) {
        let authors = change_set.authors(self.normalizer);
        for person in change_set.participants(self.normalizer) {
            let is_author = authors.contains(&person);
            let entry = stats.entry(person).or_insert_with(PersonStat::default);
            if is_author {
                entry.author.cs += 1;
            } else {
                entry.reviewer.cs += 1;
            }
        }
    }
}

/// Count people acting only as author, only as reviewer, or both.
pub fn role_counts(stats: &StatMap) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::from([("author", 0), ("commenter", 0), ("both", 0)]);
    for stat in stats.values() {
        let key = match (stat.author.msg > 0, stat.reviewer.msg > 0) {
            (true, true) => "both",
            (false, true) => "commenter",
            (true, false) => "author",
            (false, false) => continue,
        };
        if let Some(count) = counts.get_mut(key) {
            *count += 1;
        }
    }
    counts
}
