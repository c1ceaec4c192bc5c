//! Per-identity contribution records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ScoreWeights;
use crate::models::Identity;

/// Activity in one role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleStat {
    /// Distinct change-sets
    pub cs: u64,
    /// Distinct threads
    pub thr: u64,
    /// Message occurrences
    pub msg: u64,
}

/// Signed engagement score, stored twice so that both ends sort descending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub positive: i64,
    pub negative: i64,
}

impl Score {
    pub fn new(value: i64) -> Self {
        Score {
            positive: value,
            negative: -value,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonStat {
    pub author: RoleStat,
    pub reviewer: RoleStat,
    pub score: Score,
}

/// Statistics keyed by identity (or organization in corporate mode).
pub type StatMap = BTreeMap<Identity, PersonStat>;

impl PersonStat {
    /// Compute the score from the role counters.
    pub fn score_with(&self, weights: &ScoreWeights) -> i64 {
        // Not clamped: a pure author pays for the missing first reply.
        let reviewer_extra = self.reviewer.msg as i64 - 1;
        let authored_volume = (self.author.msg as i64)
            .checked_div(weights.author_message_divisor)
            .unwrap_or(0);

        weights.reviewer_change_sets * self.reviewer.cs as i64
            + weights.reviewer_threads * self.reviewer.thr as i64
            + weights.reviewer_extra_messages * reviewer_extra
            - weights.author_threads * self.author.thr as i64
            - authored_volume
    }

    pub fn rescore(&mut self, weights: &ScoreWeights) {
        self.score = Score::new(self.score_with(weights));
    }
}
