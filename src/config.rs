//! Runtime tunables read from the environment.
//!
//! Paths and modes come from the command line; the knobs below are policy
//! constants that operators occasionally adjust without touching the CLI.

use std::env;

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<i64>().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Coefficients of the engagement score.
///
/// Reviewing is rewarded and authored volume is discounted. The defaults are
/// empirical and only their relative ranking effect matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreWeights {
    pub reviewer_change_sets: i64,
    pub reviewer_threads: i64,
    /// Applied to reviewer messages beyond the first one
    pub reviewer_extra_messages: i64,
    pub author_threads: i64,
    /// Authored messages are divided by this before being subtracted
    pub author_message_divisor: i64,
}

impl ScoreWeights {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            reviewer_change_sets: env_i64(
                "ML_STAT_SCORE_REVIEWER_CS",
                defaults.reviewer_change_sets,
            ),
            reviewer_threads: env_i64("ML_STAT_SCORE_REVIEWER_THR", defaults.reviewer_threads),
            reviewer_extra_messages: env_i64(
                "ML_STAT_SCORE_REVIEWER_MSG",
                defaults.reviewer_extra_messages,
            ),
            author_threads: env_i64("ML_STAT_SCORE_AUTHOR_THR", defaults.author_threads),
            author_message_divisor: env_i64(
                "ML_STAT_SCORE_AUTHOR_MSG_DIV",
                defaults.author_message_divisor,
            ),
        }
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            reviewer_change_sets: 5,
            reviewer_threads: 10,
            reviewer_extra_messages: 2,
            author_threads: 3,
            author_message_divisor: 2,
        }
    }
}

/// Everything a statistics run needs besides its inputs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub weights: ScoreWeights,
    /// Prefix turning a Message-ID into a stable archive link
    pub link_base: String,
}

impl RunConfig {
    pub fn from_env() -> Self {
        Self {
            weights: ScoreWeights::from_env(),
            link_base: env_string("ML_STAT_LINK_BASE", "https://lore.kernel.org/r/"),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            link_base: "https://lore.kernel.org/r/".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_favor_threads_over_change_sets() {
        let weights = ScoreWeights::default();
        assert!(weights.reviewer_threads > weights.reviewer_change_sets);
        assert!(weights.author_message_divisor > 0);
    }

    #[test]
    fn test_env_i64_falls_back_on_missing_key() {
        assert_eq!(env_i64("ML_STAT_TEST_UNSET_KEY_FOR_DEFAULTS", 7), 7);
    }
}
