//! Statistics over commits applied directly by maintainers.
//!
//! A commit counts as reviewed when an `Acked-by:` or `Reviewed-by:` trailer
//! appears before the maintainer's own `Signed-off-by:`. The review is
//! cross-company when the trailer line does not mention the author's email
//! domain. Commits touching the selftests are counted a second time on their
//! own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::history::commits::CommitRecord;
use crate::identity::MappingTable;
use crate::models::Identity;

const REVIEW_TRAILERS: &[&str] = &["Acked-by:", "Reviewed-by:"];

/// Tree path whose commits make up the test counters.
pub const SELFTESTS_PATH: &str = "tools/testing/selftests";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewCoverage {
    pub reviewed: usize,
    /// Share of maintainer-signed commits, in percent, two decimals
    pub pct: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Reviews {
    pub any: ReviewCoverage,
    #[serde(rename = "x-company")]
    pub x_company: ReviewCoverage,
}

/// The `git` result section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaintainerStats {
    pub direct_commits: usize,
    /// Direct commits touching [`SELFTESTS_PATH`]
    pub direct_test_commits: usize,
    pub reviews: Reviews,
    pub commit_authors: BTreeMap<Identity, u64>,
    pub test_commit_authors: BTreeMap<Identity, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_commit: Option<String>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round2(part as f64 * 100.0 / whole as f64)
    }
}

fn committed_by(commit: &CommitRecord, maintainers: &[String]) -> bool {
    let committer = commit.committer();
    maintainers.iter().any(|m| committer.contains(m.as_str()))
}

/// Review trailers seen before the maintainer sign-off, `None` without one.
fn review_counts(commit: &CommitRecord, maintainers: &[String]) -> Option<(usize, usize)> {
    let domain = commit
        .author_email
        .rsplit_once('@')
        .map(|(_, domain)| domain.to_lowercase())
        .unwrap_or_default();

    let mut any = 0;
    let mut cross = 0;
    for line in commit.message.lines() {
        if REVIEW_TRAILERS.iter().any(|t| line.contains(t)) {
            any += 1;
            if domain.is_empty() || !line.to_lowercase().contains(&domain) {
                cross += 1;
            }
        }
        if line.contains("Signed-off-by:") && maintainers.iter().any(|m| line.contains(m.as_str())) {
            return Some((any, cross));
        }
    }
    None
}

/// Compute the `git` section for commits applied by `maintainers`.
///
/// ## Arguments
///
/// * `commits` - non-merge commits of the range
/// * `test_commits` - the subset of `commits` touching [`SELFTESTS_PATH`]
/// * `maintainers` - substrings matched against `Name <email>` of the committer
/// * `mailmap` - applied to commit authors before counting
pub fn maintainer_stats(
    commits: &[CommitRecord],
    test_commits: &[CommitRecord],
    maintainers: &[String],
    mailmap: &MappingTable,
) -> MaintainerStats {
    let mut stats = MaintainerStats::default();
    let mut signed = 0usize;

    for commit in test_commits.iter().filter(|c| committed_by(c, maintainers)) {
        stats.direct_test_commits += 1;
        *stats
            .test_commit_authors
            .entry(mailmap.apply(&commit.author()))
            .or_insert(0) += 1;
    }

    for commit in commits.iter().filter(|c| committed_by(c, maintainers)) {
        stats.direct_commits += 1;
        *stats
            .commit_authors
            .entry(mailmap.apply(&commit.author()))
            .or_insert(0) += 1;

        if let Some((any, cross)) = review_counts(commit, maintainers) {
            signed += 1;
            if any > 0 {
                stats.reviews.any.reviewed += 1;
            }
            if cross > 0 {
                stats.reviews.x_company.reviewed += 1;
            }
        }
    }

    stats.reviews.any.pct = percent(stats.reviews.any.reviewed, signed);
    stats.reviews.x_company.pct = percent(stats.reviews.x_company.reviewed, signed);

    log::info!(
        "{} direct commits ({} to selftests), {} signed, {} reviewed",
        stats.direct_commits,
        stats.direct_test_commits,
        signed,
        stats.reviews.any.reviewed
    );
    stats
}
