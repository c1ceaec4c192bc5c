//! Commit history: log access, tenure and maintainer statistics.

pub mod commits;
pub mod maintainer;
pub mod tenure;

pub use commits::{CommitLog, CommitRecord, GitError, parse_range};
pub use maintainer::{MaintainerStats, ReviewCoverage, Reviews, SELFTESTS_PATH, maintainer_stats};
pub use tenure::{AgeRecord, AuthorHistory, resolve_ages, split_name_email};
