//! Contribution statistics.

pub mod aggregate;
pub mod person;

pub use aggregate::{Aggregator, role_counts};
pub use person::{PersonStat, RoleStat, Score, StatMap};
