//! Identity resolution: turning raw sender strings into statistics keys.
//!
//! - `mapping`: the mailmap/corpmap rule tables and their JSON database
//! - `normalize`: sender canonicalization and the bot denylist
//! - `audit`: detection of likely-duplicate identities
//! - `choices`: operator decision sources for the audit loop
//! - `gitdm`: corporate affiliation proposals from a gitdm export

pub mod audit;
pub mod choices;
pub mod gitdm;
pub mod mapping;
pub mod normalize;

pub use audit::{AuditOutcome, CandidateGroup, GroupingKind, find_candidates, reconcile};
pub use choices::{OperatorChoice, OperatorChoices, PolicyChoices, ScriptedChoices, TerminalPrompt};
pub use gitdm::GitdmDb;
pub use mapping::{MappingDb, MappingError, MappingRule, MappingTable};
pub use normalize::{BOT_SENDERS, Normalizer};
