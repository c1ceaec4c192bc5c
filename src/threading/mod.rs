//! Email threading module
//!
//! Reconstructs conversations from mailing-list archives whose reference
//! headers are frequently missing, malformed or delivered out of order.
//!
//! ## Threading Strategy
//!
//! Grouping relies on headers only:
//!
//! 1. **References / In-Reply-To**: recovered into an ordered id list
//!    (`references`), the first id already known decides the thread
//! 2. **Force-root rules**: bug-tracker forwards and bot reports always start
//!    a new thread
//! 3. **Miss queue**: messages seen before their parent are retried until a
//!    fixed point (`assembler`)
//!
//! ## Module Structure
//!
//! - `references`: reference-id recovery
//! - `assembler`: the grouping passes and their counters
//! - `thread`: assembled threads and their author/participant views
//! - `classify`: subject rule table
//! - `patch_series`: series numbering and cover letters
//! - `change_set`: grouping of thread revisions

pub mod assembler;
pub mod change_set;
pub mod classify;
pub mod patch_series;
pub mod references;
pub mod thread;

// Re-export main types and functions
pub use assembler::{
    Assembly, AssemblyPolicy, AssemblyStats, MessageState, ThreadAssembler, UnresolvedMessage,
};
pub use change_set::{ChangeSet, ChangeSetSummary, change_set_key, group_change_sets, summarize};
pub use classify::{Classification, classify};
pub use patch_series::{SeriesInfo, extract_series_info, is_cover_letter};
pub use thread::Thread;
