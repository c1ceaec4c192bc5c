//! Mailing-list engagement statistics.
//!
//! Turns a window of a mailing-list archive and the project's commit history
//! into per-person and per-organization authoring/reviewing statistics:
//!
//! - `archive`: reading and parsing raw messages
//! - `threading`: thread reconstruction, classification, change-sets
//! - `identity`: sender normalization, mapping tables, duplicate auditing
//! - `stats`: author/reviewer tallies and scoring
//! - `history`: commit log, tenure, maintainer statistics
//! - `results` / `report`: JSON accumulator and text output

pub mod archive;
pub mod config;
pub mod error;
pub mod history;
pub mod identity;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod results;
pub mod stats;
pub mod threading;

use env_logger::Env;
use std::sync::Once;

pub use error::StatError;

static LOGGER: Once = Once::new();

/// Initialize `env_logger` once; `RUST_LOG` overrides the default level.
pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info"))
            .format_timestamp(None)
            .init();
    });
}
