//! End-to-end statistics over one batch of messages.

use std::collections::BTreeMap;

use crate::config::RunConfig;
use crate::error::StatError;
use crate::history::{AgeRecord, AuthorHistory, resolve_ages};
use crate::identity::{MappingDb, Normalizer};
use crate::models::{Identity, RawMessage};
use crate::results::{ResultStore, Snapshot};
use crate::stats::{Aggregator, StatMap};
use crate::threading::{
    Assembly, AssemblyPolicy, ChangeSetSummary, ThreadAssembler, group_change_sets, summarize,
};

/// Everything computed from one archive window.
#[derive(Debug, Clone)]
pub struct MailingListStats {
    pub assembly: Assembly,
    pub individual: StatMap,
    pub corporate: StatMap,
    pub change_sets: ChangeSetSummary,
}

/// Assemble threads and aggregate both person and corporate statistics.
pub fn analyze(
    messages: Vec<RawMessage>,
    db: &MappingDb,
    policy: AssemblyPolicy,
    config: &RunConfig,
) -> MailingListStats {
    let assembly = ThreadAssembler::new(policy).assemble(messages);
    let change_sets = group_change_sets(assembly.threads.values());
    let summary = summarize(&change_sets);

    let person = Normalizer::new(db.person_tables());
    let corporate = Normalizer::new(db.corporate_tables());

    let individual = Aggregator::new(&person, config.weights)
        .aggregate(assembly.threads.values(), &change_sets);
    let corporate = Aggregator::new(&corporate, config.weights)
        .aggregate(assembly.threads.values(), &change_sets);

    log::info!(
        "{} change-sets ({} anomalous), {} people, {} organizations",
        summary.total,
        summary.anomalies,
        individual.len(),
        corporate.len()
    );

    MailingListStats {
        assembly,
        individual,
        corporate,
        change_sets: summary,
    }
}

/// Ages of every person key in `individual`.
pub fn tenure(individual: &StatMap, history: &AuthorHistory) -> BTreeMap<Identity, AgeRecord> {
    resolve_ages(individual.keys().map(String::as_str), history)
}

impl MailingListStats {
    /// This run's view for the summary, without git or tenure data.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            individual: self.individual.clone(),
            corporate: self.corporate.clone(),
            count: self.assembly.count,
            first_date: self.assembly.first_date,
            last_date: self.assembly.last_date,
            ..Default::default()
        }
    }

    /// Write all sections this run owns into the store.
    pub fn store(&self, store: &mut ResultStore) -> Result<(), StatError> {
        store.set_section("individual", &self.individual)?;
        store.set_section("corporate", &self.corporate)?;
        store.set_section("change_sets", &self.change_sets)?;
        store.set_section("assembly", &self.assembly.stats)?;
        store.set_section("count", &self.assembly.count)?;
        store.set_section("first_date", &self.assembly.first_date)?;
        store.set_section("last_date", &self.assembly.last_date)?;
        Ok(())
    }
}
