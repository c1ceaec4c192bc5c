use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use serde_json::Value;

use ml_stat::identity::GitdmDb;
use ml_stat::results::ResultStore;

#[derive(Parser, Debug)]
#[command(
    name = "gitdm-resolve",
    about = "Propose corpmap entries for unmapped people from a gitdm database"
)]
struct Args {
    /// Results file written by `ml-stat --json-out`.
    #[arg(long)]
    results: PathBuf,

    /// gitdm developer database (tab separated `corp email name stat`).
    #[arg(long)]
    gitdm: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    ml_stat::init_logger();

    let args = Args::parse();
    let store = ResultStore::open(&args.results)?;
    let corporate: BTreeMap<String, Value> = store
        .section_as("corporate")?
        .ok_or_else(|| format!("no corporate section in {}", args.results.display()))?;

    let gitdm = GitdmDb::load(&args.gitdm)?;
    let rules = gitdm.propose(corporate.keys().map(String::as_str));
    log::info!(
        "{} of {} corporate keys resolved through gitdm",
        rules.len(),
        corporate.len()
    );

    let mut out = io::stdout().lock();
    for rule in &rules {
        writeln!(out, "{},", rule.to_json_entry())?;
    }
    Ok(())
}
