use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;

use ml_stat::history::{AuthorHistory, CommitLog, SELFTESTS_PATH, maintainer_stats, resolve_ages};
use ml_stat::identity::MappingDb;
use ml_stat::results::ResultStore;

#[derive(Parser, Debug)]
#[command(
    name = "git-stat",
    about = "Review coverage of commits applied by maintainers"
)]
struct Args {
    /// Path to the project git tree.
    #[arg(long)]
    linux: PathBuf,

    /// First commit of the window (exclusive).
    #[arg(long)]
    start_commit: String,

    /// Last commit of the window, HEAD when omitted.
    #[arg(long)]
    end_commit: Option<String>,

    /// Mapping database used to merge author identities.
    #[arg(long)]
    db: PathBuf,

    /// Maintainer names or emails, matched against committer and sign-offs.
    #[arg(long, num_args = 1.., required = true)]
    maintainers: Vec<String>,

    /// Add the results into this JSON file.
    #[arg(long)]
    json_out: Option<PathBuf>,

    /// Skip resolving author tenure.
    #[arg(long)]
    no_ages: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    ml_stat::init_logger();

    let args = Args::parse();
    let db = MappingDb::load(&args.db)?;
    let log = CommitLog::open(&args.linux)?;

    let end = args.end_commit.as_deref().unwrap_or("HEAD");
    let range = format!("{}..{}", args.start_commit, end);
    let commits = log.commits(&range)?;
    log::info!("{} commits in {}", commits.len(), range);

    let test_commits = log.touching(&commits, SELFTESTS_PATH)?;

    let mut stats = maintainer_stats(&commits, &test_commits, &args.maintainers, &db.mailmap);
    stats.start_commit = Some(log.resolve(&args.start_commit)?.to_string());
    stats.end_commit = Some(log.resolve(end)?.to_string());

    let ages = if args.no_ages {
        None
    } else {
        let history = AuthorHistory::build(&log.commits("HEAD")?, &db.mailmap);
        Some(resolve_ages(
            stats.commit_authors.keys().map(String::as_str),
            &history,
        ))
    };

    match &args.json_out {
        Some(path) => {
            let mut store = ResultStore::open(path)?;
            store.set_section("git", &stats)?;
            if let Some(ages) = &ages {
                store.merge_section("ages", ages)?;
            }
            store.save()?;
        }
        None => {
            let mut out = io::stdout().lock();
            writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
            if let Some(ages) = &ages {
                writeln!(out, "{}", serde_json::to_string_pretty(ages)?)?;
            }
        }
    }

    Ok(())
}
