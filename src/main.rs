use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use ml_stat::archive::{ArchiveSource, MessageDir, ParseSummary, PublicInboxMirror, read_messages};
use ml_stat::config::RunConfig;
use ml_stat::history::{AuthorHistory, CommitLog};
use ml_stat::identity::{
    CandidateGroup, GroupingKind, MappingDb, OperatorChoice, OperatorChoices, PolicyChoices,
    TerminalPrompt, find_candidates, reconcile,
};
use ml_stat::models::RawMessage;
use ml_stat::pipeline::{analyze, tenure};
use ml_stat::report::{
    DEFAULT_KEYS, write_classification_issues, write_misses, write_names, write_rank, write_summary,
    write_top,
};
use ml_stat::results::{ResultStore, Snapshot};
use ml_stat::threading::AssemblyPolicy;

#[derive(Parser, Debug)]
#[command(
    name = "ml-stat",
    about = "Mailing list engagement statistics",
    group(ArgGroup::new("source").required(true).multiple(true).args(["archive", "msg_dir"]))
)]
struct Args {
    /// Mapping database (JSON with `mailmap` and `corpmap`).
    #[arg(long)]
    db: PathBuf,

    /// public-inbox v2 epoch repository to read messages from.
    #[arg(long)]
    archive: Option<PathBuf>,

    /// Directory of numbered message files; filled from --archive when both are given.
    #[arg(long)]
    msg_dir: Option<PathBuf>,

    /// How many emails to look back into the archive.
    #[arg(long)]
    email_count: usize,

    /// Print the stats by company rather than by person.
    #[arg(long)]
    corp: bool,

    /// Walk through likely-duplicate identities and propose mailmap entries.
    #[arg(long)]
    check: bool,

    /// With --check, accept every email-based group without asking.
    #[arg(long, requires = "check")]
    auto_accept: bool,

    /// Print messages whose thread could not be found.
    #[arg(long)]
    dump_miss: bool,

    /// Print every identity key.
    #[arg(long)]
    name_dump: bool,

    /// Print the rank of these people instead of the top lists.
    #[arg(long, num_args = 1..)]
    name: Vec<String>,

    /// How many extra entries to add to the top lists.
    #[arg(long, default_value_t = 0)]
    top_extra: usize,

    /// Git tree used to compute contributor tenure.
    #[arg(long)]
    linux: Option<PathBuf>,

    /// Revision whose history is used for tenure.
    #[arg(long, default_value = "HEAD", requires = "linux")]
    history: String,

    /// Add the results into this JSON file.
    #[arg(long)]
    json_out: Option<PathBuf>,
}

fn load_messages(
    args: &Args,
) -> Result<(Vec<RawMessage>, ParseSummary), Box<dyn std::error::Error>> {
    let source: Box<dyn ArchiveSource> = match (&args.archive, &args.msg_dir) {
        (Some(archive), Some(dir)) => {
            let dir = MessageDir::new(dir);
            dir.populate(&PublicInboxMirror::new(archive), args.email_count)?;
            Box::new(dir)
        }
        (Some(archive), None) => Box::new(PublicInboxMirror::new(archive)),
        (None, Some(dir)) => Box::new(MessageDir::new(dir)),
        (None, None) => return Err("either --archive or --msg-dir is required".into()),
    };
    Ok(read_messages(source.as_ref(), args.email_count)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    ml_stat::init_logger();

    let args = Args::parse();
    let config = RunConfig::from_env();
    let db = MappingDb::load(&args.db)?;

    let (messages, parsed) = load_messages(&args)?;
    let results = analyze(messages, &db, AssemblyPolicy::default(), &config);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    write_classification_issues(&mut out, results.assembly.threads.values())?;
    writeln!(out, "{}", serde_json::to_string(&results.assembly.stats)?)?;
    if parsed.errors > 0 {
        writeln!(out, "unparsable messages: {}", parsed.errors)?;
    }
    writeln!(out)?;

    // With a result file the summary also shows what git-stat stored there.
    let mut snapshot = results.snapshot();
    if let Some(path) = &args.json_out {
        let mut store = ResultStore::open(path)?;
        results.store(&mut store)?;

        if let Some(linux) = &args.linux {
            let commits = CommitLog::open(linux)?.commits(&args.history)?;
            let history = AuthorHistory::build(&commits, &db.mailmap);
            store.merge_section("ages", &tenure(&results.individual, &history))?;
        }
        store.save()?;
        snapshot = Snapshot::load(&store)?;
    }
    write_summary(&mut out, "ml", &snapshot)?;

    let stats = if args.corp {
        &results.corporate
    } else {
        &results.individual
    };

    if args.dump_miss {
        write_misses(&mut out, &results.assembly.miss_report(&config.link_base))?;
    } else if args.check {
        out.flush()?;
        let groups = find_candidates(results.individual.keys().map(String::as_str), &db.mailmap);
        let mut choices: Box<dyn OperatorChoices> = if args.auto_accept {
            Box::new(PolicyChoices(|group: &CandidateGroup| {
                if group.kind == GroupingKind::Email {
                    OperatorChoice::Accept
                } else {
                    OperatorChoice::Ignore
                }
            }))
        } else {
            Box::new(TerminalPrompt::new(io::stdin().lock(), io::stderr()))
        };

        let outcome = reconcile(&groups, choices.as_mut())?;
        if outcome.proposals.is_empty() {
            writeln!(out, "No new mail map entries found")?;
        } else {
            writeln!(out, "Suggested mail map additions:")?;
            for rule in &outcome.proposals {
                writeln!(out, "\t{},", rule.to_json_entry())?;
            }
        }
    } else if args.name_dump {
        write_names(&mut out, stats)?;
    } else if !args.name.is_empty() {
        for name in &args.name {
            for key in DEFAULT_KEYS {
                write_rank(&mut out, stats, key, name)?;
            }
        }
    } else {
        for key in DEFAULT_KEYS {
            write_top(&mut out, stats, key, key.top + args.top_extra)?;
        }
    }

    out.flush()?;
    Ok(())
}
