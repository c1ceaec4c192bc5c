use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;

use ml_stat::report::{write_comparison, write_summary, write_tenure_histogram};
use ml_stat::results::{ResultStore, Snapshot};

#[derive(Parser, Debug)]
#[command(
    name = "stat-print",
    about = "Compare two result files and print rank movement and tenure"
)]
struct Args {
    /// Result files of the previous and the current window.
    #[arg(long, num_args = 2, required = true, value_names = ["PREV", "CURR"])]
    ml_stats: Vec<PathBuf>,

    /// How many extra entries to add to the top lists.
    #[arg(long, default_value_t = 0)]
    top_extra: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    ml_stat::init_logger();

    let args = Args::parse();
    let prev = Snapshot::load(&ResultStore::open(&args.ml_stats[0])?)?;
    let curr = Snapshot::load(&ResultStore::open(&args.ml_stats[1])?)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    write_summary(&mut out, "Prev", &prev)?;
    write_summary(&mut out, "Curr", &curr)?;

    // Counts are per week of the current window.
    let weeks = curr.weeks().unwrap_or(1);
    write_comparison(&mut out, &prev.individual, &curr.individual, args.top_extra, weeks)?;
    writeln!(out)?;
    write_comparison(&mut out, &prev.corporate, &curr.corporate, args.top_extra, weeks)?;

    if curr.ages.is_empty() {
        log::warn!("no ages section in {}, skipping tenure", args.ml_stats[1].display());
    } else {
        let now = Utc::now();
        let scale = write_tenure_histogram(&mut out, &curr, "reviewer", now, None)?;
        write_tenure_histogram(&mut out, &curr, "author", now, Some(scale))?;
    }

    out.flush()?;
    Ok(())
}
