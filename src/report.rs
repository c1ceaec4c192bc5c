//! Plain-text reports.
//!
//! Every writer takes an `io::Write` so binaries print to stdout and tests
//! capture into a buffer.

use std::collections::HashMap;
use std::io::{self, Write};

use chrono::{DateTime, Utc};

use crate::results::Snapshot;
use crate::stats::{PersonStat, StatMap, role_counts};
use crate::threading::{Classification, Thread, UnresolvedMessage};

/// One counter of a [`PersonStat`], e.g. `reviewer`/`thr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatKey {
    pub role: &'static str,
    pub counter: &'static str,
    /// Default length of the top list
    pub top: usize,
}

impl StatKey {
    pub const fn new(role: &'static str, counter: &'static str, top: usize) -> Self {
        Self { role, counter, top }
    }

    pub fn value(&self, stat: &PersonStat) -> i64 {
        let role = match self.role {
            "author" => &stat.author,
            "reviewer" => &stat.reviewer,
            _ => {
                return match self.counter {
                    "positive" => stat.score.positive,
                    "negative" => stat.score.negative,
                    _ => 0,
                };
            }
        };
        let value = match self.counter {
            "cs" => role.cs,
            "thr" => role.thr,
            "msg" => role.msg,
            _ => 0,
        };
        value as i64
    }
}

/// Tables printed by default.
pub const DEFAULT_KEYS: &[StatKey] = &[
    StatKey::new("reviewer", "thr", 10),
    StatKey::new("reviewer", "msg", 10),
    StatKey::new("author", "thr", 15),
    StatKey::new("author", "msg", 10),
    StatKey::new("score", "positive", 15),
    StatKey::new("score", "negative", 15),
];

/// Everyone ordered by `key`, highest first, ties by name.
pub fn ranked<'s>(stats: &'s StatMap, key: &StatKey) -> Vec<(&'s str, i64)> {
    let mut rows: Vec<(&str, i64)> = stats
        .iter()
        .map(|(person, stat)| (person.as_str(), key.value(stat)))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    rows
}

pub fn write_top<W: Write>(out: &mut W, stats: &StatMap, key: &StatKey, n: usize) -> io::Result<()> {
    writeln!(out, "Top {} {}s ({}):", n, key.role, key.counter)?;
    for (i, (person, value)) in ranked(stats, key).into_iter().take(n).enumerate() {
        writeln!(out, "  {:2}. [{:3}] {}", i + 1, value, person)?;
    }
    writeln!(out)
}

/// Position of one person in the `key` ranking. Returns `false` if unknown.
pub fn write_rank<W: Write>(
    out: &mut W,
    stats: &StatMap,
    key: &StatKey,
    person: &str,
) -> io::Result<bool> {
    let rows = ranked(stats, key);
    let Some(position) = rows.iter().position(|(p, _)| *p == person) else {
        return Ok(false);
    };
    writeln!(out, "{} ({}):", key.role, key.counter)?;
    writeln!(
        out,
        "  #{:2}. [{:3}] {}",
        position + 1,
        rows[position].1,
        person
    )?;
    Ok(true)
}

pub fn write_names<W: Write>(out: &mut W, stats: &StatMap) -> io::Result<()> {
    writeln!(out, "Names ({}):", stats.len())?;
    for person in stats.keys() {
        writeln!(out, "  {}", person)?;
    }
    Ok(())
}

pub fn write_misses<W: Write>(out: &mut W, misses: &[UnresolvedMessage]) -> io::Result<()> {
    for miss in misses {
        writeln!(out, "{}\t{}\t{}", miss.subject, miss.date, miss.link)?;
    }
    Ok(())
}

/// Threads the classifier could not place, by root subject.
pub fn write_classification_issues<'a, W: Write>(
    out: &mut W,
    threads: impl IntoIterator<Item = &'a Thread> + Clone,
) -> io::Result<()> {
    for (title, class) in [("Unknown", Classification::Unknown), ("Bad", Classification::Bad)] {
        writeln!(out, "{}:", title)?;
        for thread in threads.clone() {
            if thread.classification() == class {
                writeln!(out, "  {}", thread.root_subject())?;
            }
        }
    }
    Ok(())
}

fn per_day(total: usize, days: i64) -> i64 {
    (total as f64 / days as f64).round() as i64
}

/// Header block: time span, volume, role split and, once `git-stat` ran,
/// the direct-commit and review lines.
pub fn write_summary<W: Write>(out: &mut W, label: &str, snapshot: &Snapshot) -> io::Result<()> {
    if let (Some(first), Some(last)) = (snapshot.first_date, snapshot.last_date) {
        writeln!(
            out,
            "{}: start: {}\n\tend: {}",
            label,
            first.to_rfc2822(),
            last.to_rfc2822()
        )?;
    }
    let days = snapshot.days();
    match days {
        Some(days) => writeln!(
            out,
            "{}: messages: {} days: {} ({} msg/day)",
            label,
            snapshot.count,
            days,
            per_day(snapshot.count, days)
        )?,
        None => writeln!(out, "{}: messages: {}", label, snapshot.count)?,
    }
    if let Some(git) = &snapshot.git {
        match days {
            Some(days) => writeln!(
                out,
                "{}: direct commits: {} ({} commits/day)",
                label,
                git.direct_commits,
                per_day(git.direct_commits, days)
            )?,
            None => writeln!(out, "{}: direct commits: {}", label, git.direct_commits)?,
        }
    }

    let counts = role_counts(&snapshot.individual);
    writeln!(
        out,
        "{}: people/aliases: {}  author: {} commenter: {} both: {}",
        label,
        snapshot.individual.len(),
        counts.get("author").copied().unwrap_or(0),
        counts.get("commenter").copied().unwrap_or(0),
        counts.get("both").copied().unwrap_or(0)
    )?;
    if let Some(git) = &snapshot.git {
        writeln!(
            out,
            "{}: review pct: {}%  x-corp pct: {}%",
            label, git.reviews.any.pct, git.reviews.x_company.pct
        )?;
    }
    writeln!(out)
}

/// Counter pairs printed side by side when comparing two windows.
pub const COMPARED_KEYS: &[(StatKey, StatKey)] = &[
    (StatKey::new("reviewer", "thr", 15), StatKey::new("reviewer", "msg", 15)),
    (StatKey::new("author", "thr", 15), StatKey::new("author", "msg", 15)),
    (StatKey::new("score", "positive", 15), StatKey::new("score", "negative", 15)),
];

/// Top `n` of `curr` by `key` with their movement since `prev`.
///
/// Values are divided by `div` (the window length in weeks) and the rank
/// change is `**` for newcomers, `==` for an unchanged position, `+N`/`-N`
/// otherwise. Names are printed without their address.
pub fn compared_top(
    prev: &StatMap,
    curr: &StatMap,
    key: &StatKey,
    n: usize,
    div: i64,
) -> Vec<String> {
    let previous: HashMap<&str, usize> = ranked(prev, key)
        .into_iter()
        .enumerate()
        .map(|(i, (person, _))| (person, i + 1))
        .collect();
    let div = div.max(1) as f64;

    let mut lines = vec![format!("Top {} {}s ({}):", n, key.role, key.counter)];
    let mut width = 1;
    for (i, (person, value)) in ranked(curr, key).into_iter().take(n).enumerate() {
        let position = i + 1;
        let movement = match previous.get(person) {
            None => "**".to_string(),
            Some(&before) if before == position => "==".to_string(),
            Some(&before) => format!("{:+}", before as i64 - position as i64),
        };
        let value = (value as f64 / div).round() as i64;
        width = width.max(value.to_string().len());
        let name = person.split(" <").next().unwrap_or(person);
        lines.push(format!(
            "  {:2} ({}) [{:>width$}] {}",
            position,
            movement,
            value,
            name,
            width = width
        ));
    }
    lines
}

/// Side-by-side top lists of `curr` against `prev` for [`COMPARED_KEYS`].
pub fn write_comparison<W: Write>(
    out: &mut W,
    prev: &StatMap,
    curr: &StatMap,
    top_extra: usize,
    div: i64,
) -> io::Result<()> {
    for (left_key, right_key) in COMPARED_KEYS {
        let left = compared_top(prev, curr, left_key, left_key.top + top_extra, div);
        let right = compared_top(prev, curr, right_key, right_key.top + top_extra, div);
        for (l, r) in left.iter().zip(right.iter()) {
            writeln!(out, "{}", format!("{:36} {:36}", l, r).trim_end())?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn tenure_label(lower: u32, upper: u32) -> String {
    match upper {
        0..=3 => format!(" 0-{:2}mo", upper),
        4..=11 => format!("{:2}-{:2}mo", upper / 2, upper),
        12 => format!("{}mo-{}yr", upper / 2, upper / 12),
        _ => format!("{:2}-{:2}yr", lower / 12, upper / 12),
    }
}

/// Histogram of how long the people active in `role` have been committing.
///
/// Buckets are in 30-day months, doubling up to two years and growing by
/// two years after that. People missing from `ages` are `unknown`, those
/// with no commit at all `no commit`.
///
/// ## Returns
///
/// Stars per person, to pass back in as `per_dot` so that several
/// histograms share a scale.
pub fn write_tenure_histogram<W: Write>(
    out: &mut W,
    snapshot: &Snapshot,
    role: &'static str,
    now: DateTime<Utc>,
    per_dot: Option<f64>,
) -> io::Result<f64> {
    let key = StatKey::new(role, "msg", 0);
    let mut unknown = 0;
    let mut no_commit = 0;
    let mut months = Vec::new();
    for (person, stat) in &snapshot.individual {
        if key.value(stat) == 0 {
            continue;
        }
        match snapshot.ages.get(person) {
            None => unknown += 1,
            Some(None) => no_commit += 1,
            Some(Some(start)) => months.push((now - *start).num_seconds() as f64 / 86_400.0 / 30.0),
        }
    }

    let mut rows = vec![
        ("unknown".to_string(), unknown, '*'),
        ("no commit".to_string(), no_commit, '*'),
    ];
    let (mut lower, mut upper) = (0u32, 3u32);
    while !months.is_empty() {
        let (inside, rest): (Vec<f64>, Vec<f64>) =
            months.into_iter().partition(|m| *m < f64::from(upper));
        let dot = if upper >= 24 { '#' } else { '*' };
        rows.push((tenure_label(lower, upper), inside.len(), dot));
        months = rest;
        lower = upper;
        upper = if upper < 24 { upper * 2 } else { upper + 24 };
    }

    let per_dot = per_dot.unwrap_or_else(|| {
        let most = rows.iter().map(|(_, count, _)| *count).max().unwrap_or(0);
        if most == 0 { 0.0 } else { 50.0 / most as f64 }
    });

    writeln!(out, "Tenure histogram for {}", role)?;
    for (label, count, dot) in &rows {
        let bar = dot.to_string().repeat((*count as f64 * per_dot) as usize);
        writeln!(out, "{:9} | {:3} | {}", label, count, bar)?;
    }
    writeln!(out)?;
    Ok(per_dot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::history::MaintainerStats;
    use crate::stats::RoleStat;

    fn stats() -> StatMap {
        let mut stats = StatMap::new();
        stats.insert(
            "Ann <ann@a.org>".to_string(),
            PersonStat {
                reviewer: RoleStat { cs: 1, thr: 3, msg: 4 },
                ..Default::default()
            },
        );
        stats.insert(
            "Bob <bob@b.org>".to_string(),
            PersonStat {
                reviewer: RoleStat { cs: 2, thr: 7, msg: 9 },
                ..Default::default()
            },
        );
        stats
    }

    #[test]
    fn test_top_is_descending() {
        let mut out = Vec::new();
        write_top(&mut out, &stats(), &StatKey::new("reviewer", "thr", 10), 1).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Top 1 reviewers (thr):"));
        assert!(text.contains("   1. [  7] Bob <bob@b.org>"));
        assert!(!text.contains("Ann"));
    }

    #[test]
    fn test_rank_of_person() {
        let mut out = Vec::new();
        let key = StatKey::new("reviewer", "msg", 10);
        assert!(write_rank(&mut out, &stats(), &key, "Ann <ann@a.org>").unwrap());
        assert!(!write_rank(&mut out, &stats(), &key, "Nobody <n@x>").unwrap());
        assert!(String::from_utf8(out).unwrap().contains("# 2. [  4] Ann"));
    }

    fn date(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            individual: stats(),
            count: 40,
            first_date: Some(date("2024-01-01T10:00:00Z")),
            last_date: Some(date("2024-01-11T10:00:00Z")),
            ..Default::default()
        }
    }

    #[test]
    fn test_summary_counts_days() {
        let mut out = Vec::new();
        write_summary(&mut out, "ml", &snapshot()).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("ml: start: Mon, 1 Jan 2024 10:00:00 +0000"));
        assert!(text.contains("ml: messages: 40 days: 10 (4 msg/day)"));
        assert!(text.contains("people/aliases: 2  author: 0 commenter: 2 both: 0"));
        assert!(!text.contains("direct commits"));
    }

    #[test]
    fn test_summary_with_git_section() {
        let mut snapshot = snapshot();
        let mut git = MaintainerStats {
            direct_commits: 25,
            ..Default::default()
        };
        git.reviews.any.pct = 62.5;
        git.reviews.x_company.pct = 12.5;
        snapshot.git = Some(git);

        let mut out = Vec::new();
        write_summary(&mut out, "Curr", &snapshot).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Curr: direct commits: 25 (3 commits/day)"));
        assert!(text.contains("Curr: review pct: 62.5%  x-corp pct: 12.5%"));
    }

    #[test]
    fn test_compared_top_marks_movement() {
        let prev = stats();
        let mut curr = stats();
        curr.insert(
            "Cat <cat@c.org>".to_string(),
            PersonStat {
                reviewer: RoleStat { cs: 0, thr: 30, msg: 30 },
                ..Default::default()
            },
        );
        curr.get_mut("Ann <ann@a.org>").unwrap().reviewer.thr = 8;
        let key = StatKey::new("reviewer", "thr", 15);

        // Two weeks: values are halved.
        let lines = compared_top(&prev, &curr, &key, 3, 2);
        assert_eq!(lines[0], "Top 3 reviewers (thr):");
        assert_eq!(lines[1], "   1 (**) [15] Cat");
        assert_eq!(lines[2], "   2 (==) [ 4] Ann");
        assert_eq!(lines[3], "   3 (-2) [ 4] Bob");

        let lines = compared_top(&curr, &prev, &key, 2, 1);
        assert_eq!(lines[1], "   1 (+2) [7] Bob");
        assert_eq!(lines[2], "   2 (==) [3] Ann");
    }

    #[test]
    fn test_unchanged_rank_is_marked_equal() {
        let lines = compared_top(&stats(), &stats(), &StatKey::new("reviewer", "msg", 15), 2, 1);
        assert_eq!(lines[1], "   1 (==) [9] Bob");
        assert_eq!(lines[2], "   2 (==) [4] Ann");
    }

    #[test]
    fn test_comparison_pairs_columns() {
        let mut out = Vec::new();
        write_comparison(&mut out, &stats(), &stats(), 0, 1).unwrap();
        let text = String::from_utf8(out).unwrap();

        let first = text.lines().next().unwrap();
        assert!(first.starts_with("Top 15 reviewers (thr):"));
        assert!(first.ends_with("Top 15 reviewers (msg):"));
        assert!(text.contains("Top 15 scores (positive):"));
    }

    #[test]
    fn test_tenure_histogram_buckets() {
        let now = date("2024-07-01T00:00:00Z");
        let mut snapshot = snapshot();
        let reviewer = PersonStat {
            reviewer: RoleStat { cs: 0, thr: 1, msg: 1 },
            ..Default::default()
        };
        for person in ["Cat <cat@c.org>", "Dan <dan@d.org>", "Eve <eve@e.org>"] {
            snapshot.individual.insert(person.to_string(), reviewer);
        }
        snapshot.ages = BTreeMap::from([
            ("Ann <ann@a.org>".to_string(), Some(date("2024-06-01T00:00:00Z"))),
            ("Bob <bob@b.org>".to_string(), Some(date("2024-03-01T00:00:00Z"))),
            ("Cat <cat@c.org>".to_string(), Some(date("2020-01-01T00:00:00Z"))),
            ("Dan <dan@d.org>".to_string(), None),
        ]);

        let mut out = Vec::new();
        let scale = write_tenure_histogram(&mut out, &snapshot, "reviewer", now, None).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(scale, 50.0);
        assert_eq!(lines[0], "Tenure histogram for reviewer");
        assert!(lines[1].starts_with("unknown   |   1 | *"));
        assert!(lines[2].starts_with("no commit |   1 | *"));
        assert!(lines[3].starts_with(" 0- 3mo   |   1 |"));
        assert!(lines[4].starts_with(" 3- 6mo   |   1 |"));
        assert!(lines[5].starts_with("6mo-1yr   |   0 |"));
        assert!(lines[6].starts_with(" 1- 2yr   |   0 |"));
        assert!(lines[7].starts_with(" 2- 4yr   |   0 |"));
        assert!(lines[8].starts_with(" 4- 6yr   |   1 | #"));
        assert_eq!(lines[9], "");
        assert_eq!(lines.len(), 10);

        // Authors reuse the reviewer scale and nobody authored anything.
        let mut out = Vec::new();
        write_tenure_histogram(&mut out, &snapshot, "author", now, Some(scale)).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(text.contains("unknown   |   0 | \n"));
    }

    #[test]
    fn test_score_key_reads_score() {
        let mut stat = PersonStat::default();
        stat.score.positive = 5;
        stat.score.negative = -5;
        assert_eq!(StatKey::new("score", "negative", 1).value(&stat), -5);
    }
}
