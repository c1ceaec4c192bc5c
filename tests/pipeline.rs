use std::fs;
use std::path::Path;

use tempfile::TempDir;

use ml_stat::archive::{MessageDir, ParseSummary, read_messages};
use ml_stat::config::RunConfig;
use ml_stat::identity::MappingDb;
use ml_stat::pipeline::analyze;
use ml_stat::results::{ResultStore, Snapshot};
use ml_stat::stats::StatMap;
use ml_stat::threading::{AssemblyPolicy, AssemblyStats};

const DB: &str = r#"{
    "mailmap": [["jdoe@gmail", "John Doe <john@corp.example>"]],
    "corpmap": [["@corp.example", "Corp"]]
}"#;

fn write_message(dir: &Path, index: usize, headers: &str, body: &str) {
    let raw = format!("{}\r\n\r\n{}\r\n", headers.replace('\n', "\r\n"), body);
    fs::write(dir.join(index.to_string()), raw).unwrap();
}

/// Four messages, `3` the oldest.
fn populate(dir: &Path) {
    write_message(
        dir,
        3,
        "From: Ann <ann@corp.example>\n\
         Subject: [PATCH] mm: add helper\n\
         Message-ID: <root@corp.example>\n\
         Date: Mon, 1 Jan 2024 10:00:00 +0000",
        "the patch",
    );
    write_message(
        dir,
        2,
        "From: Bob <bob@b.org>\n\
         Subject: Re: [PATCH] mm: add helper\n\
         Message-ID: <bob-1@b.org>\n\
         In-Reply-To: <root@corp.example>\n\
         References: <root@corp.example>\n\
         Date: Tue, 2 Jan 2024 10:00:00 +0000",
        "> the patch\n\nReviewed-by: Bob <bob@b.org>",
    );
    write_message(
        dir,
        1,
        "From: jdoe@gmail.com\n\
         Subject: Re: [PATCH] mm: add helper\n\
         Message-ID: <jd-1@gmail.com>\n\
         In-Reply-To: <bob-1@b.org>\n\
         References: <root@corp.example> <bob-1@b.org>\n\
         Date: Wed, 3 Jan 2024 10:00:00 +0000",
        "Thanks.",
    );
    write_message(
        dir,
        0,
        "From: Carl <carl@c.org>\n\
         Subject: Re: something from last year\n\
         Message-ID: <carl-1@c.org>\n\
         In-Reply-To: <long-gone@c.org>\n\
         Date: Thu, 11 Jan 2024 10:00:00 +0000",
        "Ping?",
    );
}

#[test]
fn test_message_dir_to_result_store() {
    let work = TempDir::new().unwrap();
    let msg_dir = work.path().join("msgs");
    fs::create_dir(&msg_dir).unwrap();
    populate(&msg_dir);

    let db_path = work.path().join("db.json");
    fs::write(&db_path, DB).unwrap();
    let db = MappingDb::load(&db_path).unwrap();

    let (messages, parsed) = read_messages(&MessageDir::new(&msg_dir), 4).unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(parsed, ParseSummary { ok: 4, errors: 0 });

    let results = analyze(messages, &db, AssemblyPolicy::default(), &RunConfig::default());

    assert_eq!(
        results.assembly.stats,
        AssemblyStats {
            root: 1,
            matched: 2,
            miss: 1,
            ..Default::default()
        }
    );
    assert_eq!(results.assembly.count, 4);

    let ann = &results.individual["Ann <ann@corp.example>"];
    assert_eq!((ann.author.thr, ann.author.msg), (1, 1));
    let bob = &results.individual["Bob <bob@b.org>"];
    assert_eq!((bob.reviewer.thr, bob.reviewer.msg, bob.reviewer.cs), (1, 1, 1));
    assert!(results.individual.contains_key("John Doe <john@corp.example>"));
    assert!(!results.individual.contains_key("Carl <carl@c.org>"));

    // Ann and John collapse into their company, which authored the thread.
    let corp = &results.corporate["Corp"];
    assert_eq!(corp.author.thr, 1);
    assert_eq!(corp.reviewer.thr, 0);
    assert_eq!(results.change_sets.total, 1);

    let out = work.path().join("results.json");
    let mut store = ResultStore::open(&out).unwrap();
    results.store(&mut store).unwrap();
    store.save().unwrap();

    let store = ResultStore::open(&out).unwrap();
    let snapshot = Snapshot::load(&store).unwrap();
    assert_eq!(snapshot, results.snapshot());
    assert_eq!(snapshot.days(), Some(10));
    assert!(snapshot.git.is_none());
    let individual: StatMap = store.section_as("individual").unwrap().unwrap();
    assert_eq!(individual, results.individual);
    assert_eq!(store.section("count"), Some(&serde_json::json!(4)));
    assert_eq!(
        store.section("assembly").and_then(|s| s.get("match")),
        Some(&serde_json::json!(2))
    );
}

#[test]
fn test_missing_message_file_is_an_error() {
    let work = TempDir::new().unwrap();
    populate(work.path());

    assert!(read_messages(&MessageDir::new(work.path()), 5).is_err());
}
