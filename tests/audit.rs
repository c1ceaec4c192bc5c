use ml_stat::identity::{
    GroupingKind, MappingRule, MappingTable, Normalizer, OperatorChoice, ScriptedChoices,
    find_candidates, reconcile,
};
use ml_stat::models::RawMessage;
use ml_stat::stats::Aggregator;
use ml_stat::threading::{ThreadAssembler, group_change_sets};

#[test]
fn test_unmapped_aliases_become_one_email_group() {
    let root = RawMessage::new("r@x", "[PATCH] lib: add helper").with_from("John Doe <jd@x.com>");
    let reply = RawMessage::new("q@x", "Re: [PATCH] lib: add helper")
        .with_from("<jd@x.com>")
        .with_in_reply_to("<r@x>");

    let assembly = ThreadAssembler::default().assemble(vec![root, reply]);
    let change_sets = group_change_sets(assembly.threads.values());
    let normalizer = Normalizer::new(vec![MappingTable::default()]);
    let stats = Aggregator::new(&normalizer, Default::default())
        .aggregate(assembly.threads.values(), &change_sets);
    assert_eq!(stats.len(), 2);

    let groups = find_candidates(stats.keys().map(String::as_str), &MappingTable::default());
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].kind, GroupingKind::Email);
    assert_eq!(groups[0].key, "jd@x.com");
    assert_eq!(groups[0].identities[0], "John Doe <jd@x.com>");

    let mut choices = ScriptedChoices::new([OperatorChoice::Accept]);
    let outcome = reconcile(&groups, &mut choices).unwrap();
    assert_eq!(
        outcome.proposals,
        vec![MappingRule::new("<jd@x.com>", "John Doe <jd@x.com>")]
    );
    assert_eq!(outcome.accepted, 1);
}

#[test]
fn test_mapped_aliases_are_not_candidates() {
    let mailmap = MappingTable::from_pairs([("<jd@x.com>", "John Doe <jd@x.com>")]);
    let normalizer = Normalizer::new(vec![mailmap.clone()]);

    let identities: Vec<String> = ["John Doe <jd@x.com>", "<jd@x.com>"]
        .into_iter()
        .map(|raw| normalizer.normalize(raw))
        .collect();
    let groups = find_candidates(identities.iter().map(String::as_str), &mailmap);

    assert!(groups.is_empty());
}

#[test]
fn test_rotate_then_accept_changes_target() {
    let groups = find_candidates(
        ["Jane Roe <jane@a.org>", "Jane Roe <jroe@b.org>"],
        &MappingTable::default(),
    );
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].kind, GroupingKind::Name);

    let mut choices = ScriptedChoices::new([OperatorChoice::Rotate, OperatorChoice::Accept]);
    let outcome = reconcile(&groups, &mut choices).unwrap();

    assert_eq!(
        outcome.proposals,
        vec![MappingRule::new("Jane Roe <jane@a.org>", "Jane Roe <jroe@b.org>")]
    );
    assert_eq!(choices.remaining(), 0);
}

#[test]
fn test_ignored_groups_propose_nothing() {
    let groups = find_candidates(
        ["Jane Roe <jane@a.org>", "jane roe <jane@c.org>"],
        &MappingTable::default(),
    );
    assert_eq!(groups[0].kind, GroupingKind::FoldedName);

    let mut choices = ScriptedChoices::new(Vec::new()).with_fallback(OperatorChoice::Ignore);
    let outcome = reconcile(&groups, &mut choices).unwrap();
    assert!(outcome.proposals.is_empty());
    assert_eq!(outcome.ignored, 1);
}
