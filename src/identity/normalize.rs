//! Sender normalization.
//!
//! Turns a raw `From` header value into the [`Identity`] used as a statistics
//! key:
//!
//! 1. **Relay recovery**: list servers that rewrite `From` for DMARC reasons
//!    produce `"Jane via some-list" <some-list@host>`; the original sender is
//!    taken from the alternate header when the message has one.
//! 2. **Canonical form**: double quotes are dropped and a bare address is
//!    wrapped as `<addr>` so every identity ends with the same suffix shape.
//! 3. **Mapping**: each table is applied in order (see [`MappingTable`]).
//!
//! Automation senders are filtered out afterwards by exact match against
//! [`BOT_SENDERS`].

use std::collections::BTreeMap;

use crate::identity::mapping::MappingTable;
use crate::models::{Identity, RawMessage};

/// Canonical identities of automation that posts to the lists.
///
/// Matched after mapping, so senders with per-report addresses (syzbot uses
/// `syzbot+<hash>@...`) need a mailmap rule onto the entry listed here.
pub const BOT_SENDERS: &[&str] = &[
    "<patchwork-bot+netdevbpf@kernel.org>",
    "kernel test robot <lkp@intel.com>",
    "<pr-tracker-bot@kernel.org>",
    "<patchwork-bot+bluetooth@kernel.org>",
    "syzbot <syzbot@syzkaller.appspotmail.com>",
];

/// Display-name fragments left behind by relaying list servers.
const RELAY_MARKERS: &[&str] = &[" via "];

/// Whether a raw `From` value was rewritten by a relay.
pub fn is_relayed(raw_from: &str) -> bool {
    RELAY_MARKERS.iter().any(|marker| raw_from.contains(marker))
}

/// Strip double quotes and make sure the address part is angle-bracketed.
pub fn canonicalize(raw_from: &str) -> String {
    let cleaned: String = raw_from
        .chars()
        .filter(|c| *c != '"')
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.contains('<') {
        cleaned.to_string()
    } else {
        format!("<{}>", cleaned)
    }
}

/// Applies the configured mapping tables to sender strings.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    tables: Vec<MappingTable>,
}

impl Normalizer {
    pub fn new(tables: Vec<MappingTable>) -> Self {
        Normalizer { tables }
    }

    /// Normalize one raw sender string.
    pub fn normalize(&self, raw_from: &str) -> Identity {
        let mut identity = canonicalize(raw_from);
        for table in &self.tables {
            if let Some(rule) = table.first_match(&identity) {
                log::trace!("mapped {} -> {}", identity, rule.target);
                identity = rule.target.clone();
            }
        }
        identity
    }

    /// Normalize one sender, falling back to the original sender on relays.
    pub fn normalize_sender(&self, raw_from: &str, original_from: Option<&str>) -> Identity {
        match original_from {
            Some(original) if is_relayed(raw_from) && !original.trim().is_empty() => {
                self.normalize(original)
            }
            _ => self.normalize(raw_from),
        }
    }

    /// All senders of a message, relays resolved, bots kept.
    pub fn senders(&self, message: &RawMessage) -> Vec<Identity> {
        message
            .from
            .iter()
            .map(|raw| self.normalize_sender(raw, message.original_from.as_deref()))
            .collect()
    }

    pub fn is_bot(&self, identity: &str) -> bool {
        BOT_SENDERS.contains(&identity)
    }

    /// Add every non-bot sender of `message` to a per-identity counter.
    pub fn count_senders(&self, message: &RawMessage, counts: &mut BTreeMap<Identity, u64>) {
        for identity in self.senders(message) {
            if self.is_bot(&identity) {
                continue;
            }
            *counts.entry(identity).or_insert(0) += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailmap() -> MappingTable {
        MappingTable::from_pairs([
            ("jdoe@gmail.com", "John Doe <john@corp.example>"),
            ("john@corp.example", "John Doe <john@corp.example>"),
        ])
    }

    #[test]
    fn test_bare_address_is_wrapped() {
        assert_eq!(canonicalize("jd@x.com"), "<jd@x.com>");
        assert_eq!(canonicalize("  John Doe <jd@x.com> "), "John Doe <jd@x.com>");
    }

    #[test]
    fn test_quotes_are_stripped() {
        assert_eq!(canonicalize("\"Doe, John\" <jd@x.com>"), "Doe, John <jd@x.com>");
    }

    #[test]
    fn test_apostrophes_survive_mapping() {
        let mailmap = MappingTable::from_pairs([(
            "Nick O'Connell <nick@home.example>",
            "Nick O'Connell <nick@work.example>",
        )]);
        let normalizer = Normalizer::new(vec![mailmap]);
        assert_eq!(
            normalizer.normalize("Nick O'Connell <nick@home.example>"),
            "Nick O'Connell <nick@work.example>"
        );
        assert_eq!(
            canonicalize("\"Nick O'Connell\" <nick@home.example>"),
            "Nick O'Connell <nick@home.example>"
        );
    }

    #[test]
    fn test_syzbot_reports_map_onto_the_denylist() {
        let mailmap = MappingTable::from_pairs([(
            "@syzkaller.appspotmail.com",
            "syzbot <syzbot@syzkaller.appspotmail.com>",
        )]);
        let normalizer = Normalizer::new(vec![mailmap]);
        let message = RawMessage::new("s@x", "[syzbot] KASAN: slab-out-of-bounds")
            .with_from("syzbot <syzbot+8c1a2f9d@syzkaller.appspotmail.com>")
            .with_from("Ann <ann@a.org>");

        let mut counts = BTreeMap::new();
        normalizer.count_senders(&message, &mut counts);
        assert_eq!(counts.keys().collect::<Vec<_>>(), vec!["Ann <ann@a.org>"]);

        // Without the rule the per-report address slips through.
        let mut counts = BTreeMap::new();
        Normalizer::default().count_senders(&message, &mut counts);
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_tables_apply_in_order() {
        let corpmap = MappingTable::from_pairs([("@corp.example", "Corp")]);
        let normalizer = Normalizer::new(vec![mailmap(), corpmap]);
        assert_eq!(normalizer.normalize("J. Doe <jdoe@gmail.com>"), "Corp");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let normalizer = Normalizer::new(vec![mailmap()]);
        for raw in ["J. Doe <jdoe@gmail.com>", "<other@example.com>", "bare@example.com"] {
            let once = normalizer.normalize(raw);
            assert_eq!(normalizer.normalize(&once), once);
        }
    }

    #[test]
    fn test_relay_uses_original_sender() {
        let normalizer = Normalizer::default();
        let identity = normalizer.normalize_sender(
            "Jane Roe via netdev <netdev@vger.kernel.org>",
            Some("Jane Roe <jane@example.com>"),
        );
        assert_eq!(identity, "Jane Roe <jane@example.com>");
    }

    #[test]
    fn test_relayed_message_counts_original_sender() {
        let normalizer = Normalizer::default();
        let message = RawMessage::new("r@x", "Re: [PATCH] x")
            .with_from("Jane Roe via netdev <netdev@vger.kernel.org>")
            .with_original_from("Jane Roe <jane@example.com>");

        assert_eq!(normalizer.senders(&message), vec!["Jane Roe <jane@example.com>"]);
    }

    #[test]
    fn test_relay_without_alternate_keeps_header() {
        let normalizer = Normalizer::default();
        let identity =
            normalizer.normalize_sender("Jane Roe via netdev <netdev@vger.kernel.org>", None);
        assert_eq!(identity, "Jane Roe via netdev <netdev@vger.kernel.org>");
    }

    #[test]
    fn test_bots_are_not_counted() {
        let normalizer = Normalizer::default();
        let message = RawMessage::new("a@b", "[PATCH] x")
            .with_from("patchwork-bot+netdevbpf@kernel.org")
            .with_from("Jane Roe <jane@example.com>");

        let mut counts = BTreeMap::new();
        normalizer.count_senders(&message, &mut counts);

        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get("Jane Roe <jane@example.com>"), Some(&1));
    }
}
