//! Thread assembly with a fixed-point miss queue.
//!
//! Messages are grouped by reference matching in delivery order (oldest
//! first). A message whose references are all still unknown is parked in the
//! miss queue; the queue is then rescanned until a pass attaches nothing,
//! which absorbs the out-of-order delivery typical of `git send-email`.
//!
//! ## Algorithm
//!
//! For every message:
//!
//! 1. **Intake**: skip messages without subject or Message-ID and repeated
//!    Message-IDs, counting each case.
//! 2. **Root**: a message with no recoverable references, or one matching a
//!    force-root rule, starts a new group.
//! 3. **Attach**: otherwise the message joins the group of the first
//!    reference id already present in the index.
//! 4. **Defer**: otherwise it goes to the miss queue.
//!
//! After the delivery-order pass the queue is retried until the number of
//! parked messages stops changing. What is left is unresolvable.
//!
//! ## Exclusion
//!
//! Messages selected by the exclusion policy are grouped like any other so
//! that their replies still resolve, and are removed once the groups are
//! final: a group rooted at an excluded message is dropped together with its
//! replies, excluded replies are removed from surviving groups.
//!
//! The id → group index lives in an [`AssemblerState`] owned by a single
//! [`ThreadAssembler::assemble`] call and is dropped when it returns.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::RawMessage;
use crate::threading::references::reference_set;
use crate::threading::thread::Thread;

/// Where a message stands during assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    Unprocessed,
    Rooted,
    Attached,
    Miss,
}

/// A report bot whose postings always start a new thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportBot {
    /// Sender domain, matched against the part of the From header after `@`
    pub domain: String,
    /// Subject tag the bot puts on its reports
    pub subject_tag: String,
}

/// Rules deciding which messages are forced to the root or excluded.
#[derive(Debug, Clone)]
pub struct AssemblyPolicy {
    /// Subject fragments that always start a new thread
    pub force_root_subjects: Vec<String>,
    pub report_bots: Vec<ReportBot>,
    /// Subject fragments whose messages are removed after grouping
    pub exclude_subjects: Vec<String>,
    /// Remove messages carrying `X-stable: review`
    pub exclude_stable_review: bool,
}

impl Default for AssemblyPolicy {
    fn default() -> Self {
        Self {
            force_root_subjects: vec!["Fw: [Bug ".to_string()],
            report_bots: vec![ReportBot {
                domain: "syzkaller.appspotmail.com".to_string(),
                subject_tag: "[syzbot]".to_string(),
            }],
            exclude_subjects: vec!["PATCH AUTOSEL".to_string()],
            exclude_stable_review: true,
        }
    }
}

impl AssemblyPolicy {
    pub fn is_force_root(&self, message: &RawMessage) -> bool {
        let subject = message.subject_str();
        if self
            .force_root_subjects
            .iter()
            .any(|marker| subject.contains(marker.as_str()))
        {
            return true;
        }

        self.report_bots.iter().any(|bot| {
            subject.contains(bot.subject_tag.as_str())
                && message
                    .from
                    .iter()
                    .any(|sender| sender_domain(sender).is_some_and(|d| d == bot.domain))
        })
    }

    pub fn is_excluded(&self, message: &RawMessage) -> bool {
        let subject = message.subject_str();
        (self.exclude_stable_review && message.stable_review)
            || self
                .exclude_subjects
                .iter()
                .any(|marker| subject.contains(marker.as_str()))
    }
}

/// Lower-cased domain of the first address in a From header value.
fn sender_domain(sender: &str) -> Option<String> {
    let addresses = mailparse::addrparse(sender.trim()).ok()?;
    let address = addresses.iter().find_map(|addr| match addr {
        mailparse::MailAddr::Single(info) => Some(info.addr.clone()),
        mailparse::MailAddr::Group(group) => group.addrs.first().map(|info| info.addr.clone()),
    })?;
    let (_, domain) = address.rsplit_once('@')?;
    Some(domain.trim().to_lowercase())
}

/// Counters describing one assembly run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyStats {
    pub root: usize,
    #[serde(rename = "match")]
    pub matched: usize,
    pub miss: usize,
    #[serde(rename = "skip-no-subject")]
    pub skip_no_subject: usize,
    #[serde(rename = "skip-no-id")]
    pub skip_no_id: usize,
    pub duplicate: usize,
    pub excluded: usize,
}

/// A message that never found its thread, ready for manual follow-up.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct UnresolvedMessage {
    pub subject: String,
    pub date: String,
    pub message_id: String,
    pub link: String,
}

/// Output of [`ThreadAssembler::assemble`].
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    /// Threads keyed by root Message-ID
    pub threads: BTreeMap<String, Thread>,
    /// Miss-queue leftovers, in queue order
    pub unresolved: Vec<RawMessage>,
    pub stats: AssemblyStats,
    /// Messages handed to the assembler, skipped ones included
    pub count: usize,
    /// Date of the first delivered message with a parseable Date header
    pub first_date: Option<DateTime<Utc>>,
    /// Date of the last delivered message with a parseable Date header
    pub last_date: Option<DateTime<Utc>>,
    states: HashMap<String, MessageState>,
}

impl Assembly {
    /// Final state of a grouped message, `None` for skipped ones.
    pub fn state(&self, message_id: &str) -> Option<MessageState> {
        self.states.get(message_id).copied()
    }

    /// Thread that ended up containing `message_id`.
    pub fn thread_of(&self, message_id: &str) -> Option<&Thread> {
        self.threads.values().find(|thread| {
            thread
                .messages()
                .iter()
                .any(|m| m.message_id_str() == message_id)
        })
    }

    /// Unresolved messages with stable archive links, sorted.
    pub fn miss_report(&self, link_base: &str) -> Vec<UnresolvedMessage> {
        let mut report: Vec<UnresolvedMessage> = self
            .unresolved
            .iter()
            .map(|message| UnresolvedMessage {
                subject: message.subject_str().to_string(),
                date: message.raw_date.clone().unwrap_or_default(),
                message_id: message.message_id_str().to_string(),
                link: format!("{}{}", link_base, message.message_id_str()),
            })
            .collect();
        report.sort();
        report
    }
}

/// Per-run grouping state.
struct AssemblerState<'p> {
    policy: &'p AssemblyPolicy,
    /// Accepted messages; indexes into this are message slots
    messages: Vec<RawMessage>,
    states: Vec<MessageState>,
    /// Member slots of each group, root first
    groups: Vec<Vec<usize>>,
    /// Message-ID → group
    index: HashMap<String, usize>,
    seen: HashSet<String>,
    misses: Vec<usize>,
    stats: AssemblyStats,
    count: usize,
    first_date: Option<DateTime<Utc>>,
    last_date: Option<DateTime<Utc>>,
}

impl<'p> AssemblerState<'p> {
    fn new(policy: &'p AssemblyPolicy) -> Self {
        Self {
            policy,
            messages: Vec::new(),
            states: Vec::new(),
            groups: Vec::new(),
            index: HashMap::new(),
            seen: HashSet::new(),
            misses: Vec::new(),
            stats: AssemblyStats::default(),
            count: 0,
            first_date: None,
            last_date: None,
        }
    }

    /// Validate one delivered message and store it. Returns its slot.
    fn intake(&mut self, message: RawMessage) -> Option<usize> {
        self.count += 1;
        if let Some(date) = message.date {
            self.first_date.get_or_insert(date);
            self.last_date = Some(date);
        }

        if message.subject.as_deref().is_none_or(|s| s.trim().is_empty()) {
            self.stats.skip_no_subject += 1;
            return None;
        }
        let Some(id) = message.message_id.clone().filter(|id| !id.is_empty()) else {
            self.stats.skip_no_id += 1;
            return None;
        };
        if !self.seen.insert(id) {
            log::trace!("duplicate message {}", message.message_id_str());
            self.stats.duplicate += 1;
            return None;
        }

        self.messages.push(message);
        self.states.push(MessageState::Unprocessed);
        Some(self.messages.len() - 1)
    }

    /// Try to place a message. Returns `false` if it has to wait.
    fn group_one(&mut self, slot: usize) -> bool {
        let message = &self.messages[slot];
        let id = message.message_id_str().to_string();
        let refs = reference_set(&message.references, &message.in_reply_to);

        if refs.is_empty() || self.policy.is_force_root(message) {
            self.groups.push(vec![slot]);
            self.index.insert(id, self.groups.len() - 1);
            self.states[slot] = MessageState::Rooted;
            self.stats.root += 1;
            return true;
        }

        let found = refs.iter().find_map(|r| self.index.get(r).copied());
        match found {
            Some(group) => {
                self.groups[group].push(slot);
                self.index.insert(id, group);
                self.states[slot] = MessageState::Attached;
                self.stats.matched += 1;
                true
            }
            None => {
                self.states[slot] = MessageState::Miss;
                false
            }
        }
    }

    /// Rescan the miss queue until a pass attaches nothing.
    fn retry_misses(&mut self) {
        let mut pass = 0;
        loop {
            pass += 1;
            let before = self.misses.len();
            let pending = std::mem::take(&mut self.misses);
            for slot in pending {
                if !self.group_one(slot) {
                    self.misses.push(slot);
                }
            }
            log::debug!(
                "miss pass {}: {} -> {} pending",
                pass,
                before,
                self.misses.len()
            );
            if self.misses.len() == before {
                break;
            }
        }
    }

    fn finish(mut self) -> Assembly {
        let policy = self.policy;
        let mut slots: Vec<Option<RawMessage>> = self.messages.into_iter().map(Some).collect();
        let mut states = HashMap::with_capacity(slots.len());
        for (slot, state) in self.states.iter().enumerate() {
            if let Some(message) = &slots[slot] {
                states.insert(message.message_id_str().to_string(), *state);
            }
        }

        let mut threads = BTreeMap::new();
        for group in &self.groups {
            let mut members = group.iter().filter_map(|&slot| slots[slot].take());
            let Some(root) = members.next() else {
                continue;
            };

            if policy.is_excluded(&root) {
                self.stats.excluded += 1 + members.count();
                continue;
            }

            let replies: Vec<RawMessage> = members
                .filter(|reply| {
                    let excluded = policy.is_excluded(reply);
                    if excluded {
                        self.stats.excluded += 1;
                    }
                    !excluded
                })
                .collect();

            let thread = Thread::new(root, replies);
            threads.insert(thread.root_id().to_string(), thread);
        }

        let mut unresolved = Vec::with_capacity(self.misses.len());
        for slot in &self.misses {
            if let Some(message) = slots[*slot].take() {
                if policy.is_excluded(&message) {
                    self.stats.excluded += 1;
                } else {
                    unresolved.push(message);
                }
            }
        }
        self.stats.miss = unresolved.len();

        Assembly {
            threads,
            unresolved,
            stats: self.stats,
            count: self.count,
            first_date: self.first_date,
            last_date: self.last_date,
            states,
        }
    }
}

/// Groups raw messages into threads.
#[derive(Debug, Clone, Default)]
pub struct ThreadAssembler {
    policy: AssemblyPolicy,
}

impl ThreadAssembler {
    pub fn new(policy: AssemblyPolicy) -> Self {
        Self { policy }
    }

    /// Assemble messages delivered oldest first.
    ///
    /// ## Returns
    ///
    /// Threads keyed by root id, the messages that never resolved, and the
    /// run counters.
    pub fn assemble(&self, messages: impl IntoIterator<Item = RawMessage>) -> Assembly {
        let mut state = AssemblerState::new(&self.policy);

        for message in messages {
            let Some(slot) = state.intake(message) else {
                continue;
            };
            if !state.group_one(slot) {
                state.misses.push(slot);
            }
        }

        log::debug!(
            "first pass: {} roots, {} matched, {} deferred",
            state.stats.root,
            state.stats.matched,
            state.misses.len()
        );
        state.retry_misses();

        let assembly = state.finish();
        log::info!(
            "assembled {} threads from {} messages: {:?}",
            assembly.threads.len(),
            assembly.count,
            assembly.stats
        );
        assembly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, subject: &str) -> RawMessage {
        RawMessage::new(id, subject).with_from("Ann <ann@a.org>")
    }

    #[test]
    fn test_sender_domain() {
        assert_eq!(
            sender_domain("syzbot <syzbot+abc@SYZKALLER.appspotmail.com>"),
            Some("syzkaller.appspotmail.com".to_string())
        );
        assert_eq!(sender_domain("a@b.org"), Some("b.org".to_string()));
        assert_eq!(sender_domain("nobody"), None);
    }

    #[test]
    fn test_sender_domain_reads_quoted_and_group_addresses() {
        assert_eq!(
            sender_domain("\"Doe, John\" <jd@x.com>"),
            Some("x.com".to_string())
        );
        assert_eq!(
            sender_domain("reporters: syzbot <syzbot+1f2e@syzkaller.appspotmail.com>;"),
            Some("syzkaller.appspotmail.com".to_string())
        );
    }

    #[test]
    fn test_window_dates_skip_undated_messages() {
        let first = DateTime::from_timestamp(1_704_103_200, 0).unwrap();
        let last = DateTime::from_timestamp(1_704_967_200, 0).unwrap();
        let messages = vec![
            msg("a@x", "[PATCH] a").with_date(first),
            msg("b@x", "[PATCH] b").with_date(last),
            msg("c@x", "[PATCH] c"),
        ];

        let assembly = ThreadAssembler::default().assemble(messages);
        assert_eq!(assembly.first_date, Some(first));
        assert_eq!(assembly.last_date, Some(last));
    }

    #[test]
    fn test_unreferenced_message_is_own_root() {
        let assembly = ThreadAssembler::default().assemble(vec![msg("a@x", "hello")]);
        assert_eq!(assembly.threads.len(), 1);
        assert_eq!(assembly.threads["a@x"].len(), 1);
        assert_eq!(assembly.state("a@x"), Some(MessageState::Rooted));
    }

    #[test]
    fn test_skip_counters() {
        let mut no_subject = msg("a@x", "");
        no_subject.subject = None;
        let mut no_id = msg("b@x", "x");
        no_id.message_id = None;

        let assembly = ThreadAssembler::default().assemble(vec![
            no_subject,
            no_id,
            msg("c@x", "x"),
            msg("c@x", "x again"),
        ]);

        assert_eq!(assembly.stats.skip_no_subject, 1);
        assert_eq!(assembly.stats.skip_no_id, 1);
        assert_eq!(assembly.stats.duplicate, 1);
        assert_eq!(assembly.stats.root, 1);
        assert_eq!(assembly.count, 4);
    }

    #[test]
    fn test_first_known_reference_wins() {
        let assembly = ThreadAssembler::default().assemble(vec![
            msg("a@x", "[PATCH] a"),
            msg("b@x", "[PATCH] b"),
            msg("c@x", "Re: both").with_references("<nope@x> <b@x> <a@x>"),
        ]);
        assert_eq!(assembly.threads["b@x"].len(), 2);
        assert_eq!(assembly.threads["a@x"].len(), 1);
    }

    #[test]
    fn test_bug_forward_is_forced_root() {
        let assembly = ThreadAssembler::default().assemble(vec![
            msg("a@x", "[PATCH] a"),
            msg("b@x", "Fw: [Bug 1] crash").with_in_reply_to("<a@x>"),
        ]);
        assert_eq!(assembly.threads.len(), 2);
        assert_eq!(assembly.state("b@x"), Some(MessageState::Rooted));
    }

    #[test]
    fn test_miss_report_links() {
        let assembly = ThreadAssembler::default()
            .assemble(vec![msg("z@x", "Re: lost").with_in_reply_to("<gone@x>")]);
        let report = assembly.miss_report("https://lore.kernel.org/r/");

        assert_eq!(assembly.stats.miss, 1);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].link, "https://lore.kernel.org/r/z@x");
        assert_eq!(assembly.state("z@x"), Some(MessageState::Miss));
    }
}
