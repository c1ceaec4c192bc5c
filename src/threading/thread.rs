//! Assembled conversation threads.

use std::collections::BTreeMap;

use crate::identity::Normalizer;
use crate::models::{Identity, RawMessage};
use crate::threading::classify::{Classification, classify};
use crate::threading::patch_series::is_cover_letter;

/// A root message plus every reply reachable from it.
///
/// Classification and the review/acceptance flags are computed once when the
/// thread is built and never change afterwards.
#[derive(Debug, Clone)]
pub struct Thread {
    messages: Vec<RawMessage>,
    classification: Classification,
    has_review_tag: bool,
    bot_accepted: bool,
}

impl Thread {
    /// Build a thread from its root and replies in arrival order.
    pub fn new(root: RawMessage, replies: Vec<RawMessage>) -> Self {
        let classification = classify(root.subject_str());
        let has_review_tag = replies.iter().any(|m| m.has_review_tag);
        let bot_accepted = root.bot_accept || replies.iter().any(|m| m.bot_accept);

        let mut messages = Vec::with_capacity(replies.len() + 1);
        messages.push(root);
        messages.extend(replies);

        Thread {
            messages,
            classification,
            has_review_tag,
            bot_accepted,
        }
    }

    pub fn root(&self) -> &RawMessage {
        &self.messages[0]
    }

    pub fn root_id(&self) -> &str {
        self.root().message_id_str()
    }

    pub fn root_subject(&self) -> &str {
        self.root().subject_str()
    }

    /// All members, root first.
    pub fn messages(&self) -> &[RawMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn is_patch(&self) -> bool {
        self.classification == Classification::Patch
    }

    /// Some reply carries a review or ack trailer.
    pub fn has_review_tag(&self) -> bool {
        self.has_review_tag
    }

    /// Some member is an automated "applied" notice.
    pub fn bot_accepted(&self) -> bool {
        self.bot_accepted
    }

    /// Number of members that are actual patches.
    ///
    /// A patch has a leading bracket tag and is not a series cover letter.
    /// Replies (`Re: [PATCH ...]`) never count.
    pub fn patch_count(&self) -> usize {
        self.messages
            .iter()
            .map(RawMessage::subject_str)
            .filter(|subject| subject.starts_with('[') && !is_cover_letter(subject))
            .count()
    }

    /// Senders of the root and of every patch or pull-request member, with
    /// per-identity message counts. Bots are excluded.
    pub fn authors(&self, normalizer: &Normalizer) -> BTreeMap<Identity, u64> {
        let mut people = BTreeMap::new();
        for (i, message) in self.messages.iter().enumerate() {
            let authored = i == 0
                || matches!(
                    classify(message.subject_str()),
                    Classification::Patch | Classification::PullRequest
                );
            if authored {
                normalizer.count_senders(message, &mut people);
            }
        }
        people
    }

    /// Every sender of the thread with per-identity message counts. Bots are
    /// excluded.
    pub fn participants(&self, normalizer: &Normalizer) -> BTreeMap<Identity, u64> {
        let mut people = BTreeMap::new();
        for message in &self.messages {
            normalizer.count_senders(message, &mut people);
        }
        people
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> Thread {
        let cover = RawMessage::new("c@x", "[PATCH v2 0/2] net: rework").with_from("Ann <ann@a.org>");
        let p1 = RawMessage::new("p1@x", "[PATCH v2 1/2] net: one").with_from("Ann <ann@a.org>");
        let p2 = RawMessage::new("p2@x", "[PATCH v2 2/2] net: two").with_from("Ann <ann@a.org>");
        let review = RawMessage::new("r@x", "Re: [PATCH v2 1/2] net: one")
            .with_from("Bob <bob@b.org>")
            .with_review_tag();
        let bot = RawMessage::new("b@x", "Re: [PATCH v2 0/2] net: rework")
            .with_from("patchwork-bot+netdevbpf@kernel.org")
            .with_bot_accept();
        Thread::new(cover, vec![p1, p2, review, bot])
    }

    #[test]
    fn test_patch_count_skips_cover_and_replies() {
        assert_eq!(series().patch_count(), 2);
    }

    #[test]
    fn test_cached_flags() {
        let thread = series();
        assert!(thread.is_patch());
        assert!(thread.has_review_tag());
        assert!(thread.bot_accepted());
        assert_eq!(thread.root_id(), "c@x");
    }

    #[test]
    fn test_review_tag_on_root_does_not_count() {
        let root = RawMessage::new("a@x", "[PATCH] x").with_review_tag();
        assert!(!Thread::new(root, Vec::new()).has_review_tag());
    }

    #[test]
    fn test_authors_and_participants() {
        let thread = series();
        let normalizer = Normalizer::default();

        let authors = thread.authors(&normalizer);
        assert_eq!(authors.get("Ann <ann@a.org>"), Some(&3));
        assert!(!authors.contains_key("Bob <bob@b.org>"));

        let participants = thread.participants(&normalizer);
        assert_eq!(participants.len(), 2);
        assert_eq!(participants.get("Bob <bob@b.org>"), Some(&1));
    }
}
