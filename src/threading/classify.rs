//! Subject-based message classification.
//!
//! Classification is a small rule table: every rule is a `(category,
//! predicate)` pair evaluated over the subject line. All rules run; the set
//! of categories that fired decides the result:
//!
//! - exactly one fired: that category;
//! - none fired: [`Classification::Unknown`];
//! - more than one fired: [`Classification::Bad`].
//!
//! `Bad` is never resolved automatically, it is reported so a human can look
//! at the subject.

use serde::{Deserialize, Serialize};

/// Phrases marking a pull request, matched case-insensitively.
const PULL_REQUEST_MARKERS: &[&str] = &["pull req", "pull-req", "git pull"];

/// Leading tags of postings that are conversations rather than changes.
const DISCUSSION_TAGS: &[&str] = &["syzbot", "ann"];

/// Bug tracker forwards look like patches but start a conversation.
const BUG_FORWARD: &str = "Fw: [Bug ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    Patch,
    PullRequest,
    Discussion,
    Unknown,
    Bad,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Patch => "patch",
            Classification::PullRequest => "pull-request",
            Classification::Discussion => "discussion",
            Classification::Unknown => "unknown",
            Classification::Bad => "bad",
        }
    }
}

type Rule = (Classification, fn(&str) -> bool);

const RULES: &[Rule] = &[
    (Classification::Patch, is_patch_subject),
    (Classification::PullRequest, is_pull_request_subject),
    (Classification::Discussion, is_discussion_subject),
];

/// Content of the bracket tag the subject starts with, if any.
fn leading_tag(subject: &str) -> Option<&str> {
    let rest = subject.strip_prefix('[')?;
    Some(rest.find(']').map_or(rest, |end| &rest[..end]))
}

fn is_pull_request_tag(tag: &str) -> bool {
    tag.to_lowercase().split_whitespace().any(|word| word == "pull")
}

fn is_discussion_tag(tag: &str) -> bool {
    let tag = tag.trim().to_lowercase();
    DISCUSSION_TAGS.iter().any(|prefix| tag.starts_with(prefix))
}

/// Starts with a bracket tag that is neither a pull nor a discussion tag.
pub fn is_patch_subject(subject: &str) -> bool {
    match leading_tag(subject) {
        Some(tag) => !is_pull_request_tag(tag) && !is_discussion_tag(tag),
        None => false,
    }
}

pub fn is_pull_request_subject(subject: &str) -> bool {
    let lower = subject.to_lowercase();
    PULL_REQUEST_MARKERS.iter().any(|marker| lower.contains(marker))
        || leading_tag(subject).is_some_and(is_pull_request_tag)
}

pub fn is_bug_forward(subject: &str) -> bool {
    subject.contains(BUG_FORWARD)
}

/// Plain subjects without any tag, discussion tags, and bug forwards.
pub fn is_discussion_subject(subject: &str) -> bool {
    let untagged =
        !subject.contains('[') && !subject.contains(']') && !is_pull_request_subject(subject);
    untagged || leading_tag(subject).is_some_and(is_discussion_tag) || is_bug_forward(subject)
}

/// Classify one subject line.
pub fn classify(subject: &str) -> Classification {
    let mut fired = RULES
        .iter()
        .filter(|(_, predicate)| predicate(subject))
        .map(|(category, _)| *category);

    match (fired.next(), fired.next()) {
        (None, _) => Classification::Unknown,
        (Some(category), None) => category,
        (Some(_), Some(_)) => Classification::Bad,
    }
}
