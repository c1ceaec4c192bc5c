use chrono::{DateTime, Utc};

/// Canonical `Name <email>` (or bare `<email>`) string.
///
/// Statistics are keyed by identity. When the corporate mapping table is
/// applied the same slot holds an organization name instead.
pub type Identity = String;

// ===== Archive Input =====

/// One message as materialized by the archive reader.
///
/// Every field is optional or possibly empty because mailing-list archives
/// contain messages with missing, duplicated or contradictory headers. The
/// threading engine decides how to recover from each case; the record itself
/// is never mutated after parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMessage {
    /// Message-ID without angle brackets
    pub message_id: Option<String>,
    pub subject: Option<String>,
    /// Every `From` header value, in header order
    pub from: Vec<String>,
    /// Original sender for relayed messages (`X-Original-From`, then `Reply-To`)
    pub original_from: Option<String>,
    /// Raw `References` header values
    pub references: Vec<String>,
    /// Raw `In-Reply-To` header values
    pub in_reply_to: Vec<String>,
    pub date: Option<DateTime<Utc>>,
    pub raw_date: Option<String>,
    /// Carries the `X-stable: review` header
    pub stable_review: bool,
    /// Body contains an unquoted review/ack trailer
    pub has_review_tag: bool,
    /// Message is an automated "applied" notice
    pub bot_accept: bool,
}

impl RawMessage {
    pub fn new(message_id: impl Into<String>, subject: impl Into<String>) -> Self {
        RawMessage {
            message_id: Some(message_id.into()),
            subject: Some(subject.into()),
            ..Default::default()
        }
    }

    pub fn with_from(mut self, sender: impl Into<String>) -> Self {
        self.from.push(sender.into());
        self
    }

    pub fn with_original_from(mut self, sender: impl Into<String>) -> Self {
        self.original_from = Some(sender.into());
        self
    }

    pub fn with_references(mut self, value: impl Into<String>) -> Self {
        self.references.push(value.into());
        self
    }

    pub fn with_in_reply_to(mut self, value: impl Into<String>) -> Self {
        self.in_reply_to.push(value.into());
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.raw_date = Some(date.to_rfc2822());
        self.date = Some(date);
        self
    }

    pub fn with_review_tag(mut self) -> Self {
        self.has_review_tag = true;
        self
    }

    pub fn with_bot_accept(mut self) -> Self {
        self.bot_accept = true;
        self
    }

    pub fn with_stable_review(mut self) -> Self {
        self.stable_review = true;
        self
    }

    /// Subject line, or the empty string when the header is missing.
    pub fn subject_str(&self) -> &str {
        self.subject.as_deref().unwrap_or("")
    }

    pub fn message_id_str(&self) -> &str {
        self.message_id.as_deref().unwrap_or("")
    }
}
