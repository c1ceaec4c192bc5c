//! Raw message parsing.
//!
//! Turns archive blobs into [`RawMessage`] records using `mailparse` for MIME
//! parsing and `dateparser` for dates.
//!
//! # Leniency
//!
//! Unlike an importer, the statistics engine wants to see broken messages:
//! missing Message-ID, Subject or Date are recorded as absent and handled by
//! the threading engine (skip counters, miss queue). Only blobs that are not
//! a MIME message at all are rejected.
//!
//! # Body-derived flags
//!
//! The body is scanned once for:
//! - review trailers (`Reviewed-by:`, `Acked-by:`, `Tested-by:`) at the start
//!   of an unquoted line,
//! - patchwork bot acceptance notices (`was applied to`).

use chrono::Utc;
use mailparse::{MailHeaderMap, ParsedMail, parse_mail};
use thiserror::Error;

use crate::models::RawMessage;

const REVIEW_TRAILERS: &[&str] = &["Reviewed-by:", "Acked-by:", "Tested-by:"];

const BOT_ACCEPT_SENDER: &str = "patchwork-bot";
const BOT_ACCEPT_PHRASE: &str = "was applied to";

/// Errors that can be returned while parsing a message.
#[derive(Debug, Error)]
pub enum ParseMessageError {
    #[error("empty message blob")]
    Empty,
    #[error("failed to parse MIME structure: {0}")]
    MimeParse(#[from] mailparse::MailParseError),
}

/// Remove NUL bytes and surrounding whitespace
fn sanitize_text(text: &str) -> String {
    text.replace('\0', "").trim().to_string()
}

/// Message-ID without angle brackets, `None` when empty
fn normalize_message_id(msg_id: Option<String>) -> Option<String> {
    msg_id.and_then(|id| {
        let cleaned = id.trim().trim_matches(&['<', '>'][..]).trim();
        if cleaned.is_empty() {
            None
        } else {
            Some(sanitize_text(cleaned))
        }
    })
}

/// First `text/plain` part, falling back to the root body
fn extract_body(parsed: &ParsedMail<'_>) -> String {
    if parsed.subparts.is_empty() {
        return parsed.get_body().unwrap_or_default();
    }

    parsed
        .subparts
        .iter()
        .find(|part| part.ctype.mimetype.as_str() == "text/plain")
        .and_then(|part| part.get_body().ok())
        .filter(|body| !body.is_empty())
        .unwrap_or_else(|| parsed.get_body().unwrap_or_default())
}

/// Unquoted line starting with a review trailer.
pub fn has_review_trailer(body: &str) -> bool {
    body.lines().map(str::trim_start).any(|line| {
        !line.starts_with('>') && REVIEW_TRAILERS.iter().any(|tag| line.starts_with(tag))
    })
}

pub fn is_bot_accept(from: &[String], body: &str) -> bool {
    from.iter().any(|sender| sender.contains(BOT_ACCEPT_SENDER)) && body.contains(BOT_ACCEPT_PHRASE)
}

fn parse_date(raw: &str, message_id: Option<&str>) -> Option<chrono::DateTime<Utc>> {
    match dateparser::parse(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            log::debug!(
                "message {} has invalid date `{}`: {}",
                message_id.unwrap_or("<no id>"),
                raw,
                e
            );
            None
        }
    }
}

/// Parse one archive blob.
///
/// # Returns
///
/// - `Ok(RawMessage)`: every header that was present, decoded
/// - `Err(...)`: the blob is empty or not a MIME message
pub fn parse_message(blob: &[u8]) -> Result<RawMessage, ParseMessageError> {
    if blob.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseMessageError::Empty);
    }

    let parsed = parse_mail(blob).map_err(|e| {
        log::debug!("failed to parse MIME: {}", e);
        ParseMessageError::MimeParse(e)
    })?;
    let headers = &parsed.headers;

    let message_id = normalize_message_id(headers.get_first_value("Message-ID"));
    let subject = headers
        .get_first_value("Subject")
        .map(|s| sanitize_text(&s))
        .filter(|s| !s.is_empty());

    let from: Vec<String> = headers
        .get_all_values("From")
        .iter()
        .map(|v| sanitize_text(v))
        .filter(|v| !v.is_empty())
        .collect();
    let original_from = headers
        .get_first_value("X-Original-From")
        .or_else(|| headers.get_first_value("Reply-To"))
        .map(|v| sanitize_text(&v))
        .filter(|v| !v.is_empty());

    let raw_date = headers
        .get_first_value("Date")
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    let date = raw_date
        .as_deref()
        .and_then(|raw| parse_date(raw, message_id.as_deref()));

    let stable_review = headers
        .get_all_values("X-stable")
        .iter()
        .any(|v| v.trim().eq_ignore_ascii_case("review"));

    let body = sanitize_text(&extract_body(&parsed));

    let message = RawMessage {
        has_review_tag: has_review_trailer(&body),
        bot_accept: is_bot_accept(&from, &body),
        message_id,
        subject,
        from,
        original_from,
        references: headers.get_all_values("References"),
        in_reply_to: headers.get_all_values("In-Reply-To"),
        date,
        raw_date,
        stable_review,
    };

    log::trace!("parsed: {} - {}", message.message_id_str(), message.subject_str());
    Ok(message)
}
