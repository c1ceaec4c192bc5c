//! Reference-id recovery from `References` / `In-Reply-To` headers.
//!
//! Archives contain every flavour of broken reference header: ids without
//! separators (`<a@x><b@y>`), ids mixed with comments, continuation lines
//! folded into one value. Recovery is best effort:
//!
//! - a value with at most one `<` is taken as a single id, the `<...>` token
//!   when there is one, so trailing comments are ignored;
//! - a value with several `<` is split on whitespace and only well-formed
//!   `<...>` tokens are kept, glued tokens being split at `><`.
//!
//! Ids are returned without angle brackets, in header order, deduplicated.

/// Ordered, deduplicated reference ids of a message.
///
/// `References` values come first, then `In-Reply-To`.
pub fn reference_set(references: &[String], in_reply_to: &[String]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();

    for value in references.iter().chain(in_reply_to.iter()) {
        for id in split_header_value(value) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }

    ids
}

/// Reference ids carried by one header value.
pub fn split_header_value(value: &str) -> Vec<String> {
    if value.matches('<').count() <= 1 {
        let single = value
            .find('<')
            .and_then(|open| Some((open, open + value[open..].find('>')?)))
            .map_or(value, |(open, close)| &value[open..=close]);
        let id = strip_brackets(single);
        return if id.is_empty() { Vec::new() } else { vec![id.to_string()] };
    }

    let mut ids = Vec::new();
    for token in value.split_whitespace() {
        if !(token.starts_with('<') && token.ends_with('>')) {
            log::warn!("dropping malformed reference token `{}`", token);
            continue;
        }
        for piece in token.split("><") {
            let id = strip_brackets(piece);
            if !id.is_empty() {
                ids.push(id.to_string());
            }
        }
    }
    ids
}

fn strip_brackets(value: &str) -> &str {
    value.trim().trim_matches(&['<', '>'][..]).trim()
}
