//! Patch series detection
//!
//! Kernel mailing list postings often come in "patch series" with subjects like:
//! - [PATCH 0/5] Cover letter describing the series
//! - [PATCH 1/5] First actual patch
//! - [PATCH net-next v2 2/5] Second patch, tree and revision tagged
//!
//! Only the numbering matters here: the cover letter carries no code and is
//! not counted as a patch.

use regex::Regex;
use std::sync::OnceLock;

/// Lazy-initialized regex for matching patch series numbering
static SERIES_REGEX: OnceLock<Regex> = OnceLock::new();

/// Lazy-initialized regex for the revision marker inside a tag
static VERSION_REGEX: OnceLock<Regex> = OnceLock::new();

/// Pattern matches:
/// - [PATCH 2/5] - basic patch series
/// - [PATCH v2 3/10] - versioned series
/// - [RFC PATCH 1/3] - RFC patches
/// - [PATCH net-next v3 0/5] - tree-tagged cover letter
///
/// Captures the bracket content before the numbering, the patch number and
/// the series length.
fn get_series_regex() -> &'static Regex {
    SERIES_REGEX.get_or_init(|| {
        Regex::new(r"\[([^\]]*?\bPATCH\b[^\]]*?)\s*(\d+)/(\d+)\s*\]")
            .expect("Invalid patch series regex")
    })
}

fn get_version_regex() -> &'static Regex {
    VERSION_REGEX.get_or_init(|| Regex::new(r"\bv(\d+)\b").expect("Invalid version regex"))
}

/// Numbering of one posting within a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesInfo {
    /// Revision from a `vN` marker, absent for the first posting
    pub version: Option<u32>,
    pub number: u32,
    pub total: u32,
}

/// Extract patch series information from a subject
///
/// ## Returns
///
/// `Some(SeriesInfo)` if the subject contains a `N/M` marker inside a PATCH tag.
pub fn extract_series_info(subject: &str) -> Option<SeriesInfo> {
    let caps = get_series_regex().captures(subject)?;

    let version = caps
        .get(1)
        .and_then(|tag| get_version_regex().captures(tag.as_str()))
        .and_then(|v| v.get(1)?.as_str().parse::<u32>().ok());
    let number = caps.get(2)?.as_str().parse::<u32>().ok()?;
    let total = caps.get(3)?.as_str().parse::<u32>().ok()?;

    Some(SeriesInfo {
        version,
        number,
        total,
    })
}

/// Whether the subject is the cover letter of a series.
pub fn is_cover_letter(subject: &str) -> bool {
    subject.contains(" 0/") || extract_series_info(subject).is_some_and(|info| info.number == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_basic_patch() {
        let result = extract_series_info("[PATCH 2/5] Fix memory leak");
        assert_eq!(
            result,
            Some(SeriesInfo {
                version: None,
                number: 2,
                total: 5
            })
        );
    }

    #[test]
    fn test_extract_versioned_patch() {
        let result = extract_series_info("[PATCH v2 3/10] Add new feature");
        assert_eq!(
            result,
            Some(SeriesInfo {
                version: Some(2),
                number: 3,
                total: 10
            })
        );
    }

    #[test]
    fn test_extract_tree_tagged_patch() {
        let result = extract_series_info("[PATCH net-next v4 12/15] tcp: foo");
        assert_eq!(
            result,
            Some(SeriesInfo {
                version: Some(4),
                number: 12,
                total: 15
            })
        );
    }

    #[test]
    fn test_extract_rfc_patch() {
        let result = extract_series_info("[RFC PATCH 1/3] Experimental feature");
        assert_eq!(result.map(|info| info.number), Some(1));
    }

    #[test]
    fn test_extract_no_patch() {
        assert_eq!(extract_series_info("Regular email subject"), None);
        assert_eq!(extract_series_info("[PATCH] single patch"), None);
    }

    #[test]
    fn test_cover_letter() {
        assert!(is_cover_letter("[PATCH v3 0/5] Cover letter"));
        assert!(is_cover_letter("[PATCH net-next 00/12] big series"));
        assert!(!is_cover_letter("[PATCH v3 1/5] First patch"));
        assert!(!is_cover_letter("[PATCH] single"));
    }
}
