//! Parsing and validation of raw request parameters.
//!
//! Query-string values arrive as loosely typed strings. Everything here turns
//! them into typed values before a query component sees them: paging values
//! fall back to defaults when missing or malformed, while identifiers and
//! filters reject bad input with [`QueryError::InvalidInput`].

use crate::error::QueryError;

pub const DEFAULT_OFFSET: i64 = 0;
pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 500;

pub const MAX_SEARCH_LENGTH: usize = 100;
pub const MAX_KEY_LENGTH: usize = 64;
pub const MAX_FILTER_LENGTH: usize = 200;

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;

/// A validated offset/limit pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: i64,
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: DEFAULT_OFFSET,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn new(offset: i64, limit: i64) -> Self {
        Self {
            offset: offset.max(0),
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Build from raw query-string values.
    ///
    /// Missing, empty, non-numeric or negative `offset` becomes 0. Missing,
    /// empty, non-numeric or non-positive `limit` becomes 50. `limit` is
    /// capped at [`MAX_LIMIT`].
    pub fn from_raw(offset: Option<&str>, limit: Option<&str>) -> Self {
        let offset = offset
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|n| *n >= 0)
            .unwrap_or(DEFAULT_OFFSET);
        let limit = limit
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|n| *n > 0)
            .map(|n| n.min(MAX_LIMIT))
            .unwrap_or(DEFAULT_LIMIT);
        Self { offset, limit }
    }
}

/// Strip ASCII control characters (except space), trim whitespace,
/// and enforce a byte-length limit.
pub fn sanitize_text(input: &str, max_len: usize, what: &str) -> Result<String, QueryError> {
    if input.len() > max_len {
        return Err(QueryError::invalid(format!(
            "{} exceeds maximum length of {} bytes",
            what, max_len
        )));
    }
    let sanitized: String = input
        .chars()
        .filter(|c| !c.is_ascii_control() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string();
    if sanitized.is_empty() {
        return Err(QueryError::invalid(format!("empty {}", what)));
    }
    Ok(sanitized)
}

/// Validate a name to fuzzy-search for.
pub fn validate_search(input: &str) -> Result<String, QueryError> {
    sanitize_text(input, MAX_SEARCH_LENGTH, "search name")
}

/// Validate a parent identifier for the related-records pager.
///
/// An empty key is an invalid request, never "no filter".
pub fn validate_parent_key(input: &str, what: &str) -> Result<String, QueryError> {
    sanitize_text(input, MAX_KEY_LENGTH, what)
}

/// Parse an optional year filter. Empty or whitespace-only means absent.
pub fn validate_year(input: Option<&str>) -> Result<Option<i32>, QueryError> {
    let Some(raw) = non_blank(input) else {
        return Ok(None);
    };
    let year: i32 = raw
        .parse()
        .map_err(|_| QueryError::invalid(format!("year must be an integer, got '{}'", raw)))?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(QueryError::invalid(format!(
            "year must be between {} and {}",
            MIN_YEAR, MAX_YEAR
        )));
    }
    Ok(Some(year))
}

/// Parse an optional text filter. Empty or whitespace-only means absent.
pub fn validate_filter_text(input: Option<&str>, what: &str) -> Result<Option<String>, QueryError> {
    match non_blank(input) {
        Some(raw) => sanitize_text(raw, MAX_FILTER_LENGTH, what).map(Some),
        None => Ok(None),
    }
}

fn non_blank(input: Option<&str>) -> Option<&str> {
    input.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- Paging --

    #[test]
    fn page_defaults_when_absent() {
        assert_eq!(PageRequest::from_raw(None, None), PageRequest::new(0, 50));
    }

    #[test]
    fn page_parses_values() {
        let page = PageRequest::from_raw(Some("20"), Some(" 10 "));
        assert_eq!(page.offset, 20);
        assert_eq!(page.limit, 10);
    }

    #[test]
    fn page_malformed_falls_back() {
        let page = PageRequest::from_raw(Some("abc"), Some("ten"));
        assert_eq!(page, PageRequest::default());
    }

    #[test]
    fn page_negative_falls_back() {
        let page = PageRequest::from_raw(Some("-5"), Some("-1"));
        assert_eq!(page, PageRequest::default());
    }

    #[test]
    fn page_zero_limit_falls_back() {
        assert_eq!(PageRequest::from_raw(None, Some("0")).limit, DEFAULT_LIMIT);
    }

    #[test]
    fn page_limit_capped() {
        assert_eq!(PageRequest::from_raw(None, Some("100000")).limit, MAX_LIMIT);
        assert_eq!(PageRequest::new(0, 100000).limit, MAX_LIMIT);
    }

    // -- Search names --

    #[test]
    fn search_trimmed() {
        assert_eq!(validate_search("  Smith ").unwrap(), "Smith");
    }

    #[test]
    fn search_empty() {
        assert!(validate_search("   ").unwrap_err().is_client_error());
    }

    #[test]
    fn search_too_long() {
        assert!(validate_search(&"a".repeat(MAX_SEARCH_LENGTH + 1)).is_err());
    }

    #[test]
    fn search_strips_control_chars() {
        assert_eq!(validate_search("Sm\u{0007}ith").unwrap(), "Smith");
    }

    // -- Parent keys --

    #[test]
    fn parent_key_empty_rejected() {
        assert!(validate_parent_key("", "committee id").is_err());
    }

    #[test]
    fn parent_key_kept_verbatim() {
        assert_eq!(
            validate_parent_key("stA-0123", "committee id").unwrap(),
            "stA-0123"
        );
    }

    // -- Year --

    #[test]
    fn year_absent() {
        assert_eq!(validate_year(None).unwrap(), None);
        assert_eq!(validate_year(Some("  ")).unwrap(), None);
    }

    #[test]
    fn year_valid() {
        assert_eq!(validate_year(Some("2020")).unwrap(), Some(2020));
    }

    #[test]
    fn year_non_numeric() {
        let err = validate_year(Some("twenty")).unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("twenty"));
    }

    #[test]
    fn year_out_of_range() {
        assert!(validate_year(Some("20200")).is_err());
        assert!(validate_year(Some("1066")).is_err());
    }

    // -- Text filters --

    #[test]
    fn filter_text_absent_when_blank() {
        assert_eq!(validate_filter_text(Some(""), "office").unwrap(), None);
    }

    #[test]
    fn filter_text_trimmed() {
        assert_eq!(
            validate_filter_text(Some(" Governor "), "office").unwrap(),
            Some("Governor".to_string())
        );
    }

    #[test]
    fn filter_text_too_long() {
        let long = "x".repeat(MAX_FILTER_LENGTH + 1);
        assert!(validate_filter_text(Some(&long), "office").is_err());
    }
}
