//! Query string parsing for list operations.

use std::collections::HashMap;

use kule_core::{
    page::{DEFAULT_LIMIT, DEFAULT_OFFSET, PaginationWindow},
    query::RawFilter,
};

use crate::error::ApiError;

pub const LIMIT_PARAM: &str = "limit";
pub const OFFSET_PARAM: &str = "offset";
pub const QUERY_PARAM: &str = "query";

/// The pagination window and filter of a list request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    pub window: PaginationWindow,
    pub filter: RawFilter,
}

impl ListParams {
    /// Parses `limit`, `offset` and `query` from the query parameters.
    ///
    /// Missing, negative or non-numeric `limit`/`offset` fall back to their defaults.
    /// A missing or empty `query` is the empty filter.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::BadRequest`] when `query` is not a JSON object.
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self, ApiError> {
        let window = PaginationWindow::new(
            int_or_default(params.get(LIMIT_PARAM), DEFAULT_LIMIT),
            int_or_default(params.get(OFFSET_PARAM), DEFAULT_OFFSET),
        );

        let filter = match params.get(QUERY_PARAM).map(|raw| raw.trim()) {
            Some(raw) if !raw.is_empty() => RawFilter::from_json_str(raw)?,
            _ => RawFilter::empty(),
        };

        Ok(Self { window, filter })
    }
}

fn int_or_default(value: Option<&String>, default: usize) -> usize {
    value
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let parsed = ListParams::from_query(&HashMap::new()).unwrap();
        assert_eq!(parsed.window, PaginationWindow::new(20, 0));
        assert!(parsed.filter.is_empty());
    }

    #[test]
    fn test_numeric_window() {
        let parsed = ListParams::from_query(&params(&[("limit", "5"), ("offset", " 10 ")])).unwrap();
        assert_eq!(parsed.window, PaginationWindow::new(5, 10));
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        for (limit, offset) in [("abc", "x"), ("-1", "-3"), ("2.5", ""), ("", "1e3")] {
            let parsed = ListParams::from_query(&params(&[("limit", limit), ("offset", offset)])).unwrap();
            assert_eq!(parsed.window, PaginationWindow::default());
        }
    }

    #[test]
    fn test_filter() {
        let parsed = ListParams::from_query(&params(&[("query", r#"{"a": {"$gt": 1}}"#)])).unwrap();
        assert_eq!(parsed.filter.as_document(), &doc! { "a": { "$gt": 1 } });

        let parsed = ListParams::from_query(&params(&[("query", "")])).unwrap();
        assert!(parsed.filter.is_empty());
    }

    #[test]
    fn test_malformed_filter_is_bad_request() {
        for raw in ["not-json", "[1, 2]", "{\"a\":"] {
            let result = ListParams::from_query(&params(&[("query", raw)]));
            assert!(matches!(result, Err(ApiError::BadRequest(_))), "{raw}");
        }
    }
}
