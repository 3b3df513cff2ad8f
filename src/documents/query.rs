//! Query construction for document listings
//!
//! Translates filter requests into MongoDB filter + sort documents. Every
//! listing is sorted by `dateGiven` descending.

use bson::{doc, Document};

use crate::documents::model::{Messages, Status};
use crate::types::DocError;

/// A store query: filter plus sort order
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentQuery {
    pub filter: Document,
    pub sort: Document,
}

impl DocumentQuery {
    fn with_filter(filter: Document) -> Self {
        Self {
            filter,
            sort: doc! { "dateGiven": -1 },
        }
    }

    /// All documents, newest first
    pub fn all() -> Self {
        Self::with_filter(doc! {})
    }

    /// Case-insensitive substring match on `executor`, anywhere in the field
    ///
    /// The input is escaped so it matches as a literal, not as a pattern
    /// expression.
    pub fn by_executor(substring: &str) -> Self {
        Self::with_filter(doc! {
            "executor": { "$regex": escape_regex(substring), "$options": "i" }
        })
    }

    /// Filter by derived status
    ///
    /// `active` means no return date recorded, `returned` means one is.
    pub fn by_status(status: &str, messages: &Messages) -> Result<Self, DocError> {
        let filter = match Status::parse(status, messages)? {
            Status::Active => doc! { "dateReturned": bson::Bson::Null },
            Status::Returned => doc! { "dateReturned": { "$ne": bson::Bson::Null } },
        };
        Ok(Self::with_filter(filter))
    }
}

/// Escape PCRE metacharacters so the input matches as a literal substring
fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(
            c,
            '\\' | '^' | '$' | '.' | '|' | '?' | '*' | '+' | '(' | ')' | '[' | ']' | '{' | '}'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_sorts_by_date_given_desc() {
        let query = DocumentQuery::all();
        assert!(query.filter.is_empty());
        assert_eq!(query.sort, doc! { "dateGiven": -1 });
    }

    #[test]
    fn test_by_executor_builds_case_insensitive_regex() {
        let query = DocumentQuery::by_executor("smith");
        let executor = query.filter.get_document("executor").unwrap();
        assert_eq!(executor.get_str("$regex").unwrap(), "smith");
        assert_eq!(executor.get_str("$options").unwrap(), "i");
        assert_eq!(query.sort, doc! { "dateGiven": -1 });
    }

    #[test]
    fn test_by_executor_escapes_pattern_metacharacters() {
        let query = DocumentQuery::by_executor("a.b*c(d)");
        let executor = query.filter.get_document("executor").unwrap();
        assert_eq!(executor.get_str("$regex").unwrap(), r"a\.b\*c\(d\)");
    }

    #[test]
    fn test_by_status_active_maps_to_null_date_returned() {
        let query = DocumentQuery::by_status("active", &Messages::default()).unwrap();
        assert_eq!(query.filter, doc! { "dateReturned": bson::Bson::Null });
    }

    #[test]
    fn test_by_status_returned_maps_to_non_null_date_returned() {
        let query = DocumentQuery::by_status("returned", &Messages::default()).unwrap();
        assert_eq!(
            query.filter,
            doc! { "dateReturned": { "$ne": bson::Bson::Null } }
        );
    }

    #[test]
    fn test_by_status_rejects_unknown_value() {
        let err = DocumentQuery::by_status("bogus", &Messages::default()).unwrap_err();
        assert!(matches!(err, DocError::Validation { ref field, .. } if field == "status"));
    }
}
