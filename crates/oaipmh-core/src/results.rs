//! Session-level query arguments and result types.
//!
//! These are the shapes the commands and harvesters work with: listing
//! queries with optional time bounds, result windows, and records with
//! the tombstone status lifted into a plain boolean.

use chrono::{DateTime, Utc};

use crate::wire::Header;

/// Arguments for the listing verbs. An absent set means "all sets";
/// absent time bounds are unbounded.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub set: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

/// A paging window over a result list.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    /// How many results to drop before the first one delivered.
    pub first_result: usize,
    /// Maximum number of results to deliver; `-1` means unbounded.
    pub max_results: i64,
}

impl Window {
    /// A window over everything.
    pub fn unbounded() -> Self {
        Window {
            first_result: 0,
            max_results: -1,
        }
    }

    /// A window dropping the first `first` results and delivering at most
    /// `max` more.
    pub fn new(first: usize, max: i64) -> Self {
        Window {
            first_result: first,
            max_results: max,
        }
    }

    /// True when `count` (a running total including skipped results) has
    /// reached the end of the window.
    pub fn exhausted_by(&self, count: usize) -> bool {
        self.max_results != -1 && count >= self.first_result + self.max_results as usize
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// A listed header with the deletion status lifted out.
#[derive(Debug, Clone)]
pub struct HeaderResult {
    pub header: Header,
    pub deleted: bool,
}

impl HeaderResult {
    pub fn new(header: Header) -> Self {
        let deleted = header.is_deleted();
        HeaderResult { header, deleted }
    }

    /// The record's URN.
    pub fn identifier(&self) -> &str {
        &self.header.identifier
    }
}

/// A fetched record with the deletion status lifted out.
#[derive(Debug, Clone)]
pub struct RecordResult {
    pub header: Header,
    /// The raw metadata XML. Empty for tombstones.
    pub content: String,
    pub deleted: bool,
}

impl RecordResult {
    pub fn new(header: Header, content: String) -> Self {
        let deleted = header.is_deleted();
        RecordResult {
            header,
            content,
            deleted,
        }
    }

    /// The record's URN.
    pub fn identifier(&self) -> &str {
        &self.header.identifier
    }

    /// View this record as a header-only result.
    pub fn as_header_result(&self) -> HeaderResult {
        HeaderResult {
            header: self.header.clone(),
            deleted: self.deleted,
        }
    }
}

impl From<crate::wire::Record> for RecordResult {
    fn from(record: crate::wire::Record) -> Self {
        RecordResult::new(record.header, record.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(status: Option<&str>) -> Header {
        Header {
            identifier: "urn:x".to_string(),
            datestamp: DateTime::<Utc>::UNIX_EPOCH,
            set_spec: vec![],
            status: status.map(String::from),
        }
    }

    #[test]
    fn deleted_status_is_lifted() {
        assert!(HeaderResult::new(header(Some("deleted"))).deleted);
        assert!(!HeaderResult::new(header(None)).deleted);
        assert!(!HeaderResult::new(header(Some("active"))).deleted);
    }

    #[test]
    fn window_bounds() {
        let w = Window::new(7, 4);
        assert!(!w.exhausted_by(10));
        assert!(w.exhausted_by(11));

        let unbounded = Window::unbounded();
        assert!(!unbounded.exhausted_by(usize::MAX / 2));
    }
}
