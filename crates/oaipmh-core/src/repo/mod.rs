//! Repository-side record model and cursor contract.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::wire::{MetadataFormat, Set};
use crate::Result;

/// The floor datestamp used when a listing has no lower bound.
pub fn min_datestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).unwrap()
}

/// Lazily-loaded record content. Reading the backing store is deferred
/// until the record is actually served.
pub type ContentLoader = Arc<dyn Fn() -> Result<String> + Send + Sync>;

/// A record held by a repository.
///
/// Only the identity fields are materialised up front; the metadata body
/// stays behind [`ContentLoader`] so that listing a large repository does
/// not read every file.
#[derive(Clone)]
pub struct StoredRecord {
    /// The record identifier (filename stem for file repositories).
    pub id: String,
    /// Last modification time.
    pub date: DateTime<Utc>,
    /// The set this record belongs to.
    pub set: String,
    /// Loader for the record's metadata XML.
    pub content: ContentLoader,
}

impl StoredRecord {
    /// Read the record's metadata content.
    pub fn content(&self) -> Result<String> {
        (self.content)()
    }
}

impl fmt::Debug for StoredRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredRecord")
            .field("id", &self.id)
            .field("date", &self.date)
            .field("set", &self.set)
            .finish_non_exhaustive()
    }
}

/// Ordered, rewindable access over a repository listing.
///
/// A freshly created cursor is positioned at the first record: `record()`
/// returns it without a preceding `next()`. `set_pos` supports the
/// provider's rewind-on-resumption discipline.
pub trait RecordCursor: Send {
    /// True while the cursor points at a record.
    fn has_record(&self) -> bool;

    /// Advance to the next record. Returns false when the cursor moves
    /// past the end.
    fn next(&mut self) -> bool;

    /// Move the cursor to an absolute position. Returns false and leaves
    /// the cursor unchanged when the position is invalid.
    fn set_pos(&mut self, pos: usize) -> bool;

    /// The current position.
    fn pos(&self) -> usize;

    /// The record at the current position, if any.
    fn record(&self) -> Option<&StoredRecord>;
}

/// Drain up to `n` records from a cursor. The second return value is true
/// when the cursor still has records to serve.
pub fn next_n_records(cursor: &mut dyn RecordCursor, n: usize) -> (Vec<StoredRecord>, bool) {
    let mut records = Vec::with_capacity(n.min(128));

    while records.len() < n && cursor.has_record() {
        if let Some(record) = cursor.record() {
            records.push(record.clone());
        }
        cursor.next();
    }

    (records, cursor.has_record())
}

/// A repository that can be hosted as an OAI-PMH provider.
#[async_trait]
pub trait Repository: Send + Sync {
    /// The sets managed by this repository.
    async fn sets(&self) -> Result<Vec<Set>>;

    /// The metadata formats managed by this repository.
    fn formats(&self) -> Vec<MetadataFormat>;

    /// A cursor over records, optionally restricted to a set. The cursor
    /// is positioned at the first record.
    async fn list_records(
        &self,
        set: Option<&str>,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Box<dyn RecordCursor>>;

    /// Look up a single record by identifier.
    async fn record(&self, id: &str) -> Result<Option<StoredRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedCursor {
        records: Vec<StoredRecord>,
        pos: usize,
    }

    fn record(id: &str) -> StoredRecord {
        StoredRecord {
            id: id.to_string(),
            date: min_datestamp(),
            set: "alpha".to_string(),
            content: Arc::new(|| Ok("<doc/>".to_string())),
        }
    }

    impl RecordCursor for FixedCursor {
        fn has_record(&self) -> bool {
            self.pos < self.records.len()
        }

        fn next(&mut self) -> bool {
            self.pos += 1;
            self.has_record()
        }

        fn set_pos(&mut self, pos: usize) -> bool {
            if pos < self.records.len() {
                self.pos = pos;
                true
            } else {
                false
            }
        }

        fn pos(&self) -> usize {
            self.pos
        }

        fn record(&self) -> Option<&StoredRecord> {
            self.records.get(self.pos)
        }
    }

    #[test]
    fn next_n_drains_in_batches() {
        let mut cursor = FixedCursor {
            records: (0..5).map(|i| record(&format!("urn:{}", i))).collect(),
            pos: 0,
        };

        let (batch, more) = next_n_records(&mut cursor, 3);
        assert_eq!(batch.len(), 3);
        assert!(more);
        assert_eq!(cursor.pos(), 3);

        let (batch, more) = next_n_records(&mut cursor, 3);
        assert_eq!(batch.len(), 2);
        assert!(!more);
    }

    #[test]
    fn next_n_zero_leaves_cursor_alone() {
        let mut cursor = FixedCursor {
            records: vec![record("urn:0")],
            pos: 0,
        };

        let (batch, more) = next_n_records(&mut cursor, 0);
        assert!(batch.is_empty());
        assert!(more);
        assert_eq!(cursor.pos(), 0);
    }
}
