//! oaipmh-core - Core OAI-PMH types, wire messages and traits.

pub mod error;
pub mod repo;
pub mod results;
pub mod source;
pub mod types;
pub mod wire;

pub use error::{Error, ErrorCode, TransportError};
pub use repo::{min_datestamp, next_n_records, ContentLoader, RecordCursor, Repository, StoredRecord};
pub use results::{HeaderResult, ListQuery, RecordResult, Window};
pub use source::{ListSink, RecordSource};
pub use types::EndpointUrl;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
