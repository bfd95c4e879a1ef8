//! Typed OAI-PMH protocol messages and their XML codec.
//!
//! A response envelope is a discriminated union: exactly one payload kind
//! is present per response. Each payload decodes from its own XML element
//! under the `http://www.openarchives.org/OAI/2.0/` namespace.

mod decode;
mod encode;

pub use decode::decode_envelope;
pub use encode::encode_envelope;

use chrono::{DateTime, Utc};

use crate::error::ErrorCode;

/// The OAI-PMH 2.0 XML namespace.
pub const OAI_PMH_NS: &str = "http://www.openarchives.org/OAI/2.0/";

/// The Dublin Core container namespace used inside set descriptions.
pub const OAI_DC_NS: &str = "http://www.openarchives.org/OAI/2.0/oai_dc/";

/// The header status value marking a tombstone.
pub const STATUS_DELETED: &str = "deleted";

/// A full OAI-PMH response envelope.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// When the provider produced this response (UTC).
    pub response_date: DateTime<Utc>,
    /// The echoed request element.
    pub request: RequestEcho,
    /// The response payload.
    pub payload: Payload,
}

/// The echoed `<request>` element of a response.
#[derive(Debug, Clone, Default)]
pub struct RequestEcho {
    /// The provider base URL (element text).
    pub base_url: String,
    /// The verb of the request being answered.
    pub verb: String,
}

/// The payload of a response. Exactly one variant per envelope.
#[derive(Debug, Clone)]
pub enum Payload {
    Error(ProtocolFault),
    Identify(Identify),
    ListMetadataFormats(Vec<MetadataFormat>),
    ListSets(SetList),
    ListIdentifiers(HeaderList),
    ListRecords(RecordList),
    GetRecord(Box<Record>),
}

/// A protocol-level error carried inside an envelope.
#[derive(Debug, Clone)]
pub struct ProtocolFault {
    pub code: ErrorCode,
    pub message: String,
}

/// The `Identify` payload describing a repository.
#[derive(Debug, Clone)]
pub struct Identify {
    pub repository_name: String,
    pub base_url: String,
    pub protocol_version: String,
    pub admin_email: String,
    pub earliest_datestamp: String,
    pub deleted_record: String,
    pub granularity: String,
}

/// A metadata format offered by a repository.
#[derive(Debug, Clone)]
pub struct MetadataFormat {
    pub prefix: String,
    pub schema: String,
    pub namespace: String,
}

/// A record header.
#[derive(Debug, Clone)]
pub struct Header {
    /// The record's URN. Opaque and unique, not necessarily a URL.
    pub identifier: String,
    /// Last modification time of the record.
    pub datestamp: DateTime<Utc>,
    /// The sets this record belongs to.
    pub set_spec: Vec<String>,
    /// Optional status attribute; `"deleted"` marks a tombstone.
    pub status: Option<String>,
}

impl Header {
    /// True when this header marks a deleted record.
    pub fn is_deleted(&self) -> bool {
        self.status.as_deref() == Some(STATUS_DELETED)
    }
}

/// A record: header plus the raw inner XML of its `<metadata>` element.
///
/// The metadata is preserved byte-for-byte, including the producer's
/// namespace declarations. Deleted records carry no metadata.
#[derive(Debug, Clone)]
pub struct Record {
    pub header: Header,
    pub metadata: String,
}

/// A set offered by a repository.
#[derive(Debug, Clone)]
pub struct Set {
    pub spec: String,
    pub name: String,
    /// Flattened from the embedded Dublin Core `<dc><description>`.
    pub description: String,
}

/// One page of a `ListIdentifiers` response.
#[derive(Debug, Clone, Default)]
pub struct HeaderList {
    pub headers: Vec<Header>,
    pub resumption_token: Option<String>,
}

/// One page of a `ListRecords` response.
#[derive(Debug, Clone, Default)]
pub struct RecordList {
    pub records: Vec<Record>,
    pub resumption_token: Option<String>,
}

/// One page of a `ListSets` response.
#[derive(Debug, Clone, Default)]
pub struct SetList {
    pub sets: Vec<Set>,
    pub resumption_token: Option<String>,
}
