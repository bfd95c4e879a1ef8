//! Error types for the OAI-PMH toolkit.
//!
//! This module provides a unified error type with explicit variants for
//! transport, protocol and iterator-state failures. The end-of-stream
//! signal is modelled as an error variant so that iterators can surface
//! it through the same channel as real failures; it is folded away before
//! anything reaches the user.

use std::fmt;
use thiserror::Error;

/// The unified error type for OAI-PMH operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (connection, timeout, non-200 status).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A typed error returned inside an OAI-PMH response envelope.
    #[error("OAI-PMH error ({code}): {message}")]
    Protocol { code: ErrorCode, message: String },

    /// No more results in an iterator. Internal signal, never user-visible.
    #[error("no more results")]
    NoMore,

    /// The response body could not be decoded as an OAI-PMH envelope.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The provider URL failed validation.
    #[error("invalid provider URL '{value}': {reason}")]
    BadEndpoint { value: String, reason: String },

    /// A failure scoped to a single record, carrying its identifier.
    #[error("record '{id}': {source}")]
    Record {
        id: String,
        #[source]
        source: Box<Error>,
    },

    /// Filesystem errors from the file repository and file-driven harvester.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An iterator accessor was called out of sequence.
    #[error("{0}")]
    IteratorState(&'static str),
}

impl Error {
    /// Wrap an error with the identifier of the record it relates to.
    pub fn for_record(id: impl Into<String>, source: Error) -> Self {
        Error::Record {
            id: id.into(),
            source: Box::new(source),
        }
    }

    /// True when this error means the stream is cleanly drained rather
    /// than broken: the internal end marker, or a provider reporting
    /// `noRecordsMatch`.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Error::NoMore)
            || matches!(
                self,
                Error::Protocol {
                    code: ErrorCode::NoRecordsMatch,
                    ..
                }
            )
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// The provider answered with a non-200 status.
    #[error("HTTP error: {status}")]
    Status { status: u16 },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else {
            TransportError::Http {
                message: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(TransportError::from(err))
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Malformed(err.to_string())
    }
}

/// The machine-readable error codes defined by OAI-PMH 2.0.
///
/// `Display` and `from_wire` round-trip the protocol spelling, so codes
/// not in the closed protocol set survive as [`ErrorCode::Other`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    BadArgument,
    BadResumptionToken,
    BadVerb,
    CannotDisseminateFormat,
    IdDoesNotExist,
    NoRecordsMatch,
    NoMetadataFormats,
    NoSetHierarchy,
    Other(String),
}

impl ErrorCode {
    /// Parse a wire-format code string.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "badArgument" => ErrorCode::BadArgument,
            "badResumptionToken" => ErrorCode::BadResumptionToken,
            "badVerb" => ErrorCode::BadVerb,
            "cannotDisseminateFormat" => ErrorCode::CannotDisseminateFormat,
            "idDoesNotExist" => ErrorCode::IdDoesNotExist,
            "noRecordsMatch" => ErrorCode::NoRecordsMatch,
            "noMetadataFormats" => ErrorCode::NoMetadataFormats,
            "noSetHierarchy" => ErrorCode::NoSetHierarchy,
            other => ErrorCode::Other(other.to_string()),
        }
    }

    /// The wire spelling of this code.
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::BadArgument => "badArgument",
            ErrorCode::BadResumptionToken => "badResumptionToken",
            ErrorCode::BadVerb => "badVerb",
            ErrorCode::CannotDisseminateFormat => "cannotDisseminateFormat",
            ErrorCode::IdDoesNotExist => "idDoesNotExist",
            ErrorCode::NoRecordsMatch => "noRecordsMatch",
            ErrorCode::NoMetadataFormats => "noMetadataFormats",
            ErrorCode::NoSetHierarchy => "noSetHierarchy",
            ErrorCode::Other(s) => s,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_round_trips_wire_spelling() {
        for code in [
            "badArgument",
            "badResumptionToken",
            "badVerb",
            "cannotDisseminateFormat",
            "idDoesNotExist",
            "noRecordsMatch",
            "noMetadataFormats",
            "noSetHierarchy",
            "somethingFuturistic",
        ] {
            assert_eq!(ErrorCode::from_wire(code).as_str(), code);
        }
    }

    #[test]
    fn no_records_match_is_end_of_stream() {
        let err = Error::Protocol {
            code: ErrorCode::NoRecordsMatch,
            message: "nothing here".to_string(),
        };
        assert!(err.is_end_of_stream());
        assert!(Error::NoMore.is_end_of_stream());
    }

    #[test]
    fn other_protocol_codes_are_fatal() {
        let err = Error::Protocol {
            code: ErrorCode::BadArgument,
            message: "bad".to_string(),
        };
        assert!(!err.is_end_of_stream());
    }
}
