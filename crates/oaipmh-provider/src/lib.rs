//! oaipmh-provider - A hostable OAI-PMH provider.
//!
//! A verb dispatcher over HTTP with an in-process resumption-token
//! registry, backed by a pluggable [`Repository`] implementation. The
//! included [`FileRepository`] serves records straight from a directory
//! tree.
//!
//! [`Repository`]: oaipmh_core::Repository

mod filerepo;
mod handler;
mod tokens;

pub use filerepo::{default_format, FileRepository, VecRecordCursor};
pub use handler::{Provider, VerbParams};
pub use tokens::TokenRegistry;
