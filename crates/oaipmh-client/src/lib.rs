//! oaipmh-client - OAI-PMH harvesting client.
//!
//! A resumption-token-driven client over an OAI-PMH provider: the
//! [`Client`] performs single verb calls and hands back lazy paged
//! iterators; the [`Session`] facade adds result windows, callback-driven
//! iteration and tombstone handling on top.

mod client;
mod iter;
mod session;

pub use client::{Client, DebugLevel, ListArgs, Transport};
pub use iter::{ListIdentifiersIter, ListRecordsIter, ListSetsIter, RecordIterator};
pub use session::Session;
