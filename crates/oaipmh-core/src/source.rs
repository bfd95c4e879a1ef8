//! The record source trait consumed by harvesters and comparators.

use async_trait::async_trait;

use crate::results::{HeaderResult, ListQuery, RecordResult, Window};
use crate::Result;

/// Receiver for listed items.
///
/// Implemented for any `FnMut(T) -> bool` closure; returning false stops
/// the listing cleanly. Implementations that feed bounded queues can
/// suspend in `accept`, which is how backpressure reaches the lister.
#[async_trait]
pub trait ListSink<T>: Send {
    async fn accept(&mut self, item: T) -> bool;
}

#[async_trait]
impl<T, F> ListSink<T> for F
where
    T: Send + 'static,
    F: FnMut(T) -> bool + Send,
{
    async fn accept(&mut self, item: T) -> bool {
        self(item)
    }
}

/// A source of headers and records.
///
/// This is the seam between the bulk operations (harvest, search,
/// compare) and the protocol client: the client session implements it
/// over the wire, and tests implement it in memory.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// List record headers matching `query`, windowed by `window`.
    async fn list_identifiers(
        &self,
        query: &ListQuery,
        window: Window,
        sink: &mut dyn ListSink<HeaderResult>,
    ) -> Result<()>;

    /// List full records matching `query`, windowed by `window`.
    async fn list_records(
        &self,
        query: &ListQuery,
        window: Window,
        sink: &mut dyn ListSink<RecordResult>,
    ) -> Result<()>;

    /// Fetch a single record by its URN.
    async fn get_record(&self, id: &str) -> Result<RecordResult>;
}
