//! Paged iterators over list responses.
//!
//! Each iterator holds the current page in a buffer and the resumption
//! token that continues it. Advancing past the buffer triggers a fetch
//! carrying only the token, per the protocol. A missing token after the
//! last page, or a provider answering `noRecordsMatch`, terminates the
//! iterator cleanly.

use async_trait::async_trait;

use oaipmh_core::error::Error;
use oaipmh_core::wire::{self, Payload};
use oaipmh_core::Result;

use crate::client::Client;

const NEXT_NOT_CALLED: &str = "next() was not called first";

/// An iterator over a `ListIdentifiers` or `ListRecords` response.
///
/// `next()` must succeed before `header()` or `record()` are meaningful.
#[async_trait]
pub trait RecordIterator: Send {
    /// Advance to the next element, fetching the next page when the
    /// current one is exhausted. Returns [`Error::NoMore`] once the list
    /// is fully drained.
    async fn next(&mut self) -> Result<()>;

    /// The header of the current element.
    fn header(&self) -> Result<&wire::Header>;

    /// The current record. Fails on iterators that only carry headers.
    fn record(&self) -> Result<&wire::Record>;
}

/// Paging state shared by the iterators: pending initial parameters, the
/// current resumption token, and the buffer position.
struct PageState {
    initial_params: Option<Vec<(String, String)>>,
    token: Option<String>,
    pos: usize,
}

impl PageState {
    fn new(initial_params: Vec<(String, String)>) -> Self {
        PageState {
            initial_params: Some(initial_params),
            token: None,
            pos: 0,
        }
    }

    /// The parameters for the next fetch, or `None` when the list is
    /// exhausted. Subsequent fetches carry only the resumption token.
    fn next_request(&mut self) -> Option<Vec<(String, String)>> {
        if let Some(params) = self.initial_params.take() {
            return Some(params);
        }
        self.token
            .take()
            .map(|token| vec![("resumptionToken".to_string(), token)])
    }

    fn start_page(&mut self, token: Option<String>) {
        self.pos = 0;
        self.token = token.filter(|t| !t.is_empty());
    }
}

// ---------------------------------------------------------------------------
// ListIdentifiers

/// Iterator over listed headers.
pub struct ListIdentifiersIter {
    client: Client,
    state: PageState,
    headers: Vec<wire::Header>,
}

impl ListIdentifiersIter {
    pub(crate) fn new(client: Client, params: Vec<(String, String)>) -> Self {
        Self {
            client,
            state: PageState::new(params),
            headers: Vec::new(),
        }
    }

    async fn fetch_page(&mut self, params: Vec<(String, String)>) -> Result<()> {
        let envelope = self.client.fetch("ListIdentifiers", params).await?;
        match envelope.payload {
            Payload::ListIdentifiers(list) => {
                self.headers = list.headers;
                self.state.start_page(list.resumption_token);
                Ok(())
            }
            _ => Err(Error::Malformed(
                "ListIdentifiers response carries the wrong payload".to_string(),
            )),
        }
    }
}

#[async_trait]
impl RecordIterator for ListIdentifiersIter {
    async fn next(&mut self) -> Result<()> {
        loop {
            if self.state.pos < self.headers.len() {
                self.state.pos += 1;
                return Ok(());
            }

            let Some(params) = self.state.next_request() else {
                return Err(Error::NoMore);
            };

            match self.fetch_page(params).await {
                Ok(()) => {}
                Err(e) if e.is_end_of_stream() => return Err(Error::NoMore),
                Err(e) => return Err(e),
            }
        }
    }

    fn header(&self) -> Result<&wire::Header> {
        if self.state.pos > 0 {
            Ok(&self.headers[self.state.pos - 1])
        } else {
            Err(Error::IteratorState(NEXT_NOT_CALLED))
        }
    }

    fn record(&self) -> Result<&wire::Record> {
        Err(Error::IteratorState("records are not fetched"))
    }
}

// ---------------------------------------------------------------------------
// ListRecords

/// Iterator over listed records.
pub struct ListRecordsIter {
    client: Client,
    state: PageState,
    records: Vec<wire::Record>,
}

impl ListRecordsIter {
    pub(crate) fn new(client: Client, params: Vec<(String, String)>) -> Self {
        Self {
            client,
            state: PageState::new(params),
            records: Vec::new(),
        }
    }

    async fn fetch_page(&mut self, params: Vec<(String, String)>) -> Result<()> {
        let envelope = self.client.fetch("ListRecords", params).await?;
        match envelope.payload {
            Payload::ListRecords(list) => {
                self.records = list.records;
                self.state.start_page(list.resumption_token);
                Ok(())
            }
            _ => Err(Error::Malformed(
                "ListRecords response carries the wrong payload".to_string(),
            )),
        }
    }
}

#[async_trait]
impl RecordIterator for ListRecordsIter {
    async fn next(&mut self) -> Result<()> {
        loop {
            if self.state.pos < self.records.len() {
                self.state.pos += 1;
                return Ok(());
            }

            let Some(params) = self.state.next_request() else {
                return Err(Error::NoMore);
            };

            match self.fetch_page(params).await {
                Ok(()) => {}
                Err(e) if e.is_end_of_stream() => return Err(Error::NoMore),
                Err(e) => return Err(e),
            }
        }
    }

    fn header(&self) -> Result<&wire::Header> {
        self.record().map(|record| &record.header)
    }

    fn record(&self) -> Result<&wire::Record> {
        if self.state.pos > 0 {
            Ok(&self.records[self.state.pos - 1])
        } else {
            Err(Error::IteratorState(NEXT_NOT_CALLED))
        }
    }
}

// ---------------------------------------------------------------------------
// ListSets

/// Iterator over the provider's sets. Pages the same way as the record
/// iterators but yields [`wire::Set`] values.
pub struct ListSetsIter {
    client: Client,
    state: PageState,
    sets: Vec<wire::Set>,
}

impl ListSetsIter {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            state: PageState::new(Vec::new()),
            sets: Vec::new(),
        }
    }

    /// Advance to the next set. Returns [`Error::NoMore`] once drained.
    pub async fn next(&mut self) -> Result<()> {
        loop {
            if self.state.pos < self.sets.len() {
                self.state.pos += 1;
                return Ok(());
            }

            let Some(params) = self.state.next_request() else {
                return Err(Error::NoMore);
            };

            match self.fetch_page(params).await {
                Ok(()) => {}
                Err(e) if e.is_end_of_stream() => return Err(Error::NoMore),
                Err(e) => return Err(e),
            }
        }
    }

    /// The current set.
    pub fn set(&self) -> Result<&wire::Set> {
        if self.state.pos > 0 {
            Ok(&self.sets[self.state.pos - 1])
        } else {
            Err(Error::IteratorState(NEXT_NOT_CALLED))
        }
    }

    async fn fetch_page(&mut self, params: Vec<(String, String)>) -> Result<()> {
        let envelope = self.client.fetch("ListSets", params).await?;
        match envelope.payload {
            Payload::ListSets(list) => {
                self.sets = list.sets;
                self.state.start_page(list.resumption_token);
                Ok(())
            }
            _ => Err(Error::Malformed(
                "ListSets response carries the wrong payload".to_string(),
            )),
        }
    }
}
