//! The session facade over the protocol client.
//!
//! The session owns the metadata prefix and adds the contracts every
//! command relies on: windowed subsets, callback-driven iteration with
//! clean early stop, and tombstone status lifted to a boolean. The
//! `noRecordsMatch` protocol code and the internal end marker both fold
//! into normal termination here.

use async_trait::async_trait;

use oaipmh_core::source::ListSink;
use oaipmh_core::wire;
use oaipmh_core::{Error, HeaderResult, ListQuery, RecordResult, RecordSource, Result, Window};

use crate::client::{Client, ListArgs};
use crate::iter::RecordIterator;

/// A session against one provider with a fixed metadata prefix.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    prefix: String,
}

impl Session {
    /// Create a session over an existing client.
    pub fn new(client: Client, prefix: impl Into<String>) -> Self {
        Session {
            client,
            prefix: prefix.into(),
        }
    }

    /// The underlying protocol client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The metadata prefix used by this session.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn list_args(&self, query: &ListQuery) -> ListArgs {
        ListArgs {
            prefix: self.prefix.clone(),
            set: query.set.clone(),
            from: query.from,
            until: query.until,
        }
    }

    /// Drive `iter` through `window`, projecting each in-window element
    /// and handing it to `sink`. A false return from the sink stops the
    /// iteration cleanly, as does hitting the window bound (with a
    /// one-line stderr advisory, matching the `-c` flag's behaviour).
    async fn iterator_subset<I, T>(
        &self,
        iter: &mut I,
        window: Window,
        project: impl Fn(&I) -> Result<T> + Send,
        sink: &mut dyn ListSink<T>,
    ) -> Result<()>
    where
        I: RecordIterator,
        T: Send + 'static,
    {
        let mut count: usize = 0;

        loop {
            match iter.next().await {
                Ok(()) => {}
                Err(e) if e.is_end_of_stream() => return Ok(()),
                Err(e) => return Err(e),
            }

            if count >= window.first_result && !sink.accept(project(iter)?).await {
                return Ok(());
            }

            count += 1;
            if window.exhausted_by(count) {
                eprintln!(
                    "Maximum number of results encountered ({}).  Use -c to change.",
                    window.max_results
                );
                return Ok(());
            }
        }
    }

    /// List headers, handing each one in the window to `sink`.
    pub async fn list_identifiers(
        &self,
        query: &ListQuery,
        window: Window,
        sink: &mut dyn ListSink<HeaderResult>,
    ) -> Result<()> {
        let mut iter = self.client.list_identifiers(self.list_args(query));

        self.iterator_subset(
            &mut iter,
            window,
            |it| Ok(HeaderResult::new(it.header()?.clone())),
            sink,
        )
        .await
    }

    /// List headers by running `ListRecords` and discarding the payloads.
    /// For providers that reject `ListIdentifiers` but accept
    /// `ListRecords` with the same paging semantics.
    pub async fn list_identifiers_using_list_records(
        &self,
        query: &ListQuery,
        window: Window,
        sink: &mut dyn ListSink<HeaderResult>,
    ) -> Result<()> {
        let mut iter = self.client.list_records(self.list_args(query));

        self.iterator_subset(
            &mut iter,
            window,
            |it| Ok(HeaderResult::new(it.record()?.header.clone())),
            sink,
        )
        .await
    }

    /// List full records, handing each one in the window to `sink`.
    pub async fn list_records(
        &self,
        query: &ListQuery,
        window: Window,
        sink: &mut dyn ListSink<RecordResult>,
    ) -> Result<()> {
        let mut iter = self.client.list_records(self.list_args(query));

        self.iterator_subset(
            &mut iter,
            window,
            |it| Ok(RecordResult::from(it.record()?.clone())),
            sink,
        )
        .await
    }

    /// List the provider's sets, handing each one in the window to `sink`.
    pub async fn list_sets(
        &self,
        window: Window,
        sink: &mut dyn ListSink<wire::Set>,
    ) -> Result<()> {
        let mut iter = self.client.list_sets();
        let mut count: usize = 0;

        loop {
            match iter.next().await {
                Ok(()) => {}
                Err(e) if e.is_end_of_stream() => return Ok(()),
                Err(e) => return Err(e),
            }

            if count >= window.first_result && !sink.accept(iter.set()?.clone()).await {
                return Ok(());
            }

            count += 1;
            if window.exhausted_by(count) {
                eprintln!(
                    "Maximum number of results encountered ({}).  Use -c to change.",
                    window.max_results
                );
                return Ok(());
            }
        }
    }

    /// Fetch a single record. Failures carry the record's identifier.
    pub async fn get_record(&self, id: &str) -> Result<RecordResult> {
        match self.client.get_record(&self.prefix, id).await {
            Ok(record) => Ok(RecordResult::from(record)),
            Err(err) => Err(Error::for_record(id, err)),
        }
    }

    /// Fetch the provider's identity.
    pub async fn identify(&self) -> Result<wire::Identify> {
        self.client.identify().await
    }
}

#[async_trait]
impl RecordSource for Session {
    async fn list_identifiers(
        &self,
        query: &ListQuery,
        window: Window,
        sink: &mut dyn ListSink<HeaderResult>,
    ) -> Result<()> {
        Session::list_identifiers(self, query, window, sink).await
    }

    async fn list_records(
        &self,
        query: &ListQuery,
        window: Window,
        sink: &mut dyn ListSink<RecordResult>,
    ) -> Result<()> {
        Session::list_records(self, query, window, sink).await
    }

    async fn get_record(&self, id: &str) -> Result<RecordResult> {
        Session::get_record(self, id).await
    }
}
