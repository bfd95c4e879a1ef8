//! Metadata harvesters: bulk record retrieval from a record source.
//!
//! Three strategies produce the same observer callbacks. The serial
//! harvester walks `ListRecords` directly; the two parallel variants feed
//! identifiers (from `ListIdentifiers` or from a file) into a map/reduce
//! pool whose mappers fetch records with `GetRecord` and whose single
//! reducer dispatches to the observer. Parallel delivery order is
//! arbitrary; `on_completed` is always the final callback.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use oaipmh_core::source::ListSink;
use oaipmh_core::{Error, HeaderResult, ListQuery, RecordResult, RecordSource, Result, Window};

use crate::lines::lines_from_file;
use crate::mapreduce::MapReduce;

/// Input queue capacity for the parallel harvesters.
const WORK_QUEUE_CAPACITY: usize = 100;

/// Recipient of harvested records.
pub trait HarvestObserver: Send {
    /// Called for every harvested record that passes the guard.
    fn on_record(&mut self, record: &RecordResult);

    /// Called when a record or listing error is encountered. The harvest
    /// continues.
    fn on_error(&mut self, error: Error);

    /// Called exactly once, after all in-flight work has drained.
    fn on_completed(&mut self, selected: usize, skipped: usize, errors: usize);
}

/// A predicate over listed headers, applied before a record is fetched.
pub type HeaderPredicate = fn(&HeaderResult) -> bool;

/// A predicate over fetched records.
pub type RecordPredicate = fn(&RecordResult) -> bool;

/// Selects every header.
pub fn all_headers(_: &HeaderResult) -> bool {
    true
}

/// Selects only headers of live records.
pub fn live_headers(header: &HeaderResult) -> bool {
    !header.deleted
}

/// Selects every record.
pub fn all_records(_: &RecordResult) -> bool {
    true
}

/// Selects only live records.
pub fn live_records(record: &RecordResult) -> bool {
    !record.deleted
}

/// Running totals kept by the parallel reducers.
#[derive(Debug, Default, Clone, Copy)]
struct Counts {
    selected: usize,
    skipped: usize,
    errors: usize,
}

// ---------------------------------------------------------------------------
// ListRecords harvester

/// A serial harvester using the `ListRecords` verb.
pub struct ListRecordsHarvester<S> {
    pub source: S,
    pub query: ListQuery,
    pub window: Window,
    /// Guard applied to each record; defaults to live records only.
    pub guard: Option<RecordPredicate>,
}

impl<S: RecordSource> ListRecordsHarvester<S> {
    /// Run the harvest, returning the observer when everything has
    /// drained.
    pub async fn harvest<O: HarvestObserver>(&self, mut observer: O) -> O {
        let guard = self.guard.unwrap_or(live_records);
        let mut selected = 0;
        let mut skipped = 0;
        let mut errors = 0;

        let listing = self
            .source
            .list_records(&self.query, self.window, &mut |record: RecordResult| {
                if guard(&record) {
                    observer.on_record(&record);
                    selected += 1;
                } else {
                    skipped += 1;
                }
                true
            })
            .await;

        if let Err(err) = listing {
            observer.on_error(err);
            errors += 1;
        }

        observer.on_completed(selected, skipped, errors);
        observer
    }
}

// ---------------------------------------------------------------------------
// List-and-get harvester

/// A parallel harvester: `ListIdentifiers` feeds URNs into a worker pool
/// whose mappers call `GetRecord`.
pub struct ListAndGetHarvester<S> {
    pub source: S,
    pub query: ListQuery,
    pub window: Window,
    /// Number of parallel download workers.
    pub workers: usize,
    /// Guard applied to listed headers before a record is queued.
    pub harvest_guard: Option<HeaderPredicate>,
    /// Guard applied to fetched records; defaults to live records only.
    pub guard: Option<RecordPredicate>,
}

impl<S: RecordSource + Clone + 'static> ListAndGetHarvester<S> {
    /// Run the harvest, returning the observer when everything has
    /// drained.
    pub async fn harvest<O: HarvestObserver + 'static>(&self, observer: O) -> O {
        let guard = self.guard.unwrap_or(live_records);
        let head_guard = self.harvest_guard.unwrap_or(all_headers);

        let pool = get_record_pool(self.source.clone(), observer, self.workers, guard);

        let mut sink = QueueSink {
            pool: &pool,
            guard: head_guard,
            skipped: 0,
        };
        let listing = self
            .source
            .list_identifiers(&self.query, self.window, &mut sink)
            .await;
        let lister_skipped = sink.skipped;

        debug!(skipped = lister_skipped, "identifier listing finished");

        let (mut observer, mut counts) = pool.close().await;

        if let Err(err) = listing {
            observer.on_error(err);
            counts.errors += 1;
        }

        observer.on_completed(counts.selected, counts.skipped + lister_skipped, counts.errors);
        observer
    }
}

/// Sink feeding accepted identifiers into the worker pool. Headers
/// rejected by the guard are counted, not queued.
struct QueueSink<'a, O> {
    pool: &'a MapReduce<String, (O, Counts)>,
    guard: HeaderPredicate,
    skipped: usize,
}

#[async_trait]
impl<O: HarvestObserver + 'static> ListSink<HeaderResult> for QueueSink<'_, O> {
    async fn accept(&mut self, header: HeaderResult) -> bool {
        if (self.guard)(&header) {
            self.pool.push(header.identifier().to_string()).await
        } else {
            self.skipped += 1;
            true
        }
    }
}

// ---------------------------------------------------------------------------
// File harvester

/// A parallel harvester reading URNs from a file, or standard input when
/// the filename is `-`.
pub struct FileHarvester<S> {
    pub source: S,
    pub filename: String,
    pub window: Window,
    /// Number of parallel download workers.
    pub workers: usize,
    /// Guard applied to fetched records; defaults to live records only.
    pub guard: Option<RecordPredicate>,
}

impl<S: RecordSource + Clone + 'static> FileHarvester<S> {
    /// Run the harvest, returning the observer when everything has
    /// drained.
    pub async fn harvest<O: HarvestObserver + 'static>(&self, observer: O) -> O {
        let guard = self.guard.unwrap_or(live_records);

        let pool = get_record_pool(self.source.clone(), observer, self.workers, guard);

        let mut sink = LineSink { pool: &pool };
        let listing = lines_from_file(&self.filename, self.window, &mut sink).await;

        let (mut observer, mut counts) = pool.close().await;

        if let Err(err) = listing {
            observer.on_error(err);
            counts.errors += 1;
        }

        observer.on_completed(counts.selected, counts.skipped, counts.errors);
        observer
    }
}

struct LineSink<'a, O> {
    pool: &'a MapReduce<String, (O, Counts)>,
}

#[async_trait]
impl<O: HarvestObserver + 'static> ListSink<String> for LineSink<'_, O> {
    async fn accept(&mut self, urn: String) -> bool {
        self.pool.push(urn).await
    }
}

// ---------------------------------------------------------------------------

/// Set up the worker pool shared by the parallel harvesters:
///
///   mapper:  URN -> fetched record, or an error
///   reducer: dispatches records and errors to the observer and keeps
///            the counts for the terminal callback
///
/// URNs are pushed into the pool's input queue.
fn get_record_pool<S, O>(
    source: S,
    observer: O,
    workers: usize,
    guard: RecordPredicate,
) -> MapReduce<String, (O, Counts)>
where
    S: RecordSource + Clone + 'static,
    O: HarvestObserver + 'static,
{
    MapReduce::start(
        workers,
        WORK_QUEUE_CAPACITY,
        workers.max(1) * 5,
        move |id: String| {
            let source = source.clone();
            async move { source.get_record(&id).await }
        },
        move |mut results: mpsc::Receiver<Result<RecordResult>>| async move {
            let mut observer = observer;
            let mut counts = Counts::default();

            while let Some(result) = results.recv().await {
                match result {
                    Ok(record) => {
                        if guard(&record) {
                            counts.selected += 1;
                            observer.on_record(&record);
                        } else {
                            counts.skipped += 1;
                        }
                    }
                    Err(err) => {
                        counts.errors += 1;
                        observer.on_error(err);
                    }
                }
            }

            (observer, counts)
        },
    )
}
