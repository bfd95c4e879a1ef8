//! oaipmh-harvest - Bulk operations over OAI-PMH records.
//!
//! Parallel harvesting over a bounded map/reduce worker pool, a small
//! search expression language evaluated against record XML, and a
//! two-source presence comparator.

pub mod compare;
pub mod harvester;
pub mod lines;
pub mod mapreduce;
pub mod search;

pub use compare::{PresenceListener, PresenceMap};
pub use harvester::{
    all_headers, all_records, live_headers, live_records, FileHarvester, HarvestObserver,
    HeaderPredicate, ListAndGetHarvester, ListRecordsHarvester, RecordPredicate,
};
pub use lines::lines_from_file;
pub use mapreduce::MapReduce;
pub use search::{Match, SearchError, SearchExpr, XmlPath};
