//! The `harvest` command.

use std::fs;
use std::path::PathBuf;

use chrono::Local;
use clap::Args;
use tracing::debug;

use oaipmh_client::Session;
use oaipmh_core::{Error, RecordResult, Window};
use oaipmh_harvest::{
    live_headers, live_records, FileHarvester, HarvestObserver, ListAndGetHarvester,
    ListRecordsHarvester,
};

use super::Context;
use crate::output;
use crate::util::escape_id_for_filename;

#[derive(Args, Debug)]
pub struct HarvestOpts {
    /// Select records from this set ('*' = all sets)
    #[arg(short = 's')]
    pub set: Option<String>,

    /// Select records updated after this date (YYYY-MM-DD)
    #[arg(short = 'A')]
    pub after: Option<String>,

    /// Select records updated before this date (YYYY-MM-DD)
    #[arg(short = 'B')]
    pub before: Option<String>,

    /// Index of first record to retrieve
    #[arg(short = 'f', default_value_t = 0)]
    pub first: usize,

    /// Maximum number of records to retrieve
    #[arg(short = 'c', default_value_t = 100_000)]
    pub max: i64,

    /// Read identifiers from a file ('-' = standard input)
    #[arg(short = 'F')]
    pub from_file: Option<String>,

    /// Number of download workers running in parallel
    #[arg(short = 'W', default_value_t = 4)]
    pub workers: usize,

    /// Use list-and-get instead of ListRecords. Slow.
    #[arg(short = 'L')]
    pub list_and_get: bool,

    /// Dry run; do not save records to disk
    #[arg(short = 'n')]
    pub dry_run: bool,

    /// Maximum number of files to store in each directory
    #[arg(short = 'D', default_value_t = 10_000)]
    pub max_dir_size: usize,
}

/// Observer writing each record under a timestamped directory prefix,
/// in numbered subdirectories capped at `max_dir_size` files.
struct SaveObserver {
    dir_prefix: String,
    max_dir_size: usize,
    dry_run: bool,
    count: usize,
    write_errors: usize,
}

impl SaveObserver {
    fn save(&self, dir_id: usize, record: &RecordResult) -> std::io::Result<()> {
        let dir = PathBuf::from(format!("{}/{:02}", self.dir_prefix, dir_id));
        fs::create_dir_all(&dir)?;

        let filename = format!("{}.xml", escape_id_for_filename(record.identifier()));
        fs::write(
            dir.join(filename),
            format!("<?xml version=\"1.0\"?>\n{}", record.content),
        )
    }
}

impl HarvestObserver for SaveObserver {
    fn on_record(&mut self, record: &RecordResult) {
        self.count += 1;
        let dir_id = self.count / self.max_dir_size.max(1) + 1;

        println!("{:8}  {}", self.count, record.identifier());
        if !self.dry_run {
            if let Err(err) = self.save(dir_id, record) {
                output::error(&format!("cannot save '{}': {}", record.identifier(), err));
                self.write_errors += 1;
            }
        }
    }

    fn on_error(&mut self, error: Error) {
        output::error(&error.to_string());
    }

    fn on_completed(&mut self, selected: usize, skipped: usize, errors: usize) {
        if skipped > 0 {
            output::note(&format!("{} deleted record(s) not harvested", skipped));
        }
        output::summary(&format!(
            "Harvest complete: {} harvested, {} skipped, {} errors",
            selected,
            skipped,
            errors + self.write_errors
        ));
    }
}

pub async fn run(ctx: &Context, opts: &HarvestOpts) -> anyhow::Result<()> {
    let query = ctx.list_query(
        opts.set.as_deref(),
        opts.after.as_deref(),
        opts.before.as_deref(),
    )?;
    let window = Window::new(opts.first, opts.max);

    let observer = SaveObserver {
        dir_prefix: Local::now().format("%Y%m%dT%H%M%S").to_string(),
        max_dir_size: opts.max_dir_size,
        dry_run: opts.dry_run,
        count: 0,
        write_errors: 0,
    };
    if !opts.dry_run {
        debug!(dir = %observer.dir_prefix, "saving harvested records");
    }

    let source: Session = ctx.session.clone();

    if let Some(filename) = &opts.from_file {
        FileHarvester {
            source,
            filename: filename.clone(),
            window,
            workers: opts.workers,
            guard: Some(live_records),
        }
        .harvest(observer)
        .await;
    } else if opts.list_and_get {
        ListAndGetHarvester {
            source,
            query,
            window,
            workers: opts.workers,
            harvest_guard: Some(live_headers),
            guard: Some(live_records),
        }
        .harvest(observer)
        .await;
    } else {
        ListRecordsHarvester {
            source,
            query,
            window,
            guard: Some(live_records),
        }
        .harvest(observer)
        .await;
    }

    Ok(())
}
