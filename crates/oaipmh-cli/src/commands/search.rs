//! The `search` command.

use anyhow::Context as _;
use clap::Args;

use oaipmh_client::Session;
use oaipmh_core::{Error, RecordResult, Window};
use oaipmh_harvest::{
    live_headers, live_records, FileHarvester, HarvestObserver, ListAndGetHarvester,
    ListRecordsHarvester, SearchExpr,
};

use super::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct SearchOpts {
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

    /// Use list-and-get instead of ListRecords
    #[arg(short = 'L')]
    pub list_and_get: bool,

    /// Invert the match
    #[arg(short = 'v')]
    pub invert: bool,

    /// Only show the URN
    #[arg(short = 'l')]
    pub urn_only: bool,

    /// Only show the matched value
    #[arg(long = "value-only")]
    pub value_only: bool,

    /// The match expression
    pub expression: String,
}

/// Observer matching each record against the expression and printing
/// hits.
struct SearchObserver {
    expr: SearchExpr,
    invert: bool,
    urn_only: bool,
    value_only: bool,
    hits: usize,
    misses: usize,
}

impl HarvestObserver for SearchObserver {
    fn on_record(&mut self, record: &RecordResult) {
        let result = match self.expr.search(record) {
            Ok(result) => result,
            Err(err) => {
                output::error(&format!("record {}: {}", record.identifier(), err));
                return;
            }
        };

        // There is no meaningful value for an inverted match.
        let result = if self.invert { result.invert() } else { result };

        if result.matched {
            let show_urn = !self.value_only;
            let show_value = !self.urn_only && !self.invert;

            if show_urn && show_value {
                println!("{}: {}", record.identifier(), result.value);
            } else if show_urn {
                println!("{}", record.identifier());
            } else if show_value {
                println!("{}", result.value);
            }
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    fn on_error(&mut self, error: Error) {
        output::error(&format!("harvesting error: {}", error));
    }

    fn on_completed(&mut self, _selected: usize, skipped: usize, errors: usize) {
        output::summary(&format!(
            "Search complete: hits = {}, misses = {}, skips = {}, errors = {}",
            self.hits, self.misses, skipped, errors
        ));
    }
}

pub async fn run(ctx: &Context, opts: &SearchOpts) -> anyhow::Result<()> {
    let expr = SearchExpr::parse(&opts.expression)
        .with_context(|| format!("expression '{}'", opts.expression))?;

    let query = ctx.list_query(
        opts.set.as_deref(),
        opts.after.as_deref(),
        opts.before.as_deref(),
    )?;
    let window = Window::new(opts.first, opts.max);

    let observer = SearchObserver {
        expr,
        invert: opts.invert,
        urn_only: opts.urn_only,
        value_only: opts.value_only,
        hits: 0,
        misses: 0,
    };

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
