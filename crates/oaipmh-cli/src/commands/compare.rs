//! The `compare` command.

use clap::Args;

use oaipmh_client::Session;
use oaipmh_core::{HeaderResult, Window};
use oaipmh_harvest::{lines_from_file, PresenceListener, PresenceMap};

use super::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct CompareOpts {
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

    /// Read expected identifiers from a file ('-' = standard input)
    #[arg(short = 'F')]
    pub from_file: Option<String>,

    /// Also compare the metadata content of common records
    #[arg(short = 'C')]
    pub compare_content: bool,

    /// The provider to compare against
    pub other_provider: String,
}

/// Collects the partition while printing the `-`/`+` lines. URNs found
/// in both providers are kept for the optional content pass.
#[derive(Default)]
struct Partition {
    in_both: Vec<String>,
    missing: usize,
    redundant: usize,
}

impl PresenceListener for Partition {
    fn urn_in_both(&mut self, urn: &str) {
        self.in_both.push(urn.to_string());
    }

    fn urn_missing(&mut self, urn: &str) {
        println!("-  {}", urn);
        self.missing += 1;
    }

    fn urn_redundant(&mut self, urn: &str) {
        println!("+  {}", urn);
        self.redundant += 1;
    }
}

pub async fn run(ctx: &Context, opts: &CompareOpts) -> anyhow::Result<()> {
    let other_provider = ctx.config.lookup_provider(&opts.other_provider);
    let other_client = ctx.session.client().for_endpoint(&other_provider.url)?;
    let other_session = Session::new(other_client, ctx.session.prefix());

    let query = ctx.list_query(
        opts.set.as_deref(),
        opts.after.as_deref(),
        opts.before.as_deref(),
    )?;
    let window = Window::new(opts.first, opts.max);

    let mut presence = PresenceMap::new();

    // Expected pass: this provider, or the identifier file.
    match &opts.from_file {
        Some(filename) => {
            lines_from_file(filename, window, &mut |urn: String| {
                presence.add_expected(&urn);
                true
            })
            .await?;
        }
        None => {
            ctx.session
                .list_identifiers(&query, window, &mut |res: HeaderResult| {
                    if !res.deleted {
                        presence.add_expected(res.identifier());
                    }
                    true
                })
                .await?;
        }
    }

    // Comparison pass: the other provider.
    other_session
        .list_identifiers(&query, window, &mut |res: HeaderResult| {
            if !res.deleted {
                presence.add_comparison(res.identifier());
            }
            true
        })
        .await?;

    let mut partition = Partition::default();
    presence.report(&mut partition);

    let mut differing = 0;
    let mut errors = 0;

    if opts.compare_content {
        for urn in &partition.in_both {
            let this_record = match ctx.session.get_record(urn).await {
                Ok(record) => record,
                Err(_) => {
                    println!("E  {}", urn);
                    errors += 1;
                    continue;
                }
            };
            let other_record = match other_session.get_record(urn).await {
                Ok(record) => record,
                Err(_) => {
                    println!("E  {}", urn);
                    errors += 1;
                    continue;
                }
            };

            if this_record.content != other_record.content {
                println!("D  {}", urn);
                differing += 1;
            }
        }

        output::summary(&format!(
            "Comparison complete: {} OK, {} different, {} missing, {} redundant, {} errors",
            partition.in_both.len(),
            differing,
            partition.missing,
            partition.redundant,
            errors
        ));
    } else {
        output::summary(&format!(
            "Comparison complete: {} OK, {} missing, {} redundant",
            partition.in_both.len(),
            partition.missing,
            partition.redundant
        ));
    }

    Ok(())
}
