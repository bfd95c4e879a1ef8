//! The `list` command.

use clap::Args;

use oaipmh_core::{HeaderResult, Window};

use super::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct ListOpts {
    /// Select records from this set ('*' = all sets)
    #[arg(short = 's')]
    pub set: Option<String>,

    /// Select records updated after this date (YYYY-MM-DD)
    #[arg(short = 'A')]
    pub after: Option<String>,

    /// Select records updated before this date (YYYY-MM-DD)
    #[arg(short = 'B')]
    pub before: Option<String>,

    /// Use detailed listing format
    #[arg(short = 'l')]
    pub detailed: bool,

    /// Show deleted records, along with active ones
    #[arg(short = 'd')]
    pub show_deleted: bool,

    /// Only show deleted records
    #[arg(short = 'D')]
    pub only_deleted: bool,

    /// Index of first record to retrieve
    #[arg(short = 'f', default_value_t = 0)]
    pub first: usize,

    /// Maximum number of records to retrieve
    #[arg(short = 'c', default_value_t = 100_000)]
    pub max: i64,

    /// Use ListRecords instead of ListIdentifiers
    #[arg(short = 'R')]
    pub use_list_records: bool,
}

impl ListOpts {
    /// Whether a header should be shown under the deletion flags.
    fn shows(&self, header: &HeaderResult) -> bool {
        if self.show_deleted {
            true
        } else if self.only_deleted {
            header.deleted
        } else {
            !header.deleted
        }
    }
}

pub async fn run(ctx: &Context, opts: &ListOpts) -> anyhow::Result<()> {
    let query = ctx.list_query(
        opts.set.as_deref(),
        opts.after.as_deref(),
        opts.before.as_deref(),
    )?;
    let window = Window::new(opts.first, opts.max);

    let mut active: usize = 0;
    let mut deleted: usize = 0;

    let mut callback = |res: HeaderResult| {
        if res.deleted {
            deleted += 1;
        } else {
            active += 1;
        }

        if opts.shows(&res) {
            if opts.detailed {
                let flag = if res.deleted { "D" } else { "." };
                let set = res.header.set_spec.first().map(String::as_str).unwrap_or("");
                print!("{} ", flag);
                print!("{:<20} ", set);
                print!("{:<20}  ", res.header.datestamp.to_rfc3339());
                println!("{}", res.identifier());
            } else {
                println!("{}", res.identifier());
            }
        }
        true
    };

    let result = if opts.use_list_records {
        ctx.session
            .list_identifiers_using_list_records(&query, window, &mut callback)
            .await
    } else {
        ctx.session
            .list_identifiers(&query, window, &mut callback)
            .await
    };

    match result {
        Ok(()) => {
            if opts.detailed {
                output::summary(&format!(
                    "{} records: {} active, {} deleted",
                    active + deleted,
                    active,
                    deleted
                ));
            } else if deleted > 0 {
                if opts.show_deleted {
                    output::note(&format!("{} deleted record(s) displayed", deleted));
                } else if !opts.only_deleted {
                    output::note(&format!("{} deleted record(s) not displayed", deleted));
                }
            }
            Ok(())
        }
        Err(err) => {
            output::error(&err.to_string());
            Ok(())
        }
    }
}
