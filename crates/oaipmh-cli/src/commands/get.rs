//! The `get` command.

use std::fs::File;
use std::io::{self, BufRead, BufReader};

use anyhow::{bail, Context as _};
use clap::Args;

use crate::config::ExtProcessConfig;
use crate::extprocess;
use crate::output;

use super::Context;

#[derive(Args, Debug)]
pub struct GetOpts {
    /// Display the record header instead of the content
    #[arg(short = 'H')]
    pub header: bool,

    /// Test that the records can be retrieved
    #[arg(short = 't')]
    pub test: bool,

    /// Record separator
    #[arg(short = 's', default_value = "====")]
    pub separator: String,

    /// Invoke the named external process with each record
    #[arg(short = 'P', long = "process")]
    pub ext_process: Option<String>,

    /// Record identifiers; '@file' reads identifiers from a file, '@-'
    /// from standard input
    #[arg(required = true)]
    pub ids: Vec<String>,
}

pub async fn run(ctx: &Context, opts: &GetOpts) -> anyhow::Result<()> {
    let ext_process = match &opts.ext_process {
        Some(name) => Some(
            ctx.config
                .ext_process
                .get(name)
                .with_context(|| format!("no external process with name '{}'", name))?
                .clone(),
        ),
        None => None,
    };

    let mut count = 0;
    for id_expr in &opts.ids {
        for id in expand_id_expr(id_expr)? {
            display_record(ctx, opts, ext_process.as_ref(), &id, &mut count).await?;
        }
    }

    Ok(())
}

/// Interpret an identifier argument: `@file` and `@-` expand to the
/// lines of the file or standard input.
fn expand_id_expr(id_expr: &str) -> anyhow::Result<Vec<String>> {
    let Some(filename) = id_expr.strip_prefix('@') else {
        return Ok(vec![id_expr.to_string()]);
    };

    let reader: Box<dyn BufRead> = if filename == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(
            File::open(filename).with_context(|| format!("opening {}", filename))?,
        ))
    };

    let mut ids = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            ids.push(line.to_string());
        }
    }
    Ok(ids)
}

async fn display_record(
    ctx: &Context,
    opts: &GetOpts,
    ext_process: Option<&ExtProcessConfig>,
    id: &str,
    count: &mut usize,
) -> anyhow::Result<()> {
    if *count >= 1 && !opts.test {
        println!("{}", opts.separator);
    }
    *count += 1;

    match ctx.session.get_record(id).await {
        Ok(record) => {
            if opts.test {
                println!("+ {}", record.identifier());
            } else if let Some(ext) = ext_process {
                if let Err(err) = extprocess::invoke_with_record(ext, &record).await {
                    bail!("record '{}': external process - {:#}", record.identifier(), err);
                }
            } else if opts.header {
                println!("Id:\t{}", record.identifier());
                println!("Date:\t{}", record.header.datestamp.to_rfc3339());
                println!("Sets:\t{}", record.header.set_spec.join(", "));
            } else {
                println!("<?xml version=\"1.0\"?>");
                println!("{}", record.content.trim());
            }
        }
        Err(err) => {
            if opts.test {
                println!("- {}", id);
            } else {
                output::error(&format!("cannot get record '{}': {}", id, err));
            }
        }
    }

    Ok(())
}
