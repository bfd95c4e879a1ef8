//! oaipmh - command-line toolkit for OAI-PMH endpoints.
//!
//! A thin wrapper over the oaipmh crates, for listing, viewing,
//! harvesting, searching and comparing metadata records from OAI-PMH
//! providers, and for hosting a small file-backed provider.

mod cli;
mod commands;
mod config;
mod extprocess;
mod output;
mod util;

use std::process::ExitCode;

use anyhow::{bail, Context as _};
use clap::Parser as _;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use oaipmh_client::{Client, DebugLevel, Session, Transport};

use cli::{Cli, Command};
use commands::Context;

#[tokio::main]
async fn main() -> ExitCode {
    // Usage errors exit 1, not clap's default of 2. Help and version
    // output still exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_logging(cli.debug);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("oaipmh: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::Config::load()?;

    if cli.list_providers {
        for (name, provider) in &config.provider {
            if provider.set.is_empty() {
                println!("{}\t{}", name, provider.url);
            } else {
                println!("{}\t{}\t{}", name, provider.url, provider.set);
            }
        }
        return Ok(());
    }

    let Some(provider_arg) = cli.provider else {
        bail!("expected a provider name or URL");
    };
    let Some(command) = cli.command else {
        bail!("expected a subcommand");
    };

    // The serve command binds the provider argument rather than
    // connecting to it.
    if let Command::Serve(opts) = &command {
        return commands::serve::run(&provider_arg, opts).await;
    }

    let provider = config.lookup_provider(&provider_arg);

    let transport = if cli.use_get {
        Transport::Get
    } else {
        Transport::Post
    };
    let debug = match cli.debug {
        0 => DebugLevel::None,
        1 => DebugLevel::Request,
        _ => DebugLevel::Body,
    };

    let client = Client::new(&provider.url)
        .with_context(|| format!("provider '{}'", provider_arg))?
        .transport(transport)
        .debug_level(debug);
    let session = Session::new(client, &cli.prefix);

    let ctx = Context {
        session,
        config,
        provider,
    };

    match command {
        Command::Sets(opts) => commands::sets::run(&ctx, &opts).await,
        Command::List(opts) => commands::list::run(&ctx, &opts).await,
        Command::Get(opts) => commands::get::run(&ctx, &opts).await,
        Command::Harvest(opts) => commands::harvest::run(&ctx, &opts).await,
        Command::Search(opts) => commands::search::run(&ctx, &opts).await,
        Command::Compare(opts) => commands::compare::run(&ctx, &opts).await,
        Command::Serve(_) => unreachable!("serve is handled before session setup"),
    }
}

fn init_logging(debug: u8) {
    let filter = match debug {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
