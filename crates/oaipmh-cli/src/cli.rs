//! CLI argument definitions.

use clap::{ArgAction, Parser, Subcommand};

use crate::commands::{compare, get, harvest, list, search, serve, sets};

/// Command-line toolkit for OAI-PMH endpoints.
#[derive(Parser, Debug)]
#[command(name = "oaipmh")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The metadata prefix
    #[arg(short = 'p', long = "prefix", default_value = "iso19139")]
    pub prefix: String,

    /// Debug the HTTP exchange (-d requests, -dd response bodies)
    #[arg(short = 'd', action = ArgAction::Count)]
    pub debug: u8,

    /// Use HTTP GET instead of POST
    #[arg(short = 'G')]
    pub use_get: bool,

    /// List the configured providers and exit
    #[arg(short = 'P', long = "providers")]
    pub list_providers: bool,

    /// Provider name or URL (bind address for `serve`)
    pub provider: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the provider's sets
    Sets(sets::SetsOpts),

    /// List record identifiers
    List(list::ListOpts),

    /// Get individual records
    Get(get::GetOpts),

    /// Harvest records into a directory tree
    Harvest(harvest::HarvestOpts),

    /// Search records with a match expression
    Search(search::SearchOpts),

    /// Host a file-backed OAI-PMH provider
    Serve(serve::ServeOpts),

    /// Compare record presence against another provider
    Compare(compare::CompareOpts),
}
