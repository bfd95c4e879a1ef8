//! The `serve` command.

use clap::Args;

use oaipmh_provider::{FileRepository, Provider};

#[derive(Args, Debug)]
pub struct ServeOpts {
    /// Base directory of the hosted repository
    #[arg(long = "dir", default_value = ".")]
    pub dir: String,
}

/// Host a file-backed provider. The provider argument is the address to
/// bind, e.g. `localhost:8080`.
pub async fn run(bind_addr: &str, opts: &ServeOpts) -> anyhow::Result<()> {
    let provider = Provider::new(FileRepository::new(&opts.dir));
    provider.serve(bind_addr).await?;
    Ok(())
}
