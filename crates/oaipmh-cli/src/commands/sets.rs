//! The `sets` command.

use clap::Args;

use oaipmh_core::wire::Set;
use oaipmh_core::Window;

use super::Context;

#[derive(Args, Debug)]
pub struct SetsOpts {
    /// Use detailed listing format
    #[arg(short = 'l')]
    pub detailed: bool,
}

pub async fn run(ctx: &Context, opts: &SetsOpts) -> anyhow::Result<()> {
    ctx.session
        .list_sets(Window::unbounded(), &mut |set: Set| {
            if opts.detailed {
                println!("Name: {}\nSpec: {}\n", set.name, set.spec);
                for line in set.description.lines() {
                    let line = line.trim();
                    if !line.is_empty() {
                        println!("{}", line);
                    }
                }
                println!("---");
            } else {
                println!("{}", set.name);
            }
            true
        })
        .await?;

    Ok(())
}
