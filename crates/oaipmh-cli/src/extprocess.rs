//! External-process invocation for harvested records.

use std::process::Stdio;

use anyhow::{bail, Context as _};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use oaipmh_core::RecordResult;

use crate::config::ExtProcessConfig;

/// Run the configured shell command for one record. The record's URN is
/// exported as `$urn`; the metadata arrives on stdin, or in a temp file
/// named by `$file` when `temp-file` is set. The temp file is removed
/// once the process completes.
pub async fn invoke_with_record(
    ext: &ExtProcessConfig,
    record: &RecordResult,
) -> anyhow::Result<()> {
    let shell = std::env::var("SHELL").context("no SHELL defined")?;

    let mut command = Command::new(&shell);
    command
        .arg("-c")
        .arg(&ext.cmd)
        .env("urn", record.identifier());

    let status = if ext.temp_file {
        let file = tempfile::Builder::new()
            .prefix("oaipmh-")
            .suffix(".xml")
            .tempfile()
            .context("creating temp file")?;
        std::fs::write(file.path(), &record.content).context("writing temp file")?;

        command.env("file", file.path()).stdin(Stdio::null());
        let status = command.status().await.context("running external process")?;
        // Dropping the handle removes the file.
        drop(file);
        status
    } else {
        command.stdin(Stdio::piped());
        let mut child = command.spawn().context("running external process")?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(record.content.as_bytes()).await?;
            drop(stdin);
        }

        child.wait().await.context("running external process")?
    };

    if !status.success() {
        bail!("external process exited with {}", status);
    }
    Ok(())
}
