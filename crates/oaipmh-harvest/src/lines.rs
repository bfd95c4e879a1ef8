//! Windowed line reading for file-driven operations.

use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use oaipmh_core::source::ListSink;
use oaipmh_core::{Result, Window};

/// Read lines from `filename` (`-` = standard input), trimming
/// whitespace and skipping blank lines, and hand the lines inside
/// `window` to `sink`. Hitting the window bound emits a one-line stderr
/// advisory and stops cleanly.
pub async fn lines_from_file(
    filename: &str,
    window: Window,
    sink: &mut dyn ListSink<String>,
) -> Result<()> {
    let reader: Box<dyn AsyncBufRead + Unpin + Send> = if filename == "-" {
        Box::new(BufReader::new(tokio::io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(filename).await?))
    };

    let mut lines = reader.lines();
    let mut count: usize = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if count >= window.first_result && !sink.accept(line.to_string()).await {
            return Ok(());
        }

        count += 1;
        if window.exhausted_by(count) {
            eprintln!(
                "Maximum number of lines encountered ({}).  Use -c to change.",
                window.max_results
            );
            return Ok(());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    async fn collect(filename: &str, window: Window) -> Vec<String> {
        let mut lines = Vec::new();
        lines_from_file(filename, window, &mut |line: String| {
            lines.push(line);
            true
        })
        .await
        .unwrap();
        lines
    }

    #[tokio::test]
    async fn reads_trimmed_non_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "urn:1\n  urn:2  \n\nurn:3\n").unwrap();
        file.flush().unwrap();

        let lines = collect(&file.path().to_string_lossy(), Window::unbounded()).await;
        assert_eq!(lines, vec!["urn:1", "urn:2", "urn:3"]);
    }

    #[tokio::test]
    async fn window_subsets_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 1..=10 {
            writeln!(file, "urn:{}", i).unwrap();
        }
        file.flush().unwrap();

        let lines = collect(&file.path().to_string_lossy(), Window::new(3, 2)).await;
        assert_eq!(lines, vec!["urn:4", "urn:5"]);
    }

    #[tokio::test]
    async fn missing_file_is_an_error()  {
        let result = lines_from_file(
            "/nonexistent/urns.txt",
            Window::unbounded(),
            &mut |_line: String| true,
        )
        .await;
        assert!(result.is_err());
    }
}
