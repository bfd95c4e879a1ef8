//! Output helpers for the commands.

use colored::Colorize;

/// Print an error line to stderr.
pub fn error(msg: &str) {
    eprintln!("{} {}", "oaipmh:".red(), msg);
}

/// Print an advisory note to stderr.
pub fn note(msg: &str) {
    eprintln!("{} {}", "oaipmh:".dimmed(), msg);
}

/// Print a summary line to stderr.
pub fn summary(msg: &str) {
    eprintln!("{}", msg.dimmed());
}
