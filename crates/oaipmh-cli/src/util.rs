//! Small helpers shared by the commands.

use anyhow::{bail, Context as _};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters escaped when an identifier becomes a filename: everything
/// outside `[A-Za-z0-9_\-.:]`. The colon survives because it appears in
/// URNs.
const FILENAME_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'-')
    .remove(b'.')
    .remove(b':');

/// Percent-encode a record identifier for use as a filename.
pub fn escape_id_for_filename(id: &str) -> String {
    utf8_percent_encode(id, FILENAME_ESCAPES).to_string()
}

/// Parse a `YYYY-MM-DD` date flag, interpreted at local midnight. An
/// empty or absent flag means unbounded.
pub fn parse_date_flag(value: Option<&str>) -> anyhow::Result<Option<DateTime<Utc>>> {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{}'", value))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("invalid date '{}'", value))?;

    match Local.from_local_datetime(&midnight).earliest() {
        Some(local) => Ok(Some(local.with_timezone(&Utc))),
        None => bail!("invalid date '{}'", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaping_keeps_urn_characters() {
        assert_eq!(escape_id_for_filename(""), "");
        assert_eq!(escape_id_for_filename("abc123"), "abc123");
        assert_eq!(
            escape_id_for_filename("urn:x-xmo:wis::int.wmo.wis:SSVX13"),
            "urn:x-xmo:wis::int.wmo.wis:SSVX13"
        );
        assert_eq!(
            escape_id_for_filename("All_valid-Characters-4_this.test"),
            "All_valid-Characters-4_this.test"
        );
    }

    #[test]
    fn escaping_encodes_everything_else() {
        assert_eq!(escape_id_for_filename("spaces are here"), "spaces%20are%20here");
        assert_eq!(escape_id_for_filename("abc/123"), "abc%2F123");
        assert_eq!(
            escape_id_for_filename("someone@somewhere#here"),
            "someone%40somewhere%23here"
        );
    }

    #[test]
    fn date_flags_parse_or_fail_loudly() {
        assert!(parse_date_flag(None).unwrap().is_none());
        assert!(parse_date_flag(Some("")).unwrap().is_none());
        assert!(parse_date_flag(Some("2015-06-07")).unwrap().is_some());
        assert!(parse_date_flag(Some("07/06/2015")).is_err());
        assert!(parse_date_flag(Some("2015-13-40")).is_err());
    }
}
