mod author;
mod book;

pub use self::author::{Author, NewAuthor};
pub(crate) use self::author::AuthorRow;
pub use self::book::{Book, BookFilter, BookPatch, NewBook};
pub(crate) use self::book::BookRow;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Parse a timestamp column (stored as RFC 3339 text, always UTC).
pub(crate) fn parse_timestamp(value: &str, field: &'static str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339).or_raise(|| ErrorKind::InvalidData(field))
}

/// Format a timestamp the way timestamp columns store it.
pub(crate) fn format_timestamp(value: OffsetDateTime) -> Result<String> {
    value.format(&Rfc3339).or_raise(|| ErrorKind::Serialization)
}

/// Current time, both as a value and in the format it is stored in.
pub(crate) fn now() -> Result<(OffsetDateTime, String)> {
    let now = OffsetDateTime::now_utc();
    Ok((now, format_timestamp(now)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2023-02-15T18:14:28.000Z")]
    #[case("2023-02-15T18:14:28Z")]
    #[case("2023-02-15T18:14:28.123456789Z")]
    fn test_parse_stored_timestamps(#[case] value: &str) {
        let parsed = parse_timestamp(value, "created at").unwrap();
        assert_eq!(parsed.year(), 2023);
        assert_eq!(parsed.unix_timestamp(), 1676484868);
    }

    #[test]
    fn test_parse_invalid_timestamp() {
        let err = parse_timestamp("yesterday", "updated at").unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidData("updated at"));
    }

    #[test]
    fn test_format_unrepresentable_offset() {
        // RFC 3339 offsets have no seconds component.
        let offset = time::UtcOffset::from_hms(0, 0, 1).unwrap();
        let err = format_timestamp(OffsetDateTime::UNIX_EPOCH.to_offset(offset)).unwrap_err();
        assert_eq!(*err, ErrorKind::Serialization);
    }

    #[test]
    fn test_now_round_trips() {
        let (now, formatted) = now().unwrap();
        assert_eq!(parse_timestamp(&formatted, "now").unwrap(), now);
    }
}
