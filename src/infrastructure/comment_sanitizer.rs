//! Comment text sanitizing and field normalization
//!
//! Upstream `textDisplay` may still carry entity-encoded markup even when plain
//! text is requested, so the order matters: decode entities first, then strip
//! whatever tags the decoding revealed, then trim.

use chrono::{DateTime, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref MARKUP_TAG: Regex = Regex::new(r"<[^>]+>").expect("static markup regex");
}

/// Decode HTML entities, strip markup tags, trim.
pub fn sanitize_comment(text: &str) -> String {
    let decoded = html_escape::decode_html_entities(text);
    MARKUP_TAG.replace_all(&decoded, "").trim().to_string()
}

/// Parse an upstream timestamp and normalize it to UTC.
///
/// Offsets are honoured; offset-less values are taken as UTC. `None` when the
/// value is not a recognizable timestamp.
pub fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case("plain text", "plain text")]
    #[case("  padded  ", "padded")]
    #[case("<b>bold</b> move", "bold move")]
    #[case("Tom &amp; Jerry", "Tom & Jerry")]
    #[case("&lt;i&gt;encoded&lt;/i&gt; tags", "encoded tags")]
    #[case("line<br>break", "linebreak")]
    #[case("it&#39;s &quot;fine&quot;", "it's \"fine\"")]
    #[case("<a href=\"https://x.y\">link</a>", "link")]
    #[case("i <3 this", "i <3 this")]
    #[case("", "")]
    fn sanitizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_comment(input), expected);
    }

    #[test]
    fn parses_zulu_timestamp() {
        let parsed = parse_published_at("2024-07-12T08:30:00Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 7, 12, 8, 30, 0).unwrap());
    }

    #[test]
    fn converts_offsets_to_utc() {
        let parsed = parse_published_at("2024-07-12T17:30:00+09:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 7, 12, 8, 30, 0).unwrap());
    }

    #[test]
    fn offsetless_timestamp_is_taken_as_utc() {
        let parsed = parse_published_at("2024-07-12T08:30:00.250").unwrap();
        assert_eq!(parsed.timestamp_millis(), Utc.with_ymd_and_hms(2024, 7, 12, 8, 30, 0).unwrap().timestamp_millis() + 250);
    }

    #[test]
    fn garbage_timestamp_is_none() {
        assert!(parse_published_at("yesterday").is_none());
    }
}
