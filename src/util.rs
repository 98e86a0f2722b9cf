//! Small helpers shared by the loaders and the page shell.

use std::borrow::Cow;

use chrono::{Local, NaiveDate};

/// Decode chapter bytes to a string.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. Falls back to Windows-1252 for files saved by older editors
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    log::warn!("input is not valid UTF-8, decoding as windows-1252");
    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Format a date in the en-US long form, e.g. `October 18, 2026`.
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Today's date in the local time zone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8_with_bom() {
        let bytes = b"\xEF\xBB\xBF# Title";
        assert_eq!(decode_text(bytes), "# Title");
    }

    #[test]
    fn test_decode_windows_1252_fallback() {
        let bytes = b"caf\xE9";
        assert_eq!(decode_text(bytes), "café");
    }

    #[test]
    fn test_format_long_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(format_long_date(date), "March 7, 2024");
    }
}
