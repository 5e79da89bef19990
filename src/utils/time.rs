use jiff::{Timestamp, civil::DateTime, tz::Offset};
use log::debug;

/// Receipt dates are always written in this exact shape, in UTC.
const RECEIPT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Parses a receipt date string, returning `None` for empty or unparseable input.
pub(crate) fn timestamp_from_receipt_date(text: &str) -> Option<Timestamp> {
    if text.is_empty() {
        return None;
    }

    let dt = match DateTime::strptime(RECEIPT_DATE_FORMAT, text) {
        Ok(dt) => dt,
        Err(e) => {
            debug!("ignoring unparseable receipt date `{}`: {}", text, e);
            return None;
        }
    };

    Offset::UTC.to_timestamp(dt).ok()
}
