mod byte_cursor;
mod time;

pub(crate) use self::byte_cursor::ByteCursor;
pub(crate) use self::time::timestamp_from_receipt_date;
