use chrono::NaiveDateTime;

/// Source format for `Created Date`: 12-hour clock with AM/PM marker,
/// e.g. `03/05/2020 01:30:45 PM`.
const CREATED_DATE_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// Parse a `Created Date` value. Anything that does not match the expected
/// format (including out-of-range components) yields `None`; the caller
/// stores a null timestamp instead of failing the batch.
pub fn parse_created_date(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), CREATED_DATE_FORMAT).ok()
}
