use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Writes `value` into `slot` only if it is still empty.
/// Returns whether the write happened.
pub fn set_once<T>(slot: &mut Option<T>, value: T) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(value);
    true
}

/// Calendar date of `at` on the hotel's wall clock.
pub fn local_date<Tz: chrono::TimeZone>(at: &DateTime<Tz>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

pub fn to_utc(at: &DateTime<FixedOffset>) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}
