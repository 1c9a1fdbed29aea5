pub mod author;
pub mod comment;
pub mod post;
pub mod tag;

use time::{Duration, OffsetDateTime, UtcOffset};

/// Current UTC time truncated to whole seconds so stored timestamps sort
/// lexically.
pub fn now_utc() -> OffsetDateTime {
    truncate_to_seconds(OffsetDateTime::now_utc())
}

pub fn truncate_to_seconds(value: OffsetDateTime) -> OffsetDateTime {
    let value = value.to_offset(UtcOffset::UTC);
    value - Duration::nanoseconds(i64::from(value.nanosecond()))
}
