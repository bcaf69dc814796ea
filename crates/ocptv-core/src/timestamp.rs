use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::error::SerializeError;

const WHOLE_SECONDS: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const MICROSECONDS: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]");
const OFFSET: &[BorrowedFormatItem<'static>] =
    format_description!("[offset_hour sign:mandatory]:[offset_minute]");

/// Formatting settings threaded through field formatters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatContext {
    /// Display offset; `None` resolves the local system offset.
    pub timezone: Option<UtcOffset>,
}

impl Default for FormatContext {
    fn default() -> Self {
        Self {
            timezone: Some(UtcOffset::UTC),
        }
    }
}

impl FormatContext {
    pub fn new(timezone: Option<UtcOffset>) -> Self {
        Self { timezone }
    }

    /// Offset timestamps are rendered in, resolving `None` to the local offset.
    pub fn resolved_offset(&self) -> UtcOffset {
        self.timezone
            .unwrap_or_else(|| UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
    }
}

/// Current wall-clock time as Unix epoch seconds.
pub fn now() -> f64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    nanos as f64 / 1e9
}

/// Render Unix epoch seconds as ISO-8601 in `offset`.
///
/// Microseconds are printed only when non-zero and a UTC offset is written
/// as `Z`.
pub fn format_timestamp(seconds: f64, offset: UtcOffset) -> Result<String, SerializeError> {
    if !seconds.is_finite() {
        return Err(SerializeError::InvalidTimestamp { value: seconds });
    }

    let micros = (seconds * 1e6).round() as i128;
    let at = OffsetDateTime::from_unix_timestamp_nanos(micros * 1_000)
        .map_err(|_| SerializeError::InvalidTimestamp { value: seconds })?
        .to_offset(offset);

    let layout = if at.microsecond() == 0 {
        WHOLE_SECONDS
    } else {
        MICROSECONDS
    };
    let mut rendered = at
        .format(layout)
        .map_err(|_| SerializeError::InvalidTimestamp { value: seconds })?;

    if offset == UtcOffset::UTC {
        rendered.push('Z');
    } else {
        let suffix = at
            .format(OFFSET)
            .map_err(|_| SerializeError::InvalidTimestamp { value: seconds })?;
        rendered.push_str(&suffix);
    }
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_renders_as_zulu() {
        let rendered = format_timestamp(0.0, UtcOffset::UTC).expect("format");
        assert_eq!(rendered, "1970-01-01T00:00:00Z");
    }

    #[test]
    fn fixed_offset_keeps_numeric_suffix_and_microseconds() {
        let offset = UtcOffset::from_hms(1, 0, 0).expect("offset");
        // 2020-01-02T02:04:05.000100Z
        let seconds = 1_577_930_645.0001;
        let rendered = format_timestamp(seconds, offset).expect("format");
        assert_eq!(rendered, "2020-01-02T03:04:05.000100+01:00");
    }

    #[test]
    fn negative_offset_is_signed() {
        let offset = UtcOffset::from_hms(-2, 0, 0).expect("offset");
        let rendered = format_timestamp(0.0, offset).expect("format");
        assert_eq!(rendered, "1969-12-31T22:00:00-02:00");
    }

    #[test]
    fn non_finite_timestamp_is_rejected() {
        let err = format_timestamp(f64::NAN, UtcOffset::UTC).expect_err("must fail");
        assert!(matches!(err, SerializeError::InvalidTimestamp { .. }));
    }
}
