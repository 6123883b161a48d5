// Camera date/time encoding.
//
// The camera takes the wall-clock time with the zone's *standard* offset
// and a separate DST flag, e.g.
// `{"datetime": "Tue, 01 Jan 2019 00:00:00 +0900", "dst": false}`.
// It does not accept a DST-adjusted offset.

use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};

use super::models::CameraDateTime;
use crate::error::Error;

/// Source of UTC offsets for local wall-clock times.
pub trait ZoneOffsets {
    /// Offset in effect at the given local wall-clock time.
    fn offset_at(&self, local: &NaiveDateTime) -> FixedOffset;
}

impl ZoneOffsets for Local {
    fn offset_at(&self, local: &NaiveDateTime) -> FixedOffset {
        // Times skipped by a DST jump have no local offset; fall back to
        // treating the wall clock as UTC for the lookup.
        Local
            .offset_from_local_datetime(local)
            .earliest()
            .unwrap_or_else(|| Local.offset_from_utc_datetime(local))
    }
}

impl ZoneOffsets for FixedOffset {
    fn offset_at(&self, _local: &NaiveDateTime) -> FixedOffset {
        *self
    }
}

/// The zone's standard (non-DST) offset for `year`: the smaller of the
/// offsets in effect in January and July.
pub fn standard_offset<Z: ZoneOffsets + ?Sized>(zone: &Z, year: i32) -> FixedOffset {
    let offset_in = |month: u32| {
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .map(|dt| zone.offset_at(&dt))
    };
    match (offset_in(1), offset_in(7)) {
        (Some(jan), Some(jul)) => {
            if jan.local_minus_utc() <= jul.local_minus_utc() {
                jan
            } else {
                jul
            }
        }
        (Some(one), None) | (None, Some(one)) => one,
        (None, None) => Utc.fix(),
    }
}

/// Whether DST is in effect at `local` in `zone`.
pub fn is_dst<Z: ZoneOffsets + ?Sized>(zone: &Z, local: &NaiveDateTime) -> bool {
    zone.offset_at(local).local_minus_utc() > standard_offset(zone, local.year()).local_minus_utc()
}

/// Encode a local wall-clock time for `PUT functions/datetime`.
pub fn format_camera_datetime<Z: ZoneOffsets + ?Sized>(
    zone: &Z,
    local: &NaiveDateTime,
) -> CameraDateTime {
    let standard = standard_offset(zone, local.year());
    CameraDateTime {
        datetime: format!(
            "{} {}",
            local.format("%a, %d %b %Y %H:%M:%S"),
            format_offset(standard)
        ),
        dst: is_dst(zone, local),
    }
}

/// Parse the camera's datetime string.
pub fn parse_camera_datetime(raw: &str) -> Result<DateTime<FixedOffset>, Error> {
    DateTime::parse_from_rfc2822(raw.trim()).map_err(|e| Error::Deserialization {
        message: format!("invalid camera datetime {raw:?}: {e}"),
        body: raw.to_owned(),
    })
}

/// `+HHMM` / `-HHMM`.
fn format_offset(offset: FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let abs = secs.unsigned_abs();
    format!("{sign}{:02}{:02}", abs / 3600, (abs % 3600) / 60)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Timelike;

    /// +01:00 standard, +02:00 from April through October.
    struct SummerZone;

    impl ZoneOffsets for SummerZone {
        fn offset_at(&self, local: &NaiveDateTime) -> FixedOffset {
            let hours = if (4..=10).contains(&local.month()) { 2 } else { 1 };
            FixedOffset::east_opt(hours * 3600).unwrap()
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn fixed_zone_matches_camera_format() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let value = format_camera_datetime(&tokyo, &at(2019, 1, 1, 0, 0, 0));
        assert_eq!(value.datetime, "Tue, 01 Jan 2019 00:00:00 +0900");
        assert!(!value.dst);
    }

    #[test]
    fn summer_time_uses_standard_offset_and_flag() {
        let value = format_camera_datetime(&SummerZone, &at(2024, 7, 15, 14, 30, 5));
        assert_eq!(value.datetime, "Mon, 15 Jul 2024 14:30:05 +0100");
        assert!(value.dst);
    }

    #[test]
    fn negative_offsets_are_zero_padded() {
        let newfoundland = FixedOffset::west_opt(3 * 3600 + 30 * 60).unwrap();
        let value = format_camera_datetime(&newfoundland, &at(2023, 3, 9, 8, 5, 0));
        assert_eq!(value.datetime, "Thu, 09 Mar 2023 08:05:00 -0330");
    }

    #[test]
    fn payload_round_trips_wall_clock_fields() {
        for local in [at(2024, 1, 31, 23, 59, 59), at(2024, 8, 1, 6, 7, 8)] {
            let value = format_camera_datetime(&SummerZone, &local);
            let parsed = parse_camera_datetime(&value.datetime).unwrap();
            let wall = parsed.naive_local();
            assert_eq!(wall.date(), local.date());
            assert_eq!(
                (wall.hour(), wall.minute(), wall.second()),
                (local.hour(), local.minute(), local.second())
            );
            assert_eq!(value.dst, is_dst(&SummerZone, &local));
        }
    }

    #[test]
    fn garbage_datetime_is_rejected() {
        assert!(parse_camera_datetime("yesterday").is_err());
    }
}
