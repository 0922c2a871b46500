use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use time_tz::{Offset, OffsetDateTimeExt, OffsetResult, PrimitiveDateTimeExt, TimeZone, Tz};

use crate::error::TimeFormatError;
use crate::types::reminders::SlotKey;

/// "Every day at HH:MM local time", independent of any zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    time: Time,
}

pub fn to_daily_trigger(
    slot_key: SlotKey,
    time_24h: &str,
) -> Result<DailyTrigger, TimeFormatError> {
    let invalid = || TimeFormatError {
        slot_key,
        value: time_24h.to_string(),
    };
    let (hour, minute) = parse_hh_mm(time_24h).ok_or_else(invalid)?;
    let time = Time::from_hms(hour, minute, 0).map_err(|_| invalid())?;
    Ok(DailyTrigger { time })
}

fn parse_hh_mm(value: &str) -> Option<(u8, u8)> {
    let &[h1, h0, b':', m1, m0] = value.as_bytes() else {
        return None;
    };
    let hour = digit(h1)? * 10 + digit(h0)?;
    let minute = digit(m1)? * 10 + digit(m0)?;
    (hour < 24 && minute < 60).then_some((hour, minute))
}

fn digit(byte: u8) -> Option<u8> {
    byte.is_ascii_digit().then(|| byte - b'0')
}

pub fn resolve_timezone(name: &str) -> Option<&'static Tz> {
    time_tz::timezones::get_by_name(name)
}

impl DailyTrigger {
    pub fn hour(&self) -> u8 {
        self.time.hour()
    }

    pub fn minute(&self) -> u8 {
        self.time.minute()
    }

    /// First instant strictly after `after` at which the civil clock in `tz` shows this
    /// trigger's time. Returns `None` only at the edge of the representable calendar.
    pub fn next_after(&self, after: OffsetDateTime, tz: &Tz) -> Option<OffsetDateTime> {
        let mut date = after.to_timezone(tz).date();
        for _ in 0..3 {
            let candidate = self.on_date(date, tz);
            if candidate > after {
                return Some(candidate);
            }
            date = date.next_day()?;
        }
        None
    }

    fn on_date(&self, date: Date, tz: &Tz) -> OffsetDateTime {
        let wall = PrimitiveDateTime::new(date, self.time);
        match wall.assume_timezone(tz) {
            OffsetResult::Some(at) => at,
            // Clocks fall back: the wall time happens twice, fire on the first pass.
            OffsetResult::Ambiguous(first, second) => first.min(second),
            // Clocks spring forward over the wall time: keep the pre-transition offset,
            // which lands the same distance past the jump. A day earlier is always before
            // the transition, whichever side of UTC the zone is on.
            OffsetResult::None => {
                let before = wall.assume_utc() - time::Duration::days(1);
                wall.assume_offset(tz.get_offset_utc(&before).to_utc())
            }
        }
    }
}

impl std::fmt::Display for DailyTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}
