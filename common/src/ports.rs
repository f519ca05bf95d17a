use chrono::{DateTime, Datelike, FixedOffset, Offset, TimeZone, Timelike, Utc};

use crate::{
    error::SensorError,
    timer::{HOUR_SECS, MINUTE_SECS},
};

/// Local wall-clock fields the engine schedules against. `month` is 1-12.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarTime {
    pub hour: u32,
    pub minute: u32,
    pub month: u32,
}

impl CalendarTime {
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self {
            hour: dt.hour(),
            minute: dt.minute(),
            month: dt.month(),
        }
    }

    pub fn at_offset(epoch_secs: i64, offset: &FixedOffset) -> Self {
        let utc = DateTime::from_timestamp(epoch_secs, 0).unwrap_or_default();
        Self::from_datetime(&utc.with_timezone(offset))
    }

    pub fn second_of_day(&self) -> i64 {
        i64::from(self.hour) * HOUR_SECS + i64::from(self.minute) * MINUTE_SECS
    }
}

pub trait Clock {
    fn now(&self) -> i64;

    fn local_calendar(&self, epoch_secs: i64) -> CalendarTime;
}

pub trait TemperatureSensor {
    fn current_temperature_celsius(&mut self) -> Result<f32, SensorError>;
}

pub trait PumpActuator {
    fn set_output(&mut self, on: bool);
}

#[derive(Debug, Clone, Copy)]
pub struct FixedOffsetClock {
    offset: FixedOffset,
}

impl FixedOffsetClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }
}

impl Clock for FixedOffsetClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }

    fn local_calendar(&self, epoch_secs: i64) -> CalendarTime {
        CalendarTime::at_offset(epoch_secs, &self.offset)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn calendar_uses_one_based_months() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let epoch = offset
            .with_ymd_and_hms(2026, 1, 15, 9, 30, 45)
            .unwrap()
            .timestamp();

        let calendar = CalendarTime::at_offset(epoch, &offset);

        assert_eq!(
            calendar,
            CalendarTime {
                hour: 9,
                minute: 30,
                month: 1,
            }
        );
        assert_eq!(calendar.second_of_day(), 9 * 3_600 + 30 * 60);
    }

    #[test]
    fn calendar_applies_offset_across_month_boundary() {
        let epoch = Utc
            .with_ymd_and_hms(2026, 6, 30, 23, 30, 0)
            .unwrap()
            .timestamp();
        let east = FixedOffset::east_opt(2 * 3_600).unwrap();

        let calendar = FixedOffsetClock::new(east).local_calendar(epoch);

        assert_eq!(calendar.month, 7);
        assert_eq!(calendar.hour, 1);
    }
}
