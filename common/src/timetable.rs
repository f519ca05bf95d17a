use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{ConfigError, TimetableError},
    schedule::TemperatureBand,
    timer::{DAY_SECS, HOUR_SECS, MINUTE_SECS},
};

pub const LAST_MINUTE: u32 = (DAY_SECS - MINUTE_SECS) as u32;

/// One pump-on interval, both ends in seconds of the day. A window whose
/// `on` lies after its `off` does not wrap past midnight; it never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(with = "time_of_day")]
    pub on: u32,
    #[serde(with = "time_of_day")]
    pub off: u32,
}

impl TimeWindow {
    pub fn new(on: u32, off: u32) -> Self {
        Self { on, off }
    }

    pub fn parse(on: &str, off: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            on: parse_time_of_day(on)?,
            off: parse_time_of_day(off)?,
        })
    }

    /// Inclusive on both ends.
    pub fn contains(&self, second_of_day: u32) -> bool {
        self.on <= second_of_day && second_of_day <= self.off
    }

    pub fn duration_secs(&self) -> i64 {
        i64::from(self.off) - i64::from(self.on)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            format_time_of_day(self.on),
            format_time_of_day(self.off)
        )
    }
}

pub fn parse_time_of_day(raw: &str) -> Result<u32, ConfigError> {
    let invalid = || ConfigError::InvalidTimeOfDay(raw.to_string());

    let (hours, minutes) = raw.split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.trim().parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.trim().parse().map_err(|_| invalid())?;
    if hours >= 24 || minutes >= 60 {
        return Err(invalid());
    }

    Ok(hours * HOUR_SECS as u32 + minutes * MINUTE_SECS as u32)
}

pub fn format_time_of_day(second_of_day: u32) -> String {
    let secs = second_of_day.min(LAST_MINUTE);
    let hours = secs / HOUR_SECS as u32;
    let minutes = (secs % HOUR_SECS as u32) / MINUTE_SECS as u32;
    format!("{hours}:{minutes:02}")
}

pub(crate) mod time_of_day {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(second_of_day: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_time_of_day(*second_of_day))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time_of_day(&raw).map_err(D::Error::custom)
    }
}

pub fn is_in_timetable(timetable: &[TimeWindow], hour: u32, minute: u32) -> bool {
    let now = hour * HOUR_SECS as u32 + minute * MINUTE_SECS as u32;
    timetable.iter().any(|window| window.contains(now))
}

/// Falls back to the whole day when the band's runtime does not fit the
/// season window. A band without runtime or splits keeps its explicit table.
pub fn generate(
    band: &TemperatureBand,
    season_window: &TimeWindow,
) -> Result<Vec<TimeWindow>, TimetableError> {
    if (band.duration_secs == 0 || band.splits == 0) && !band.table.is_empty() {
        debug!(windows = band.table.len(), "using explicit band table");
        return Ok(band.table.clone());
    }
    if band.splits == 0 {
        return Err(TimetableError::NoSplits);
    }

    let duration = i64::from(band.duration_secs).min(DAY_SECS);
    let splits = i64::from(band.splits);

    let season_secs = season_window.duration_secs();
    let (available, start_shift) = if duration >= season_secs {
        debug!(
            duration,
            season_secs, "runtime does not fit the season window, spreading over the whole day"
        );
        (DAY_SECS, 0)
    } else {
        (season_secs, i64::from(season_window.on))
    };

    let per_split = available / splits;
    let per_split_center = per_split / 2;
    let slot = duration / splits;
    let half_slot = slot / 2;
    if per_split_center < half_slot {
        return Err(TimetableError::SlotExceedsSplit {
            slot_secs: slot,
            split_secs: per_split,
        });
    }

    let windows = (0..splits)
        .map(|i| {
            let start = i * per_split + start_shift + per_split_center - half_slot;
            let end = start + slot;
            TimeWindow::new(clamp_to_day(start), clamp_to_day(end))
        })
        .collect();

    Ok(windows)
}

// Boundaries are kept to whole minutes, the resolution they are matched and
// rendered at.
fn clamp_to_day(secs: i64) -> u32 {
    let secs = secs - secs.rem_euclid(MINUTE_SECS);
    secs.clamp(0, i64::from(LAST_MINUTE)) as u32
}
