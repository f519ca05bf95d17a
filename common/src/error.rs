use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimetableError {
    #[error("band has zero splits and no explicit table")]
    NoSplits,
    #[error("slot of {slot_secs}s does not fit a {split_secs}s split")]
    SlotExceedsSplit { slot_secs: i64, split_secs: i64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid time of day '{0}', expected H:MM")]
    InvalidTimeOfDay(String),
    #[error("band {index} has an empty temperature range {min_t}..{max_t}")]
    EmptyBand { index: usize, min_t: f32, max_t: f32 },
    #[error("season '{name}' lists month {month}, expected 1-12")]
    MonthOutOfRange { name: String, month: u32 },
    #[error("season '{0}' has no time window")]
    SeasonWithoutWindow(String),
    #[error("season '{name}' window {on}-{off} ends before it starts")]
    InvertedSeasonWindow { name: String, on: String, off: String },
    #[error("band {band} cannot be scheduled in season '{season}': {source}")]
    Unschedulable {
        band: usize,
        season: String,
        #[source]
        source: TimetableError,
    },
    #[error("invalid timezone '{0}'")]
    InvalidTimezone(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("temperature probe disconnected")]
    Disconnected,
}
