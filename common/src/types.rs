use serde::{Deserialize, Serialize};

use crate::{
    schedule::{SeasonWindow, TemperatureBand},
    timetable::TimeWindow,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScheduleMode {
    Automatic,
    Manual,
}

impl ScheduleMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Automatic => "AUTOMATIC",
            Self::Manual => "MANUAL",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    #[serde(rename = "currentTemp")]
    pub current_temp: Option<f32>,
    #[serde(rename = "liveTemp")]
    pub live_temp: Option<f32>,
    pub timetable: Vec<TimeWindow>,
    #[serde(rename = "activeSeason")]
    pub active_season: Option<SeasonWindow>,
    #[serde(rename = "activeBand")]
    pub active_band: Option<TemperatureBand>,
    pub mode: &'static str,
    #[serde(rename = "isManual")]
    pub is_manual: bool,
    #[serde(rename = "pumpOn")]
    pub pump_on: bool,
    #[serde(rename = "remainingManualTime")]
    pub remaining_manual_time: i64,
    #[serde(rename = "lastTableUpdate")]
    pub last_table_update: Option<i64>,
    #[serde(rename = "currentTimestamp")]
    pub current_timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolStatePayload {
    pub temp: Option<f32>,
    pub pump: bool,
    pub mode: &'static str,
    #[serde(rename = "manualRemainingMin")]
    pub manual_remaining_min: i64,
}

/// Manual override command. A missing `duration` leaves the override
/// bounded by the watchdog alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ManualRequest {
    #[serde(default = "default_on")]
    pub on: bool,
    #[serde(default)]
    pub duration: Option<i64>,
}

fn default_on() -> bool {
    true
}
