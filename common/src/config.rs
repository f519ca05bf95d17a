use serde::{Deserialize, Serialize};

use crate::{
    schedule::ScheduleTable,
    timer::{interval_from_unit, TimeUnit, DAY_SECS},
    timetable::time_of_day,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pump_check_interval_secs: i64,
    #[serde(with = "time_of_day")]
    pub table_update_at: u32,
    pub sensor_sample_interval_secs: i64,
    /// Hard ceiling on any manual override.
    pub watchdog_secs: i64,
    pub min_valid_temp_c: f32,
    pub max_valid_temp_c: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pump_check_interval_secs: interval_from_unit(1.0, TimeUnit::Minutes),
            table_update_at: 0,
            sensor_sample_interval_secs: interval_from_unit(5.0, TimeUnit::Minutes),
            watchdog_secs: interval_from_unit(10.0, TimeUnit::Days),
            min_valid_temp_c: -10.0,
            max_valid_temp_c: 50.0,
        }
    }
}

impl EngineConfig {
    pub fn sanitize(&mut self) {
        let defaults = Self::default();

        self.pump_check_interval_secs = self.pump_check_interval_secs.clamp(1, 3_600);
        self.sensor_sample_interval_secs = self.sensor_sample_interval_secs.clamp(1, DAY_SECS);
        self.watchdog_secs = self.watchdog_secs.clamp(60, 30 * DAY_SECS);
        self.table_update_at %= DAY_SECS as u32;

        if !self.min_valid_temp_c.is_finite()
            || !self.max_valid_temp_c.is_finite()
            || self.min_valid_temp_c >= self.max_valid_temp_c
        {
            self.min_valid_temp_c = defaults.min_valid_temp_c;
            self.max_valid_temp_c = defaults.max_valid_temp_c;
        }
    }

    pub fn is_plausible_temp(&self, temp_c: f32) -> bool {
        temp_c.is_finite() && (self.min_valid_temp_c..=self.max_valid_temp_c).contains(&temp_c)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    // Bands and seasons sit at the document root, as `timetable` and
    // `whitehours` in older files.
    #[serde(flatten)]
    pub schedule: ScheduleTable,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub network: NetworkConfig,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            schedule: ScheduleTable::default(),
            timezone: default_timezone(),
            network: NetworkConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_match_legacy_timers() {
        let config = EngineConfig::default();

        assert_eq!(config.pump_check_interval_secs, 60);
        assert_eq!(config.sensor_sample_interval_secs, 300);
        assert_eq!(config.watchdog_secs, 864_000);
        assert_eq!(config.table_update_at, 0);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let raw = r#"{
            "engine": { "table_update_at": "6:30", "watchdog_secs": 7200 }
        }"#;

        let config: RuntimeConfig = serde_json::from_str(raw).unwrap();

        assert_eq!(config.engine.table_update_at, 6 * 3_600 + 30 * 60);
        assert_eq!(config.engine.watchdog_secs, 7_200);
        assert_eq!(config.engine.pump_check_interval_secs, 60);
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.network.mqtt_port, 1883);
        assert!(config.schedule.bands.is_empty());
        assert!(config.schedule.seasons.is_empty());
    }

    #[test]
    fn legacy_schedule_keys_load_from_document_root() {
        let raw = r#"{
            "timezone": "Europe/Paris",
            "timetable": [
                { "minT": 15, "maxT": 25, "splits": 2, "duration": 7200 }
            ],
            "whitehours": [
                { "name": "summer", "months": [6, 7, 8], "table": { "on": "6:00", "off": "18:00" } }
            ]
        }"#;

        let config: RuntimeConfig = serde_json::from_str(raw).unwrap();

        assert_eq!(config.schedule.bands.len(), 1);
        assert_eq!(config.schedule.bands[0].splits, 2);
        assert_eq!(config.schedule.seasons.len(), 1);
        assert_eq!(config.schedule.seasons[0].name, "summer");
        assert_eq!(config.timezone, "Europe/Paris");
        config.schedule.validate().unwrap();
    }

    #[test]
    fn sanitize_clamps_intervals_and_temperature_range() {
        let mut config = EngineConfig {
            pump_check_interval_secs: 0,
            sensor_sample_interval_secs: -5,
            watchdog_secs: 1,
            min_valid_temp_c: 40.0,
            max_valid_temp_c: 10.0,
            ..EngineConfig::default()
        };

        config.sanitize();

        assert_eq!(config.pump_check_interval_secs, 1);
        assert_eq!(config.sensor_sample_interval_secs, 1);
        assert_eq!(config.watchdog_secs, 60);
        assert_eq!(config.min_valid_temp_c, -10.0);
        assert_eq!(config.max_valid_temp_c, 50.0);
    }

    #[test]
    fn plausible_temperature_range_is_inclusive() {
        let config = EngineConfig::default();

        assert!(config.is_plausible_temp(50.0));
        assert!(config.is_plausible_temp(-10.0));
        assert!(!config.is_plausible_temp(85.0));
        assert!(!config.is_plausible_temp(f32::NAN));
    }
}
