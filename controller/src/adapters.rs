use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::info;

use pool_common::{CalendarTime, Clock, ConfigError, PumpActuator, SensorError, TemperatureSensor};

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(timezone: &str) -> Result<Self, ConfigError> {
        let tz = timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(timezone.to_string()))?;
        Ok(Self { tz })
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }
}

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }

    fn local_calendar(&self, epoch_secs: i64) -> CalendarTime {
        let utc = DateTime::from_timestamp(epoch_secs, 0).unwrap_or_default();
        CalendarTime::from_datetime(&utc.with_timezone(&self.tz))
    }
}

/// Latest water temperature received over MQTT. Readings older than
/// `stale_after` count as a disconnected probe.
#[derive(Debug, Clone)]
pub struct SharedTemperature {
    latest: Arc<Mutex<Option<(f32, Instant)>>>,
    stale_after: Duration,
}

impl SharedTemperature {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            latest: Arc::new(Mutex::new(None)),
            stale_after,
        }
    }

    pub fn publish(&self, temp_c: f32) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some((temp_c, Instant::now()));
        }
    }
}

impl TemperatureSensor for SharedTemperature {
    fn current_temperature_celsius(&mut self) -> Result<f32, SensorError> {
        let latest = self.latest.lock().ok().and_then(|latest| *latest);
        match latest {
            Some((temp_c, at)) if at.elapsed() < self.stale_after => Ok(temp_c),
            _ => Err(SensorError::Disconnected),
        }
    }
}

/// Host stand-in for the pump relay; the output is only logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingRelay;

impl PumpActuator for LoggingRelay {
    fn set_output(&mut self, on: bool) {
        info!(on, "pump relay output");
    }
}
