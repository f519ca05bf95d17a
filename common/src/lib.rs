pub mod config;
pub mod engine;
pub mod error;
pub mod ports;
pub mod schedule;
pub mod timer;
pub mod timetable;
pub mod topics;
pub mod types;

pub use config::{EngineConfig, NetworkConfig, RuntimeConfig};
pub use engine::{ScheduleEngine, ScheduleState};
pub use error::{ConfigError, SensorError, TimetableError};
pub use ports::{CalendarTime, Clock, FixedOffsetClock, PumpActuator, TemperatureSensor};
pub use schedule::{ScheduleTable, SeasonWindow, TemperatureBand};
pub use timer::{DailyTimer, IntervalTimer, TimeUnit, TimerMode};
pub use timetable::TimeWindow;
pub use topics::*;
pub use types::{ManualRequest, PoolStatePayload, PoolStatus, ScheduleMode};
