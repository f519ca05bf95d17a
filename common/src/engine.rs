use tracing::{debug, info, warn};

use crate::{
    config::EngineConfig,
    ports::{Clock, PumpActuator, TemperatureSensor},
    schedule::{ScheduleTable, SeasonWindow},
    timer::{DailyTimer, IntervalTimer, TimerMode, MINUTE_SECS},
    timetable::{self, TimeWindow},
    types::{PoolStatePayload, PoolStatus, ScheduleMode},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleState {
    pub current_temp: Option<f32>,
    pub live_temp: Option<f32>,
    pub active_band: Option<usize>,
    pub active_season: Option<SeasonWindow>,
    pub timetable: Vec<TimeWindow>,
    pub pump_on: bool,
    pub is_manual: bool,
    pub last_table_update: Option<i64>,
}

#[derive(Debug)]
pub struct ScheduleEngine<C, S, A> {
    config: EngineConfig,
    schedule: ScheduleTable,
    clock: C,
    sensor: S,
    actuator: A,

    state: ScheduleState,

    pump_check_timer: IntervalTimer,
    table_update_timer: DailyTimer,
    sensor_timer: IntervalTimer,
    activation_timer: IntervalTimer,
    watchdog_timer: IntervalTimer,
}

impl<C, S, A> ScheduleEngine<C, S, A>
where
    C: Clock,
    S: TemperatureSensor,
    A: PumpActuator,
{
    pub fn new(
        mut config: EngineConfig,
        schedule: ScheduleTable,
        clock: C,
        sensor: S,
        mut actuator: A,
    ) -> Self {
        config.sanitize();
        actuator.set_output(false);

        // Never reset: both fire on the first update so the pump state and
        // the timetable are known right after boot.
        let mut pump_check_timer =
            IntervalTimer::new(config.pump_check_interval_secs, TimerMode::Repeating);
        pump_check_timer.start();
        let mut table_update_timer = DailyTimer::new(i64::from(config.table_update_at));
        let calendar = clock.local_calendar(clock.now());
        table_update_timer.start(calendar.second_of_day());

        let mut sensor_timer =
            IntervalTimer::new(config.sensor_sample_interval_secs, TimerMode::Repeating);
        sensor_timer.start();

        let activation_timer = IntervalTimer::new(config.watchdog_secs, TimerMode::SingleShot);
        let watchdog_timer = IntervalTimer::new(config.watchdog_secs, TimerMode::SingleShot);

        Self {
            config,
            schedule,
            clock,
            sensor,
            actuator,
            state: ScheduleState::default(),
            pump_check_timer,
            table_update_timer,
            sensor_timer,
            activation_timer,
            watchdog_timer,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn schedule(&self) -> &ScheduleTable {
        &self.schedule
    }

    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    pub fn timetable(&self) -> &[TimeWindow] {
        &self.state.timetable
    }

    pub fn mode(&self) -> ScheduleMode {
        if self.state.is_manual {
            ScheduleMode::Manual
        } else {
            ScheduleMode::Automatic
        }
    }

    pub fn is_manual(&self) -> bool {
        self.state.is_manual
    }

    pub fn is_pump_on(&self) -> bool {
        self.state.pump_on
    }

    pub fn poll(&mut self) {
        let now = self.clock.now();
        self.update(now);
    }

    pub fn update(&mut self, now: i64) {
        if self.state.is_manual {
            let watchdog_fired = self.watchdog_timer.update(now);
            let expired = self.activation_timer.update(now);
            if watchdog_fired || expired {
                info!(watchdog_fired, expired, "manual override ended");
                self.end_manual(now);
            }
        } else {
            if self.pump_check_timer.update(now) {
                self.on_check_pump(now);
            }

            let second_of_day = self.clock.local_calendar(now).second_of_day();
            if self.table_update_timer.update(now, second_of_day) {
                self.on_timetable_update(now);
            }
        }

        if self.sensor_timer.update(now) {
            self.sample_temperature();
        }
    }

    /// Regenerates the timetable from the current temperature and month,
    /// then re-evaluates the pump. Returns false and keeps the previous
    /// timetable when no band, season or window applies.
    pub fn on_timetable_update(&mut self, now: i64) -> bool {
        self.state.last_table_update = Some(now);

        let Some(temp_c) = self.sample_temperature() else {
            warn!("no temperature reading yet, keeping previous timetable");
            return false;
        };
        self.state.current_temp = Some(temp_c);

        let month = self.clock.local_calendar(now).month;

        let Some((band_index, band)) = self.schedule.select_band(temp_c) else {
            warn!(temp_c, "no temperature band matches, keeping previous timetable");
            return false;
        };
        let Some(season) = self.schedule.select_season(month) else {
            warn!(month, "no season covers this month, keeping previous timetable");
            return false;
        };
        let Some(window) = season.primary_window() else {
            warn!(season = %season.name, "season has no time window, keeping previous timetable");
            return false;
        };

        let generated = match timetable::generate(band, window) {
            Ok(generated) => generated,
            Err(err) => {
                warn!(
                    band = band_index,
                    season = %season.name,
                    "timetable generation failed: {err}"
                );
                return false;
            }
        };

        info!(
            temp_c,
            band = band_index,
            season = %season.name,
            windows = generated.len(),
            "timetable updated"
        );
        for (i, window) in generated.iter().enumerate() {
            debug!("{}. {}", i + 1, window);
        }

        self.state.active_season = Some(season.clone());
        self.state.active_band = Some(band_index);
        self.state.timetable = generated;

        self.on_check_pump(now);
        true
    }

    pub fn on_check_pump(&mut self, now: i64) {
        let calendar = self.clock.local_calendar(now);
        if self.is_in_timetable(calendar.hour, calendar.minute) {
            self.set_pump_on();
        } else {
            self.set_pump_off();
        }
    }

    pub fn is_in_timetable(&self, hour: u32, minute: u32) -> bool {
        timetable::is_in_timetable(&self.state.timetable, hour, minute)
    }

    pub fn set_pump_on(&mut self) {
        if self.state.pump_on {
            return;
        }
        self.state.pump_on = true;
        info!("switching pump on");
        self.actuator.set_output(true);
    }

    pub fn set_pump_off(&mut self) {
        if !self.state.pump_on {
            return;
        }
        self.state.pump_on = false;
        info!("switching pump off");
        self.actuator.set_output(false);
    }

    /// Takes the pump out of the schedule. Without a duration the override
    /// lasts until disabled or until the watchdog fires.
    pub fn enable_manual_pump(&mut self, duration_secs: Option<i64>, on: bool) {
        let now = self.clock.now();

        self.activation_timer.pause();
        match duration_secs {
            Some(secs) => {
                self.activation_timer.set_interval(secs.max(0));
                self.activation_timer.start_reset(now);
            }
            None => warn!(
                watchdog_secs = self.config.watchdog_secs,
                "manual override without duration, bounded by watchdog only"
            ),
        }

        self.watchdog_timer.pause();
        self.watchdog_timer.set_interval(self.config.watchdog_secs);
        self.watchdog_timer.start_reset(now);

        self.state.is_manual = true;
        info!(on, ?duration_secs, "manual override enabled");

        if on {
            self.set_pump_on();
        } else {
            self.set_pump_off();
        }
    }

    pub fn disable_manual_pump(&mut self) {
        let now = self.clock.now();
        self.end_manual(now);
    }

    pub fn remaining_manual_time(&self) -> i64 {
        self.remaining_manual_time_at(self.clock.now())
    }

    pub fn remaining_manual_time_at(&self, now: i64) -> i64 {
        if !self.state.is_manual {
            return 0;
        }

        let watchdog = self.watchdog_timer.remaining_time(now);
        if self.activation_timer.is_paused() {
            watchdog
        } else {
            watchdog.min(self.activation_timer.remaining_time(now))
        }
    }

    pub fn status(&self, now: i64) -> PoolStatus {
        PoolStatus {
            current_temp: self.state.current_temp,
            live_temp: self.state.live_temp,
            timetable: self.state.timetable.clone(),
            active_season: self.state.active_season.clone(),
            active_band: self
                .state
                .active_band
                .and_then(|index| self.schedule.bands.get(index).cloned()),
            mode: self.mode().as_str(),
            is_manual: self.state.is_manual,
            pump_on: self.state.pump_on,
            remaining_manual_time: self.remaining_manual_time_at(now),
            last_table_update: self.state.last_table_update,
            current_timestamp: now,
        }
    }

    pub fn state_payload(&self, now: i64) -> PoolStatePayload {
        PoolStatePayload {
            temp: self.state.live_temp,
            pump: self.state.pump_on,
            mode: self.mode().as_str(),
            manual_remaining_min: self.remaining_manual_time_at(now) / MINUTE_SECS,
        }
    }

    pub fn timetable_listing(&self) -> String {
        self.state
            .timetable
            .iter()
            .enumerate()
            .map(|(i, window)| format!("{}. {}\n", i + 1, window))
            .collect()
    }

    fn end_manual(&mut self, now: i64) {
        if !self.state.is_manual {
            warn!("manual override not active, resynchronising anyway");
        }

        self.watchdog_timer.pause();
        self.activation_timer.pause();
        self.set_pump_off();
        self.state.is_manual = false;

        if !self.on_timetable_update(now) {
            self.on_check_pump(now);
        }
    }

    fn sample_temperature(&mut self) -> Option<f32> {
        match self.sensor.current_temperature_celsius() {
            Ok(temp_c) if self.config.is_plausible_temp(temp_c) => {
                debug!(temp_c, "temperature sampled");
                self.state.live_temp = Some(temp_c);
            }
            Ok(temp_c) => warn!(temp_c, "discarding implausible temperature reading"),
            Err(err) => warn!("temperature read failed: {err}"),
        }
        self.state.live_temp
    }
}
