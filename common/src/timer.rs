use std::fmt;

use tracing::debug;

pub const MINUTE_SECS: i64 = 60;
pub const HOUR_SECS: i64 = 60 * MINUTE_SECS;
pub const DAY_SECS: i64 = 24 * HOUR_SECS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    SingleShot,
    Repeating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    pub fn secs(self) -> i64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => MINUTE_SECS,
            Self::Hours => HOUR_SECS,
            Self::Days => DAY_SECS,
        }
    }
}

pub fn interval_from_unit(amount: f64, unit: TimeUnit) -> i64 {
    if !amount.is_finite() || amount <= 0.0 {
        return 0;
    }
    // Nudge past float noise such as 0.7 * 60 = 41.999...
    (amount * unit.secs() as f64 + 1e-6).trunc() as i64
}

type Callback = Box<dyn FnMut() + Send>;

pub struct IntervalTimer {
    interval_secs: i64,
    last_fire: i64,
    running: bool,
    mode: TimerMode,
    callback: Option<Callback>,
}

impl fmt::Debug for IntervalTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntervalTimer")
            .field("interval_secs", &self.interval_secs)
            .field("last_fire", &self.last_fire)
            .field("running", &self.running)
            .field("mode", &self.mode)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl IntervalTimer {
    pub fn new(interval_secs: i64, mode: TimerMode) -> Self {
        Self {
            interval_secs,
            last_fire: 0,
            running: false,
            mode,
            callback: None,
        }
    }

    pub fn with_callback(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn start_reset(&mut self, now: i64) {
        self.last_fire = now;
        self.start();
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn is_paused(&self) -> bool {
        !self.running
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn interval_secs(&self) -> i64 {
        self.interval_secs
    }

    pub fn set_interval(&mut self, interval_secs: i64) {
        self.interval_secs = interval_secs;
    }

    pub fn last_fire(&self) -> i64 {
        self.last_fire
    }

    pub fn update(&mut self, now: i64) -> bool {
        if !self.running {
            return false;
        }

        let elapsed = now.saturating_sub(self.last_fire);
        if elapsed < 0 {
            debug!(
                now,
                last_fire = self.last_fire,
                "clock moved backwards, re-anchoring timer"
            );
            self.last_fire = now;
            return false;
        }

        if elapsed < self.interval_secs {
            return false;
        }

        if let Some(callback) = self.callback.as_mut() {
            callback();
        }
        self.last_fire = now;
        if self.mode == TimerMode::SingleShot {
            self.pause();
        }
        true
    }

    /// Seconds until the next fire, or 0 while paused. Goes negative when a
    /// fire is overdue and `update` has not observed it yet.
    pub fn remaining_time(&self, now: i64) -> i64 {
        if !self.running {
            return 0;
        }
        self.interval_secs - now.saturating_sub(self.last_fire)
    }
}

pub fn seconds_until(target: i64, current: i64) -> i64 {
    if target < current {
        DAY_SECS - current + target
    } else {
        target - current
    }
}

#[derive(Debug)]
pub struct DailyTimer {
    timer: IntervalTimer,
    start_at: i64,
}

impl DailyTimer {
    pub fn new(start_at_second_of_day: i64) -> Self {
        Self {
            timer: IntervalTimer::new(0, TimerMode::Repeating),
            start_at: start_at_second_of_day.rem_euclid(DAY_SECS),
        }
    }

    pub fn start_at(&self) -> i64 {
        self.start_at
    }

    pub fn start(&mut self, second_of_day: i64) {
        self.timer
            .set_interval(seconds_until(self.start_at, second_of_day));
        self.timer.start();
    }

    pub fn pause(&mut self) {
        self.timer.pause();
    }

    pub fn is_paused(&self) -> bool {
        self.timer.is_paused()
    }

    pub fn update(&mut self, now: i64, second_of_day: i64) -> bool {
        if !self.timer.update(now) {
            return false;
        }

        let next = match seconds_until(self.start_at, second_of_day) {
            // Fired on the target itself: the next one is tomorrow.
            0 => DAY_SECS,
            secs => secs,
        };
        self.timer.set_interval(next);
        debug!(next_in_secs = next, "daily timer re-armed");
        true
    }

    pub fn next_interval_secs(&self) -> i64 {
        self.timer.interval_secs()
    }

    pub fn remaining_time(&self, now: i64) -> i64 {
        self.timer.remaining_time(now)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn late_update_reports_a_single_fire() {
        let mut timer = IntervalTimer::new(60, TimerMode::Repeating);
        timer.start_reset(1_000);

        assert!(!timer.update(1_059));
        assert!(timer.update(1_000 + 60 * 10));
        assert!(!timer.update(1_000 + 60 * 10));
        assert!(!timer.update(1_000 + 60 * 10 + 59));
        assert!(timer.update(1_000 + 60 * 11));
    }

    #[test]
    fn single_shot_pauses_after_fire() {
        let mut timer = IntervalTimer::new(300, TimerMode::SingleShot);
        timer.start_reset(0);

        assert!(timer.update(300));
        assert!(timer.is_paused());
        assert!(!timer.update(10_000));
        assert_eq!(timer.remaining_time(10_000), 0);
    }

    #[test]
    fn paused_timer_never_fires() {
        let mut timer = IntervalTimer::new(1, TimerMode::Repeating);
        assert!(!timer.update(1_000_000));
    }

    #[test]
    fn start_without_reset_keeps_previous_anchor() {
        let mut timer = IntervalTimer::new(60, TimerMode::Repeating);
        timer.start_reset(100);
        timer.pause();
        timer.start();

        assert_eq!(timer.last_fire(), 100);
        assert!(timer.update(160));
    }

    #[test]
    fn never_reset_timer_fires_on_first_update() {
        let mut timer = IntervalTimer::new(60, TimerMode::Repeating);
        timer.start();

        assert!(timer.update(1_700_000_000));
    }

    #[test]
    fn callback_runs_on_each_fire() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let mut timer = IntervalTimer::new(10, TimerMode::Repeating).with_callback(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        timer.start_reset(0);

        timer.update(5);
        timer.update(10);
        timer.update(20);

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn remaining_time_can_go_negative() {
        let mut timer = IntervalTimer::new(60, TimerMode::Repeating);
        timer.start_reset(0);

        assert_eq!(timer.remaining_time(20), 40);
        assert_eq!(timer.remaining_time(90), -30);
    }

    #[test]
    fn backward_clock_jump_does_not_fire() {
        let mut timer = IntervalTimer::new(60, TimerMode::Repeating);
        timer.start_reset(10_000);

        assert!(!timer.update(5_000));
        assert_eq!(timer.last_fire(), 5_000);
        assert!(!timer.update(5_059));
        assert!(timer.update(5_060));
    }

    #[test]
    fn set_interval_applies_on_next_update() {
        let mut timer = IntervalTimer::new(600, TimerMode::Repeating);
        timer.start_reset(0);
        assert!(!timer.update(100));

        timer.set_interval(50);
        assert!(timer.update(100));
    }

    #[test]
    fn converts_fractional_units() {
        assert_eq!(interval_from_unit(10.0, TimeUnit::Days), 864_000);
        assert_eq!(interval_from_unit(1.5, TimeUnit::Days), 129_600);
        assert_eq!(interval_from_unit(0.7, TimeUnit::Minutes), 42);
        assert_eq!(interval_from_unit(1.0, TimeUnit::Minutes), 60);
        assert_eq!(interval_from_unit(2.9, TimeUnit::Seconds), 2);
        assert_eq!(interval_from_unit(-3.0, TimeUnit::Hours), 0);
    }

    #[test]
    fn seconds_until_wraps_past_midnight() {
        assert_eq!(seconds_until(7 * HOUR_SECS, 14 * HOUR_SECS), 17 * HOUR_SECS);
        assert_eq!(seconds_until(14 * HOUR_SECS, 7 * HOUR_SECS), 7 * HOUR_SECS);
        assert_eq!(seconds_until(0, 0), 0);
    }

    #[test]
    fn daily_timer_targets_second_of_day() {
        let mut timer = DailyTimer::new(6 * HOUR_SECS);
        timer.start(5 * HOUR_SECS);

        assert_eq!(timer.next_interval_secs(), HOUR_SECS);
    }

    #[test]
    fn daily_timer_corrects_drift_after_fire() {
        let mut timer = DailyTimer::new(0);
        // 23:00, one hour to midnight.
        timer.start(23 * HOUR_SECS);
        let base = 1_000_000;
        // Never reset: first update fires right away and re-arms for midnight.
        assert!(timer.update(base, 23 * HOUR_SECS));
        assert_eq!(timer.next_interval_secs(), HOUR_SECS);

        // The loop observes the fire five minutes late.
        let late = base + HOUR_SECS + 5 * MINUTE_SECS;
        assert!(timer.update(late, 5 * MINUTE_SECS));
        assert_eq!(timer.next_interval_secs(), DAY_SECS - 5 * MINUTE_SECS);
    }

    #[test]
    fn daily_timer_rearm_stays_within_a_day() {
        for current in (0..DAY_SECS).step_by(1_799) {
            for target in [0, 1, 12 * HOUR_SECS, DAY_SECS - 1] {
                let mut timer = DailyTimer::new(target);
                timer.start(current);
                assert!(timer.update(1_000_000, current));

                let next = timer.next_interval_secs();
                assert!((0..=DAY_SECS).contains(&next), "next={next}");
                assert!(next > 0);
            }
        }
    }

    #[test]
    fn daily_timer_fire_on_target_waits_a_full_day() {
        let mut timer = DailyTimer::new(8 * HOUR_SECS);
        timer.start(8 * HOUR_SECS);
        assert!(timer.update(50_000, 8 * HOUR_SECS));

        assert_eq!(timer.next_interval_secs(), DAY_SECS);
        assert!(!timer.update(50_001, 8 * HOUR_SECS));
    }
}
