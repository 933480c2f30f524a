//! Scoped timing of pipeline stages.
//!
//! A [`TimingGuard`] records when it was created and logs the elapsed time under
//! the `cardsheet::telemetry` target when dropped. Guards only log when telemetry
//! was switched on through [`configure`] and the level passes both the configured
//! threshold and the global log filter.

use std::{
    borrow::Cow,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use log::{Level, LevelFilter, log, log_enabled};

pub const TELEMETRY_TARGET: &str = "cardsheet::telemetry";

static ENABLED: AtomicBool = AtomicBool::new(false);
static THRESHOLD: AtomicUsize = AtomicUsize::new(0);

const FILTERS: [LevelFilter; 6] = [
    LevelFilter::Off,
    LevelFilter::Error,
    LevelFilter::Warn,
    LevelFilter::Info,
    LevelFilter::Debug,
    LevelFilter::Trace,
];

/// Logs how long a scope took when dropped.
pub struct TimingGuard {
    label: Cow<'static, str>,
    level: Level,
    start: Instant,
    active: bool,
}

impl TimingGuard {
    /// Consume the guard and return the elapsed duration without logging.
    pub fn finish(mut self) -> Duration {
        self.active = false;
        self.start.elapsed()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if self.active {
            log!(
                target: TELEMETRY_TARGET,
                self.level,
                "{} completed in {:.2?}",
                self.label,
                self.start.elapsed()
            );
        }
    }
}

/// Start timing `label`; the guard logs at `level` when telemetry allows it.
pub fn timing_guard(label: impl Into<Cow<'static, str>>, level: Level) -> TimingGuard {
    let active = telemetry_allows(level) && log_enabled!(target: TELEMETRY_TARGET, level);
    TimingGuard {
        label: label.into(),
        level,
        start: Instant::now(),
        active,
    }
}

/// Switch telemetry on or off and set the most verbose level it may log at.
pub fn configure(enabled: bool, level: LevelFilter) {
    ENABLED.store(enabled, Ordering::Relaxed);
    THRESHOLD.store(level as usize, Ordering::Relaxed);
}

pub fn telemetry_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

pub fn telemetry_level() -> LevelFilter {
    FILTERS
        .get(THRESHOLD.load(Ordering::Relaxed))
        .copied()
        .unwrap_or(LevelFilter::Off)
}

/// True when telemetry is on and `level` is within the configured threshold.
pub fn telemetry_allows(level: Level) -> bool {
    telemetry_enabled() && level <= telemetry_level()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_controls_threshold() {
        configure(true, LevelFilter::Info);
        assert!(telemetry_enabled());
        assert_eq!(telemetry_level(), LevelFilter::Info);
        assert!(telemetry_allows(Level::Info));
        assert!(!telemetry_allows(Level::Debug));

        configure(false, LevelFilter::Trace);
        assert!(!telemetry_allows(Level::Error));
    }

    #[test]
    fn guard_without_logger_stays_quiet() {
        let guard = timing_guard("noop", Level::Debug);
        let _ = guard.finish();
    }
}
