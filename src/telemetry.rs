use std::time::Duration;

const RATE_WINDOW: Duration = Duration::from_secs(1);

/// Tick rate and processing time, read by monitoring front ends.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Telemetry {
    window_start: Option<Duration>,
    tick_counter: u32,
    tick_rate: u32,
    last_tick_duration: Duration,
}

impl Telemetry {
    pub fn on_tick(&mut self, now: Duration) {
        let window_start = *self.window_start.get_or_insert(now);
        if now.saturating_sub(window_start) > RATE_WINDOW {
            self.window_start = Some(now);
            self.tick_rate = self.tick_counter;
            self.tick_counter = 0;
        } else {
            self.tick_counter += 1;
        }
    }

    pub fn record_duration(&mut self, duration: Duration) {
        self.last_tick_duration = duration;
    }

    pub fn reset(&mut self) {
        *self = Telemetry::default();
    }

    /// Ticks counted over the last completed one second window.
    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn last_tick_duration(&self) -> Duration {
        self.last_tick_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_is_published_after_window() {
        let mut telemetry = Telemetry::default();
        let step = Duration::from_micros(8333);
        let mut now = Duration::ZERO;
        for _ in 0..130 {
            telemetry.on_tick(now);
            now += step;
        }
        // Ticks 0 through 120 fall inside the first window; tick 121 closes it.
        assert_eq!(telemetry.tick_rate(), 121);
        telemetry.record_duration(Duration::from_millis(2));
        assert_eq!(telemetry.last_tick_duration(), Duration::from_millis(2));
        telemetry.reset();
        assert_eq!(telemetry, Telemetry::default());
    }
}
