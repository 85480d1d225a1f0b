use std::time::{Duration, Instant};

/// Paces the fixed physics tick the host drives the cart pipeline on.
pub trait Timer {
    type Timestamp: Copy;
    fn now(&self) -> Self::Timestamp;
    fn elapsed(&self, ts: Self::Timestamp) -> Duration;
    fn sleep(&self, d: Duration);
    /// Blocks until the next tick boundary and returns the tick index.
    fn wait_for_tick(&mut self) -> u64;
    fn stats(&self) -> TickStats;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickStats {
    pub ticks: u64,
    pub average_tick_ns: f64,
    pub jitter_ns: f64,
    pub max_tick_ns: f64,
    pub overruns: u64,
}

/// Fixed-rate tick timer with a rolling window of measured tick lengths.
#[derive(Debug, Clone)]
pub struct TickTimer {
    start: Instant,
    period: Duration,
    next_deadline: Duration,
    last_tick: Option<Duration>,
    tick_times: Vec<Duration>,
    max_samples: usize,
    ticks: u64,
    overruns: u64,
}

impl TickTimer {
    #[must_use]
    pub fn new(tick_hz: f64) -> Self {
        let period = Duration::from_secs_f64(1.0 / tick_hz.max(1.0));
        Self {
            start: Instant::now(),
            period,
            next_deadline: period,
            last_tick: None,
            tick_times: Vec::with_capacity(1000),
            max_samples: 1000,
            ticks: 0,
            overruns: 0,
        }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    fn record_tick(&mut self, at: Duration) {
        if let Some(prev) = self.last_tick {
            if self.tick_times.len() >= self.max_samples {
                self.tick_times.remove(0);
            }
            self.tick_times.push(at.saturating_sub(prev));
        }
        self.last_tick = Some(at);
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(all(target_os = "linux", feature = "high_precision_timer"))]
        self.linux_sleep(duration);
        #[cfg(not(all(target_os = "linux", feature = "high_precision_timer")))]
        std::thread::sleep(duration);
    }

    #[cfg(all(target_os = "linux", feature = "high_precision_timer"))]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }
}

impl Timer for TickTimer {
    type Timestamp = u64;

    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }

    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }

    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }

    fn wait_for_tick(&mut self) -> u64 {
        let now = self.start.elapsed();
        if now < self.next_deadline {
            self.sleep(self.next_deadline - now);
            self.next_deadline += self.period;
        } else {
            // Late: count it and re-anchor instead of bursting to catch up.
            self.overruns += 1;
            tracing::trace!(late_ns = (now - self.next_deadline).as_nanos() as u64, "tick overrun");
            self.next_deadline = now + self.period;
        }
        self.record_tick(self.start.elapsed());
        self.ticks += 1;
        self.ticks
    }

    fn stats(&self) -> TickStats {
        let times: Vec<f64> = self.tick_times.iter().map(|d| d.as_nanos() as f64).collect();
        if times.is_empty() {
            return TickStats {
                ticks: self.ticks,
                overruns: self.overruns,
                ..TickStats::default()
            };
        }
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        let max = times.iter().copied().fold(f64::MIN, f64::max);
        TickStats {
            ticks: self.ticks,
            average_tick_ns: avg,
            jitter_ns: var.sqrt(),
            max_tick_ns: max,
            overruns: self.overruns,
        }
    }
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new(50.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_are_counted_and_measured() {
        let mut timer = TickTimer::new(500.0);
        for expected in 1..=5 {
            assert_eq!(timer.wait_for_tick(), expected);
        }
        let stats = timer.stats();
        assert_eq!(stats.ticks, 5);
        assert!(stats.average_tick_ns > 0.0);
        assert!(stats.max_tick_ns >= stats.average_tick_ns);
    }

    #[test]
    fn rate_is_clamped_to_one_hertz() {
        assert_eq!(TickTimer::new(0.0).period(), Duration::from_secs(1));
    }
}
