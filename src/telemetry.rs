//! Telemetry sample types and the plumbing shared by every provider.
//!
//! A provider is anything that can produce one reading on demand. Providers
//! never panic the overlay: a failed or slow reading is reported as `None`,
//! which the text block shows as `N/A`. Providers that need a native library
//! (NVML, the audio backend) are probed once at startup and wrapped in
//! [`Gated`]; a failed probe is never retried on later ticks.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::audio::AudioReading;
use crate::gpu_data::GpuData;

/// Default time allowed for a single provider call
pub const DEFAULT_BUDGET: Duration = Duration::from_millis(250);

/// Used and total amounts sharing one unit (MB for memory, GB for disk)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub used: u64,
    pub total: u64,
}

impl Usage {
    pub fn new(used: u64, total: u64) -> Option<Self> {
        (total > 0).then_some(Self {
            used: used.min(total),
            total,
        })
    }

    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        (self.used as f64 / self.total as f64 * 100.0) as f32
    }
}

/// One snapshot of everything the text block shows.
/// `None` anywhere means the value could not be read this tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySample {
    pub os_name: Option<String>,
    pub uptime: Option<Duration>,
    pub cpu_model: Option<String>,
    pub cpu_usage: Option<f32>,
    pub memory: Option<Usage>,
    pub disk: Option<Usage>,
    pub gpu: GpuData,
    pub audio: Option<AudioReading>,
}

/// A source of one kind of reading
pub trait Provider {
    type Output;

    /// Short name used in log messages
    fn name(&self) -> &'static str;

    /// One reading, or `None` when it is unavailable right now
    fn sample(&mut self) -> Option<Self::Output>;
}

impl<P: Provider + ?Sized> Provider for Box<P> {
    type Output = P::Output;

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn sample(&mut self) -> Option<Self::Output> {
        (**self).sample()
    }
}

/// Result of the startup capability probe.
/// Dropping a `Capable` provider releases whatever it acquired.
pub enum Gated<P> {
    Capable(P),
    Incapable,
}

impl<P: Provider> Gated<P> {
    /// Runs `probe` once. An error moves the provider to `Incapable` for the
    /// rest of the session.
    pub fn probe(name: &str, probe: impl FnOnce() -> anyhow::Result<P>) -> Self {
        match probe() {
            Ok(provider) => {
                info!("{} provider available", name);
                Gated::Capable(provider)
            }
            Err(e) => {
                warn!("{} provider unavailable: {:#}", name, e);
                Gated::Incapable
            }
        }
    }

    pub fn is_capable(&self) -> bool {
        matches!(self, Gated::Capable(_))
    }

    /// Incapable providers always report `None` without touching anything
    pub fn sample(&mut self) -> Option<P::Output> {
        match self {
            Gated::Capable(provider) => provider.sample(),
            Gated::Incapable => None,
        }
    }

    pub fn sample_within(&mut self, budget: Budget) -> Option<P::Output> {
        match self {
            Gated::Capable(provider) => {
                let name = provider.name();
                budget.run(name, || provider.sample())
            }
            Gated::Incapable => None,
        }
    }

    /// Drops the provider, releasing its resources
    pub fn release(&mut self) {
        if let Gated::Capable(provider) = std::mem::replace(self, Gated::Incapable) {
            debug!("Releasing {} provider", provider.name());
        }
    }
}

/// Upper bound on how long one provider call may take.
///
/// Provider calls are synchronous and can't be interrupted, so the budget is
/// checked after the call returns: a reading that arrived late is discarded
/// and logged, keeping the displayed values consistent with the tick they
/// belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    limit: Duration,
}

impl Default for Budget {
    fn default() -> Self {
        Self { limit: DEFAULT_BUDGET }
    }
}

impl Budget {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    pub fn run<T>(&self, name: &str, call: impl FnOnce() -> Option<T>) -> Option<T> {
        let started = Instant::now();
        let value = call();
        let elapsed = started.elapsed();
        if elapsed > self.limit {
            warn!(
                "{} took {} ms (budget {} ms), discarding reading",
                name,
                elapsed.as_millis(),
                self.limit.as_millis()
            );
            return None;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counter {
        calls: Rc<Cell<u32>>,
    }

    impl Provider for Counter {
        type Output = u32;

        fn name(&self) -> &'static str {
            "counter"
        }

        fn sample(&mut self) -> Option<u32> {
            self.calls.set(self.calls.get() + 1);
            Some(self.calls.get())
        }
    }

    #[test]
    fn test_usage_percent() {
        let usage = Usage::new(6144, 16384).unwrap();
        assert!((usage.percent() - 37.5).abs() < 1e-4);
        assert_eq!(Usage::new(1, 0), None);
        assert_eq!(Usage::new(20, 10).unwrap().used, 10);
    }

    #[test]
    fn test_failed_probe_is_never_sampled() {
        let mut gated: Gated<Counter> = Gated::probe("counter", || anyhow::bail!("no device"));
        assert!(!gated.is_capable());
        for _ in 0..5 {
            assert_eq!(gated.sample(), None);
        }
    }

    #[test]
    fn test_capable_provider_samples_until_released() {
        let calls = Rc::new(Cell::new(0));
        let provider = Counter { calls: calls.clone() };
        let mut gated = Gated::probe("counter", || Ok(provider));
        assert_eq!(gated.sample(), Some(1));
        assert_eq!(gated.sample_within(Budget::default()), Some(2));
        gated.release();
        assert!(!gated.is_capable());
        assert_eq!(gated.sample(), None);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_budget_discards_slow_reading() {
        let budget = Budget::new(Duration::from_millis(5));
        let value = budget.run("slow", || {
            std::thread::sleep(Duration::from_millis(30));
            Some(42)
        });
        assert_eq!(value, None);
        assert_eq!(budget.run("fast", || Some(7)), Some(7));
    }
}
