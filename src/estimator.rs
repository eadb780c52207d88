// LOADSLOT LOAD ESTIMATOR
// CLOSED-LOOP ADMISSION CONTROL FROM RAW CPU COUNTERS
//
// EVERY update():
//   POLL -> REJECT UNLESS STRICTLY NEWER -> INSTANTANEOUS BUSY CORES
//   -> CAP AVAILABLE AT THRESHOLD -> SMOOTH (MEAN + ERROR BAND)
//   -> AT MOST ONE HYSTERESIS STEP PER TIME CONSTANT.
//
// SINGLE WRITER. NO LOCKS, NO THREADS. CALLERS SHARING ONE ESTIMATOR
// ACROSS THREADS MUST SERIALIZE update() THEMSELVES.

use std::time::Duration;

use log::debug;

use crate::error::{LoadError, LoadResult};
use crate::event::Snapshot;
use crate::hysteresis::{self, Adjustment, RateLimiter};
use crate::smoothing::Smoother;
use crate::source::{self, Sample, SampleSource};

pub const DEFAULT_TIME_CONSTANT: f64 = 3.0;

// POLL ROUGHLY THREE TIMES PER TIME CONSTANT
const POLLS_PER_TIME_CONSTANT: f64 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EstimatorConfig {
    /// Smoothing time constant in seconds. Also the minimum spacing
    /// between two adjustments of `available`.
    pub time_constant: f64,
    /// Logical CPU count. `None` detects it at construction.
    pub cores: Option<u32>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            time_constant: DEFAULT_TIME_CONSTANT,
            cores: None,
        }
    }
}

impl EstimatorConfig {
    pub fn with_time_constant(time_constant: f64) -> Self {
        Self {
            time_constant,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> LoadResult<()> {
        if !self.time_constant.is_finite() || self.time_constant <= 0.0 {
            return Err(LoadError::InvalidConfiguration(format!(
                "time constant must be a positive number of seconds, got {}",
                self.time_constant
            )));
        }
        if self.cores == Some(0) {
            return Err(LoadError::InvalidConfiguration(
                "core count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Recommended spacing between update() calls.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.time_constant / POLLS_PER_TIME_CONSTANT)
    }
}

pub struct LoadEstimator<S> {
    source: S,
    // LAST ACCEPTED SAMPLE. None UNTIL THE SOURCE FIRST ANSWERS.
    previous: Option<Sample>,
    smoother: Smoother,
    instantaneous: f64,
    error: f64,
    cores: u32,
    available: u32,
    limiter: RateLimiter,
}

impl<S: SampleSource> LoadEstimator<S> {
    /// Validate `config`, then take one priming sample.
    ///
    /// The estimator starts "fully loaded but fully available": the
    /// average sits at the core count and every core is an available slot.
    /// A failed priming poll is not an error; the first sample that does
    /// arrive becomes the baseline instead.
    pub fn new(config: EstimatorConfig, source: S) -> LoadResult<Self> {
        config.validate()?;
        let cores = config.cores.unwrap_or_else(source::core_count).max(1);
        let seed = cores as f64;
        let smoother = Smoother::seeded(config.time_constant, seed);

        let mut estimator = Self {
            source,
            previous: None,
            smoother,
            instantaneous: seed,
            error: smoother.error(),
            cores,
            available: cores,
            limiter: RateLimiter::new(),
        };
        match estimator.source.poll() {
            Ok(sample) => estimator.previous = Some(sample),
            Err(e) => debug!("priming poll failed, waiting for first sample: {e}"),
        }
        Ok(estimator)
    }

    pub fn with_defaults(source: S) -> LoadResult<Self> {
        Self::new(EstimatorConfig::default(), source)
    }

    /// Poll once and maybe move `available` by one toward `threshold`.
    ///
    /// Returns true only when a hysteresis step fired. Failed polls and
    /// samples that do not strictly advance are skipped without touching
    /// any state.
    pub fn update(&mut self, threshold: f64) -> bool {
        match self.try_update(threshold) {
            Ok(adjustment) => adjustment.changed(),
            Err(e) => {
                debug!("update skipped: {e}");
                false
            }
        }
    }

    /// Same as [`update`](Self::update) but reports why a cycle was skipped.
    pub fn try_update(&mut self, threshold: f64) -> LoadResult<Adjustment> {
        let sample = self.source.poll()?;

        let previous = match self.previous {
            Some(previous) => previous,
            None => {
                self.previous = Some(sample);
                return Ok(Adjustment::Hold);
            }
        };
        if !sample.dominates(&previous) {
            return Err(LoadError::NonMonotonicSample {
                previous,
                latest: sample,
            });
        }

        self.instantaneous =
            self.cores as f64 * (sample.busy - previous.busy) / (sample.ticks - previous.ticks);

        let capped = hysteresis::clamp_to_threshold(self.available, threshold);
        if capped != self.available {
            debug!("available capped {} -> {} by threshold {threshold}", self.available, capped);
            self.available = capped;
        }

        self.error = self
            .smoother
            .observe(self.instantaneous, sample.time - previous.time);

        let mut adjustment = Adjustment::Hold;
        if self.limiter.is_open(sample.time) {
            adjustment =
                hysteresis::decide(self.smoother.average(), self.error, threshold, self.available);
            if adjustment.changed() {
                self.available = hysteresis::apply(adjustment, self.available);
                self.limiter.arm(sample.time, self.smoother.time_constant());
            }
        }

        self.previous = Some(sample);
        Ok(adjustment)
    }

    pub fn snapshot(&self, threshold: f64) -> Snapshot {
        Snapshot {
            time: self.previous.map_or(0.0, |s| s.time),
            instantaneous: self.instantaneous,
            average: self.average(),
            error: self.error,
            available: self.available,
            threshold,
        }
    }
}

impl<S> LoadEstimator<S> {
    /// Smoothed busy-core count.
    pub fn average(&self) -> f64 {
        self.smoother.average()
    }

    pub fn available(&self) -> u32 {
        self.available
    }

    pub fn instantaneous(&self) -> f64 {
        self.instantaneous
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn mean_square(&self) -> f64 {
        self.smoother.mean_square()
    }

    pub fn core_count(&self) -> u32 {
        self.cores
    }

    pub fn time_constant(&self) -> f64 {
        self.smoother.time_constant()
    }

    pub fn previous(&self) -> Option<Sample> {
        self.previous
    }

    pub fn next_eligible_time(&self) -> f64 {
        self.limiter.next_eligible()
    }
}
