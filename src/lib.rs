// LOADSLOT LIBRARY
// CPU LOAD ESTIMATION AND HYSTERESIS ADMISSION CONTROL
//
// PURE-RUST CORE: SMOOTHING + HYSTERESIS MATH HAS NO OS DEPENDENCIES.
// PLATFORM COUNTER READERS LIVE BEHIND source::SampleSource.

pub mod error;
pub mod estimator;
pub mod event;
pub mod hysteresis;
pub mod smoothing;
pub mod source;

pub use error::{LoadError, LoadResult};
pub use estimator::{EstimatorConfig, LoadEstimator, DEFAULT_TIME_CONSTANT};
pub use hysteresis::Adjustment;
pub use source::{Sample, SampleSource};
