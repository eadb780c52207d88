// LOADSLOT SAMPLE SOURCES
// ONE CAPABILITY: poll() -> {busy, ticks, time}. PLATFORM VARIANTS BELOW
// ARE SELECTED AT COMPILE TIME AND NEVER LEAK INTO THE ESTIMATOR.

#[cfg(any(target_os = "linux", target_os = "android"))]
mod linux;
#[cfg(any(target_os = "freebsd", target_os = "dragonfly"))]
mod bsd;
#[cfg(any(target_os = "macos", target_os = "ios"))]
mod macos;
#[cfg(windows)]
mod windows;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub use linux::{parse_proc_stat, ProcStat, PROC_STAT_PATH};

use crate::error::LoadResult;

// ONE READING OF THE CUMULATIVE CPU COUNTERS
// busy AND ticks SHARE A UNIT FOR THE LIFETIME OF A SOURCE.
// time IS SECONDS SINCE AN ARBITRARY EPOCH AND MAY BE NEGATIVE.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sample {
    pub busy: f64,
    pub ticks: f64,
    pub time: f64,
}

impl Sample {
    pub fn new(busy: f64, ticks: f64, time: f64) -> Self {
        Self { busy, ticks, time }
    }

    // EVERY FIELD STRICTLY ADVANCED. FAILS ON COUNTER RESET, WRAPAROUND,
    // CLOCK SKEW OR TWO POLLS INSIDE ONE COUNTER TICK.
    pub fn dominates(&self, previous: &Sample) -> bool {
        self.ticks > previous.ticks && self.busy > previous.busy && self.time > previous.time
    }
}

pub trait SampleSource {
    fn poll(&mut self) -> LoadResult<Sample>;
}

impl<F> SampleSource for F
where
    F: FnMut() -> LoadResult<Sample>,
{
    fn poll(&mut self) -> LoadResult<Sample> {
        self()
    }
}

// RUNTIME-CHOSEN SOURCES. A GENERIC Box<S> WOULD OVERLAP THE CLOSURE IMPL
// BECAUSE A BOXED CLOSURE IS ITSELF FnMut.
impl SampleSource for Box<dyn SampleSource + Send> {
    fn poll(&mut self) -> LoadResult<Sample> {
        (**self).poll()
    }
}

// PLATFORM SELECTION

#[cfg(any(target_os = "linux", target_os = "android"))]
pub type PlatformSource = linux::ProcStat;
#[cfg(any(target_os = "freebsd", target_os = "dragonfly"))]
pub type PlatformSource = bsd::CpTime;
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub type PlatformSource = macos::HostProcessorInfo;
#[cfg(windows)]
pub type PlatformSource = windows::SystemTimes;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn platform_source() -> LoadResult<PlatformSource> {
    linux::ProcStat::new()
}

#[cfg(any(
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "macos",
    target_os = "ios",
    windows,
))]
pub fn platform_source() -> LoadResult<PlatformSource> {
    Ok(PlatformSource::default())
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "macos",
    target_os = "ios",
    windows,
)))]
mod unsupported {
    use super::{Sample, SampleSource};
    use crate::error::{LoadError, LoadResult};

    // EVERY POLL FAILS, SO THE ESTIMATOR JUST NEVER MOVES
    pub struct Unsupported;

    impl SampleSource for Unsupported {
        fn poll(&mut self) -> LoadResult<Sample> {
            Err(LoadError::SourceUnavailable(format!(
                "no cpu counter reader for {}",
                std::env::consts::OS
            )))
        }
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "macos",
    target_os = "ios",
    windows,
)))]
pub type PlatformSource = unsupported::Unsupported;

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "macos",
    target_os = "ios",
    windows,
)))]
pub fn platform_source() -> LoadResult<PlatformSource> {
    Ok(unsupported::Unsupported)
}

// CLOCK

// MONOTONIC SECONDS SINCE AN ARBITRARY EPOCH
#[cfg(unix)]
pub fn now_secs() -> f64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    ts.tv_sec as f64 + ts.tv_nsec as f64 * 1e-9
}

#[cfg(not(unix))]
pub fn now_secs() -> f64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_secs_f64()
}

// TOPOLOGY

// LOGICAL CPUS VISIBLE TO THIS PROCESS, NEVER LESS THAN ONE
pub fn core_count() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
        .max(1)
}

// KERNEL CLOCK TICKS PER SECOND (USER_HZ), IF THE PLATFORM REPORTS IT
#[cfg(unix)]
pub fn clock_ticks_per_second() -> Option<u64> {
    let hz = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if hz > 0 {
        Some(hz as u64)
    } else {
        None
    }
}

#[cfg(not(unix))]
pub fn clock_ticks_per_second() -> Option<u64> {
    None
}
