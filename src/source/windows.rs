// WINDOWS: GetSystemTimes
// KERNEL TIME ALREADY INCLUDES IDLE TIME. UNIT: 100NS INTERVALS.

use super::{now_secs, Sample, SampleSource};
use crate::error::LoadResult;

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct FileTime {
    low: u32,
    high: u32,
}

impl FileTime {
    fn as_f64(self) -> f64 {
        ((self.high as u64) << 32 | self.low as u64) as f64
    }
}

extern "system" {
    fn GetSystemTimes(idle: *mut FileTime, kernel: *mut FileTime, user: *mut FileTime) -> i32;
}

#[derive(Default)]
pub struct SystemTimes;

impl SampleSource for SystemTimes {
    fn poll(&mut self) -> LoadResult<Sample> {
        let time = now_secs();
        let mut idle = FileTime::default();
        let mut kernel = FileTime::default();
        let mut user = FileTime::default();
        if unsafe { GetSystemTimes(&mut idle, &mut kernel, &mut user) } == 0 {
            return Err(std::io::Error::last_os_error().into());
        }

        let ticks = kernel.as_f64() + user.as_f64();
        Ok(Sample {
            busy: ticks - idle.as_f64(),
            ticks,
            time,
        })
    }
}
