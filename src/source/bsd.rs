// FREEBSD / DRAGONFLY: sysctl kern.cp_time
// FIVE AGGREGATE STATES: user nice system interrupt idle. UNIT: STATCLOCK TICKS.

use super::{now_secs, Sample, SampleSource};
use crate::error::LoadResult;

const CPUSTATES: usize = 5;

#[derive(Default)]
pub struct CpTime;

impl SampleSource for CpTime {
    fn poll(&mut self) -> LoadResult<Sample> {
        let time = now_secs();
        let mut states = [0 as libc::c_long; CPUSTATES];
        let mut len = std::mem::size_of_val(&states);
        let rc = unsafe {
            libc::sysctlbyname(
                c"kern.cp_time".as_ptr(),
                states.as_mut_ptr().cast(),
                &mut len,
                std::ptr::null(),
                0,
            )
        };
        if rc != 0 {
            return Err(std::io::Error::last_os_error().into());
        }

        let [user, nice, system, interrupt, idle] = states;
        let busy = (user + nice + system + interrupt) as f64;
        Ok(Sample {
            busy,
            ticks: busy + idle as f64,
            time,
        })
    }
}
