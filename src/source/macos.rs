// MACOS: host_processor_info(PROCESSOR_CPU_LOAD_INFO)
// PER-CPU TICK ARRAYS, SUMMED ACROSS CPUS. THE KERNEL HANDS BACK A
// VM ALLOCATION THAT MUST BE RETURNED WITH vm_deallocate.

#![allow(deprecated)] // libc mach bindings point at the mach2 crate

use super::{now_secs, Sample, SampleSource};
use crate::error::{LoadError, LoadResult};

#[derive(Default)]
pub struct HostProcessorInfo;

impl SampleSource for HostProcessorInfo {
    fn poll(&mut self) -> LoadResult<Sample> {
        let time = now_secs();
        let mut cpu_count: libc::natural_t = 0;
        let mut info: libc::processor_info_array_t = std::ptr::null_mut();
        let mut info_len: libc::mach_msg_type_number_t = 0;

        let rc = unsafe {
            libc::host_processor_info(
                libc::mach_host_self(),
                libc::PROCESSOR_CPU_LOAD_INFO,
                &mut cpu_count,
                &mut info,
                &mut info_len,
            )
        };
        if rc != libc::KERN_SUCCESS {
            return Err(LoadError::SourceUnavailable(format!(
                "host_processor_info failed: kern_return {rc}"
            )));
        }

        let loads = unsafe {
            std::slice::from_raw_parts(
                info as *const libc::processor_cpu_load_info,
                cpu_count as usize,
            )
        };
        let mut busy = 0.0;
        let mut idle = 0.0;
        for cpu in loads {
            busy += cpu.cpu_ticks[libc::CPU_STATE_USER as usize] as f64
                + cpu.cpu_ticks[libc::CPU_STATE_SYSTEM as usize] as f64
                + cpu.cpu_ticks[libc::CPU_STATE_NICE as usize] as f64;
            idle += cpu.cpu_ticks[libc::CPU_STATE_IDLE as usize] as f64;
        }

        unsafe {
            libc::vm_deallocate(
                libc::mach_task_self(),
                info as libc::vm_address_t,
                (info_len as usize * std::mem::size_of::<libc::integer_t>()) as libc::vm_size_t,
            );
        }

        Ok(Sample {
            busy,
            ticks: busy + idle,
            time,
        })
    }
}
