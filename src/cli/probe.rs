// RAW SAMPLE PROBE -- PRINTS ONE {time busy ticks} LINE PER POLL
// PLUS THE UTILIZATION SINCE THE PREVIOUS LINE. CTRL+C TO STOP.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;

use loadslot::{source, Sample, SampleSource};

static RUNNING: AtomicBool = AtomicBool::new(true);

pub fn run_probe(interval: Duration) -> Result<()> {
    ctrlc::set_handler(move || {
        RUNNING.store(false, Ordering::Relaxed);
    })?;

    let mut src = source::platform_source()?;
    let mut prev: Option<Sample> = None;

    println!("{:<16} {:<16} {:<16} {:<8}", "TIME_S", "BUSY", "TICKS", "UTIL%");
    while RUNNING.load(Ordering::Relaxed) {
        match src.poll() {
            Ok(s) => {
                let util = match prev {
                    Some(p) if s.dominates(&p) => {
                        format!("{:.1}", (s.busy - p.busy) / (s.ticks - p.ticks) * 100.0)
                    }
                    Some(_) => "SKIP".to_string(),
                    None => "-".to_string(),
                };
                println!("{:<16.3} {:<16.0} {:<16.0} {:<8}", s.time, s.busy, s.ticks, util);
                prev = Some(s);
            }
            Err(e) => eprintln!("poll failed: {e}"),
        }
        std::thread::sleep(interval);
    }

    Ok(())
}
