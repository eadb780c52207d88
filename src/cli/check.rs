// SOURCE CHECK -- CAN THIS MACHINE FEED THE ESTIMATOR?
// POLLS THE PLATFORM SOURCE TWICE AND REPORTS WHAT IT SAW.

use std::time::Duration;

use anyhow::Result;

use loadslot::{source, SampleSource};

const CHECK_GAP: Duration = Duration::from_millis(500);

pub fn run_check() -> Result<()> {
    println!("LOADSLOT SOURCE CHECK");
    println!();

    let mut ok = true;
    println!("  {:<24}{}", "platform", std::env::consts::OS);
    println!("  {:<24}{}", "logical cpus", source::core_count());
    match source::clock_ticks_per_second() {
        Some(hz) => println!("  {:<24}{}", "clock ticks/s", hz),
        None => println!("  {:<24}UNKNOWN", "clock ticks/s"),
    }
    println!();

    let mut src = source::platform_source()?;

    let first = match src.poll() {
        Ok(s) => {
            println!("  {:<24}OK (busy={:.0} ticks={:.0})", "first poll", s.busy, s.ticks);
            Some(s)
        }
        Err(e) => {
            println!("  {:<24}FAILED ({})", "first poll", e);
            ok = false;
            None
        }
    };

    std::thread::sleep(CHECK_GAP);

    let second = match src.poll() {
        Ok(s) => {
            println!("  {:<24}OK (busy={:.0} ticks={:.0})", "second poll", s.busy, s.ticks);
            Some(s)
        }
        Err(e) => {
            println!("  {:<24}FAILED ({})", "second poll", e);
            ok = false;
            None
        }
    };

    if let (Some(a), Some(b)) = (first, second) {
        if b.dominates(&a) {
            let pct = (b.busy - a.busy) / (b.ticks - a.ticks) * 100.0;
            println!("  {:<24}{:.1}% over {:.0}ms", "utilization", pct, (b.time - a.time) * 1000.0);
        } else {
            // AN IDLE MACHINE CAN LEGITIMATELY NOT MOVE busy IN 500MS
            println!("  {:<24}NOT ADVANCING (sample would be skipped)", "utilization");
        }
    }
    println!();

    if ok {
        println!("ALL CHECKS PASSED");
    } else {
        println!("SOME CHECKS FAILED");
        std::process::exit(1);
    }

    Ok(())
}
