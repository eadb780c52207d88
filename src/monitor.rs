// LOADSLOT MONITOR LOOP
// FIXED-CADENCE CONTROL LOOP ON THE MAIN THREAD:
//   SLEEP -> update() -> PRINT TELEMETRY -> RECORD SNAPSHOT.
// SOURCE FAILURES ARE SKIPPED CYCLES, NEVER FATAL.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info, warn};

use loadslot::event::EventLog;
use loadslot::{LoadError, LoadEstimator, SampleSource};

pub struct MonitorSettings {
    pub threshold: f64,
    pub interval: Duration,
    pub max_ticks: Option<u64>,
    pub verbose: bool,
}

pub fn monitor_loop<S: SampleSource>(
    estimator: &mut LoadEstimator<S>,
    settings: &MonitorSettings,
    log: &mut EventLog,
    shutdown: &AtomicBool,
) {
    let threshold = settings.threshold;
    let mut tick_counter: u64 = 0;
    let mut skipped: u64 = 0;
    let mut source_down = false;

    log.record(estimator.snapshot(threshold));

    while !shutdown.load(Ordering::Relaxed) {
        if settings.max_ticks.is_some_and(|max| tick_counter >= max) {
            break;
        }
        std::thread::sleep(settings.interval);
        tick_counter += 1;

        let adjustment = match estimator.try_update(threshold) {
            Ok(adjustment) => {
                if source_down {
                    info!("sample source recovered");
                    source_down = false;
                }
                adjustment
            }
            Err(LoadError::SourceUnavailable(reason)) => {
                // WARN ONCE PER OUTAGE, NOT ONCE PER TICK
                if !source_down {
                    warn!("sample source unavailable: {reason}");
                    source_down = true;
                }
                skipped += 1;
                continue;
            }
            Err(e) => {
                debug!("{e}");
                skipped += 1;
                continue;
            }
        };

        if adjustment.changed() {
            info!(
                "{}: available {} (average {:.2} +/- {:.2}, threshold {})",
                adjustment.label(),
                estimator.available(),
                estimator.average(),
                estimator.error(),
                threshold,
            );
        }

        if settings.verbose {
            println!(
                "load: {:<7.3} inst: {:<7.3} err: {:<7.3} avail: {:<3} next: {:.1} [{}]",
                estimator.average(), estimator.instantaneous(), estimator.error(),
                estimator.available(), estimator.next_eligible_time(), adjustment.label(),
            );
        } else {
            println!(
                "Load Average: {:.3}   Available Load: {}",
                estimator.average(), estimator.available(),
            );
        }

        log.record(estimator.snapshot(threshold));
    }

    // FINAL STATE: CAPTURED BY SCRIPTS WRAPPING THE DEMO
    println!(
        "[SLOTS] available={} average={:.3} error={:.3} threshold={} polls={} skipped={}",
        estimator.available(), estimator.average(), estimator.error(),
        threshold, tick_counter, skipped,
    );
}
