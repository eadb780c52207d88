// LOADSLOT ESTIMATOR TESTS
// SAMPLE GATING, SMOOTHING CONVERGENCE, ERROR BAND, RATE LIMIT, SCENARIOS
//
// ALL TESTS DRIVE THE ESTIMATOR WITH SYNTHETIC COUNTERS. NO /proc, RUN OFFLINE.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use loadslot::{
    Adjustment, EstimatorConfig, LoadError, LoadEstimator, LoadResult, Sample,
    SampleSource,
};

// --- SYNTHETIC SOURCE ---

type Queue = Rc<RefCell<VecDeque<LoadResult<Sample>>>>;

// SHARED QUEUE: THE TEST PUSHES, THE ESTIMATOR POLLS
fn feed() -> (Queue, impl FnMut() -> LoadResult<Sample>) {
    let queue: Queue = Rc::new(RefCell::new(VecDeque::new()));
    let polled = Rc::clone(&queue);
    let source = move || {
        polled
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(LoadError::SourceUnavailable("feed empty".to_string())))
    };
    (queue, source)
}

// CUMULATIVE COUNTERS ADVANCING AT 1000 TICKS PER SECOND
#[derive(Clone, Copy)]
struct Sim {
    busy: f64,
    ticks: f64,
    time: f64,
}

const TICK_RATE: f64 = 1000.0;
// BUSY MUST STRICTLY ADVANCE, SO "IDLE" IS A TRICKLE
const IDLE: f64 = 0.001;

impl Sim {
    fn at(time: f64) -> Self {
        Self { busy: 1_000.0, ticks: 10_000.0, time }
    }

    fn sample(&self) -> Sample {
        Sample::new(self.busy, self.ticks, self.time)
    }

    // ADVANCE dt SECONDS WITH THE GIVEN BUSY FRACTION (0..=1)
    fn step(&mut self, dt: f64, util: f64) -> Sample {
        self.ticks += dt * TICK_RATE;
        self.busy += dt * TICK_RATE * util;
        self.time += dt;
        self.sample()
    }
}

fn estimator(
    cores: u32,
    time_constant: f64,
    start: Sample,
) -> (Queue, LoadEstimator<impl FnMut() -> LoadResult<Sample>>) {
    let (queue, source) = feed();
    queue.borrow_mut().push_back(Ok(start));
    let config = EstimatorConfig {
        time_constant,
        cores: Some(cores),
    };
    let est = LoadEstimator::new(config, source).unwrap();
    (queue, est)
}

fn push(queue: &Queue, sample: Sample) {
    queue.borrow_mut().push_back(Ok(sample));
}

// TINY DETERMINISTIC LCG FOR PSEUDO-RANDOM LOAD
struct Lcg(u64);

impl Lcg {
    fn next_unit(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

// === SAMPLE GATING ===

#[test]
fn non_monotonic_samples_leave_state_untouched() {
    let mut sim = Sim::at(100.0);
    let (queue, mut est) = estimator(4, 3.0, sim.sample());

    // WARM UP SO THE STATE IS NOT JUST THE SEED
    for _ in 0..5 {
        push(&queue, sim.step(1.0, 0.5));
        est.update(4.0);
    }
    let last = sim.sample();

    let stale = [
        Sample::new(last.busy, last.ticks + 10.0, last.time + 1.0),  // BUSY FLAT
        Sample::new(last.busy + 10.0, last.ticks, last.time + 1.0),  // TICKS FLAT
        Sample::new(last.busy + 10.0, last.ticks + 20.0, last.time), // TIME FLAT
        Sample::new(last.busy + 10.0, last.ticks - 5.0, last.time + 1.0), // TICKS WRAPPED
        Sample::new(last.busy + 10.0, last.ticks + 20.0, last.time - 1.0), // CLOCK STEPPED BACK
    ];

    for bad in stale {
        let (average, available, mean_square, error) =
            (est.average(), est.available(), est.mean_square(), est.error());
        let next = est.next_eligible_time();

        push(&queue, bad);
        assert!(!est.update(4.0), "accepted {bad:?}");

        assert_eq!(est.average(), average);
        assert_eq!(est.available(), available);
        assert_eq!(est.mean_square(), mean_square);
        assert_eq!(est.error(), error);
        assert_eq!(est.next_eligible_time(), next);
        assert_eq!(est.previous(), Some(last));
    }
}

#[test]
fn try_update_reports_non_monotonic_sample() {
    let sim = Sim::at(10.0);
    let (queue, mut est) = estimator(2, 3.0, sim.sample());
    push(&queue, sim.sample());

    match est.try_update(2.0) {
        Err(LoadError::NonMonotonicSample { previous, latest }) => {
            assert_eq!(previous, sim.sample());
            assert_eq!(latest, sim.sample());
        }
        other => panic!("expected NonMonotonicSample, got {other:?}"),
    }
}

#[test]
fn source_failure_is_a_skipped_cycle() {
    let mut sim = Sim::at(0.0);
    let (queue, mut est) = estimator(4, 3.0, sim.sample());
    let average = est.average();

    // EMPTY FEED = FAILING SOURCE
    assert!(!est.update(4.0));
    assert!(matches!(est.try_update(4.0), Err(LoadError::SourceUnavailable(_))));
    assert_eq!(est.average(), average);
    assert_eq!(est.previous(), Some(sim.sample()));

    // NEXT GOOD SAMPLE MEASURED AGAINST THE ORIGINAL BASELINE
    push(&queue, sim.step(2.0, 0.25));
    est.update(4.0);
    assert!((est.instantaneous() - 1.0).abs() < 1e-12);
}

// === SMOOTHING ===

#[test]
fn instantaneous_is_scaled_by_core_count() {
    let mut sim = Sim::at(0.0);
    let (queue, mut est) = estimator(8, 3.0, sim.sample());
    push(&queue, sim.step(1.0, 0.5));
    est.update(8.0);
    assert!((est.instantaneous() - 4.0).abs() < 1e-12);
}

#[test]
fn average_converges_to_constant_load() {
    let mut sim = Sim::at(0.0);
    let (queue, mut est) = estimator(4, 3.0, sim.sample());

    // 25% OF 4 CORES = 1 BUSY CORE
    for _ in 0..200 {
        push(&queue, sim.step(1.0, 0.25));
        est.update(4.0);
    }
    assert!((est.average() - 1.0).abs() < 1e-9, "average {}", est.average());
    assert!(est.error() < 1e-6, "error {}", est.error());
}

#[test]
fn convergence_is_geometric() {
    let mut sim = Sim::at(0.0);
    let (queue, mut est) = estimator(4, 3.0, sim.sample());
    let x = (-1.0f64 / 3.0).exp();

    // SEED 4.0, TARGET 2.0: GAP SHRINKS BY x EVERY SECOND
    let mut gap = 2.0;
    for _ in 0..10 {
        push(&queue, sim.step(1.0, 0.5));
        est.update(4.0);
        gap *= x;
        assert!((est.average() - (2.0 + gap)).abs() < 1e-9);
    }
}

#[test]
fn error_band_never_negative_or_nan() {
    let mut sim = Sim::at(0.0);
    let (queue, mut est) = estimator(16, 0.5, sim.sample());
    let mut rng = Lcg(42);

    for i in 0..2000 {
        // MIX OF NOISE AND LONG FLAT STRETCHES (WHERE ROUNDING BITES)
        let util = if i % 400 < 200 { 0.75 } else { rng.next_unit().max(IDLE) };
        let dt = 0.05 + rng.next_unit();
        push(&queue, sim.step(dt, util));
        est.update(8.0);

        assert!(est.error() >= 0.0);
        assert!(!est.error().is_nan());
        assert!(est.mean_square() - est.average() * est.average() >= -1e-9);
        assert!(est.average() >= 0.0);
    }
}

// === HYSTERESIS ===

#[test]
fn at_most_one_change_per_time_constant() {
    let tau = 3.0;
    let mut sim = Sim::at(0.0);
    let (queue, mut est) = estimator(4, tau, sim.sample());
    let mut changes: Vec<f64> = Vec::new();

    // 15S FULLY BUSY / 15S IDLE, POLLED AT 10HZ
    for i in 0..1200 {
        let util = if (i / 150) % 2 == 0 { 1.0 } else { IDLE };
        let s = sim.step(0.1, util);
        push(&queue, s);
        if est.update(2.0) {
            changes.push(s.time);
        }
    }

    assert!(changes.len() >= 4, "too few changes to be meaningful: {changes:?}");
    for pair in changes.windows(2) {
        assert!(pair[1] - pair[0] > tau - 1e-9, "changes too close: {pair:?}");
    }
}

#[test]
fn available_bounded_by_integer_threshold() {
    let mut sim = Sim::at(0.0);
    let (queue, mut est) = estimator(8, 1.0, sim.sample());
    let mut rng = Lcg(7);

    for i in 0..3000 {
        let threshold = ((i / 100) % 7) as f64;
        let util = rng.next_unit().max(IDLE);
        push(&queue, sim.step(0.25, util));
        let before = est.available();
        est.update(threshold);

        assert!(est.available() as f64 <= threshold, "available {} > {threshold}", est.available());
        // ONE STEP AT MOST, ON TOP OF THE CEILING CLAMP
        let capped = before.min(threshold as u32);
        assert!(est.available().abs_diff(capped) <= 1);
    }
}

#[test]
fn threshold_clamp_alone_is_not_a_change() {
    let mut sim = Sim::at(100.0);
    let (queue, mut est) = estimator(4, 3.0, sim.sample());

    push(&queue, sim.step(1.0, 1.0));
    assert!(est.update(2.0)); // CLAMP 4 -> 2, THEN SHED -> 1
    assert_eq!(est.available(), 1);

    // INSIDE THE RATE-LIMIT WINDOW: CEILING STILL APPLIES, NO STEP
    push(&queue, sim.step(1.0, 1.0));
    assert_eq!(est.try_update(0.0).unwrap(), Adjustment::Hold);
    assert_eq!(est.available(), 0);
}

#[test]
fn negative_threshold_floors_available_at_zero() {
    let mut sim = Sim::at(0.0);
    let (queue, mut est) = estimator(4, 3.0, sim.sample());
    push(&queue, sim.step(1.0, 0.5));
    est.update(-3.0);
    assert_eq!(est.available(), 0);
}

#[test]
fn nan_threshold_floors_available_at_zero() {
    let mut sim = Sim::at(0.0);
    let (queue, mut est) = estimator(4, 3.0, sim.sample());
    push(&queue, sim.step(1.0, 0.5));
    est.update(f64::NAN);
    assert_eq!(est.available(), 0);
}

#[test]
fn negative_clock_still_adjusts() {
    // SAME LOAD AS THE SATURATED SCENARIO, CLOCK RUNNING FROM T=-100
    let mut sim = Sim::at(-100.0);
    let (queue, mut est) = estimator(4, 3.0, sim.sample());
    let mut changes = Vec::new();

    for _ in 0..20 {
        let s = sim.step(1.0, 1.0);
        push(&queue, s);
        if est.update(2.0) {
            changes.push((s.time, est.available()));
        }
    }

    assert_eq!(changes, vec![(-99.0, 1), (-95.0, 0)]);
    assert_eq!(est.available(), 0);
}

#[test]
fn boxed_source_drives_estimator() {
    let mut sim = Sim::at(0.0);
    let mut samples = vec![sim.sample(), sim.step(1.0, 1.0)].into_iter();
    let source: Box<dyn SampleSource + Send> = Box::new(move || -> LoadResult<Sample> {
        samples
            .next()
            .ok_or_else(|| LoadError::SourceUnavailable("drained".to_string()))
    });
    let config = EstimatorConfig {
        time_constant: 3.0,
        cores: Some(4),
    };
    let mut est = LoadEstimator::new(config, source).unwrap();

    assert!(est.update(2.0));
    assert_eq!(est.available(), 1);
    assert!((est.instantaneous() - 4.0).abs() < 1e-9);
    assert!(!est.update(2.0));
}

// === SCENARIOS ===

#[test]
fn scenario_idle_at_ceiling_stays_put() {
    // 4 CORES, TAU 3S, IDLE FOR 10S AT 1HZ, THRESHOLD 4
    let mut sim = Sim::at(0.0);
    let (queue, mut est) = estimator(4, 3.0, sim.sample());

    for _ in 0..10 {
        push(&queue, sim.step(1.0, IDLE));
        assert!(!est.update(4.0));
        assert_eq!(est.available(), 4);
    }
    assert!(est.average() < 1.0);
}

#[test]
fn scenario_saturated_sheds_one_slot_per_window() {
    // 4 CORES FULLY BUSY, THRESHOLD 2, TAU 3S, 1HZ FROM T=100
    let mut sim = Sim::at(100.0);
    let (queue, mut est) = estimator(4, 3.0, sim.sample());
    let mut changes = Vec::new();

    for _ in 0..20 {
        let s = sim.step(1.0, 1.0);
        push(&queue, s);
        if est.update(2.0) {
            changes.push((s.time, est.available()));
        }
    }

    // CLAMPED 4 -> 2 AND SHED AT T=101, NEXT WINDOW OPENS STRICTLY AFTER T=104
    assert_eq!(changes, vec![(101.0, 1), (105.0, 0)]);
    assert_eq!(est.available(), 0);
    assert!((est.average() - 4.0).abs() < 1e-9);

    // FLOOR: FURTHER SHED ATTEMPTS ARE NO-OPS
    push(&queue, sim.step(10.0, 1.0));
    assert_eq!(est.try_update(2.0).unwrap(), Adjustment::Hold);
    assert_eq!(est.available(), 0);
}

#[test]
fn scenario_recovers_slots_after_load_drops() {
    let mut sim = Sim::at(0.0);
    let (queue, mut est) = estimator(4, 3.0, sim.sample());

    for _ in 0..20 {
        push(&queue, sim.step(1.0, 1.0));
        est.update(2.0);
    }
    assert_eq!(est.available(), 0);

    for _ in 0..40 {
        push(&queue, sim.step(1.0, IDLE));
        est.update(2.0);
    }
    // GRANTED BACK UP TO THE THRESHOLD, NEVER PAST IT
    assert_eq!(est.available(), 2);
}

#[test]
fn scenario_corrupted_sample_does_not_poison_delta() {
    let start = Sim::at(50.0);

    let mut sim = start;
    let good1 = sim.step(1.0, 0.5);
    let good2 = sim.step(1.0, 0.75);
    let wrapped = Sample::new(good1.busy + 5.0, good1.ticks - 9_000.0, good1.time + 0.5);

    // REFERENCE: NEVER SAW THE CORRUPTED SAMPLE
    let (q_ref, mut reference) = estimator(4, 3.0, start.sample());
    push(&q_ref, good1);
    reference.update(3.0);
    push(&q_ref, good2);
    reference.update(3.0);

    let (q, mut est) = estimator(4, 3.0, start.sample());
    push(&q, good1);
    est.update(3.0);
    let before = (est.average(), est.available());

    push(&q, wrapped);
    assert!(!est.update(3.0));
    assert_eq!((est.average(), est.available()), before);
    assert_eq!(est.previous(), Some(good1));

    push(&q, good2);
    est.update(3.0);

    assert_eq!(est.previous(), Some(good2));
    assert_eq!(est.average(), reference.average());
    assert_eq!(est.mean_square(), reference.mean_square());
    assert_eq!(est.available(), reference.available());
    assert!((est.instantaneous() - 3.0).abs() < 1e-12); // 75% OF 4 CORES VS good1
}

// === CONFIGURATION ===

#[test]
fn invalid_time_constant_fails_fast() {
    let (_queue, source) = feed();
    let r = LoadEstimator::new(EstimatorConfig::with_time_constant(0.0), source);
    assert!(matches!(r, Err(LoadError::InvalidConfiguration(_))));
}

#[test]
fn default_config_detects_cores() {
    let (queue, source) = feed();
    queue.borrow_mut().push_back(Ok(Sim::at(0.0).sample()));
    let est = LoadEstimator::with_defaults(source).unwrap();
    assert!(est.core_count() >= 1);
    assert_eq!(est.available(), est.core_count());
    assert_eq!(est.average(), est.core_count() as f64);
    assert_eq!(est.time_constant(), 3.0);
}
