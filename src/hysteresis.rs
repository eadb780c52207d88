// LOADSLOT HYSTERESIS RULES
// PURE FUNCTIONS: ZERO OS DEPENDENCIES, TESTABLE OFFLINE.
//
// ASYMMETRIC DEAD ZONE AROUND THE THRESHOLD, MEASURED IN ERROR BANDS:
//   SHED A SLOT:  AVERAGE > THRESHOLD + 1 BAND   (ROUGHLY 2:1 ODDS)
//   GRANT A SLOT: AVERAGE < THRESHOLD - 2 BANDS  (MUCH STRONGER EVIDENCE)
// INSIDE THE ZONE NOTHING MOVES. AT MOST ONE STEP PER TIME CONSTANT.

pub const SHED_MARGIN_BANDS: f64 = 1.0;
pub const GRANT_MARGIN_BANDS: f64 = 2.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Adjustment {
    Shed,  // GIVE ONE SLOT BACK
    Grant, // ADMIT ONE MORE SLOT
    Hold,
}

impl Adjustment {
    pub fn label(self) -> &'static str {
        match self {
            Self::Shed => "SHED",
            Self::Grant => "GRANT",
            Self::Hold => "HOLD",
        }
    }

    pub fn changed(self) -> bool {
        self != Self::Hold
    }
}

// DECISION
// SHED IS CHECKED FIRST AND WINS: OVER-ADMITTING STARVES RUNNING WORK.

pub fn decide(average: f64, error: f64, threshold: f64, available: u32) -> Adjustment {
    if average > threshold + SHED_MARGIN_BANDS * error && available > 0 {
        Adjustment::Shed
    } else if average < threshold - GRANT_MARGIN_BANDS * error && (available as f64) < threshold {
        Adjustment::Grant
    } else {
        Adjustment::Hold
    }
}

pub fn apply(adjustment: Adjustment, available: u32) -> u32 {
    match adjustment {
        Adjustment::Shed => available.saturating_sub(1),
        Adjustment::Grant => available + 1,
        Adjustment::Hold => available,
    }
}

// CEILING
// THE THRESHOLD CAPS AVAILABLE DIRECTLY. FRACTIONAL THRESHOLDS TRUNCATE,
// NEGATIVE AND NaN THRESHOLDS FLOOR AT ZERO.

pub fn clamp_to_threshold(available: u32, threshold: f64) -> u32 {
    if threshold.is_nan() || (available as f64) > threshold {
        threshold.max(0.0) as u32
    } else {
        available
    }
}

// RATE LIMIT
// STARTS OPEN FOR ANY CLOCK. SAMPLE TIMES MAY BE NEGATIVE.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateLimiter {
    next_eligible: f64,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            next_eligible: f64::NEG_INFINITY,
        }
    }

    // STRICTLY AFTER THE ARMED DEADLINE
    pub fn is_open(&self, now: f64) -> bool {
        now > self.next_eligible
    }

    pub fn arm(&mut self, now: f64, period: f64) {
        self.next_eligible = now + period;
    }

    pub fn next_eligible(&self) -> f64 {
        self.next_eligible
    }
}
