// LOADSLOT EXPONENTIAL SMOOTHER
// TRACKS FIRST AND SECOND MOMENTS OF A NOISY SIGNAL WITH A
// TIME-WEIGHTED DECAY exp(-dt / tau). IRREGULAR SAMPLE SPACING IS FINE.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Smoother {
    time_constant: f64,
    average: f64,
    mean_square: f64,
}

impl Smoother {
    // START WIDE: mean_square = seed + seed^2 LEAVES A VARIANCE OF seed
    pub fn seeded(time_constant: f64, seed: f64) -> Self {
        Self {
            time_constant,
            average: seed,
            mean_square: seed + seed * seed,
        }
    }

    // WEIGHT KEPT BY HISTORY AFTER dt SECONDS
    pub fn decay(&self, dt: f64) -> f64 {
        (-dt / self.time_constant).exp()
    }

    // FOLD IN ONE OBSERVATION dt SECONDS AFTER THE LAST, RETURN THE NEW BAND
    pub fn observe(&mut self, value: f64, dt: f64) -> f64 {
        let x = self.decay(dt);
        self.average = x * self.average + (1.0 - x) * value;
        self.mean_square = x * self.mean_square + (1.0 - x) * value * value;
        self.error()
    }

    // ONE STANDARD DEVIATION. mean_square CAN DIP A HAIR UNDER average^2
    // FROM ROUNDING, SO CLAMP BEFORE THE ROOT.
    pub fn error(&self) -> f64 {
        (self.mean_square - self.average * self.average).max(0.0).sqrt()
    }

    pub fn average(&self) -> f64 {
        self.average
    }

    pub fn mean_square(&self) -> f64 {
        self.mean_square
    }

    pub fn time_constant(&self) -> f64 {
        self.time_constant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_gives_nonzero_band() {
        let s = Smoother::seeded(3.0, 4.0);
        assert_eq!(s.average(), 4.0);
        assert_eq!(s.mean_square(), 20.0);
        assert_eq!(s.error(), 2.0);
    }

    #[test]
    fn decay_matches_time_constant() {
        let s = Smoother::seeded(3.0, 1.0);
        assert!((s.decay(3.0) - (-1.0f64).exp()).abs() < 1e-12);
        assert_eq!(s.decay(0.0), 1.0);
    }

    #[test]
    fn observe_moves_toward_value() {
        let mut s = Smoother::seeded(3.0, 4.0);
        s.observe(0.0, 1.0);
        assert!(s.average() < 4.0 && s.average() > 0.0);
    }

    #[test]
    fn error_clamped_when_mean_square_underflows() {
        let s = Smoother {
            time_constant: 1.0,
            average: 1.0,
            mean_square: 1.0 - 1e-15,
        };
        assert_eq!(s.error(), 0.0);
    }
}
