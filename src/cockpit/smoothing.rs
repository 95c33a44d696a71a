//! Asymmetric exponential smoothing: `α = 1 − exp(−ln2·Δt/half_life)`, with
//! a distinct half-life depending on whether the signal is rising or falling.

#[derive(Debug, Clone, Copy)]
pub struct AsymmetricEma {
    rise_half_life: f64,
    fall_half_life: f64,
    value: Option<f64>,
}

impl AsymmetricEma {
    pub fn new(rise_half_life: f64, fall_half_life: f64) -> Self {
        AsymmetricEma {
            rise_half_life,
            fall_half_life,
            value: None,
        }
    }

    /// First call seeds the smoothed value directly — no easing artifact.
    pub fn advance(&mut self, target: f64, delta_time: f64) -> f64 {
        let smoothed = match self.value {
            None => target,
            Some(current) => {
                let half_life = if target >= current {
                    self.rise_half_life
                } else {
                    self.fall_half_life
                };
                let alpha = if half_life > 0.0 {
                    1.0 - (-std::f64::consts::LN_2 * delta_time / half_life).exp()
                } else {
                    1.0
                };
                let alpha = alpha.clamp(0.0, 1.0);
                current + alpha * (target - current)
            }
        };
        self.value = Some(smoothed);
        smoothed
    }

    pub fn current(&self) -> Option<f64> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_seeds_value_with_no_easing() {
        let mut ema = AsymmetricEma::new(1.0, 2.0);
        assert_eq!(ema.advance(42.0, 0.1), 42.0);
    }

    #[test]
    fn rising_signal_uses_rise_half_life() {
        let mut ema = AsymmetricEma::new(0.1, 100.0);
        ema.advance(0.0, 1.0);
        let next = ema.advance(100.0, 0.1);
        // Short rise half-life should move close to target quickly.
        assert!(next > 50.0);
    }

    #[test]
    fn falling_signal_uses_fall_half_life() {
        let mut ema = AsymmetricEma::new(100.0, 0.1);
        ema.advance(100.0, 1.0);
        let next = ema.advance(0.0, 0.1);
        assert!(next < 50.0);
    }

    #[test]
    fn converges_towards_target_over_many_ticks() {
        let mut ema = AsymmetricEma::new(1.0, 1.0);
        ema.advance(0.0, 1.0);
        for _ in 0..50 {
            ema.advance(80.0, 0.5);
        }
        assert!((ema.current().unwrap() - 80.0).abs() < 1.0);
    }
}
