//! Time based interpolation of a single value, used for one-shot animations triggered
//! from the debug panel.

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Ease {
    Linear,
    /// Quadratic ease out, the default of most tweening libraries.
    #[default]
    Power1Out,
    Power2InOut,
}

impl Ease {
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::Power1Out => 1.0 - (1.0 - t) * (1.0 - t),
            Ease::Power2InOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Tween {
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
    ease: Ease,
}

impl Tween {
    /// `duration` in seconds.
    pub fn to(from: f32, to: f32, duration: f32) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: 0.0,
            ease: Ease::default(),
        }
    }

    pub fn with_ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn advance(&mut self, dt: f32) -> f32 {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.value()
    }

    pub fn value(&self) -> f32 {
        if self.duration <= 0.0 {
            return self.to;
        }
        let progress = self.ease.apply(self.elapsed / self.duration);
        self.from + (self.to - self.from) * progress
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn reaches_target_and_stops() {
        let mut tween = Tween::to(1.0, 1.0 + std::f32::consts::TAU, 1.0);
        assert_relative_eq!(tween.value(), 1.0);
        tween.advance(0.6);
        assert!(!tween.is_finished());
        assert_relative_eq!(tween.advance(0.6), 1.0 + std::f32::consts::TAU);
        assert!(tween.is_finished());
    }

    #[test]
    fn ease_out_runs_ahead_of_linear() {
        let mut eased = Tween::to(0.0, 1.0, 1.0);
        let mut linear = Tween::to(0.0, 1.0, 1.0).with_ease(Ease::Linear);
        assert!(eased.advance(0.25) > linear.advance(0.25));
        assert_relative_eq!(Ease::Power2InOut.apply(0.5), 0.5);
    }

    #[test]
    fn zero_duration_jumps() {
        assert_relative_eq!(Tween::to(0.0, 3.0, 0.0).value(), 3.0);
    }
}
