use instant::Duration;

/// Elapsed time since a flow started, fed with frame deltas.
#[derive(Debug, Default, Clone, Copy)]
pub struct Clock {
    elapsed: Duration,
    delta: Duration,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, dt: Duration) -> f32 {
        self.elapsed += dt;
        self.delta = dt;
        self.elapsed_time()
    }

    /// Seconds since the first frame.
    pub fn elapsed_time(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    pub fn delta(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn accumulates_frame_deltas() {
        let mut clock = Clock::new();
        clock.advance(Duration::from_millis(16));
        let t = clock.advance(Duration::from_millis(34));
        assert_relative_eq!(t, 0.05, epsilon = 1e-6);
        assert_relative_eq!(clock.delta(), 0.034, epsilon = 1e-6);
    }
}
