//! Learning-rate schedules.

/// Continuous exponential decay: `lr = initial · rate^(step / decay_steps)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialDecay {
    /// Steps over which one decay factor is applied.
    pub decay_steps: usize,
    /// Multiplicative decay factor per `decay_steps`.
    pub decay_rate: f64,
}

impl ExponentialDecay {
    /// Learning rate at the given optimizer step.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn lr_at(&self, initial_lr: f64, step: usize) -> f64 {
        let steps = self.decay_steps.max(1);
        initial_lr * self.decay_rate.powf(step as f64 / steps as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decay_starts_at_initial() {
        let sched = ExponentialDecay {
            decay_steps: 5,
            decay_rate: 0.1,
        };
        assert!((sched.lr_at(1e-4, 0) - 1e-4).abs() < 1e-12);
    }

    #[test]
    fn test_decay_after_one_period() {
        let sched = ExponentialDecay {
            decay_steps: 5,
            decay_rate: 0.1,
        };
        assert!((sched.lr_at(1e-4, 5) - 1e-5).abs() < 1e-12);
    }

    #[test]
    fn test_decay_is_monotonic() {
        let sched = ExponentialDecay {
            decay_steps: 10,
            decay_rate: 0.5,
        };
        let lrs: Vec<f64> = (0..20).map(|s| sched.lr_at(1e-3, s)).collect();
        assert!(lrs.windows(2).all(|w| w[1] < w[0]));
    }
}
