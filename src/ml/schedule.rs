// ============================================================
// Layer 5 — Learning Rate Schedule
// ============================================================
// Linear decay without warm-up:
//
//   lr_t = lr_0 * max(0, (T - t) / T)
//
// where T = epochs × batches_per_epoch and t counts optimiser steps
// already taken. The first step uses the full base rate.

pub struct LinearDecay {
    base_lr:     f64,
    total_steps: usize,
    step:        usize,
}

impl LinearDecay {
    pub fn new(base_lr: f64, total_steps: usize) -> Self {
        Self { base_lr, total_steps, step: 0 }
    }

    /// Rate for the current step
    pub fn lr(&self) -> f64 {
        if self.total_steps == 0 {
            return self.base_lr;
        }
        let remaining = self.total_steps.saturating_sub(self.step) as f64;
        self.base_lr * remaining / self.total_steps as f64
    }

    /// Return the current rate, then advance one step.
    pub fn next_lr(&mut self) -> f64 {
        let lr = self.lr();
        self.step += 1;
        lr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_decay_to_zero() {
        let mut s = LinearDecay::new(2e-5, 4);
        let rates: Vec<f64> = (0..5).map(|_| s.next_lr()).collect();
        let expected = [2e-5, 1.5e-5, 1e-5, 0.5e-5, 0.0];
        for (got, want) in rates.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} != {want}");
        }
    }

    #[test]
    fn test_never_negative() {
        let mut s = LinearDecay::new(1.0, 2);
        for _ in 0..10 {
            assert!(s.next_lr() >= 0.0);
        }
    }

    #[test]
    fn test_zero_steps_keeps_base_rate() {
        assert_eq!(LinearDecay::new(0.1, 0).lr(), 0.1);
    }
}
