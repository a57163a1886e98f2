//! Confidence heuristic for generated answers.
//!
//! The score grows linearly with the number of retrieved chunks and
//! saturates at `1.0`. It is a placeholder policy, not a calibrated
//! probability: it says nothing about whether the answer is correct.

/// Default score with zero retrieved chunks.
pub const DEFAULT_BASE: f64 = 0.7;
/// Default increment per retrieved chunk.
pub const DEFAULT_PER_RESULT: f64 = 0.1;

/// Linear, capped confidence policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidencePolicy {
    pub base: f64,
    pub per_result: f64,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE,
            per_result: DEFAULT_PER_RESULT,
        }
    }
}

impl ConfidencePolicy {
    pub fn new(base: f64, per_result: f64) -> Self {
        Self { base, per_result }
    }

    /// `min(base + per_result * count, 1.0)`.
    pub fn estimate(&self, count: usize) -> f64 {
        (self.base + self.per_result * count as f64).min(1.0)
    }
}

/// Estimate with the default policy.
pub fn estimate(count: usize) -> f64 {
    ConfidencePolicy::default().estimate(count)
}
