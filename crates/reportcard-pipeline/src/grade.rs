//! Weighted grade aggregation.

use reportcard_core::{obs, Grade};

use crate::analyzer::AnalyzerResult;

/// Allowed drift of the total weight from 1.0.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Σ score·weight over `results`.
pub fn weighted_sum(results: &[AnalyzerResult]) -> f64 {
    results
        .iter()
        .map(|r| f64::from(r.score) * r.weight)
        .sum()
}

/// Letter grade of `results`.
pub fn grade(results: &[AnalyzerResult]) -> Grade {
    Grade::from_weighted_sum(weighted_sum(results))
}

/// How far the weights of `results` are from summing to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightBalance {
    pub total: f64,
    pub deviation: f64,
}

impl WeightBalance {
    pub fn is_balanced(&self) -> bool {
        self.deviation <= WEIGHT_TOLERANCE
    }
}

/// Check the weight total. An unbalanced total is logged, never rejected.
pub fn weight_balance(results: &[AnalyzerResult]) -> WeightBalance {
    let total: f64 = results.iter().map(|r| r.weight).sum();
    let balance = WeightBalance {
        total,
        deviation: (total - 1.0).abs(),
    };
    if !balance.is_balanced() {
        obs::emit_weights_unbalanced(total);
    }
    balance
}
