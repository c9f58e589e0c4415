//! Evaluation counters for permission checks

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total number of decisions
    pub total_decisions: u64,

    /// Number of allowed decisions
    pub allowed_decisions: u64,

    /// Number of denied decisions (including vetoes)
    pub denied_decisions: u64,

    /// Decisions ended by a role's denial rule
    pub vetoes: u64,

    /// Conditions that errored or panicked
    pub condition_failures: u64,
}

impl MetricsSnapshot {
    /// Calculate allow rate
    pub fn allow_rate(&self) -> f64 {
        if self.total_decisions == 0 {
            0.0
        } else {
            self.allowed_decisions as f64 / self.total_decisions as f64
        }
    }

    /// Calculate veto rate
    pub fn veto_rate(&self) -> f64 {
        if self.total_decisions == 0 {
            0.0
        } else {
            self.vetoes as f64 / self.total_decisions as f64
        }
    }
}

/// Lock-free counters shared by every authorizer of one definition
#[derive(Debug, Default)]
pub struct EvaluationMetrics {
    total_decisions: AtomicU64,
    allowed_decisions: AtomicU64,
    denied_decisions: AtomicU64,
    vetoes: AtomicU64,
    condition_failures: AtomicU64,
}

impl EvaluationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a decision
    pub fn record_decision(&self, allowed: bool) {
        self.total_decisions.fetch_add(1, Ordering::Relaxed);
        if allowed {
            self.allowed_decisions.fetch_add(1, Ordering::Relaxed);
        } else {
            self.denied_decisions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_veto(&self) {
        self.vetoes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_condition_failure(&self) {
        self.condition_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_decisions: self.total_decisions.load(Ordering::Relaxed),
            allowed_decisions: self.allowed_decisions.load(Ordering::Relaxed),
            denied_decisions: self.denied_decisions.load(Ordering::Relaxed),
            vetoes: self.vetoes.load(Ordering::Relaxed),
            condition_failures: self.condition_failures.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.total_decisions.store(0, Ordering::Relaxed);
        self.allowed_decisions.store(0, Ordering::Relaxed);
        self.denied_decisions.store(0, Ordering::Relaxed);
        self.vetoes.store(0, Ordering::Relaxed);
        self.condition_failures.store(0, Ordering::Relaxed);
    }
}
