//! Epsilon sets: the fixed tradeoff sweep and the analyst-editable exploration list

use serde::Serialize;

/// Reference epsilons swept to build the tradeoff curve
pub const SWEEP_EPSILONS: [f64; 6] = [0.1, 0.25, 0.5, 1.0, 2.0, 5.0];

/// Starting values of the exploration list
pub const DEFAULT_EXPLORATION_EPSILONS: [f64; 5] = [0.1, 0.5, 1.0, 2.0, 5.0];

/// Ascending, duplicate-free list of positive epsilons
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpsilonSet {
    values: Vec<f64>,
}

impl Default for EpsilonSet {
    fn default() -> Self {
        Self::from_values(DEFAULT_EXPLORATION_EPSILONS)
    }
}

impl EpsilonSet {
    /// Build from arbitrary values; non-positive and non-finite ones are dropped
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut set = Self { values: Vec::new() };
        for value in values {
            set.add(value);
        }
        set
    }

    /// Insert keeping order; returns false for duplicates and invalid budgets
    pub fn add(&mut self, epsilon: f64) -> bool {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return false;
        }
        match self.values.binary_search_by(|probe| probe.total_cmp(&epsilon)) {
            Ok(_) => false,
            Err(position) => {
                self.values.insert(position, epsilon);
                true
            }
        }
    }

    pub fn remove(&mut self, epsilon: f64) -> bool {
        let before = self.values.len();
        self.values.retain(|value| *value != epsilon);
        before != self.values.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
