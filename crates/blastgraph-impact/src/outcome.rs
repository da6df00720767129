//! Per-target outcomes of best-effort operations.

use crate::error::{ImpactError, PartialFailure, TargetFailure};

/// Collects the result of each target of a multi-target operation without
/// stopping on the first failure.
#[derive(Debug)]
pub struct Outcomes<T> {
    successes: Vec<T>,
    failures: Vec<TargetFailure>,
}

impl<T> Default for Outcomes<T> {
    fn default() -> Self {
        Outcomes {
            successes: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> Outcomes<T> {
    pub fn new() -> Self {
        Outcomes::default()
    }

    /// Records the outcome for `target`.
    pub fn record(&mut self, target: impl Into<String>, result: Result<T, ImpactError>) {
        match result {
            Ok(value) => self.successes.push(value),
            Err(error) => self.failures.push(TargetFailure {
                target: target.into(),
                error,
            }),
        }
    }

    pub fn successes(&self) -> &[T] {
        &self.successes
    }

    pub fn failures(&self) -> &[TargetFailure] {
        &self.failures
    }

    pub fn attempted(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Folds another set of outcomes into this one.
    pub fn merge(&mut self, other: Outcomes<T>) {
        self.successes.extend(other.successes);
        self.failures.extend(other.failures);
    }

    /// All successes, or one [`PartialFailure`] listing every failure.
    pub fn into_result(self) -> Result<Vec<T>, PartialFailure> {
        if self.failures.is_empty() {
            Ok(self.successes)
        } else {
            Err(PartialFailure {
                attempted: self.successes.len() + self.failures.len(),
                failures: self.failures,
            })
        }
    }
}
