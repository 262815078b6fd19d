//! Execution step budget

use crate::error::Halt;

/// Counts evaluation steps and halts execution once the limit is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepBudget {
    limit: Option<u64>,
    used: u64,
}

impl StepBudget {
    /// Budget allowing `limit` steps
    pub fn new(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            used: 0,
        }
    }

    /// Budget that never runs out
    pub fn unlimited() -> Self {
        Self { limit: None, used: 0 }
    }

    /// Consume one step
    #[inline]
    pub fn consume(&mut self) -> Result<(), Halt> {
        self.used += 1;
        match self.limit {
            Some(limit) if self.used > limit => Err(Halt::BudgetExhausted { steps: limit }),
            _ => Ok(()),
        }
    }

    /// Start counting from zero again
    pub fn reset(&mut self) {
        self.used = 0;
    }

    /// Steps consumed since the last reset
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Configured limit
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }
}

impl Default for StepBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_exhaustion() {
        let mut budget = StepBudget::new(2);
        assert!(budget.consume().is_ok());
        assert!(budget.consume().is_ok());
        assert_eq!(budget.consume(), Err(Halt::BudgetExhausted { steps: 2 }));
    }

    #[test]
    fn test_reset() {
        let mut budget = StepBudget::new(1);
        budget.consume().unwrap();
        budget.reset();
        assert_eq!(budget.used(), 0);
        assert!(budget.consume().is_ok());
    }

    #[test]
    fn test_unlimited() {
        let mut budget = StepBudget::unlimited();
        for _ in 0..10_000 {
            budget.consume().unwrap();
        }
        assert_eq!(budget.limit(), None);
    }
}
