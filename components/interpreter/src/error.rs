//! Abrupt completions crossing the interpreter boundary

use thiserror::Error;

use crate::value::Value;

/// Host-initiated stop; never observable by `try/catch`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Halt {
    /// The step budget ran out
    #[error("execution budget of {steps} steps exhausted")]
    BudgetExhausted {
        /// Configured limit
        steps: u64,
    },
}

/// Non-normal outcome of evaluating code
#[derive(Debug, Clone)]
pub enum Control {
    /// A JavaScript `throw`; catchable
    Throw(Value),
    /// Host halt; unwinds through every `catch` and `finally`
    Halt(Halt),
}

impl Control {
    /// The thrown value, if this is a throw
    pub fn thrown(&self) -> Option<&Value> {
        match self {
            Control::Throw(value) => Some(value),
            Control::Halt(_) => None,
        }
    }
}

impl From<Halt> for Control {
    fn from(halt: Halt) -> Self {
        Control::Halt(halt)
    }
}

/// Statement completion inside function bodies
#[derive(Debug, Clone)]
pub(crate) enum Completion {
    Normal,
    Return(Value),
    Break,
    Continue,
}
