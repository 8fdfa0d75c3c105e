//! Expectation failures.

use std::fmt;

use crate::common::SimError;
use crate::irq::{IrqId, IrqValue};

/// One reason an expectation window failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    /// A monitored signal changed and no pending expectation matched it.
    Unexpected {
        /// Signal that changed.
        irq: IrqId,
        /// Its name when the change was processed.
        name: String,
        /// Value it changed to.
        value: IrqValue,
        /// Cycle the change was captured at.
        cycle: u64,
    },
    /// An expectation was still pending when the window ran out.
    Missing {
        /// Expected signal.
        irq: IrqId,
        /// Its name when the window ended.
        name: String,
        /// Expected value.
        value: IrqValue,
    },
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unexpected {
                name, value, cycle, ..
            } => write!(
                f,
                "unexpected signal change: {name} -> {value} at cycle {cycle}"
            ),
            Self::Missing { name, value, .. } => {
                write!(f, "expected but did not occur: {name} -> {value}")
            }
        }
    }
}

/// Failure of an expectation call.
#[derive(Debug, thiserror::Error)]
pub enum ExpectError {
    /// The window produced problems.
    #[error("{}", render(.problems))]
    Failed {
        /// Every problem found, in detection order.
        problems: Vec<Problem>,
    },

    /// The session failed while the window was running.
    #[error(transparent)]
    Sim(#[from] SimError),
}

impl ExpectError {
    /// Problems of a failed window; empty for session errors.
    pub fn problems(&self) -> &[Problem] {
        match self {
            Self::Failed { problems } => problems,
            Self::Sim(_) => &[],
        }
    }
}

fn render(problems: &[Problem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
