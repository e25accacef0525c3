//! # Procedure lifecycle states.
//!
//! ```text
//! Initialized ──► Pending ──► EvaluatingConditions ──► Ready ──► Executing ──► Finishing ──► Finished
//!                    │                                   │                        ▲
//!                    └───────────────────────────────────┴────────────────────────┘
//!                               (cancellation / failed-condition shortcuts)
//! ```
//!
//! ## Rules
//! - Transitions are monotonic; only the edges above are legal.
//! - Any transition requested once `Finished` is silently absorbed.
//! - Any other illegal transition is a programming error and panics.

use std::fmt;

/// State of a [`Procedure`](crate::Procedure).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum State {
    /// Constructed, not yet added to a queue.
    Initialized,
    /// Added to a queue, waiting for dependencies.
    Pending,
    /// Dependencies finished; conditions are being evaluated.
    EvaluatingConditions,
    /// Conditions evaluated; waiting to be dispatched.
    Ready,
    /// `execute` is running.
    Executing,
    /// `finish` was called; observers are being notified.
    Finishing,
    /// Terminal.
    Finished,
}

impl State {
    /// Returns `true` if moving from `self` to `next` is a legal edge.
    pub fn can_transition_to(self, next: State) -> bool {
        use State::*;
        matches!(
            (self, next),
            (Initialized, Pending)
                | (Pending, EvaluatingConditions)
                | (Pending, Finishing)
                | (EvaluatingConditions, Ready)
                | (Ready, Executing)
                | (Ready, Finishing)
                | (Executing, Finishing)
                | (Finishing, Finished)
        )
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            State::Initialized => "initialized",
            State::Pending => "pending",
            State::EvaluatingConditions => "evaluating_conditions",
            State::Ready => "ready",
            State::Executing => "executing",
            State::Finishing => "finishing",
            State::Finished => "finished",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
