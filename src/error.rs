//! Error types used by procedures and by the queue runtime.
//!
//! This module defines two main error enums:
//!
//! - [`ProcedureError`]: errors accumulated by individual procedures
//!   (condition failures, execution failures, cancellation errors, propagated
//!   dependency errors).
//! - [`RuntimeError`]: errors raised by the [`ProcedureQueue`](crate::ProcedureQueue) itself.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logs.
//!
//! Programming-error faults (illegal state transitions, mutating a procedure
//! after execution began) are **not** represented here: they panic.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// # Errors carried by a procedure.
///
/// A procedure accumulates these in an ordered list; a procedure is
/// considered failed as soon as the list is non-empty. Errors are cheap to
/// clone so they can be handed to observers and kept in retry history.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ProcedureError {
    /// Execution failed with a plain message.
    #[error("execution failed: {reason}")]
    Fail {
        /// The underlying error message.
        reason: String,
    },

    /// Execution failed with an arbitrary error value.
    #[error("{0}")]
    Other(Arc<dyn StdError + Send + Sync>),

    /// A condition evaluated to `Failed` without a more specific error.
    #[error("condition '{condition}' failed")]
    ConditionFailed {
        /// Name of the condition.
        condition: String,
    },

    /// A condition's predecessor procedure finished with errors.
    #[error("condition '{condition}' dependency failed with {} error(s)", .errors.len())]
    ConditionDependencyFailed {
        /// Name of the condition.
        condition: String,
        /// Errors of the predecessor procedure.
        errors: Vec<ProcedureError>,
    },

    /// One or more dependencies finished with errors.
    #[error("{count} dependencies failed")]
    DependenciesFailed {
        /// Number of failed dependencies.
        count: usize,
    },

    /// One or more dependencies were cancelled.
    #[error("{count} dependencies cancelled")]
    DependenciesCancelled {
        /// Number of cancelled dependencies.
        count: usize,
    },

    /// The procedure did not finish before its deadline.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// An enclosing procedure was cancelled; carries its errors.
    #[error("parent cancelled with {} error(s)", .errors.len())]
    ParentCancelled {
        /// Errors attached to the parent at cancellation time.
        errors: Vec<ProcedureError>,
    },

    /// A retry driver had no attempt to run.
    #[error("no more attempts available")]
    NoMoreAttempts,

    /// The work future panicked.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic payload, when it is a string.
        info: String,
    },
}

impl ProcedureError {
    /// Convenience constructor for [`ProcedureError::Fail`].
    pub fn fail(reason: impl Into<String>) -> Self {
        ProcedureError::Fail {
            reason: reason.into(),
        }
    }

    /// Wraps an arbitrary error value.
    pub fn other<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        ProcedureError::Other(Arc::new(err))
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use procvisor::ProcedureError;
    ///
    /// assert_eq!(ProcedureError::fail("boom").as_label(), "procedure_failed");
    /// assert_eq!(ProcedureError::NoMoreAttempts.as_label(), "no_more_attempts");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ProcedureError::Fail { .. } => "procedure_failed",
            ProcedureError::Other(_) => "procedure_error",
            ProcedureError::ConditionFailed { .. } => "condition_failed",
            ProcedureError::ConditionDependencyFailed { .. } => "condition_dependency_failed",
            ProcedureError::DependenciesFailed { .. } => "dependencies_failed",
            ProcedureError::DependenciesCancelled { .. } => "dependencies_cancelled",
            ProcedureError::Timeout { .. } => "procedure_timeout",
            ProcedureError::ParentCancelled { .. } => "parent_cancelled",
            ProcedureError::NoMoreAttempts => "no_more_attempts",
            ProcedureError::Panicked { .. } => "procedure_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ProcedureError::Fail { reason } => format!("error: {reason}"),
            ProcedureError::Other(err) => format!("error: {err}"),
            ProcedureError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            ProcedureError::Panicked { info } => format!("panic: {info}"),
            other => other.to_string(),
        }
    }
}

/// # Errors produced by the queue runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The procedure has already been added to a queue.
    #[error("procedure {procedure} is already enqueued")]
    AlreadyEnqueued {
        /// Display form of the procedure identity.
        procedure: String,
    },

    /// Shutdown grace period was exceeded; some procedures had not finished.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Procedures that did not finish in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use procvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyEnqueued { .. } => "runtime_already_enqueued",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::AlreadyEnqueued { procedure } => {
                format!("already enqueued: {procedure}")
            }
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck procedures={stuck:?}")
            }
        }
    }
}

/// Joins a list of errors into one line, for logs and events.
pub(crate) struct DisplayErrors<'a>(pub &'a [ProcedureError]);

impl fmt::Display for DisplayErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", err.as_label())?;
        }
        Ok(())
    }
}
