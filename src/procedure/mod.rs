//! # Procedures: identity, lifecycle and work.
//!
//! - [`Procedure`] cloneable handle, owns the lifecycle state machine
//! - [`State`] lifecycle states and the allowed-transition table
//! - [`Work`] / [`Context`] the body a procedure runs
//! - [`ProcedureFn`] closure-backed [`Work`]
//! - [`chain`] / [`max_user_intent`] helpers over collections

mod collection;
mod handle;
mod identity;
mod state;
mod work;
mod work_fn;

pub use collection::{chain, max_user_intent};
pub use handle::{Procedure, WeakProcedure};
pub use identity::{ProcedureId, UserIntent};
pub use state::State;
pub use work::{Context, Work};
pub use work_fn::ProcedureFn;
