//! # Per-procedure observers.
//!
//! - [`Observer`] the callback trait
//! - [`BlockObserver`] closure adapter
//! - [`TimeoutObserver`] cancels a procedure after a deadline

mod block;
mod observer;
mod timeout;

pub use block::BlockObserver;
pub use observer::Observer;
pub use timeout::TimeoutObserver;
