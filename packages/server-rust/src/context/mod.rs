//! Execution context propagation.
//!
//! - [`slot`]: task-local storage entered once per unit of work
//! - [`accessor`]: validated façade used by business code and isolation hooks

pub mod accessor;
pub mod slot;

pub use accessor::{ContextAccessor, FixedAccessor, TaskLocalAccessor};
pub use slot::{current, is_active, run, run_sync, spawn_in_context};
