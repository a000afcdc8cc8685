//! nomaster dispatch loop and action executor.
//!
//! [`Dispatcher`] drains the event source, rejects foreign event kinds,
//! applies the protected-branch policy, and for every violation hands the
//! pull request to the [`ActionExecutor`], which closes it and posts the
//! comment on a detached task.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** The dispatcher sequences calls between business
//! logic in the [`pipeline`] crate and the port traits it defines. It holds no
//! domain rules of its own and performs no I/O directly.

pub mod dispatch;
pub mod executor;

#[cfg(test)]
mod test_support;

pub use dispatch::{DispatchExit, Dispatcher, DispatcherConfig, Disposition};
pub use executor::ActionExecutor;
