//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend only on this crate, never on each other's
//! internals.
//!
//! ## Job Model
//! - A `Job` is a command plus resource and naming metadata
//! - Commands stay structured until the submission boundary
//! - The execution environment is an explicit `EnvSnapshot`

mod backend;
mod command;
mod config;
mod env;
mod error;
mod job;
mod resources;

pub use backend::{JobBackend, LocalJobBackend};
pub use command::{shell_quote, CommandLine};
pub use config::*;
pub use env::{EnvSnapshot, PROPAGATED_VARS};
pub use error::*;
pub use job::*;
pub use resources::*;
