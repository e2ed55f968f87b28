//! Loomscript runtime CLI library.
//!
//! Provides the [`Runtime`] wrapper and supporting modules for the
//! `loomscript` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod repl;
pub mod runtime;

pub use cli::Cli;
pub use error::{CliError, CliResult};
pub use runtime::{disassemble, Runtime};
