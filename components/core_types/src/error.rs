//! Script runtime error types.
//!
//! Recoverable script-level control flow (a throw that a catch clause
//! consumes, or a soft throw nobody matches) never surfaces here; these
//! variants are the failures the embedding host actually observes.

use thiserror::Error;

/// Errors surfaced to the embedding host or an enclosing evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    /// Source text failed to lex, parse, or compile.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// A hard throw reached the bottom of the call stack with no matching
    /// catch clause. The enclosing evaluation is dead.
    #[error("uncaught exception (mask 0x{mask:x})")]
    UncaughtException {
        /// Bitmask code carried by the unmatched signal.
        mask: u32,
    },

    /// A fiber operation was applied to a fiber in the wrong lifecycle
    /// state, or to an unknown/stopped identifier.
    #[error("invalid fiber operation: {0}")]
    InvalidFiberOperation(String),

    /// A fiber snapshot could not be written, read, or decoded. Restore
    /// failures leave the fiber table untouched.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// A native function reported a failure.
    #[error("native error: {0}")]
    Native(String),
}

/// Result alias used across the runtime.
pub type ScriptResult<T> = Result<T, ScriptError>;
