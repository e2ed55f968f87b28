//! Core value and error types for the Loomscript runtime.
//!
//! This crate provides the foundational types shared by every component:
//! the dynamic console [`Value`] and the host-facing [`ScriptError`]
//! taxonomy.
//!
//! # Examples
//!
//! ```
//! use core_types::{ScriptError, Value};
//!
//! let yielded = Value::Number(123.0);
//! assert_eq!(yielded.to_string(), "123");
//!
//! let failure = ScriptError::UncaughtException { mask: 4 };
//! assert!(failure.to_string().contains("0x4"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod value;

pub use error::{ScriptError, ScriptResult};
pub use value::Value;
