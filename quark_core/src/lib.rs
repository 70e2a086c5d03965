//! Quark Core Library
//!
//! Structured failures that keep their concrete type through type erasure,
//! plus a tri-state value that either holds a result, holds nothing, or
//! holds a failure waiting to be raised.
//!
//! # Module Structure
//!
//! - [`capsule`] - Type-erased payload holder and type identity tokens
//! - [`context`] - Capsule plus the type-preserving resignal operation
//! - [`frame`] - Failure frames, origins, reports and the `crash!`/`fail!` macros
//! - [`quantum`] - `QuantumValue<T>`: Value, Null or Error
//! - [`diagnosable`] - The reason-text capability every payload provides
//! - [`error`] - Failures raised by the core itself
//! - [`hook`] - Failure hooks (process-wide and thread-scoped)
//! - [`boundary`] - `catch` and `top_level` handler boundaries
//! - [`trace`] - Stack trace capture and demangling
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Limits and defaults
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use quark_core::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct NotFound(String);
//!
//! impl Diagnosable for NotFound {
//!     fn reason(&self) -> String {
//!         format!("{} not found", self.0)
//!     }
//! }
//!
//! fn lookup(key: &str) -> QuantumValue<u32> {
//!     match key {
//!         "answer" => QuantumValue::from(42),
//!         "" => QuantumValue::null(),
//!         _ => quark_core::fail!(NotFound(key.to_string())),
//!     }
//! }
//!
//! assert_eq!(*lookup("answer"), 42);
//! assert!(lookup("") == Null);
//!
//! let missing = lookup("question");
//! assert_eq!(missing.error().map(FailureFrame::reason), Some("question not found"));
//! assert_eq!(
//!     catch::<NotFound, u32>(|| missing.into_value()),
//!     Err(NotFound("question".into()))
//! );
//! ```
//!
//! # Unwinding
//!
//! Raising is built on `std::panic::resume_unwind`; binaries using this
//! crate must not set `panic = "abort"`.

pub mod boundary;
pub mod capsule;
pub mod config;
pub mod consts;
pub mod context;
pub mod diagnosable;
pub mod error;
pub mod frame;
pub mod hook;
pub mod prelude;
pub mod quantum;
pub mod trace;

pub use frame::FailureFrame;
pub use quantum::QuantumValue;
