//! Prelude module for common re-exports.
//!
//! This module provides convenient re-exports of commonly used types
//! so that consumers can do `use quark_core::prelude::*;` and get
//! the most important types without listing individual paths.
//!
//! # Usage
//!
//! ```rust
//! use quark_core::prelude::*;
//! ```

// ─── Failure Model ──────────────────────────────────────────────────
pub use crate::capsule::{TypeCapsule, TypeIdentity};
pub use crate::context::FailureContext;
pub use crate::diagnosable::{Diagnosable, diagnose};
pub use crate::frame::{FailureFrame, FailureReport, Origin, crash};
pub use crate::quantum::{Null, QuantumState, QuantumValue};

// ─── Errors ─────────────────────────────────────────────────────────
pub use crate::error::{CapsuleError, HookError, NullValueError, TypeMismatchError};

// ─── Boundaries & Hooks ─────────────────────────────────────────────
pub use crate::boundary::{catch, top_level};
pub use crate::hook::{FailureHook, TracingHook};

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, DiagnosticsConfig, FailureConfig, LogLevel, ReportFormat,
    SharedConfig,
};
