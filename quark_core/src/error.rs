//! Structural failure types raised by the core itself.
//!
//! - [`NullValueError`]: collapsing a null [`QuantumValue`](crate::QuantumValue).
//! - [`TypeMismatchError`]: asking for a failure type the carrier does not hold.
//! - [`CapsuleError`]: cloning or resignaling a capsule that no longer
//!   holds a payload.
//! - [`HookError`]: failure hook registration problems.
//!
//! All of them are ordinary [`Diagnosable`] payloads, so when the core
//! raises one it travels through a [`FailureFrame`](crate::FailureFrame)
//! like any user failure and can be caught by its own type.

use thiserror::Error;

use crate::diagnosable::Diagnosable;

/// Raised when a null quantum value is collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Error)]
#[error("attempted to collapse a null quantum value")]
pub struct NullValueError;

impl Diagnosable for NullValueError {
    const REASON: Option<&'static str> = Some("attempted to collapse a null quantum value");
}

/// Raised when a specific failure type is requested from a carrier holding
/// a different one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("type mismatch: expected `{expected}`, found `{found}`")]
pub struct TypeMismatchError {
    /// Name of the requested type.
    pub expected: &'static str,
    /// Name of the type actually held (or a state name such as `null`).
    pub found: &'static str,
}

impl TypeMismatchError {
    /// Create a mismatch between two named types.
    pub const fn new(expected: &'static str, found: &'static str) -> Self {
        Self { expected, found }
    }
}

impl Diagnosable for TypeMismatchError {
    fn reason(&self) -> String {
        self.to_string()
    }
}

/// Errors produced by type-erased capsule operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapsuleError {
    /// The payload was already destroyed.
    #[error("capsule payload `{type_name}` was already destroyed")]
    Destroyed {
        /// Name of the type the capsule was created for.
        type_name: &'static str,
    },

    /// The failure context holds no capsule (moved-from or default).
    #[error("failure context is empty")]
    Empty,

    /// The requested concrete type does not match the stored one.
    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatchError),
}

impl Diagnosable for CapsuleError {
    fn reason(&self) -> String {
        self.to_string()
    }
}

/// Errors produced while registering a failure hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// A process-wide hook is already installed.
    #[error("a process-wide failure hook is already installed")]
    AlreadyInstalled,
}

impl Diagnosable for HookError {
    fn reason(&self) -> String {
        self.to_string()
    }
}
