//! The `Diagnosable` capability.
//!
//! Every payload carried by a [`FailureFrame`](crate::frame::FailureFrame)
//! must be able to describe itself with a human-readable reason. A type can
//! do so at the type level (the associated [`Diagnosable::REASON`] constant,
//! shared by every value) or per instance ([`Diagnosable::reason`]). When a
//! type provides both, the type-level reason wins.
//!
//! # Example
//!
//! ```rust
//! use quark_core::diagnosable::{diagnose, Diagnosable};
//!
//! #[derive(Debug, Clone)]
//! struct DivideByZero {
//!     expr: String,
//! }
//!
//! impl Diagnosable for DivideByZero {
//!     fn reason(&self) -> String {
//!         self.expr.clone()
//!     }
//! }
//!
//! struct Timeout;
//!
//! impl Diagnosable for Timeout {
//!     const REASON: Option<&'static str> = Some("operation timed out");
//! }
//!
//! assert_eq!(diagnose(&DivideByZero { expr: "x/0".into() }), "x/0");
//! assert_eq!(diagnose(&Timeout), "operation timed out");
//! ```

use std::borrow::Cow;

/// Capability required to produce a human-readable reason text.
///
/// # Empty Implementations
///
/// Both items have defaults, so `impl Diagnosable for T {}` compiles. Such
/// a type is still diagnosable: its reason is its full type name (as given
/// by [`std::any::type_name`]). This lets any payload type opt in with one
/// line; implement [`REASON`](Self::REASON) or [`reason`](Self::reason) when
/// the reason is shown to users.
pub trait Diagnosable {
    /// Type-level reason shared by every value of the type.
    ///
    /// Preferred over [`reason`](Self::reason) when set.
    const REASON: Option<&'static str> = None;

    /// Instance-level reason.
    ///
    /// The default falls back to [`REASON`](Self::REASON) and then to the
    /// type name, so a type only has to provide one of the two.
    fn reason(&self) -> String {
        match Self::REASON {
            Some(reason) => reason.to_owned(),
            None => std::any::type_name::<Self>().to_owned(),
        }
    }
}

/// Produce the reason text for `payload`, preferring the type-level reason.
pub fn diagnose<E: Diagnosable + ?Sized>(payload: &E) -> String {
    match E::REASON {
        Some(reason) => reason.to_owned(),
        None => payload.reason(),
    }
}

impl Diagnosable for String {
    fn reason(&self) -> String {
        self.clone()
    }
}

impl Diagnosable for &'static str {
    fn reason(&self) -> String {
        (*self).to_owned()
    }
}

impl Diagnosable for Cow<'static, str> {
    fn reason(&self) -> String {
        self.to_string()
    }
}
