//! Failure frames: one failure occurrence with its reason and origin.
//!
//! Building a [`FailureFrame`] only classifies a failure. Nothing leaves
//! the current function until [`FailureFrame::raise`] is called, which is
//! what lets callers inspect a stored failure before deciding to propagate
//! it.
//!
//! ## Raise Sequence
//!
//! 1. The failure hook (thread-scoped, else process-wide, else none) sees
//!    the frame by reference.
//! 2. The owned [`FailureContext`] re-signals the payload with its original
//!    static type.
//!
//! # Example
//!
//! ```rust
//! use quark_core::boundary::catch;
//! use quark_core::diagnosable::Diagnosable;
//! use quark_core::frame::FailureFrame;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Timeout;
//!
//! impl Diagnosable for Timeout {
//!     const REASON: Option<&'static str> = Some("timed out");
//! }
//!
//! let frame = FailureFrame::capture(Timeout);
//! assert_eq!(frame.reason(), "timed out");
//!
//! let caught = catch::<Timeout, ()>(|| frame.raise());
//! assert_eq!(caught, Err(Timeout));
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::panic::Location;

use serde::Serialize;

use crate::capsule::TypeIdentity;
use crate::consts::UNKNOWN_FILE;
use crate::context::FailureContext;
use crate::diagnosable::{Diagnosable, diagnose};
use crate::error::CapsuleError;
use crate::hook;
use crate::quantum::QuantumValue;
use crate::trace::{TraceFrame, capture_trace, render_trace};

// ─── Origin ─────────────────────────────────────────────────────────

/// Source location where a failure was classified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Origin {
    file: Cow<'static, str>,
    line: u32,
    column: u32,
}

impl Origin {
    /// Explicit origin. The column is unknown (0).
    pub fn new(file: impl Into<Cow<'static, str>>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column: 0,
        }
    }

    /// Location of the caller of the enclosing `#[track_caller]` chain.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }

    /// Origin for failures that did not come from a known location.
    pub const fn unknown() -> Self {
        Self {
            file: Cow::Borrowed(UNKNOWN_FILE),
            line: 0,
            column: 0,
        }
    }

    /// Source file.
    #[inline]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Source line (1-based, 0 if unknown).
    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Source column (1-based, 0 if unknown).
    #[inline]
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl From<&'static Location<'static>> for Origin {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: Cow::Borrowed(location.file()),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            0 => write!(f, "{}:{}", self.file, self.line),
            col => write!(f, "{}:{}:{}", self.file, self.line, col),
        }
    }
}

// ─── Failure Frame ──────────────────────────────────────────────────

/// One failure occurrence: reason text, origin, and the captured payload.
pub struct FailureFrame {
    reason: String,
    origin: Origin,
    context: FailureContext,
    show_trace: bool,
}

impl FailureFrame {
    /// Classify `payload` as a failure originating at `file:line`.
    pub fn new<E>(payload: E, file: impl Into<Cow<'static, str>>, line: u32) -> Self
    where
        E: Diagnosable + Clone + Send + 'static,
    {
        Self::at(payload, Origin::new(file, line))
    }

    /// Classify `payload` as a failure originating at `origin`.
    pub fn at<E>(payload: E, origin: Origin) -> Self
    where
        E: Diagnosable + Clone + Send + 'static,
    {
        Self {
            reason: diagnose(&payload),
            origin,
            context: FailureContext::new(payload),
            show_trace: true,
        }
    }

    /// Classify `payload` as a failure originating at the caller.
    #[track_caller]
    pub fn capture<E>(payload: E) -> Self
    where
        E: Diagnosable + Clone + Send + 'static,
    {
        Self::at(payload, Origin::caller())
    }

    /// Propagate the failure. Never returns.
    ///
    /// Runs the failure hook with a view of this frame, then re-signals the
    /// payload with its original static type.
    pub fn raise(self) -> ! {
        hook::invoke(&self);
        self.context.crash()
    }

    /// Reason text produced by the payload's [`Diagnosable`] capability.
    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Where the failure was classified.
    #[inline]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Shorthand for `origin().file()`.
    #[inline]
    pub fn file(&self) -> &str {
        self.origin.file()
    }

    /// Shorthand for `origin().line()`.
    #[inline]
    pub fn line(&self) -> u32 {
        self.origin.line()
    }

    /// The owned failure context.
    #[inline]
    pub fn context(&self) -> &FailureContext {
        &self.context
    }

    /// Identity of the payload type.
    pub fn type_identity(&self) -> Option<TypeIdentity> {
        self.context.type_identity()
    }

    /// Name of the payload type, or `"<empty>"` for a moved-from context.
    pub fn type_name(&self) -> &'static str {
        self.context.type_name().unwrap_or("<empty>")
    }

    /// True if the payload type is `E`.
    #[inline]
    pub fn is<E: Any>(&self) -> bool {
        self.context.is::<E>()
    }

    /// Borrow the payload as `E`.
    ///
    /// # Errors
    ///
    /// See [`FailureContext::downcast_ref`].
    pub fn downcast_ref<E: Any>(&self) -> Result<&E, CapsuleError> {
        self.context.downcast_ref::<E>()
    }

    /// Consume the frame and return the payload as `E` without raising.
    ///
    /// # Errors
    ///
    /// See [`FailureContext::into_payload`].
    pub fn into_payload<E: Any>(self) -> Result<E, CapsuleError> {
        self.context.into_payload::<E>()
    }

    /// Whether hooks should print a stack trace for this failure.
    #[inline]
    pub fn show_trace(&self) -> bool {
        self.show_trace
    }

    /// Enable or disable stack trace printing for this failure.
    #[inline]
    pub fn set_show_trace(&mut self, show: bool) {
        self.show_trace = show;
    }

    /// Builder form of [`set_show_trace`](Self::set_show_trace).
    #[must_use]
    pub fn with_show_trace(mut self, show: bool) -> Self {
        self.show_trace = show;
        self
    }

    /// Deep copy.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::Destroyed`] if the payload is gone.
    pub fn try_clone(&self) -> Result<Self, CapsuleError> {
        Ok(Self {
            reason: self.reason.clone(),
            origin: self.origin.clone(),
            context: self.context.try_clone()?,
            show_trace: self.show_trace,
        })
    }

    /// Wrap this frame into the Error state of a quantum value.
    #[inline]
    pub fn into_quantum<T>(self) -> QuantumValue<T> {
        QuantumValue::Error(self)
    }

    /// Serializable snapshot without a stack trace.
    pub fn report(&self) -> FailureReport {
        FailureReport {
            reason: self.reason.clone(),
            type_name: self.type_name(),
            file: self.origin.file().to_string(),
            line: self.origin.line(),
            column: self.origin.column(),
            trace: Vec::new(),
        }
    }

    /// Serializable snapshot including the current stack trace.
    pub fn report_with_trace(&self, max_depth: usize) -> FailureReport {
        let mut report = self.report();
        if self.show_trace {
            report.trace = capture_trace(max_depth);
        }
        report
    }
}

impl Clone for FailureFrame {
    #[track_caller]
    fn clone(&self) -> Self {
        Self {
            reason: self.reason.clone(),
            origin: self.origin.clone(),
            context: self.context.clone(),
            show_trace: self.show_trace,
        }
    }
}

impl fmt::Debug for FailureFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureFrame")
            .field("reason", &self.reason)
            .field("origin", &self.origin)
            .field("type", &self.type_name())
            .field("show_trace", &self.show_trace)
            .finish()
    }
}

impl fmt::Display for FailureFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {})", self.reason, self.origin)
    }
}

/// Raise `payload` from the caller's location without a stack trace.
#[track_caller]
pub fn crash<E>(payload: E) -> !
where
    E: Diagnosable + Clone + Send + 'static,
{
    FailureFrame::capture(payload).with_show_trace(false).raise()
}

// ─── Report ─────────────────────────────────────────────────────────

/// Serializable snapshot of a failure for logs and diagnostics output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    /// Reason text.
    pub reason: String,
    /// Payload type name.
    pub type_name: &'static str,
    /// Origin file.
    pub file: String,
    /// Origin line.
    pub line: u32,
    /// Origin column.
    pub column: u32,
    /// Captured stack, innermost first. Empty when not captured.
    pub trace: Vec<TraceFrame>,
}

impl FailureReport {
    /// Render as a single JSON object.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` serialization errors.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (at {}:{})",
            self.type_name, self.reason, self.file, self.line
        )?;
        if !self.trace.is_empty() {
            write!(f, "\n{}", render_trace(&self.trace))?;
        }
        Ok(())
    }
}

// ─── Macros ─────────────────────────────────────────────────────────

/// Classify a failure at the call site and raise it.
///
/// ```rust
/// use quark_core::boundary::catch;
///
/// let caught = catch::<String, ()>(|| quark_core::crash!(String::from("unrecoverable")));
/// assert_eq!(caught, Err(String::from("unrecoverable")));
/// ```
#[macro_export]
macro_rules! crash {
    ($payload:expr $(,)?) => {
        $crate::frame::FailureFrame::new($payload, ::core::file!(), ::core::line!()).raise()
    };
}

/// Return early with a failure classified at the call site.
///
/// The enclosing function must return a [`QuantumValue`](crate::QuantumValue).
///
/// ```rust
/// use quark_core::{fail, QuantumValue};
///
/// fn half(n: i32) -> QuantumValue<i32> {
///     if n % 2 != 0 {
///         fail!(String::from("odd input"));
///     }
///     QuantumValue::from(n / 2)
/// }
///
/// assert!(half(3).is_error());
/// assert_eq!(half(4).ok(), Some(2));
/// ```
#[macro_export]
macro_rules! fail {
    ($payload:expr $(,)?) => {
        return $crate::frame::FailureFrame::new($payload, ::core::file!(), ::core::line!())
            .into_quantum()
    };
}
