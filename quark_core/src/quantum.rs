//! Tri-state values: a `T`, nothing, or a stored failure.
//!
//! A [`QuantumValue`] defers the decision of what to do with a failure to
//! the caller. Inspection never propagates. Collapsing (asking for the `T`)
//! is the point where the value must become concrete:
//!
//! | State   | Inspection              | Collapse                         |
//! |---------|-------------------------|----------------------------------|
//! | `Value` | `is_value()`            | returns the `T`                  |
//! | `Null`  | `is_null()`, `== Null`  | raises [`NullValueError`]        |
//! | `Error` | `is_error_of::<E>()`    | raises the stored failure as `E` |
//!
//! # Example
//!
//! ```rust
//! use quark_core::boundary::catch;
//! use quark_core::diagnosable::Diagnosable;
//! use quark_core::QuantumValue;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct DivideByZero;
//!
//! impl Diagnosable for DivideByZero {
//!     const REASON: Option<&'static str> = Some("division by zero");
//! }
//!
//! fn div(a: i32, b: i32) -> QuantumValue<i32> {
//!     if b == 0 {
//!         return QuantumValue::failure(DivideByZero);
//!     }
//!     QuantumValue::from(a / b)
//! }
//!
//! let q = div(1, 0);
//! assert!(q.is_error_of::<DivideByZero>());
//! assert_eq!(catch::<DivideByZero, i32>(|| q.into_value()), Err(DivideByZero));
//! assert_eq!(*div(6, 2), 3);
//! ```

use std::any::{Any, type_name};
use std::ops::{Deref, DerefMut};

use static_assertions::{assert_impl_all, assert_not_impl_any};

use crate::capsule::{TypeCapsule, TypeIdentity};
use crate::context::FailureContext;
use crate::diagnosable::Diagnosable;
use crate::error::{NullValueError, TypeMismatchError};
use crate::frame::FailureFrame;

/// Marker compared against a [`QuantumValue`] to test for the Null state.
///
/// ```rust
/// use quark_core::quantum::{Null, QuantumValue};
///
/// assert!(QuantumValue::<u8>::null() == Null);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Null;

/// Plain tag for the state of a [`QuantumValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantumState {
    Value,
    Null,
    Error,
}

/// A `T`, nothing, or a classified failure. Exactly one branch is live.
#[derive(Debug)]
pub enum QuantumValue<T> {
    /// A usable value.
    Value(T),
    /// No value and no failure.
    Null,
    /// A stored failure, raised when the value is collapsed.
    Error(FailureFrame),
}

assert_impl_all!(TypeCapsule: Send);
assert_impl_all!(FailureContext: Send);
assert_impl_all!(FailureFrame: Send);
assert_impl_all!(QuantumValue<String>: Send);
assert_not_impl_any!(TypeCapsule: Sync);
assert_not_impl_any!(FailureContext: Sync);
assert_not_impl_any!(FailureFrame: Sync);
assert_not_impl_any!(QuantumValue<String>: Sync);

/// Raise a [`NullValueError`] from the caller's location.
#[track_caller]
fn collapse_null() -> ! {
    FailureFrame::capture(NullValueError).raise()
}

impl<T> QuantumValue<T> {
    // ─── Construction ───────────────────────────────────────────────

    /// Null value.
    #[inline]
    pub const fn new() -> Self {
        Self::Null
    }

    /// Null value.
    #[inline]
    pub const fn null() -> Self {
        Self::Null
    }

    /// Value state holding `value`.
    #[inline]
    pub const fn value(value: T) -> Self {
        Self::Value(value)
    }

    /// Error state holding `payload`, classified at the caller's location.
    #[track_caller]
    pub fn failure<E>(payload: E) -> Self
    where
        E: Diagnosable + Clone + Send + 'static,
    {
        Self::Error(FailureFrame::capture(payload))
    }

    /// Error state holding an existing frame.
    #[inline]
    pub fn from_frame(frame: FailureFrame) -> Self {
        Self::Error(frame)
    }

    // ─── Inspection ─────────────────────────────────────────────────

    /// True in the Value state.
    #[inline]
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// True in the Null state.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True in the Error state.
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Current state tag.
    pub fn state(&self) -> QuantumState {
        match self {
            Self::Value(_) => QuantumState::Value,
            Self::Null => QuantumState::Null,
            Self::Error(_) => QuantumState::Error,
        }
    }

    /// True if this holds a failure whose payload type is `identity`.
    pub fn is_error_of_type(&self, identity: &TypeIdentity) -> bool {
        match self {
            Self::Error(frame) => frame.type_identity().as_ref() == Some(identity),
            _ => false,
        }
    }

    /// True if this holds a failure of type `E`.
    pub fn is_error_of<E: Any>(&self) -> bool {
        match self {
            Self::Error(frame) => frame.is::<E>(),
            _ => false,
        }
    }

    /// True if this holds a failure of the same type as `sample`.
    ///
    /// Only the type is compared; the payload value is not.
    pub fn is_error_like<E: Any>(&self, _sample: &E) -> bool {
        self.is_error_of::<E>()
    }

    /// The stored failure, if any.
    pub fn error(&self) -> Option<&FailureFrame> {
        match self {
            Self::Error(frame) => Some(frame),
            _ => None,
        }
    }

    /// Borrow the stored failure's payload as `E`.
    ///
    /// # Errors
    ///
    /// Returns [`TypeMismatchError`] naming the held type, or `null` /
    /// `value` for the other states.
    pub fn try_cast_error<E: Diagnosable + Any>(&self) -> Result<&E, TypeMismatchError> {
        let expected = type_name::<E>();
        match self {
            Self::Error(frame) => frame
                .downcast_ref::<E>()
                .map_err(|_| TypeMismatchError::new(expected, frame.type_name())),
            Self::Null => Err(TypeMismatchError::new(expected, "null")),
            Self::Value(_) => Err(TypeMismatchError::new(expected, "value")),
        }
    }

    /// Borrow the stored failure's payload as `E`, raising a
    /// [`TypeMismatchError`] if this is not an Error of type `E`.
    #[track_caller]
    pub fn cast_error<E: Diagnosable + Any>(&self) -> &E {
        match self.try_cast_error::<E>() {
            Ok(payload) => payload,
            Err(err) => FailureFrame::capture(err).raise(),
        }
    }

    // ─── Collapse ───────────────────────────────────────────────────

    /// Consume and return the value.
    ///
    /// Null raises [`NullValueError`]; Error raises the stored failure with
    /// its original type.
    #[track_caller]
    pub fn into_value(self) -> T {
        match self {
            Self::Value(value) => value,
            Self::Null => collapse_null(),
            Self::Error(frame) => frame.raise(),
        }
    }

    /// Borrow the value. Raises like [`into_value`](Self::into_value); the
    /// stored failure is copied so `self` stays intact.
    #[track_caller]
    pub fn get(&self) -> &T {
        match self {
            Self::Value(value) => value,
            Self::Null => collapse_null(),
            Self::Error(frame) => frame.clone().raise(),
        }
    }

    /// Mutably borrow the value. Raises like [`get`](Self::get).
    #[track_caller]
    pub fn get_mut(&mut self) -> &mut T {
        match self {
            Self::Value(value) => value,
            Self::Null => collapse_null(),
            Self::Error(frame) => frame.clone().raise(),
        }
    }

    // ─── Non-raising Bridges ────────────────────────────────────────

    /// `Ok(Some(v))` for Value, `Ok(None)` for Null, `Err(frame)` for Error.
    pub fn into_option(self) -> Result<Option<T>, FailureFrame> {
        match self {
            Self::Value(value) => Ok(Some(value)),
            Self::Null => Ok(None),
            Self::Error(frame) => Err(frame),
        }
    }

    /// Borrowing form of [`into_option`](Self::into_option).
    pub fn as_ref(&self) -> Result<Option<&T>, &FailureFrame> {
        match self {
            Self::Value(value) => Ok(Some(value)),
            Self::Null => Ok(None),
            Self::Error(frame) => Err(frame),
        }
    }

    /// The value, discarding any failure.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The stored failure, discarding any value.
    pub fn into_error(self) -> Option<FailureFrame> {
        match self {
            Self::Error(frame) => Some(frame),
            _ => None,
        }
    }

    /// The value, or `default` in the Null and Error states.
    pub fn value_or(self, default: T) -> T {
        match self {
            Self::Value(value) => value,
            _ => default,
        }
    }

    /// The value, or the result of `f` in the Null and Error states.
    pub fn value_or_else(self, f: impl FnOnce() -> T) -> T {
        match self {
            Self::Value(value) => value,
            _ => f(),
        }
    }

    /// Transform the value, keeping Null and Error as they are.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QuantumValue<U> {
        match self {
            Self::Value(value) => QuantumValue::Value(f(value)),
            Self::Null => QuantumValue::Null,
            Self::Error(frame) => QuantumValue::Error(frame),
        }
    }

    /// Chain a computation that may itself produce Null or Error.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> QuantumValue<U>) -> QuantumValue<U> {
        match self {
            Self::Value(value) => f(value),
            Self::Null => QuantumValue::Null,
            Self::Error(frame) => QuantumValue::Error(frame),
        }
    }

    // ─── Assignment ─────────────────────────────────────────────────

    /// Move the contents out, leaving Null behind.
    #[inline]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Store `value` and return the previous contents.
    #[inline]
    pub fn replace(&mut self, value: T) -> Self {
        std::mem::replace(self, Self::Value(value))
    }

    /// Switch to the Value state.
    pub fn set_value(&mut self, value: T) {
        *self = Self::Value(value);
    }

    /// Switch to the Null state.
    pub fn set_null(&mut self) {
        *self = Self::Null;
    }

    /// Switch to the Error state.
    pub fn set_error(&mut self, frame: FailureFrame) {
        *self = Self::Error(frame);
    }
}

impl<T> Default for QuantumValue<T> {
    fn default() -> Self {
        Self::Null
    }
}

impl<T> From<T> for QuantumValue<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T: Clone> Clone for QuantumValue<T> {
    #[track_caller]
    fn clone(&self) -> Self {
        match self {
            Self::Value(value) => Self::Value(value.clone()),
            Self::Null => Self::Null,
            Self::Error(frame) => Self::Error(frame.clone()),
        }
    }
}

impl<T> PartialEq<Null> for QuantumValue<T> {
    fn eq(&self, _: &Null) -> bool {
        self.is_null()
    }
}

impl<T> Deref for QuantumValue<T> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        self.get()
    }
}

impl<T> DerefMut for QuantumValue<T> {
    #[track_caller]
    fn deref_mut(&mut self) -> &mut T {
        self.get_mut()
    }
}
