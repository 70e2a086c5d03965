//! Failure context: a capsule plus the operation that re-signals it.
//!
//! A [`FailureContext`] is the only place where the concrete type of a
//! captured failure is remembered after erasure. At construction it binds a
//! resignal function monomorphized for the payload type; [`crash`] hands the
//! capsule to that function, which downcasts it and resumes unwinding with
//! the original value. Everything else about the context is type-agnostic.
//!
//! [`crash`]: FailureContext::crash

use std::any::Any;
use std::fmt;
use std::panic;

use crate::capsule::{TypeCapsule, TypeIdentity};
use crate::error::CapsuleError;

/// Resignal operation bound to one concrete payload type.
type Resignal = fn(TypeCapsule) -> !;

/// Downcast `capsule` to `E` and propagate the payload as a failure of
/// static type `E`.
fn resignal<E: Any + Clone + Send>(capsule: TypeCapsule) -> ! {
    match capsule.into_payload::<E>() {
        Ok(payload) => panic::resume_unwind(Box::new(payload)),
        Err(err) => panic::resume_unwind(Box::new(err)),
    }
}

/// Owns one type-erased failure payload and knows how to re-signal it.
#[derive(Default)]
pub struct FailureContext {
    capsule: Option<TypeCapsule>,
    resignal: Option<Resignal>,
}

impl FailureContext {
    /// Capture `payload`, binding the resignal operation to `E`.
    pub fn new<E: Any + Clone + Send>(payload: E) -> Self {
        Self {
            capsule: Some(TypeCapsule::make(payload)),
            resignal: Some(resignal::<E>),
        }
    }

    /// True for a default or moved-from context.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.capsule.is_none()
    }

    /// True if the payload has been destroyed or the context is empty.
    pub fn is_destroyed(&self) -> bool {
        self.capsule.as_ref().is_none_or(TypeCapsule::is_destroyed)
    }

    /// Deep copy: clones the capsule and reuses the resignal operation.
    ///
    /// Copying an empty context yields an empty context.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::Destroyed`] if the source payload was
    /// destroyed.
    pub fn try_clone(&self) -> Result<Self, CapsuleError> {
        let capsule = self
            .capsule
            .as_ref()
            .map(TypeCapsule::try_clone)
            .transpose()?;
        Ok(Self {
            capsule,
            resignal: self.resignal,
        })
    }

    /// Move the capsule and resignal operation out, leaving `self` empty.
    #[inline]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Drop the payload early. The type identity is kept.
    pub fn destroy(&mut self) {
        if let Some(capsule) = self.capsule.as_mut() {
            capsule.destroy();
        }
    }

    /// The payload without static type information, for generic diagnostics.
    pub fn object(&self) -> Option<&dyn Any> {
        self.capsule.as_ref().and_then(TypeCapsule::raw)
    }

    /// Identity of the captured type.
    pub fn type_identity(&self) -> Option<TypeIdentity> {
        self.capsule.as_ref().map(TypeCapsule::type_identity)
    }

    /// Name of the captured type.
    pub fn type_name(&self) -> Option<&'static str> {
        self.type_identity().map(|id| id.name())
    }

    /// True if the captured type is `E`.
    pub fn is<E: Any>(&self) -> bool {
        self.type_identity().is_some_and(|id| id.is::<E>())
    }

    /// Borrow the payload as `E`.
    ///
    /// # Errors
    ///
    /// - [`CapsuleError::Empty`] if nothing was captured
    /// - [`CapsuleError::TypeMismatch`] if another type was captured
    /// - [`CapsuleError::Destroyed`] if the payload is gone
    pub fn downcast_ref<E: Any>(&self) -> Result<&E, CapsuleError> {
        self.capsule
            .as_ref()
            .ok_or(CapsuleError::Empty)?
            .downcast_ref::<E>()
    }

    /// Consume the context and return the owned payload as `E`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`downcast_ref`](Self::downcast_ref).
    pub fn into_payload<E: Any>(mut self) -> Result<E, CapsuleError> {
        self.capsule
            .take()
            .ok_or(CapsuleError::Empty)?
            .into_payload::<E>()
    }

    /// Re-signal the captured payload with its original static type.
    ///
    /// Never returns. An empty context signals [`CapsuleError::Empty`]; a
    /// destroyed payload signals [`CapsuleError::Destroyed`].
    pub fn crash(mut self) -> ! {
        match (self.capsule.take(), self.resignal.take()) {
            (Some(capsule), Some(resignal)) => resignal(capsule),
            _ => panic::resume_unwind(Box::new(CapsuleError::Empty)),
        }
    }
}

impl Clone for FailureContext {
    /// Deep copy. A destroyed payload cannot be copied; in that case the
    /// [`CapsuleError`] is raised from the caller's location.
    #[track_caller]
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(context) => context,
            Err(err) => crate::frame::FailureFrame::capture(err).raise(),
        }
    }
}

impl PartialEq<TypeIdentity> for FailureContext {
    fn eq(&self, other: &TypeIdentity) -> bool {
        self.type_identity().as_ref() == Some(other)
    }
}

impl fmt::Debug for FailureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureContext")
            .field("capsule", &self.capsule)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::catch;

    #[derive(Debug, Clone, PartialEq)]
    struct DivideByZero {
        expr: String,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Overflow;

    fn dbz() -> DivideByZero {
        DivideByZero {
            expr: "x/0".to_string(),
        }
    }

    #[test]
    fn test_new_records_identity() {
        let context = FailureContext::new(dbz());
        assert!(!context.is_empty());
        assert!(context.is::<DivideByZero>());
        assert!(!context.is::<Overflow>());
        assert_eq!(context, TypeIdentity::of::<DivideByZero>());
        assert!(context != TypeIdentity::of::<Overflow>());
    }

    #[test]
    fn test_object_is_untyped_view() {
        let context = FailureContext::new(dbz());
        let object = context.object().expect("payload");
        assert_eq!(object.downcast_ref::<DivideByZero>(), Some(&dbz()));
    }

    #[test]
    fn test_crash_preserves_static_type() {
        let result = catch::<DivideByZero, ()>(|| FailureContext::new(dbz()).crash());
        assert_eq!(result, Err(dbz()));
    }

    #[test]
    fn test_crash_not_intercepted_by_unrelated_handler() {
        let outer = catch::<DivideByZero, Result<(), Overflow>>(|| {
            catch::<Overflow, ()>(|| FailureContext::new(dbz()).crash())
        });
        assert_eq!(outer, Err(dbz()));
    }

    #[test]
    fn test_clone_then_crash_matches_original() {
        let original = FailureContext::new(dbz());
        let copy = original.try_clone().expect("clone");

        let from_copy = catch::<DivideByZero, ()>(|| copy.crash());
        let from_original = catch::<DivideByZero, ()>(|| original.crash());
        assert_eq!(from_copy, from_original);
    }

    #[test]
    fn test_take_leaves_source_empty() {
        let mut source = FailureContext::new(Overflow);
        let moved = source.take();

        assert!(source.is_empty());
        assert!(source.type_name().is_none());
        assert!(moved.is::<Overflow>());

        let result = catch::<CapsuleError, ()>(|| source.crash());
        assert_eq!(result, Err(CapsuleError::Empty));
    }

    #[test]
    fn test_clone_after_destroy_fails() {
        let mut context = FailureContext::new(dbz());
        context.destroy();
        assert!(context.is_destroyed());
        assert!(matches!(
            context.try_clone(),
            Err(CapsuleError::Destroyed { .. })
        ));
        // Identity survives destruction.
        assert!(context.is::<DivideByZero>());
    }

    #[test]
    fn test_clone_trait_raises_on_destroyed_payload() {
        let mut context = FailureContext::new(dbz());
        context.destroy();
        let result = catch::<CapsuleError, FailureContext>(|| context.clone());
        assert!(matches!(result, Err(CapsuleError::Destroyed { .. })));
    }

    #[test]
    fn test_crash_destroyed_payload_signals_capsule_error() {
        let mut context = FailureContext::new(dbz());
        context.destroy();
        let result = catch::<CapsuleError, ()>(|| context.crash());
        assert!(matches!(result, Err(CapsuleError::Destroyed { .. })));
    }

    #[test]
    fn test_empty_context_clone_is_empty() {
        let context = FailureContext::default();
        let copy = context.try_clone().expect("empty clone");
        assert!(copy.is_empty());
        assert!(copy.is_destroyed());
    }

    #[test]
    fn test_into_payload_and_downcast() {
        let context = FailureContext::new(dbz());
        assert_eq!(context.downcast_ref::<DivideByZero>(), Ok(&dbz()));
        assert!(matches!(
            context.downcast_ref::<Overflow>(),
            Err(CapsuleError::TypeMismatch(_))
        ));
        assert_eq!(context.into_payload::<DivideByZero>(), Ok(dbz()));

        let empty = FailureContext::default();
        assert_eq!(empty.into_payload::<Overflow>(), Err(CapsuleError::Empty));
    }
}
