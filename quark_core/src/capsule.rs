//! Type-erased, heap-owned payload storage.
//!
//! A [`TypeCapsule`] owns exactly one payload whose concrete type is not
//! known to the holder. The payload is reachable through a small capability
//! surface: destroy, raw access, type identity and deep clone. The concrete
//! type is recovered only through a [`TypeIdentity`] check followed by a
//! downcast.
//!
//! ## Lifetime
//!
//! - `make` boxes the payload once.
//! - `destroy` drops it once; later calls do nothing.
//! - Dropping the capsule drops a still-live payload.
//! - The identity survives `destroy`, so a destroyed capsule can still say
//!   what it used to hold.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use tracing::trace;

use crate::error::{CapsuleError, TypeMismatchError};

// ─── Type Identity ──────────────────────────────────────────────────

/// Stable, comparable token naming a concrete `'static` type.
///
/// Two identities are equal iff they were created for the same type. The
/// stored name is for diagnostics only and takes no part in comparison.
#[derive(Clone, Copy)]
pub struct TypeIdentity {
    id: TypeId,
    name: &'static str,
}

impl TypeIdentity {
    /// Identity of `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Underlying `TypeId`.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path (`a::b::Foo` → `Foo`).
    ///
    /// Generic types keep their full name, since the parameters carry paths
    /// of their own.
    pub fn short_name(&self) -> &'static str {
        if self.name.contains('<') {
            return self.name;
        }
        self.name.rsplit("::").next().unwrap_or(self.name)
    }

    /// True if this is the identity of `T`.
    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeIdentity {}

impl Hash for TypeIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeIdentity({})", self.name)
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ─── Erased Payload ─────────────────────────────────────────────────

/// Capability surface of a boxed payload. One implementation is
/// instantiated per captured concrete type.
trait ErasedPayload: Send {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_boxed(&self) -> Box<dyn ErasedPayload>;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<E: Any + Clone + Send> ErasedPayload for E {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_boxed(&self) -> Box<dyn ErasedPayload> {
        Box::new(self.clone())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

// ─── Type Capsule ───────────────────────────────────────────────────

/// Heap-owned holder for one payload of any `Clone + Send + 'static` type.
pub struct TypeCapsule {
    payload: Option<Box<dyn ErasedPayload>>,
    identity: TypeIdentity,
}

impl TypeCapsule {
    /// Box `value` into a new capsule.
    pub fn make<E: Any + Clone + Send>(value: E) -> Self {
        Self {
            payload: Some(Box::new(value)),
            identity: TypeIdentity::of::<E>(),
        }
    }

    /// Drop the payload. Idempotent: only the first call frees anything.
    pub fn destroy(&mut self) {
        if self.payload.take().is_some() {
            trace!(type_name = self.identity.name(), "capsule payload destroyed");
        }
    }

    /// True once the payload has been destroyed.
    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.payload.is_none()
    }

    /// The live payload without static type information.
    ///
    /// Returns `None` once the capsule has been destroyed.
    pub fn raw(&self) -> Option<&dyn Any> {
        self.payload.as_deref().map(|p| p.as_any())
    }

    /// Mutable variant of [`raw`](Self::raw).
    pub fn raw_mut(&mut self) -> Option<&mut dyn Any> {
        self.payload.as_deref_mut().map(|p| p.as_any_mut())
    }

    /// Identity of the type this capsule was made for.
    #[inline]
    pub fn type_identity(&self) -> TypeIdentity {
        self.identity
    }

    /// Name of the type this capsule was made for.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.identity.name()
    }

    /// Deep copy through the payload's `Clone`.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::Destroyed`] if the payload is gone. The
    /// source capsule is left untouched either way.
    pub fn try_clone(&self) -> Result<Self, CapsuleError> {
        let payload = self.payload.as_deref().ok_or(CapsuleError::Destroyed {
            type_name: self.identity.name(),
        })?;
        Ok(Self {
            payload: Some(payload.clone_boxed()),
            identity: self.identity,
        })
    }

    /// Borrow the payload as `E` after validating the identity.
    ///
    /// # Errors
    ///
    /// - [`CapsuleError::TypeMismatch`] if the capsule holds another type
    /// - [`CapsuleError::Destroyed`] if the payload is gone
    pub fn downcast_ref<E: Any>(&self) -> Result<&E, CapsuleError> {
        self.check::<E>()?;
        self.raw()
            .and_then(|any| any.downcast_ref::<E>())
            .ok_or(CapsuleError::Destroyed {
                type_name: self.identity.name(),
            })
    }

    /// Consume the capsule and return the owned payload as `E`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`downcast_ref`](Self::downcast_ref).
    pub fn into_payload<E: Any>(self) -> Result<E, CapsuleError> {
        self.check::<E>()?;
        let type_name = self.identity.name();
        let any = self.into_any()?;
        any.downcast::<E>()
            .map(|boxed| *boxed)
            .map_err(|_| CapsuleError::Destroyed { type_name })
    }

    /// Consume the capsule and return the payload box, dynamic type intact.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::Destroyed`] if the payload is gone.
    pub fn into_any(mut self) -> Result<Box<dyn Any + Send>, CapsuleError> {
        match self.payload.take() {
            Some(payload) => Ok(payload.into_any()),
            None => Err(CapsuleError::Destroyed {
                type_name: self.identity.name(),
            }),
        }
    }

    fn check<E: Any>(&self) -> Result<(), CapsuleError> {
        if self.identity.is::<E>() {
            Ok(())
        } else {
            Err(TypeMismatchError::new(std::any::type_name::<E>(), self.identity.name()).into())
        }
    }
}

impl fmt::Debug for TypeCapsule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCapsule")
            .field("type", &self.identity.name())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
