//! Target identity and type-erased shared instances.
//!
//! Everything the container can resolve — a concrete type, a trait object
//! standing in for an abstract interface, or the declared product of a
//! factory function — is identified by a [`Key`]. Resolved values travel
//! through the engine as [`Instance`]s, which erase the concrete type while
//! preserving enough identity to extract the original `Arc<T>` later.

use core::any::{Any, TypeId};
use core::fmt;
use std::sync::Arc;

/// Unique identifier for a resolvable target.
///
/// Based on [`TypeId`], so each target type has exactly one `Key`. Both
/// concrete types and trait objects can be keyed, as long as they are
/// `Send + Sync + 'static`:
///
/// ```
/// use ravel_container::key::Key;
///
/// trait Transport: Send + Sync {}
/// struct TcpTransport;
///
/// let concrete = Key::of::<TcpTransport>();
/// let interface = Key::of::<dyn Transport>();
/// assert_ne!(concrete, interface);
/// ```
///
/// Equality and hashing consider only the underlying `TypeId`; the type name
/// is carried for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct Key {
    type_id: TypeId,
    type_name: &'static str,
}

impl Key {
    /// Creates a `Key` for the given target type.
    #[must_use]
    pub fn of<T: ?Sized + Send + Sync + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the target's type name for diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for Key {}

impl core::hash::Hash for Key {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// A resolved value with its concrete type erased.
///
/// Internally this is an `Arc<Arc<T>>` behind `dyn Any`: the inner `Arc<T>`
/// is what callers receive, the outer `Arc` makes the erased payload sized
/// even when `T` is a trait object. Cloning an `Instance` is cheap and every
/// clone extracts the *same* shared value, which is what makes singleton
/// caching work.
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    key: Key,
}

impl Instance {
    /// Wraps a shared value, remembering the target key it was packed for.
    ///
    /// The value can only be extracted back at the same `T` it was packed
    /// with; packing `Arc<TcpTransport>` as `T = dyn Transport` and as
    /// `T = TcpTransport` produces two distinct (if related) instances.
    #[must_use]
    pub fn of<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value: Arc::new(value),
            key: Key::of::<T>(),
        }
    }

    /// Recovers the shared value, if `T` matches the packed type.
    #[must_use]
    pub fn extract<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value)
            .downcast::<Arc<T>>()
            .ok()
            .map(|shared| Arc::clone(&*shared))
    }

    /// Returns the key this instance was packed for.
    #[must_use]
    pub fn key(&self) -> Key {
        self.key
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.key.name())
    }
}
