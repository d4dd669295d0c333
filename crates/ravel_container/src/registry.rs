//! The target-to-factories registry.
//!
//! The registry answers one question: "which factories can build this
//! target?" It is populated through [`Registration`] values, a closed set of
//! variants decided once at registration time:
//!
//! - [`component`] - a concrete [`Construct`] type; a factory for itself and
//!   for every interface its bindings declare
//! - [`interface`] - an abstract target registered with zero factories,
//!   awaiting implementations
//! - [`factory`] - a free factory function, registered only under its
//!   declared output target
//! - [`namespace`] - a flat batch of registrations, the shape an external
//!   module scanner hands over
//!
//! Zero-or-many-candidates policy deliberately lives in the resolver, not
//! here: the registry reports what it has and the resolver turns that into
//! a failure tied to the actual resolution attempt.

use hashbrown::{HashMap, HashSet};

use crate::error::RegistrationError;
use crate::key::Key;
use crate::provider::{Construct, Provider};

use variadics_please::all_tuples;

// ─────────────────────────────────────────────────────────────────────────────
// Registration variants
// ─────────────────────────────────────────────────────────────────────────────

/// One registerable unit, classified at construction time.
#[derive(Clone)]
pub enum Registration {
    /// A concrete type: a factory for itself and its bound interfaces.
    Concrete {
        /// The type's constructor provider.
        provider: Provider,
    },
    /// An abstract target with no factories of its own.
    Abstract {
        /// The abstract target's key.
        key: Key,
    },
    /// A free factory function, serving its declared output target.
    Factory {
        /// The function's provider.
        provider: Provider,
    },
    /// A flat batch of registrations produced by an external scanner.
    Namespace {
        /// The registrations in the batch.
        entries: Vec<Registration>,
    },
}

/// Registers a concrete [`Construct`] type.
#[must_use]
pub fn component<T: Construct>() -> Registration {
    Registration::Concrete {
        provider: Provider::of::<T>(),
    }
}

/// Registers an abstract target as a placeholder awaiting implementations.
#[must_use]
pub fn interface<I: ?Sized + Send + Sync + 'static>() -> Registration {
    Registration::Abstract {
        key: Key::of::<I>(),
    }
}

/// Registers a free factory function built with [`Provider::function`].
#[must_use]
pub fn factory(provider: Provider) -> Registration {
    Registration::Factory { provider }
}

/// Registers a flat batch of registrations at once.
#[must_use]
pub fn namespace(entries: Vec<Registration>) -> Registration {
    Registration::Namespace { entries }
}

// ─────────────────────────────────────────────────────────────────────────────
// Register trait (for variadic registration)
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for values accepted by [`Container::register`].
///
/// Implemented for a single [`Registration`] and for tuples of `Register`
/// implementors, so several targets can be registered in one call:
///
/// ```ignore
/// container.register((component::<TcpTransport>(), component::<Mailer>()))?;
/// ```
///
/// [`Container::register`]: crate::container::Container::register
pub trait Register {
    /// Flattens this value into individual registrations.
    fn registrations(self) -> Vec<Registration>;
}

impl Register for Registration {
    fn registrations(self) -> Vec<Registration> {
        vec![self]
    }
}

// Tuple implementations for registering multiple targets at once
macro_rules! impl_register_tuple {
    ($(($R:ident, $value:ident)),*) => {
        impl<$($R: Register),*> Register for ($($R,)*) {
            fn registrations(self) -> Vec<Registration> {
                let ($($value,)*) = self;
                let mut all = Vec::new();
                $(all.extend($value.registrations());)*
                all
            }
        }
    };
}

// Generate impls for tuples of size 1 to 8
all_tuples!(impl_register_tuple, 1, 8, R, value);

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Maps each target to the ordered, deduplicated list of factories able to
/// produce it.
#[derive(Default)]
pub struct Registry {
    entries: HashMap<Key, Vec<Provider>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Adds entries for one registration.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when a concrete type's interface
    /// declarations are malformed (bound to itself, or to the same
    /// interface twice). Namespace batches stop at the first failing entry.
    pub fn register(&mut self, registration: Registration) -> Result<(), RegistrationError> {
        match registration {
            Registration::Concrete { provider } => {
                let mut seen = HashSet::new();
                for key in provider.interfaces() {
                    if key == provider.output() {
                        return Err(RegistrationError::SelfBinding {
                            target: provider.name(),
                        });
                    }
                    if !seen.insert(key) {
                        return Err(RegistrationError::DuplicateBinding {
                            target: provider.name(),
                            interface: key.name(),
                        });
                    }
                }

                let interfaces: Vec<Key> = provider.interfaces().collect();
                self.add_entry(provider.output(), Some(provider.clone()));
                for key in interfaces {
                    self.add_entry(key, Some(provider.clone()));
                }
                tracing::debug!(component = provider.name(), "registered component");
                Ok(())
            }
            Registration::Abstract { key } => {
                self.add_entry(key, None);
                tracing::debug!(target_key = key.name(), "registered abstract target");
                Ok(())
            }
            Registration::Factory { provider } => {
                tracing::debug!(
                    factory = provider.name(),
                    output = provider.output().name(),
                    "registered factory function"
                );
                self.add_entry(provider.output(), Some(provider));
                Ok(())
            }
            Registration::Namespace { entries } => {
                for entry in entries {
                    self.register(entry)?;
                }
                Ok(())
            }
        }
    }

    /// Returns the candidate factories for a target.
    ///
    /// An unknown target and a registered-but-unimplemented abstract target
    /// both come back empty; the resolver owns the zero/many policy.
    #[must_use]
    pub fn providers(&self, key: &Key) -> &[Provider] {
        self.entries.get(key).map_or(&[], Vec::as_slice)
    }

    /// Returns true if the target has ever been registered, even without
    /// factories.
    #[must_use]
    pub fn contains(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    fn add_entry(&mut self, key: Key, provider: Option<Provider>) {
        let slot = self.entries.entry(key).or_default();
        if let Some(provider) = provider {
            if !slot.iter().any(|existing| existing.id() == provider.id()) {
                slot.push(provider);
            }
        }
    }
}
