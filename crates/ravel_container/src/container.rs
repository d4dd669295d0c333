//! The container facade.
//!
//! [`Container`] owns the registry, the named rule contexts, and the
//! per-context singleton caches, and serializes every operation behind one
//! reentrant lock. Reentrancy matters: a factory invoked during `resolve`
//! may itself call `resolve` on the same container from the same thread,
//! and each nested call chains a fresh resolve layer onto the caller's.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ravel_container::prelude::*;
//!
//! struct Clock;
//!
//! impl Construct for Clock {
//!     fn construct(_: &mut Args) -> Result<Self, ConstructError> {
//!         Ok(Self)
//!     }
//! }
//!
//! let container = Container::new();
//! container.register(component::<Clock>())?;
//!
//! let first = container.resolve::<Clock>()?;
//! let second = container.resolve::<Clock>()?;
//! assert!(Arc::ptr_eq(&first, &second));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use core::cell::RefCell;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use once_cell::sync::Lazy;
use parking_lot::ReentrantMutex;

use crate::builder::{Builder, CacheLayer, Layer, RuleLayer, State};
use crate::error::{RegistrationError, ResolveError, ResolveErrorKind};
use crate::key::Key;
use crate::registry::Register;
use crate::rules::{DEFAULT_CONTEXT, Rule, RuleSet};

/// The IoC container: registry, rules, caches, and the resolver entrance.
///
/// A single container may be shared across threads; a reentrant lock
/// serializes registry mutation, rule mutation, and graph construction
/// process-wide. All resolution work is synchronous recursion on the
/// calling thread.
pub struct Container {
    state: ReentrantMutex<RefCell<State>>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Creates an empty container with a default rule context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(State::new())),
        }
    }

    /// Registers one or more targets.
    ///
    /// Accepts a single [`Registration`](crate::registry::Registration) or a
    /// tuple of them:
    ///
    /// ```ignore
    /// container.register(component::<TcpTransport>())?;
    /// container.register((component::<Mailer>(), interface::<dyn Transport>()))?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] for malformed interface declarations.
    pub fn register<R: Register>(&self, targets: R) -> Result<(), RegistrationError> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        for registration in targets.registrations() {
            state.registry.register(registration)?;
        }
        Ok(())
    }

    /// Resolves a target in the default context.
    ///
    /// Builds the target's full dependency graph: every constructor
    /// dependency is resolved by its declared target, singletons are cached
    /// and reused, and failure anywhere aborts the whole call — a half-built
    /// graph is never returned.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] carrying the failure reason and the
    /// dependency path that led to it.
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveError> {
        self.resolve_in::<T>(DEFAULT_CONTEXT)
    }

    /// Resolves a target against a named rule context.
    ///
    /// The context's rules and its persistent singleton cache are used in
    /// place of the default ones. An unknown context behaves as an empty
    /// one.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] carrying the failure reason and the
    /// dependency path that led to it.
    pub fn resolve_in<T: ?Sized + Send + Sync + 'static>(
        &self,
        context: &str,
    ) -> Result<Arc<T>, ResolveError> {
        self.resolve_layer::<T>(RuleLayer::Context(context.to_string()), context)
    }

    /// Resolves a target with an ad-hoc rule layer.
    ///
    /// At the top level the overrides replace the rule store for this call
    /// (singletons still cache into the default context's persistent
    /// cache). Inside a factory the overrides become the innermost layer of
    /// the caller's chain. Unlike [`add_rules`](Self::add_rules), overrides
    /// do not auto-register the targets they mention.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] carrying the failure reason and the
    /// dependency path that led to it.
    pub fn resolve_with<T: ?Sized + Send + Sync + 'static>(
        &self,
        overrides: RuleSet,
    ) -> Result<Arc<T>, ResolveError> {
        let rules: HashMap<Key, Rule> = overrides
            .entries
            .into_iter()
            .map(|entry| (entry.key, entry.rule))
            .collect();
        self.resolve_layer::<T>(RuleLayer::Overrides(rules), DEFAULT_CONTEXT)
    }

    /// Merges rules into the default context.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] if auto-registration of a mentioned
    /// target fails.
    pub fn add_rules(&self, rules: RuleSet) -> Result<(), RegistrationError> {
        self.add_rules_in(rules, DEFAULT_CONTEXT)
    }

    /// Merges rules into a named context, creating the context if new.
    ///
    /// Every target mentioned is auto-registered, so adding a rule is
    /// sufficient to make a concrete type resolvable without a separate
    /// `register` call.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] if auto-registration of a mentioned
    /// target fails.
    pub fn add_rules_in(&self, rules: RuleSet, context: &str) -> Result<(), RegistrationError> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let merged = rules.entries.len();
        for entry in rules.entries {
            if let Some(registration) = entry.registration {
                state.registry.register(registration)?;
            }
            state
                .contexts
                .entry(context.to_string())
                .or_default()
                .insert(entry.key, entry.rule);
        }
        tracing::debug!(context, merged, "rules merged");
        Ok(())
    }

    /// Clears the rule store and every instance cache, keeping the
    /// registry.
    ///
    /// # Panics
    ///
    /// Panics if any resolution is in progress. A reset mid-build is a
    /// programming error, and failing fast here is cheaper than chasing the
    /// states it would corrupt.
    pub fn reset(&self) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        assert!(
            state.stack.is_empty(),
            "reset called while a resolution is in progress"
        );
        state.contexts.clear();
        state
            .contexts
            .insert(DEFAULT_CONTEXT.to_string(), HashMap::new());
        state.caches.clear();
        tracing::debug!("container reset");
    }

    /// Pushes a resolve layer, runs the build, pops the layer, and unpacks
    /// the result.
    fn resolve_layer<T: ?Sized + Send + Sync + 'static>(
        &self,
        rules: RuleLayer,
        cache_context: &str,
    ) -> Result<Arc<T>, ResolveError> {
        let key = Key::of::<T>();
        let guard = self.state.lock();

        let layer = {
            let mut state = guard.borrow_mut();
            // Only the outermost call writes through to the context's
            // persistent cache; nested calls get a layer-local one.
            let cache = if state.stack.is_empty() {
                CacheLayer::Context(cache_context.to_string())
            } else {
                CacheLayer::Ephemeral(HashMap::new())
            };
            state.stack.push(Layer {
                rules,
                cache,
                visited: HashSet::new(),
            });
            state.stack.len() - 1
        };

        let built = Builder::new(&guard, layer).resolve(key);

        {
            let mut state = guard.borrow_mut();
            state.stack.truncate(layer);
        }

        match built? {
            Some(instance) => instance.extract::<T>().ok_or_else(|| {
                ResolveError::new(ResolveErrorKind::WrongType {
                    target: key,
                    found: instance.key().name(),
                })
            }),
            None => Err(ResolveError::new(ResolveErrorKind::NoInstance {
                target: key,
            })),
        }
    }
}

static GLOBAL: Lazy<Container> = Lazy::new(Container::new);

/// Returns the process-wide default container.
///
/// Handy for applications that wire one graph for the whole process; prefer
/// an owned [`Container`] everywhere else, tests especially.
#[must_use]
pub fn global() -> &'static Container {
    &GLOBAL
}
