//! Factory metadata and construction machinery.
//!
//! The original reflection-driven idea — "read the constructor signature and
//! resolve each declared parameter" — becomes declaration-site metadata here:
//! a type implements [`Construct`] and states, in order, what its constructor
//! needs ([`Param`]), which abstract interfaces it satisfies ([`Binding`]),
//! and how to assemble itself from resolved arguments ([`Args`]).
//!
//! A [`Provider`] is the type-erased form of that metadata: the registry
//! stores providers, and the resolver calls them. Free factory functions get
//! the same shape through [`Provider::function`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ravel_container::provider::{Args, Binding, Construct, ConstructError, Param};
//!
//! trait Store: Send + Sync {}
//!
//! struct DiskStore {
//!     root: String,
//! }
//!
//! impl Store for DiskStore {}
//!
//! impl Construct for DiskStore {
//!     fn parameters() -> Vec<Param> {
//!         vec![Param::leaf_or("root", || String::from("/var/lib/app"))]
//!     }
//!
//!     fn bindings() -> Vec<Binding<Self>> {
//!         vec![Binding::of::<dyn Store>(|it| it)]
//!     }
//!
//!     fn construct(args: &mut Args) -> Result<Self, ConstructError> {
//!         Ok(Self { root: args.value::<String>("root")? })
//!     }
//! }
//! ```

use core::any::TypeId;
use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::key::{Instance, Key};

// ─────────────────────────────────────────────────────────────────────────────
// Parameters
// ─────────────────────────────────────────────────────────────────────────────

/// How the resolver treats a single constructor parameter.
#[derive(Clone, Debug)]
pub enum ParamKind {
    /// A declared dependency, resolved recursively through the registry.
    Dependency(Key),
    /// A leaf value (numbers, text, booleans, identifiers, timestamps).
    /// The container never manufactures leaves; they come from a rule's
    /// literal arguments or from the parameter's default.
    Leaf(Key),
    /// A plain callable. Skipped by the resolver.
    Callable,
}

type DefaultFn = Arc<dyn Fn() -> Instance + Send + Sync>;

/// One entry of a factory's ordered parameter list.
///
/// Carries the parameter name, its [`ParamKind`], and an optional default
/// used when the dependency yields nothing or the leaf is not supplied.
#[derive(Clone)]
pub struct Param {
    name: &'static str,
    kind: ParamKind,
    default: Option<DefaultFn>,
}

impl Param {
    /// A required dependency on target `T`.
    #[must_use]
    pub fn dependency<T: ?Sized + Send + Sync + 'static>(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Dependency(Key::of::<T>()),
            default: None,
        }
    }

    /// A dependency on target `T` with a fallback used when resolution
    /// yields nothing or `T` has no registered implementation.
    #[must_use]
    pub fn dependency_or<T: ?Sized + Send + Sync + 'static>(
        name: &'static str,
        default: impl Fn() -> Arc<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Dependency(Key::of::<T>()),
            default: Some(Arc::new(move || Instance::of::<T>(default()))),
        }
    }

    /// A leaf parameter of type `T`, supplied through rules only.
    #[must_use]
    pub fn leaf<T: Send + Sync + 'static>(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Leaf(Key::of::<T>()),
            default: None,
        }
    }

    /// A leaf parameter with a default value.
    #[must_use]
    pub fn leaf_or<T: Send + Sync + 'static>(
        name: &'static str,
        default: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            kind: ParamKind::Leaf(Key::of::<T>()),
            default: Some(Arc::new(move || Instance::of::<T>(Arc::new(default())))),
        }
    }

    /// A callable parameter. The resolver skips it; a value must come from a
    /// rule's literal arguments or the construct body itself.
    #[must_use]
    pub fn callable(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Callable,
            default: None,
        }
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns how the resolver treats this parameter.
    #[must_use]
    pub fn kind(&self) -> &ParamKind {
        &self.kind
    }

    /// Returns true if the parameter carries a default.
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub(crate) fn default_value(&self) -> Option<Instance> {
        self.default.as_ref().map(|produce| produce())
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("has_default", &self.has_default())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Assembled arguments
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while invoking a factory.
///
/// These are the "construction-time type/arity" failures: a missing required
/// argument, an argument of the wrong type, a factory asked to produce a
/// target it has no cast for, or an error from the construct body itself.
#[derive(Debug, thiserror::Error)]
pub enum ConstructError {
    /// A required argument was not assembled and has no default.
    #[error("missing required argument `{name}`")]
    MissingArgument {
        /// The parameter name.
        name: &'static str,
    },

    /// An assembled argument does not extract as the expected type.
    #[error("argument `{name}` is not a `{expected}`")]
    ArgumentType {
        /// The parameter name.
        name: &'static str,
        /// The type the construct body asked for.
        expected: &'static str,
    },

    /// The factory has no cast producing the requested target.
    #[error("factory `{factory}` cannot produce `{requested}`")]
    WrongTarget {
        /// The factory's display name.
        factory: &'static str,
        /// The target that was requested.
        requested: &'static str,
    },

    /// The construct body failed.
    #[error(transparent)]
    Failed(Box<dyn std::error::Error + Send + Sync>),
}

impl ConstructError {
    /// Wraps an arbitrary error raised by a construct body.
    pub fn failed(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Failed(error.into())
    }
}

impl From<crate::error::ResolveError> for ConstructError {
    fn from(error: crate::error::ResolveError) -> Self {
        Self::Failed(Box::new(error))
    }
}

/// The arguments assembled for one factory invocation, keyed by parameter
/// name in the factory's declared order.
///
/// Construct bodies pull values out with [`take`](Self::take) for
/// dependencies and [`value`](Self::value) for leaves.
#[derive(Default)]
pub struct Args {
    values: HashMap<&'static str, Instance>,
}

impl Args {
    pub(crate) fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, name: &'static str, value: Instance) {
        self.values.insert(name, value);
    }

    /// Takes a resolved dependency out of the argument set.
    ///
    /// # Errors
    ///
    /// - [`ConstructError::MissingArgument`] if no value was assembled
    /// - [`ConstructError::ArgumentType`] if the value is not a `T`
    pub fn take<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        name: &'static str,
    ) -> Result<Arc<T>, ConstructError> {
        let instance = self
            .values
            .remove(name)
            .ok_or(ConstructError::MissingArgument { name })?;
        instance
            .extract::<T>()
            .ok_or(ConstructError::ArgumentType {
                name,
                expected: core::any::type_name::<T>(),
            })
    }

    /// Takes a leaf value out of the argument set, cloning it out of its
    /// shared wrapper.
    ///
    /// # Errors
    ///
    /// Same conditions as [`take`](Self::take).
    pub fn value<T: Clone + Send + Sync + 'static>(
        &mut self,
        name: &'static str,
    ) -> Result<T, ConstructError> {
        self.take::<T>(name).map(|shared| (*shared).clone())
    }

    /// Takes an optional argument, returning `None` when nothing was
    /// assembled or the type does not match.
    pub fn opt<T: ?Sized + Send + Sync + 'static>(&mut self, name: &str) -> Option<Arc<T>> {
        self.values
            .remove(name)
            .and_then(|instance| instance.extract::<T>())
    }

    /// Returns true if an argument with the given name was assembled.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Construct trait and interface bindings
// ─────────────────────────────────────────────────────────────────────────────

/// Declaration-site metadata for a concrete constructible type.
///
/// This is the statically-typed stand-in for reading a constructor signature
/// at runtime: the parameter list is declared once, in order, and the
/// construct body pulls the assembled values back out by name.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ravel_container::provider::{Args, Construct, ConstructError, Param};
///
/// struct Clock;
///
/// impl Construct for Clock {
///     fn construct(_: &mut Args) -> Result<Self, ConstructError> {
///         Ok(Self)
///     }
/// }
///
/// struct Journal {
///     clock: Arc<Clock>,
/// }
///
/// impl Construct for Journal {
///     fn parameters() -> Vec<Param> {
///         vec![Param::dependency::<Clock>("clock")]
///     }
///
///     fn construct(args: &mut Args) -> Result<Self, ConstructError> {
///         Ok(Self { clock: args.take::<Clock>("clock")? })
///     }
/// }
/// ```
pub trait Construct: Sized + Send + Sync + 'static {
    /// The ordered constructor parameter list. Defaults to no parameters.
    fn parameters() -> Vec<Param> {
        Vec::new()
    }

    /// The abstract interfaces this type satisfies. Defaults to none.
    ///
    /// Each binding makes the type a candidate implementation for that
    /// interface when registered.
    fn bindings() -> Vec<Binding<Self>> {
        Vec::new()
    }

    /// Builds the value from assembled arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructError`] when arguments are missing, of the wrong
    /// type, or the body itself fails.
    fn construct(args: &mut Args) -> Result<Self, ConstructError>;
}

/// Declares that a concrete type satisfies an abstract interface.
///
/// The cast function is the unsizing coercion from `Arc<T>` to `Arc<dyn I>`,
/// written as `|it| it` at the declaration site where both types are known:
///
/// ```
/// use ravel_container::provider::{Args, Binding, Construct, ConstructError};
///
/// trait Transport: Send + Sync {}
/// struct TcpTransport;
/// impl Transport for TcpTransport {}
///
/// impl Construct for TcpTransport {
///     fn bindings() -> Vec<Binding<Self>> {
///         vec![Binding::of::<dyn Transport>(|it| it)]
///     }
///
///     fn construct(_: &mut Args) -> Result<Self, ConstructError> {
///         Ok(Self)
///     }
/// }
/// ```
pub struct Binding<T> {
    key: Key,
    cast: Arc<dyn Fn(Arc<T>) -> Instance + Send + Sync>,
}

impl<T: Send + Sync + 'static> Binding<T> {
    /// Binds `T` to the interface `I`.
    #[must_use]
    pub fn of<I: ?Sized + Send + Sync + 'static>(cast: fn(Arc<T>) -> Arc<I>) -> Self {
        Self {
            key: Key::of::<I>(),
            cast: Arc::new(move |value| Instance::of::<I>(cast(value))),
        }
    }

    /// Returns the interface key this binding targets.
    #[must_use]
    pub fn key(&self) -> Key {
        self.key
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identity of a factory, used to deduplicate registry entries.
///
/// A concrete type's constructor and a named factory function each have
/// exactly one `ProviderId`, so registering the same factory twice for the
/// same target is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderId(TypeId);

impl ProviderId {
    /// Creates a `ProviderId` from the factory's type.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(TypeId::of::<T>())
    }
}

type CallFn = Arc<dyn Fn(&mut Args) -> Result<Option<Instance>, ConstructError> + Send + Sync>;
type CastFn = Arc<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;

/// A type-erased factory: the unit the registry stores and the resolver
/// invokes.
///
/// A provider declares its output target, its ordered parameter list, and
/// the interface casts that let one construction serve several target keys.
#[derive(Clone)]
pub struct Provider {
    id: ProviderId,
    name: &'static str,
    output: Key,
    params: Vec<Param>,
    call: CallFn,
    casts: Vec<(Key, CastFn)>,
}

impl Provider {
    /// The provider backing a concrete [`Construct`] type.
    #[must_use]
    pub fn of<T: Construct>() -> Self {
        let casts = T::bindings()
            .into_iter()
            .map(|binding| {
                let Binding { key, cast } = binding;
                let apply: CastFn =
                    Arc::new(move |instance| instance.extract::<T>().map(|value| cast(value)));
                (key, apply)
            })
            .collect();

        Self {
            id: ProviderId::of::<T>(),
            name: core::any::type_name::<T>(),
            output: Key::of::<T>(),
            params: T::parameters(),
            call: Arc::new(|args| {
                T::construct(args).map(|value| Some(Instance::of::<T>(Arc::new(value))))
            }),
            casts,
        }
    }

    /// A provider backed by a free factory function with a declared output
    /// target.
    ///
    /// The function receives the assembled arguments and may return
    /// `Ok(None)` to signal that it produced nothing; the resolver then
    /// falls back to the dependent parameter's default, or fails with a
    /// missing-dependency error.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use ravel_container::provider::{Param, Provider};
    ///
    /// struct Clock;
    ///
    /// let provider = Provider::function::<Clock, _>("make_clock", Vec::new(), |_args| {
    ///     Ok(Some(Arc::new(Clock)))
    /// });
    /// assert!(provider.name().contains("make_clock"));
    /// ```
    #[must_use]
    pub fn function<O, F>(name: &'static str, params: Vec<Param>, call: F) -> Self
    where
        O: ?Sized + Send + Sync + 'static,
        F: Fn(&mut Args) -> Result<Option<Arc<O>>, ConstructError> + Send + Sync + 'static,
    {
        Self {
            id: ProviderId::of::<F>(),
            name,
            output: Key::of::<O>(),
            params,
            call: Arc::new(move |args| {
                call(args).map(|produced| produced.map(Instance::of::<O>))
            }),
            casts: Vec::new(),
        }
    }

    /// Returns the provider's identity.
    #[must_use]
    pub fn id(&self) -> ProviderId {
        self.id
    }

    /// Returns the provider's display name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the declared output target.
    #[must_use]
    pub fn output(&self) -> Key {
        self.output
    }

    /// Returns the ordered parameter list.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Returns the interface keys this provider can also serve.
    pub fn interfaces(&self) -> impl Iterator<Item = Key> + '_ {
        self.casts.iter().map(|(key, _)| *key)
    }

    /// Invokes the factory and packs the product for the requested target.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructError`] when the call fails or when the requested
    /// target is neither the declared output nor a bound interface.
    pub(crate) fn produce(
        &self,
        requested: Key,
        args: &mut Args,
    ) -> Result<Option<Instance>, ConstructError> {
        let Some(instance) = (self.call)(args)? else {
            return Ok(None);
        };

        if requested == self.output {
            return Ok(Some(instance));
        }

        let (_, apply) = self
            .casts
            .iter()
            .find(|(key, _)| *key == requested)
            .ok_or(ConstructError::WrongTarget {
                factory: self.name,
                requested: requested.name(),
            })?;

        apply(&instance)
            .map(Some)
            .ok_or(ConstructError::WrongTarget {
                factory: self.name,
                requested: requested.name(),
            })
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("output", &self.output.name())
            .field("params", &self.params.len())
            .finish()
    }
}
