//! The object-graph resolution engine behind Ravel.
//!
//! `ravel_container` builds fully-wired instances of requested targets from
//! three pieces of state:
//!
//! - [`registry`] - which factories can produce which targets
//! - [`rules`] - per-target overrides (literal arguments, explicit factories,
//!   lifecycle scopes, pre-built instances, context redirects)
//! - the builder - the recursive resolver walking a layered rule/cache chain
//!
//! The [`container`] module ties them together behind a single facade that is
//! safe to share across threads and safe to re-enter from factories.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use ravel_container::prelude::*;
//!
//! trait Transport: Send + Sync {
//!     fn scheme(&self) -> &'static str;
//! }
//!
//! struct TcpTransport;
//!
//! impl Transport for TcpTransport {
//!     fn scheme(&self) -> &'static str {
//!         "tcp"
//!     }
//! }
//!
//! impl Construct for TcpTransport {
//!     fn bindings() -> Vec<Binding<Self>> {
//!         vec![Binding::of::<dyn Transport>(|it| it)]
//!     }
//!
//!     fn construct(_: &mut Args) -> Result<Self, ConstructError> {
//!         Ok(Self)
//!     }
//! }
//!
//! struct Mailer {
//!     transport: Arc<dyn Transport>,
//! }
//!
//! impl Construct for Mailer {
//!     fn parameters() -> Vec<Param> {
//!         vec![Param::dependency::<dyn Transport>("transport")]
//!     }
//!
//!     fn construct(args: &mut Args) -> Result<Self, ConstructError> {
//!         Ok(Self { transport: args.take::<dyn Transport>("transport")? })
//!     }
//! }
//!
//! let container = Container::new();
//! container.register((component::<TcpTransport>(), component::<Mailer>()))?;
//!
//! let mailer = container.resolve::<Mailer>()?;
//! assert_eq!(mailer.transport.scheme(), "tcp");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Target identity and type-erased shared instances.
pub mod key;

/// Factory metadata, constructor parameters, and the [`Construct`] trait.
pub mod provider;

/// The target-to-factories registry and registration variants.
pub mod registry;

/// Per-target rules, rule sets, and named rule contexts.
pub mod rules;

/// The layered recursive resolver.
mod builder;

/// Error taxonomy and the resolution trail.
pub mod error;

/// The container facade.
pub mod container;

pub use container::{Container, global};
pub use error::{Frame, RegistrationError, ResolveError, ResolveErrorKind};
pub use key::{Instance, Key};
pub use provider::{Args, Binding, Construct, ConstructError, Param, ParamKind, Provider, ProviderId};
pub use registry::{Register, Registration, Registry, component, factory, interface, namespace};
pub use rules::{DEFAULT_CONTEXT, Rule, RuleSet, Scope};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::container::{Container, global};
    pub use crate::error::{Frame, RegistrationError, ResolveError, ResolveErrorKind};
    pub use crate::key::{Instance, Key};
    pub use crate::provider::{
        Args, Binding, Construct, ConstructError, Param, ParamKind, Provider, ProviderId,
    };
    pub use crate::registry::{Register, Registration, Registry, component, factory, interface, namespace};
    pub use crate::rules::{DEFAULT_CONTEXT, Rule, RuleSet, Scope};
}
