//! Per-target resolution rules.
//!
//! A [`Rule`] tells the resolver how to deviate from plain registry lookup
//! for one target: literal constructor arguments, an explicit factory, a
//! lifecycle [`Scope`], a pre-built instance, or a redirect into another
//! named rule context. Rules are merged into the container in batches via
//! [`RuleSet`], which also auto-registers every target it mentions — adding
//! a rule is enough to make a concrete type resolvable.
//!
//! # Exclusivity
//!
//! A pre-built instance cannot be combined with literal arguments or an
//! explicit factory, and must stay [`Scope::Singleton`]: a ready object can
//! be neither customized at construction time nor rebuilt. A redirect
//! excludes everything else. Violations are programming errors and panic at
//! rule construction time.
//!
//! # Example
//!
//! ```
//! use ravel_container::rules::{Rule, RuleSet, Scope};
//! # use ravel_container::provider::{Args, Construct, ConstructError, Param};
//! # struct Endpoint { host: String, port: u16 }
//! # impl Construct for Endpoint {
//! #     fn parameters() -> Vec<Param> {
//! #         vec![Param::leaf::<String>("host"), Param::leaf::<u16>("port")]
//! #     }
//! #     fn construct(args: &mut Args) -> Result<Self, ConstructError> {
//! #         Ok(Self { host: args.value("host")?, port: args.value("port")? })
//! #     }
//! # }
//!
//! let rules = RuleSet::new().component::<Endpoint>(
//!     Rule::new()
//!         .arg("host", String::from("127.0.0.1"))
//!         .arg("port", 8080u16)
//!         .scope(Scope::Transient),
//! );
//! assert_eq!(rules.len(), 1);
//! ```

use core::fmt;
use std::sync::Arc;

use crate::key::{Instance, Key};
use crate::provider::{Construct, Provider};
use crate::registry::{Registration, component, interface};

/// The name of the context used when no explicit context is given.
pub const DEFAULT_CONTEXT: &str = "default";

/// Lifecycle of a resolved target.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Built once per cache layer and reused thereafter.
    #[default]
    Singleton,
    /// Rebuilt on every resolution, never cached.
    Transient,
}

/// Per-target overrides consulted by the resolver.
///
/// An empty rule (the default) means: resolve through the registry, all
/// parameters recursed, singleton lifecycle.
#[derive(Clone, Default)]
pub struct Rule {
    pub(crate) init: Vec<(&'static str, Instance)>,
    pub(crate) provider: Option<Provider>,
    pub(crate) scope: Scope,
    pub(crate) instance: Option<Instance>,
    pub(crate) redirect: Option<String>,
}

impl Rule {
    /// Creates an empty rule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a redirect: resolve this target inside the named context
    /// instead of the current one. Exclusive with every other setting.
    #[must_use]
    pub fn redirect(context: impl Into<String>) -> Self {
        Self {
            redirect: Some(context.into()),
            ..Self::default()
        }
    }

    /// Supplies a literal value for a named constructor parameter.
    ///
    /// The value is used as-is; the resolver never recurses for parameters
    /// named here. Most often used for leaves (numbers, strings) that the
    /// container does not manufacture.
    ///
    /// # Panics
    ///
    /// Panics if the rule already carries a pre-built instance or is a
    /// redirect.
    #[must_use]
    pub fn arg<V: Send + Sync + 'static>(self, name: &'static str, value: V) -> Self {
        self.arg_arc::<V>(name, Arc::new(value))
    }

    /// Supplies a literal shared value for a named parameter, packed for
    /// target type `T`. Use this form when the parameter is declared as a
    /// trait object.
    ///
    /// # Panics
    ///
    /// Panics if the rule already carries a pre-built instance or is a
    /// redirect.
    #[must_use]
    pub fn arg_arc<T: ?Sized + Send + Sync + 'static>(
        mut self,
        name: &'static str,
        value: Arc<T>,
    ) -> Self {
        assert!(
            self.instance.is_none(),
            "a rule can carry either a pre-built instance or literal arguments, not both"
        );
        assert!(self.redirect.is_none(), "a redirect rule carries nothing else");
        self.init.push((name, Instance::of::<T>(value)));
        self
    }

    /// Selects an explicit factory, bypassing registry lookup and
    /// disambiguation for this target.
    ///
    /// # Panics
    ///
    /// Panics if the rule already carries a pre-built instance or is a
    /// redirect.
    #[must_use]
    pub fn factory(mut self, provider: Provider) -> Self {
        assert!(
            self.instance.is_none(),
            "a rule can carry either a pre-built instance or a factory, not both"
        );
        assert!(self.redirect.is_none(), "a redirect rule carries nothing else");
        self.provider = Some(provider);
        self
    }

    /// Sets the lifecycle scope.
    ///
    /// # Panics
    ///
    /// Panics if the rule carries a pre-built instance and the scope is not
    /// [`Scope::Singleton`], or if the rule is a redirect.
    #[must_use]
    pub fn scope(mut self, scope: Scope) -> Self {
        assert!(
            self.instance.is_none() || scope == Scope::Singleton,
            "a pre-built instance cannot be rebuilt; its scope must stay Singleton"
        );
        assert!(self.redirect.is_none(), "a redirect rule carries nothing else");
        self.scope = scope;
        self
    }

    /// Supplies a pre-built value returned verbatim on every resolution of
    /// this target.
    ///
    /// # Panics
    ///
    /// Panics if the rule already carries literal arguments, a factory, a
    /// non-singleton scope, or is a redirect.
    #[must_use]
    pub fn instance<V: Send + Sync + 'static>(self, value: V) -> Self {
        self.instance_arc::<V>(Arc::new(value))
    }

    /// Supplies a pre-built shared value, packed for target type `T`. Use
    /// this form when the target is a trait object.
    ///
    /// # Panics
    ///
    /// Same conditions as [`instance`](Self::instance).
    #[must_use]
    pub fn instance_arc<T: ?Sized + Send + Sync + 'static>(mut self, value: Arc<T>) -> Self {
        assert!(
            self.init.is_empty() && self.provider.is_none() && self.scope == Scope::Singleton,
            "a pre-built instance excludes literal arguments and factories, \
             and its scope must stay Singleton"
        );
        assert!(self.redirect.is_none(), "a redirect rule carries nothing else");
        self.instance = Some(Instance::of::<T>(value));
        self
    }

    /// Looks up a literal argument by parameter name. Later entries win.
    pub(crate) fn init_value(&self, name: &str) -> Option<&Instance> {
        self.init
            .iter()
            .rev()
            .find(|(entry, _)| *entry == name)
            .map(|(_, value)| value)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule(scope={:?}", self.scope)?;
        if !self.init.is_empty() {
            let names: Vec<&str> = self.init.iter().map(|(name, _)| *name).collect();
            write!(f, ", init=[{}]", names.join(", "))?;
        }
        if let Some(provider) = &self.provider {
            write!(f, ", factory={}", provider.name())?;
        }
        if self.instance.is_some() {
            f.write_str(", instance")?;
        }
        if let Some(context) = &self.redirect {
            write!(f, ", redirect={context}")?;
        }
        f.write_str(")")
    }
}

/// An ordered batch of rules to merge into a context.
///
/// Every entry also records how to auto-register the target it mentions:
/// concrete types register themselves as components; anything else gets an
/// abstract placeholder. Rules added later for the same target replace
/// earlier ones on merge.
#[derive(Clone, Default)]
pub struct RuleSet {
    pub(crate) entries: Vec<RuleEntry>,
}

#[derive(Clone)]
pub(crate) struct RuleEntry {
    pub(crate) key: Key,
    pub(crate) rule: Rule,
    pub(crate) registration: Option<Registration>,
}

impl RuleSet {
    /// Creates an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule for a concrete [`Construct`] type, auto-registering it.
    #[must_use]
    pub fn component<T: Construct>(mut self, rule: Rule) -> Self {
        self.entries.push(RuleEntry {
            key: Key::of::<T>(),
            rule,
            registration: Some(component::<T>()),
        });
        self
    }

    /// Adds a rule for any target (typically an abstract interface),
    /// auto-registering a placeholder for it.
    #[must_use]
    pub fn target<T: ?Sized + Send + Sync + 'static>(mut self, rule: Rule) -> Self {
        self.entries.push(RuleEntry {
            key: Key::of::<T>(),
            rule,
            registration: Some(interface::<T>()),
        });
        self
    }

    /// Returns the number of rules in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the set contains no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
