//! The layered recursive resolver.
//!
//! Every `resolve` call pushes one [`Layer`] onto the container's layer
//! stack and runs the build against it. A layer bundles three things:
//!
//! - a rule view: a named context's rule table, or an ad-hoc override map
//! - a cache view: the context's persistent singleton cache for the
//!   outermost call, or an ephemeral map for nested calls started from
//!   inside a factory
//! - the visited set used for cycle detection during this one logical call
//!
//! Lookups walk the stack top to bottom, so a nested call sees its own
//! overrides first and falls back to the layers of the calls beneath it.
//! Singletons cache at the layer where their rule was found — a rule
//! declared in a parent layer caches at that parent layer, so sibling
//! resolutions sharing the parent see the same instance. When no rule is
//! found anywhere, the bottom layer is the slot, which for a top-level call
//! is the context's persistent cache.
//!
//! A redirect rule swaps the whole subtree into the named context: the
//! flagged dependency and everything below it resolve against that context's
//! rules and cache, one hop at a time.

use core::cell::RefCell;

use hashbrown::{HashMap, HashSet};

use crate::error::{Frame, ResolveError, ResolveErrorKind};
use crate::key::{Instance, Key};
use crate::provider::{Args, ParamKind, Provider};
use crate::registry::Registry;
use crate::rules::{DEFAULT_CONTEXT, Rule, Scope};

// ─────────────────────────────────────────────────────────────────────────────
// Container state
// ─────────────────────────────────────────────────────────────────────────────

/// Everything the container owns, kept behind its reentrant lock.
pub(crate) struct State {
    pub(crate) registry: Registry,
    /// Named rule contexts. The default context always exists.
    pub(crate) contexts: HashMap<String, HashMap<Key, Rule>>,
    /// Persistent singleton caches, one per context, created lazily.
    pub(crate) caches: HashMap<String, HashMap<Key, Instance>>,
    /// Active resolve layers, bottom to top.
    pub(crate) stack: Vec<Layer>,
}

impl State {
    pub(crate) fn new() -> Self {
        let mut contexts = HashMap::new();
        contexts.insert(DEFAULT_CONTEXT.to_string(), HashMap::new());
        Self {
            registry: Registry::new(),
            contexts,
            caches: HashMap::new(),
            stack: Vec::new(),
        }
    }
}

/// One resolve call's view of rules, cache, and visited targets.
pub(crate) struct Layer {
    pub(crate) rules: RuleLayer,
    pub(crate) cache: CacheLayer,
    pub(crate) visited: HashSet<Key>,
}

/// Where a layer reads rules from.
pub(crate) enum RuleLayer {
    /// The named context's rule table.
    Context(String),
    /// An ad-hoc override map supplied to `resolve_with`.
    Overrides(HashMap<Key, Rule>),
}

/// Where a layer caches singletons.
pub(crate) enum CacheLayer {
    /// The named context's persistent cache.
    Context(String),
    /// A cache that dies with the layer; used by nested resolve calls.
    Ephemeral(HashMap<Key, Instance>),
}

/// Which rule/cache tables a build step consults.
#[derive(Clone)]
enum Mode {
    /// The layer stack, walked top to bottom.
    Layered,
    /// A redirect subtree: one named context only.
    Context(String),
}

/// Where a built singleton is stored.
enum Slot {
    /// An ephemeral layer, addressed by stack index.
    Layer(usize),
    /// A context's persistent cache.
    Context(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// The resolver for one layer of one logical resolve call.
///
/// Holds no state borrow across factory invocations, so factories are free
/// to reenter the container with nested resolve calls.
pub(crate) struct Builder<'a> {
    state: &'a RefCell<State>,
    layer: usize,
}

impl<'a> Builder<'a> {
    pub(crate) fn new(state: &'a RefCell<State>, layer: usize) -> Self {
        Self { state, layer }
    }

    /// Builds the requested target against the layer stack.
    pub(crate) fn resolve(&self, key: Key) -> Result<Option<Instance>, ResolveError> {
        self.build(key, Mode::Layered)
    }

    fn build(&self, key: Key, mode: Mode) -> Result<Option<Instance>, ResolveError> {
        // A cache hit means this branch already completed; no cycle check.
        if let Some(hit) = self.cached(key, &mode) {
            return Ok(Some(hit));
        }

        let (rule, slot) = self.rule_for(key, &mode);

        // A redirect swaps this target and its subtree into the named
        // context. One hop only: a redirect found after the hop is ignored.
        let (rule, slot, mode) = match rule.redirect.clone() {
            Some(context) => {
                let mode = Mode::Context(context);
                if let Some(hit) = self.cached(key, &mode) {
                    return Ok(Some(hit));
                }
                let (rule, slot) = self.rule_for(key, &mode);
                (rule, slot, mode)
            }
            None => (rule, slot, mode),
        };

        // A pre-built instance is returned verbatim: no registry lookup,
        // no cycle check, no caching.
        if let Some(ready) = &rule.instance {
            return Ok(Some(ready.clone()));
        }

        if !self.mark(key) {
            let mut error = ResolveError::new(ResolveErrorKind::CycleDetected { target: key });
            error.push_frame(Frame::for_target(key, &rule));
            return Err(error);
        }
        let built = self.construct(key, &rule, slot, &mode);
        self.unmark(key);
        built
    }

    /// Runs factory selection, parameter resolution, construction, and
    /// caching, stamping a trail frame onto any failure.
    fn construct(
        &self,
        key: Key,
        rule: &Rule,
        slot: Slot,
        mode: &Mode,
    ) -> Result<Option<Instance>, ResolveError> {
        let mut frame = Frame::for_target(key, rule);
        match self.try_construct(key, rule, slot, mode, &mut frame) {
            Ok(value) => Ok(value),
            Err(mut error) => {
                error.push_frame(frame);
                Err(error)
            }
        }
    }

    fn try_construct(
        &self,
        key: Key,
        rule: &Rule,
        slot: Slot,
        mode: &Mode,
        frame: &mut Frame,
    ) -> Result<Option<Instance>, ResolveError> {
        tracing::trace!(building = key.name(), "constructing target");

        // Factory selection: an explicit factory short-circuits
        // disambiguation.
        let provider = match &rule.provider {
            Some(provider) => provider.clone(),
            None => self.select_provider(key)?,
        };
        frame.factory = Some(provider.name());

        // Literal arguments come from the factory's own rule, which is the
        // target's rule unless an override factory produces another type.
        let factory_rule = if provider.output() == key {
            rule.clone()
        } else {
            let (factory_rule, _) = self.rule_for(provider.output(), mode);
            frame.factory_rule = Some(format!("{factory_rule:?}"));
            factory_rule
        };

        // Parameter resolution, strictly in declaration order.
        let mut args = Args::new();
        for param in provider.params() {
            frame.parameter = Some(param.name());

            if let Some(value) = factory_rule.init_value(param.name()) {
                args.insert(param.name(), value.clone());
                frame.assembled.push(param.name());
                continue;
            }

            match param.kind() {
                // Leaves and callables are never manufactured here. Without
                // a default the factory call itself reports the gap.
                ParamKind::Leaf(_) | ParamKind::Callable => {
                    if let Some(value) = param.default_value() {
                        args.insert(param.name(), value);
                        frame.assembled.push(param.name());
                    }
                }
                ParamKind::Dependency(dependency) => {
                    let dependency = *dependency;
                    let resolved = match self.build(dependency, mode.clone()) {
                        Ok(value) => value,
                        Err(error)
                            if param.has_default()
                                && error.no_implementation_for(dependency) =>
                        {
                            None
                        }
                        Err(error) => return Err(error),
                    };
                    match resolved {
                        Some(value) => {
                            args.insert(param.name(), value);
                            frame.assembled.push(param.name());
                        }
                        None => match param.default_value() {
                            Some(value) => {
                                args.insert(param.name(), value);
                                frame.assembled.push(param.name());
                            }
                            None => {
                                return Err(ResolveError::new(
                                    ResolveErrorKind::MissingDependency {
                                        parameter: param.name(),
                                        factory: provider.name(),
                                        target: key,
                                    },
                                ));
                            }
                        },
                    }
                }
            }
        }

        // Construction. No state borrow is held here: the factory may call
        // back into the container through a nested resolve.
        let produced = provider.produce(key, &mut args).map_err(|cause| {
            ResolveError::new(ResolveErrorKind::Construction {
                factory: provider.name(),
                source: cause,
            })
        })?;

        // Transient targets are never cached; a factory that produced
        // nothing leaves no cache entry either.
        if let Some(instance) = &produced {
            if rule.scope == Scope::Singleton {
                self.store(slot, key, instance.clone());
            }
        }

        Ok(produced)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lookup helpers (each takes and drops its own state borrow)
    // ─────────────────────────────────────────────────────────────────────

    fn select_provider(&self, key: Key) -> Result<Provider, ResolveError> {
        let state = self.state.borrow();
        let candidates = state.registry.providers(&key);
        match candidates {
            [] => Err(ResolveError::new(ResolveErrorKind::NoImplementation {
                target: key,
            })),
            [single] => Ok(single.clone()),
            _ => Err(ResolveError::new(
                ResolveErrorKind::AmbiguousImplementation {
                    target: key,
                    candidates: candidates.iter().map(Provider::name).collect(),
                },
            )),
        }
    }

    fn cached(&self, key: Key, mode: &Mode) -> Option<Instance> {
        let state = self.state.borrow();
        match mode {
            Mode::Layered => {
                for layer in state.stack[..=self.layer].iter().rev() {
                    let hit = match &layer.cache {
                        CacheLayer::Ephemeral(cache) => cache.get(&key),
                        CacheLayer::Context(context) => {
                            state.caches.get(context).and_then(|cache| cache.get(&key))
                        }
                    };
                    if let Some(instance) = hit {
                        return Some(instance.clone());
                    }
                }
                None
            }
            Mode::Context(context) => state
                .caches
                .get(context)
                .and_then(|cache| cache.get(&key))
                .cloned(),
        }
    }

    /// Finds the nearest rule for a target and the slot its singleton would
    /// cache into. No rule anywhere means the empty rule, slotted at the
    /// bottom layer.
    fn rule_for(&self, key: Key, mode: &Mode) -> (Rule, Slot) {
        let state = self.state.borrow();
        match mode {
            Mode::Layered => {
                for (index, layer) in state.stack[..=self.layer].iter().enumerate().rev() {
                    let found = match &layer.rules {
                        RuleLayer::Overrides(rules) => rules.get(&key),
                        RuleLayer::Context(context) => {
                            state.contexts.get(context).and_then(|rules| rules.get(&key))
                        }
                    };
                    if let Some(rule) = found {
                        return (rule.clone(), Self::slot_for(&state, index));
                    }
                }
                (Rule::default(), Self::slot_for(&state, 0))
            }
            Mode::Context(context) => {
                let rule = state
                    .contexts
                    .get(context)
                    .and_then(|rules| rules.get(&key))
                    .cloned()
                    .unwrap_or_default();
                (rule, Slot::Context(context.clone()))
            }
        }
    }

    fn slot_for(state: &State, index: usize) -> Slot {
        match &state.stack[index].cache {
            CacheLayer::Ephemeral(_) => Slot::Layer(index),
            CacheLayer::Context(context) => Slot::Context(context.clone()),
        }
    }

    fn store(&self, slot: Slot, key: Key, instance: Instance) {
        let mut state = self.state.borrow_mut();
        match slot {
            Slot::Layer(index) => {
                if let Some(CacheLayer::Ephemeral(cache)) =
                    state.stack.get_mut(index).map(|layer| &mut layer.cache)
                {
                    cache.insert(key, instance);
                }
            }
            Slot::Context(context) => {
                state.caches.entry(context).or_default().insert(key, instance);
            }
        };
    }

    /// Marks a target as in-flight; false means it was already being built.
    fn mark(&self, key: Key) -> bool {
        self.state.borrow_mut().stack[self.layer].visited.insert(key)
    }

    /// Clears the in-flight mark so sibling branches of the graph are not
    /// falsely flagged as cyclic.
    fn unmark(&self, key: Key) {
        self.state.borrow_mut().stack[self.layer].visited.remove(&key);
    }
}
