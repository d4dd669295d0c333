//! Error taxonomy and the resolution trail.
//!
//! Resolution failures are never retried: the error unwinds the whole
//! recursive build, and every frame on the way out adds its position — the
//! target being built, its rule, the chosen factory, the arguments that were
//! already assembled, and the parameter being worked on. Rendering the
//! accumulated [`Frame`]s outermost-first shows the full dependency path
//! from the originally requested target down to the point of failure.

use core::fmt;

use crate::key::Key;
use crate::provider::ConstructError;

/// Errors raised while populating the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// A concrete type listed itself among its own interfaces.
    #[error("`{target}` declares itself as one of its own interfaces")]
    SelfBinding {
        /// The offending type's name.
        target: &'static str,
    },

    /// A concrete type listed the same interface twice.
    #[error("`{target}` declares interface `{interface}` more than once")]
    DuplicateBinding {
        /// The offending type's name.
        target: &'static str,
        /// The interface declared twice.
        interface: &'static str,
    },
}

/// The reason a resolution failed.
#[derive(Debug, thiserror::Error)]
pub enum ResolveErrorKind {
    /// The target has no candidate factories and no overriding rule.
    #[error("`{target}` has no registered implementation")]
    NoImplementation {
        /// The unresolvable target.
        target: Key,
    },

    /// The target has several candidate factories and no disambiguating
    /// rule.
    #[error("cannot disambiguate `{target}`; implementations are: {candidates:?}")]
    AmbiguousImplementation {
        /// The ambiguous target.
        target: Key,
        /// Display names of the competing factories.
        candidates: Vec<&'static str>,
    },

    /// The target was encountered twice within one resolution.
    #[error("cycle detected on `{target}`")]
    CycleDetected {
        /// The target closing the cycle.
        target: Key,
    },

    /// A required parameter produced no value and has no default.
    #[error(
        "cannot resolve parameter `{parameter}` of `{factory}` while building `{target}`: \
         the dependency produced no value and the parameter has no default"
    )]
    MissingDependency {
        /// The unresolvable parameter's name.
        parameter: &'static str,
        /// The factory that needed the parameter.
        factory: &'static str,
        /// The target being built.
        target: Key,
    },

    /// The chosen factory failed when invoked with assembled arguments.
    #[error("factory `{factory}` failed: {source}")]
    Construction {
        /// The failing factory's name.
        factory: &'static str,
        /// The underlying cause.
        #[source]
        source: ConstructError,
    },

    /// The factory for the requested target produced no value.
    #[error("resolution of `{target}` produced no instance")]
    NoInstance {
        /// The requested target.
        target: Key,
    },

    /// The resolved value does not extract as the requested type. Reachable
    /// only through a mis-packed pre-built instance or literal argument.
    #[error("resolved value for `{target}` is packed as `{found}`")]
    WrongType {
        /// The requested target.
        target: Key,
        /// The type the value was actually packed as.
        found: &'static str,
    },
}

/// One position in the dependency path, recorded while an error unwinds.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The target being built at this level.
    pub target: &'static str,
    /// A summary of the target's effective rule.
    pub rule: String,
    /// The factory chosen for the target, when selection got that far.
    pub factory: Option<&'static str>,
    /// A summary of the factory's own rule, when distinct from the target's.
    pub factory_rule: Option<String>,
    /// Names of the arguments assembled before the failure.
    pub assembled: Vec<&'static str>,
    /// The parameter being worked on when the failure occurred.
    pub parameter: Option<&'static str>,
}

impl Frame {
    pub(crate) fn for_target(target: Key, rule: &crate::rules::Rule) -> Self {
        Self {
            target: target.name(),
            rule: format!("{rule:?}"),
            factory: None,
            factory_rule: None,
            assembled: Vec::new(),
            parameter: None,
        }
    }
}

/// A failed resolution: the reason plus the dependency path leading to it.
#[derive(Debug)]
pub struct ResolveError {
    kind: ResolveErrorKind,
    trail: Vec<Frame>,
}

impl ResolveError {
    pub(crate) fn new(kind: ResolveErrorKind) -> Self {
        Self {
            kind,
            trail: Vec::new(),
        }
    }

    pub(crate) fn push_frame(&mut self, frame: Frame) {
        self.trail.push(frame);
    }

    pub(crate) fn no_implementation_for(&self, key: Key) -> bool {
        matches!(self.kind, ResolveErrorKind::NoImplementation { target } if target == key)
    }

    /// Returns the failure reason.
    #[must_use]
    pub fn kind(&self) -> &ResolveErrorKind {
        &self.kind
    }

    /// Returns the dependency path, innermost frame first.
    #[must_use]
    pub fn trail(&self) -> &[Frame] {
        &self.trail
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if self.trail.is_empty() {
            return Ok(());
        }
        f.write_str("\ndependency path:")?;
        for frame in self.trail.iter().rev() {
            write!(f, "\n  -> `{}` [{}]", frame.target, frame.rule)?;
            if let Some(factory) = frame.factory {
                write!(f, " via `{factory}`")?;
            }
            if let Some(factory_rule) = &frame.factory_rule {
                write!(f, " [{factory_rule}]")?;
            }
            if !frame.assembled.is_empty() {
                write!(f, " assembled({})", frame.assembled.join(", "))?;
            }
            if let Some(parameter) = frame.parameter {
                write!(f, " at parameter `{parameter}`")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
