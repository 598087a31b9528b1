//! Error types for the construction graph.
//!
//! Every fallible public operation returns a [`GraphError`]. Errors are
//! reported synchronously to the immediate caller and never retried by the
//! engine. Creation failures leave the store untouched; propagation failures
//! do not roll back elements already recomputed in the same pass (callers
//! needing atomicity should clone the construction first).

use thiserror::Error;

/// The error type a rule may fail with.
///
/// Rules are caller-supplied closures, so their failure payload is an opaque
/// boxed error. `GraphError` converts into it via `?`, which lets a rule
/// forward a failed [`Scope::get`](crate::graph::Scope::get) directly.
pub type RuleError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by construction graph operations.
#[derive(Error, Debug)]
pub enum GraphError {
    /// An element with this name already exists in the construction.
    #[error("an element named `{0}` already exists")]
    DuplicateName(String),

    /// A dependency list referenced names not present in the construction.
    /// The missing names are reported sorted.
    #[error("unknown dependencies: {}", .missing.join(", "))]
    UnknownDependency { missing: Vec<String> },

    /// No element with this name exists.
    #[error("no element named `{0}`")]
    ElementNotFound(String),

    /// The operation requires a placed element but found a constructed one.
    #[error("`{0}` is not a placed element")]
    NotAPlacedElement(String),

    /// A rule failed while computing an element's initial value, either
    /// during `construct` or during the recreation step of `replace`.
    #[error("rule for `{name}` failed during construction: {source}")]
    ConstructionRuleFailed {
        name: String,
        #[source]
        source: RuleError,
    },

    /// A rule failed while recomputing a downstream element during
    /// propagation. Elements recomputed earlier in the same pass keep
    /// their new values.
    #[error("rule for `{name}` failed during recompute: {source}")]
    RecomputeFailed {
        name: String,
        #[source]
        source: RuleError,
    },

    /// Ordering found a set of names none of which can be emitted: the
    /// names form, or are entangled with, a dependency cycle. Reported
    /// sorted.
    #[error("dependency cycle detected through: {}", .stuck.join(", "))]
    CycleDetected { stuck: Vec<String> },

    /// Propagation found affected elements none of which can be resolved,
    /// meaning a cycle is reachable from the modified element. Reported
    /// sorted.
    #[error("update stalled on: {}", .stuck.join(", "))]
    UpdateStalled { stuck: Vec<String> },
}

/// Convenience alias for operations on the construction graph.
pub type GraphResult<T> = Result<T, GraphError>;
