//! Graph Elements
//!
//! This module defines the element types that live in a construction graph.
//!
//! # The Two Kinds of Element
//!
//! - A *placed* element holds a directly supplied value. It has no
//!   dependencies, only dependents. Placed elements are the roots of the
//!   graph and the only elements `modify` accepts.
//!
//! - A *constructed* element holds a value derived by a rule over an
//!   explicit set of other elements. Its `requires` set is fixed at
//!   creation; the engine re-runs the rule whenever anything upstream
//!   changes.
//!
//! Both kinds carry a `required_by` set, the inverse of `requires`. The
//! two sets are only ever touched by the owning [`Construction`]'s own
//! mutating operations, which keep them mirror images of each other.
//!
//! [`Construction`]: crate::graph::Construction

use std::fmt::Debug;
use std::sync::Arc;

use indexmap::IndexSet;

use crate::error::{GraphError, RuleError};

/// A rule derives a constructed element's value from the graph.
///
/// Rules are pure, synchronous, and read-only: the [`Scope`] they receive
/// exposes nothing beyond `get`. A rule may fail; the failure surfaces to
/// the caller of whichever operation triggered the evaluation.
pub type Rule<V> = Arc<dyn Fn(&dyn Scope<V>) -> Result<V, RuleError> + Send + Sync>;

/// Read-only view of a construction, passed to rules during evaluation.
///
/// A rule is guaranteed that every name in its declared dependency set
/// holds an up-to-date value at invocation time. Narrowing the rule's
/// access to this trait prevents it from mutating the store it is being
/// evaluated against.
pub trait Scope<V> {
    /// Look up an element's current value by name.
    fn get(&self, name: &str) -> Result<&V, GraphError>;
}

/// A caller-facing description of an element, consumed by `replace` and by
/// the creation operations internally.
pub enum Definition<V> {
    /// A directly supplied value.
    Placed(V),

    /// A rule over an explicit dependency set.
    Constructed {
        rule: Rule<V>,
        requires: Vec<String>,
    },
}

impl<V> Definition<V> {
    /// Definition of a placed element.
    pub fn placed(value: V) -> Self {
        Self::Placed(value)
    }

    /// Definition of a constructed element with the given dependencies.
    pub fn constructed<F, I, S>(requires: I, rule: F) -> Self
    where
        F: Fn(&dyn Scope<V>) -> Result<V, RuleError> + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Constructed {
            rule: Arc::new(rule),
            requires: requires.into_iter().map(Into::into).collect(),
        }
    }
}

/// An element in the construction graph.
///
/// The discriminant is load-bearing: `modify` accepts only `Placed`,
/// propagation re-runs rules only on `Constructed`, and ordering treats a
/// `Placed` element as having an empty dependency set.
pub enum Element<V> {
    /// A directly supplied value with no dependencies.
    Placed {
        value: V,
        required_by: IndexSet<String>,
    },

    /// A rule-derived value over a fixed dependency set.
    Constructed {
        value: V,
        required_by: IndexSet<String>,
        requires: IndexSet<String>,
        rule: Rule<V>,
    },
}

impl<V> Element<V> {
    /// Create a placed element.
    pub(crate) fn placed(value: V, required_by: IndexSet<String>) -> Self {
        Self::Placed { value, required_by }
    }

    /// Create a constructed element with an already-computed value.
    pub(crate) fn constructed(
        value: V,
        requires: IndexSet<String>,
        rule: Rule<V>,
        required_by: IndexSet<String>,
    ) -> Self {
        Self::Constructed {
            value,
            required_by,
            requires,
            rule,
        }
    }

    /// Whether this is a placed element.
    pub fn is_placed(&self) -> bool {
        matches!(self, Self::Placed { .. })
    }

    /// Whether this is a constructed element.
    pub fn is_constructed(&self) -> bool {
        matches!(self, Self::Constructed { .. })
    }

    /// The element's current value.
    pub fn value(&self) -> &V {
        match self {
            Self::Placed { value, .. } | Self::Constructed { value, .. } => value,
        }
    }

    /// Overwrite the element's stored value.
    pub(crate) fn set_value(&mut self, new_value: V) {
        match self {
            Self::Placed { value, .. } | Self::Constructed { value, .. } => *value = new_value,
        }
    }

    /// Names that directly depend on this element.
    pub fn required_by(&self) -> &IndexSet<String> {
        match self {
            Self::Placed { required_by, .. } | Self::Constructed { required_by, .. } => required_by,
        }
    }

    /// Mutable access to the dependent set, for the store's own edge
    /// maintenance only.
    pub(crate) fn required_by_mut(&mut self) -> &mut IndexSet<String> {
        match self {
            Self::Placed { required_by, .. } | Self::Constructed { required_by, .. } => required_by,
        }
    }

    /// Names this element's rule reads, or `None` for a placed element.
    pub fn requires(&self) -> Option<&IndexSet<String>> {
        match self {
            Self::Placed { .. } => None,
            Self::Constructed { requires, .. } => Some(requires),
        }
    }

    /// The element's rule, or `None` for a placed element.
    pub(crate) fn rule(&self) -> Option<&Rule<V>> {
        match self {
            Self::Placed { .. } => None,
            Self::Constructed { rule, .. } => Some(rule),
        }
    }
}

impl<V> Clone for Element<V>
where
    V: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Self::Placed { value, required_by } => Self::Placed {
                value: value.clone(),
                required_by: required_by.clone(),
            },
            Self::Constructed {
                value,
                required_by,
                requires,
                rule,
            } => Self::Constructed {
                value: value.clone(),
                required_by: required_by.clone(),
                requires: requires.clone(),
                rule: Arc::clone(rule),
            },
        }
    }
}

impl<V> Debug for Element<V>
where
    V: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placed { value, required_by } => f
                .debug_struct("Placed")
                .field("value", value)
                .field("required_by", required_by)
                .finish(),
            Self::Constructed {
                value,
                required_by,
                requires,
                ..
            } => f
                .debug_struct("Constructed")
                .field("value", value)
                .field("requires", requires)
                .field("required_by", required_by)
                .finish(),
        }
    }
}
