//! Construction Store
//!
//! A [`Construction`] owns a mapping from unique name to element and is the
//! only sanctioned way to mutate or query that mapping. The public
//! operations are:
//!
//! - `place` / `construct`: create elements
//! - `modify`: change a placed element's value and recompute everything
//!   downstream
//! - `replace`: swap an element's definition while preserving its
//!   dependents
//! - `remove`: delete an element and cascade deletion to its dependents
//! - `get` / `order` / `describe`: read-only queries
//!
//! # Invariants
//!
//! Between mutating operations the store maintains:
//!
//! 1. `x` is in `y.requires` exactly when `y` is in `x.required_by`.
//! 2. `requires` sets reference only names currently in the store.
//! 3. No element is its own direct or transitive dependency, unless a
//!    cycle has been deliberately introduced via `replace`. Ordering and
//!    propagation detect such a cycle rather than silently tolerating it.
//!
//! Invariants are transiently broken inside a mutating call, which is why
//! concurrent use requires an external exclusive lock (see crate docs).
//!
//! # Failure Semantics
//!
//! Creation failures are mutation-free. Propagation failures are not
//! rolled back: elements recomputed earlier in the same pass keep their
//! new values. A caller needing atomicity around a risky mutation should
//! clone the construction first; `Clone` is a deep snapshot with rules
//! shared structurally.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::fmt::Write as _;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::element::{Definition, Element, Rule, Scope};
use super::order::dependency_order;
use crate::error::{GraphError, GraphResult, RuleError};

/// The read-only accessor handed to rules during evaluation.
struct StoreScope<'a, V> {
    elements: &'a IndexMap<String, Element<V>>,
}

impl<V> Scope<V> for StoreScope<'_, V> {
    fn get(&self, name: &str) -> Result<&V, GraphError> {
        self.elements
            .get(name)
            .map(Element::value)
            .ok_or_else(|| GraphError::ElementNotFound(name.to_string()))
    }
}

/// A dependency-aware computation graph of named elements.
///
/// `V` is the value payload. The engine never inspects it; it only clones
/// it across the API boundary and hands references to rules.
///
/// # Example
///
/// ```rust,ignore
/// let mut figure = Construction::new();
/// figure.place("a", 1)?;
/// figure.place("b", 2)?;
/// figure.construct("sum", |scope| Ok(scope.get("a")? + scope.get("b")?), ["a", "b"])?;
///
/// assert_eq!(*figure.get("sum")?, 3);
/// figure.modify("a", 5)?; // recomputes `sum`
/// assert_eq!(*figure.get("sum")?, 7);
/// ```
pub struct Construction<V> {
    elements: IndexMap<String, Element<V>>,
}

impl<V> Construction<V>
where
    V: Clone,
{
    /// Create an empty construction.
    pub fn new() -> Self {
        Self {
            elements: IndexMap::new(),
        }
    }

    /// Number of elements in the construction.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the construction holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether an element with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.elements.contains_key(name)
    }

    /// Element names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    /// Current value of the named element.
    pub fn get(&self, name: &str) -> GraphResult<&V> {
        self.elements
            .get(name)
            .map(Element::value)
            .ok_or_else(|| GraphError::ElementNotFound(name.to_string()))
    }

    /// Names the element's rule reads. Empty for a placed element.
    pub fn requires(&self, name: &str) -> GraphResult<Vec<String>> {
        let element = self
            .elements
            .get(name)
            .ok_or_else(|| GraphError::ElementNotFound(name.to_string()))?;
        Ok(element
            .requires()
            .into_iter()
            .flatten()
            .cloned()
            .collect())
    }

    /// Names that directly depend on the element.
    pub fn required_by(&self, name: &str) -> GraphResult<Vec<String>> {
        let element = self
            .elements
            .get(name)
            .ok_or_else(|| GraphError::ElementNotFound(name.to_string()))?;
        Ok(element.required_by().iter().cloned().collect())
    }

    /// A dependency ordering of every name in the construction.
    ///
    /// Every name appears after all names in its `requires` set.
    /// Simultaneously free names are emitted lexicographically, so the
    /// ordering is reproducible. Fails with
    /// [`GraphError::CycleDetected`] naming the unorderable remainder.
    pub fn order(&self) -> GraphResult<Vec<String>> {
        dependency_order(&self.elements)
    }

    /// Insert a placed element.
    ///
    /// Fails with [`GraphError::DuplicateName`] if the name exists; no
    /// mutation on failure. Returns the stored value.
    pub fn place(&mut self, name: impl Into<String>, value: V) -> GraphResult<V> {
        let name = name.into();
        if self.elements.contains_key(&name) {
            return Err(GraphError::DuplicateName(name));
        }

        self.elements
            .insert(name.clone(), Element::placed(value.clone(), IndexSet::new()));
        debug!(element = %name, "placed element");
        Ok(value)
    }

    /// Insert a constructed element.
    ///
    /// The duplicate check runs first, then the dependency-existence
    /// check, and only then is the rule invoked against the current store
    /// to compute the initial value. Any failure leaves the store
    /// unchanged. On success the new name is registered in the
    /// `required_by` set of each dependency.
    pub fn construct<F, I, S>(
        &mut self,
        name: impl Into<String>,
        rule: F,
        requires: I,
    ) -> GraphResult<V>
    where
        F: Fn(&dyn Scope<V>) -> Result<V, RuleError> + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if self.elements.contains_key(&name) {
            return Err(GraphError::DuplicateName(name));
        }

        let requires: IndexSet<String> = requires.into_iter().map(Into::into).collect();
        self.check_dependencies(&requires)?;

        let rule: Rule<V> = Arc::new(rule);
        let value = self.evaluate(&name, &rule)?;

        self.elements.insert(
            name.clone(),
            Element::constructed(value.clone(), requires.clone(), rule, IndexSet::new()),
        );
        for dep in &requires {
            if let Some(dependency) = self.elements.get_mut(dep) {
                dependency.required_by_mut().insert(name.clone());
            }
        }

        debug!(element = %name, requires = requires.len(), "constructed element");
        Ok(value)
    }

    /// Set a new value on a placed element and recompute everything
    /// downstream.
    ///
    /// Fails with [`GraphError::NotAPlacedElement`] on a constructed
    /// element. The value is set before propagation runs, so a
    /// propagation failure leaves the new value (and any elements already
    /// recomputed) in place.
    pub fn modify(&mut self, name: &str, value: V) -> GraphResult<V> {
        let element = self
            .elements
            .get_mut(name)
            .ok_or_else(|| GraphError::ElementNotFound(name.to_string()))?;
        if element.is_constructed() {
            return Err(GraphError::NotAPlacedElement(name.to_string()));
        }

        element.set_value(value.clone());
        debug!(element = %name, "modified element");
        self.propagate(name)?;
        Ok(value)
    }

    /// Swap an element's definition while preserving its dependents.
    ///
    /// The new definition is validated in full (dependency existence and,
    /// for a constructed definition, rule evaluation against the current
    /// store) before the old element is touched, so a validation failure
    /// leaves the store unchanged. On success the old element's
    /// `required_by` set carries over to the new element and every
    /// preserved dependent is recomputed against the new value.
    ///
    /// The replacement may list the replaced name among its own
    /// dependencies (its rule then reads the *old* value during
    /// validation). That deliberately introduces a cycle, which the
    /// subsequent propagation reports as [`GraphError::UpdateStalled`]
    /// and `order` reports as [`GraphError::CycleDetected`].
    pub fn replace(&mut self, name: &str, definition: Definition<V>) -> GraphResult<V> {
        let old_requires = match self.elements.get(name) {
            Some(element) => element.requires().cloned(),
            None => return Err(GraphError::ElementNotFound(name.to_string())),
        };

        // Validate the whole new definition before any mutation.
        let (value, constructed) = match definition {
            Definition::Placed(value) => (value, None),
            Definition::Constructed { rule, requires } => {
                let requires: IndexSet<String> = requires.into_iter().collect();
                self.check_dependencies(&requires)?;
                let value = self.evaluate(name, &rule)?;
                (value, Some((requires, rule)))
            }
        };

        // Detach the old definition's outgoing edges.
        if let Some(old_requires) = old_requires {
            for dep in &old_requires {
                if let Some(dependency) = self.elements.get_mut(dep) {
                    dependency.required_by_mut().shift_remove(name);
                }
            }
        }

        // Swap in the new definition under the same name, dependents
        // intact. Captured after detaching so a previously self-dependent
        // element does not resurrect its own back-edge.
        let required_by = self
            .elements
            .get(name)
            .map(|element| element.required_by().clone())
            .unwrap_or_default();

        match constructed {
            Some((requires, rule)) => {
                self.elements.insert(
                    name.to_string(),
                    Element::constructed(value.clone(), requires.clone(), rule, required_by),
                );
                for dep in &requires {
                    if let Some(dependency) = self.elements.get_mut(dep) {
                        dependency.required_by_mut().insert(name.to_string());
                    }
                }
            }
            None => {
                self.elements
                    .insert(name.to_string(), Element::placed(value.clone(), required_by));
            }
        }

        debug!(element = %name, "replaced element");
        self.propagate(name)?;
        Ok(value)
    }

    /// Delete an element and every transitive dependent.
    ///
    /// Dependents are deleted, never recomputed: their required input no
    /// longer exists. Deletion walks the dependent closure depth-first
    /// with a revisit guard, so even a deliberately introduced cycle
    /// cannot loop it.
    pub fn remove(&mut self, name: &str) -> GraphResult<()> {
        if !self.elements.contains_key(name) {
            return Err(GraphError::ElementNotFound(name.to_string()));
        }

        let mut stack = vec![name.to_string()];
        let mut visited: IndexSet<String> = IndexSet::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(element) = self.elements.shift_remove(&current) else {
                continue;
            };

            // Detach from each dependency that survives the cascade.
            if let Some(requires) = element.requires() {
                for dep in requires {
                    if let Some(dependency) = self.elements.get_mut(dep) {
                        dependency.required_by_mut().shift_remove(&current);
                    }
                }
            }

            for dependent in element.required_by() {
                stack.push(dependent.clone());
            }
            debug!(element = %current, "removed element");
        }

        Ok(())
    }

    /// Recompute the full transitive dependent closure of `origin`, in
    /// dependency order.
    ///
    /// Mirrors the ordering algorithm, restricted to the affected set:
    /// each round resolves the affected elements whose dependencies are
    /// all stable (outside the remaining affected set), re-running their
    /// rules against the current store. A round that resolves nothing
    /// means a cycle is reachable from `origin`.
    fn propagate(&mut self, origin: &str) -> GraphResult<()> {
        // Transitive closure of `required_by`, guarded against revisits so
        // a latent cycle cannot loop the traversal.
        let mut affected: IndexSet<String> = IndexSet::new();
        let mut queue: VecDeque<String> = self
            .elements
            .get(origin)
            .map(|element| element.required_by().iter().cloned().collect())
            .unwrap_or_default();

        while let Some(current) = queue.pop_front() {
            if !affected.insert(current.clone()) {
                continue;
            }
            if let Some(element) = self.elements.get(&current) {
                queue.extend(element.required_by().iter().cloned());
            }
        }

        trace!(origin = %origin, affected = affected.len(), "propagating");

        while !affected.is_empty() {
            let mut resolvable: SmallVec<[String; 8]> = affected
                .iter()
                .filter(|name| {
                    self.elements
                        .get(name.as_str())
                        .and_then(Element::requires)
                        .map_or(true, |requires| requires.is_disjoint(&affected))
                })
                .cloned()
                .collect();

            if resolvable.is_empty() {
                let mut stuck: Vec<String> = affected.into_iter().collect();
                stuck.sort();
                return Err(GraphError::UpdateStalled { stuck });
            }

            resolvable.sort();
            for name in resolvable {
                let rule = self.elements.get(&name).and_then(|e| e.rule().cloned());
                if let Some(rule) = rule {
                    let value = rule(&StoreScope {
                        elements: &self.elements,
                    })
                    .map_err(|source| GraphError::RecomputeFailed {
                        name: name.clone(),
                        source,
                    })?;
                    if let Some(element) = self.elements.get_mut(&name) {
                        element.set_value(value);
                    }
                    trace!(element = %name, "recomputed");
                }
                affected.shift_remove(&name);
            }
        }

        Ok(())
    }

    /// Check that every name in `requires` is present in the store.
    fn check_dependencies(&self, requires: &IndexSet<String>) -> GraphResult<()> {
        let mut missing: Vec<String> = requires
            .iter()
            .filter(|dep| !self.elements.contains_key(dep.as_str()))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            missing.sort();
            Err(GraphError::UnknownDependency { missing })
        }
    }

    /// Run a rule against the current store for an element's initial value.
    fn evaluate(&self, name: &str, rule: &Rule<V>) -> GraphResult<V> {
        rule(&StoreScope {
            elements: &self.elements,
        })
        .map_err(|source| GraphError::ConstructionRuleFailed {
            name: name.to_string(),
            source,
        })
    }
}

impl<V> Construction<V>
where
    V: Clone + Debug,
{
    /// Diagnostic dump: one line per element, in dependency order.
    ///
    /// A cyclic store degrades to an "unorderable" header followed by
    /// every element in insertion order; `CycleDetected` is never
    /// propagated to this display-only caller.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let names: Vec<String> = match self.order() {
            Ok(order) => order,
            Err(error) => {
                let _ = writeln!(out, "unorderable: {error}");
                self.elements.keys().cloned().collect()
            }
        };

        for name in names {
            if let Some(element) = self.elements.get(&name) {
                match element.requires() {
                    Some(requires) => {
                        let deps: Vec<&str> = requires.iter().map(String::as_str).collect();
                        let _ = writeln!(
                            out,
                            "{name} <- [{}] = {:?}",
                            deps.join(", "),
                            element.value()
                        );
                    }
                    None => {
                        let _ = writeln!(out, "{name} = {:?}", element.value());
                    }
                }
            }
        }
        out
    }
}

impl<V> Default for Construction<V>
where
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for Construction<V>
where
    V: Clone,
{
    fn clone(&self) -> Self {
        Self {
            elements: self.elements.clone(),
        }
    }
}

impl<V> Debug for Construction<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Construction")
            .field("len", &self.elements.len())
            .field("names", &self.elements.keys().collect::<Vec<_>>())
            .finish()
    }
}
