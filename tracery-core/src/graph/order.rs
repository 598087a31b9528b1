//! Dependency Ordering
//!
//! Produces a linear arrangement of element names consistent with the
//! `requires` partial order, or reports the set of names entangled with a
//! cycle.
//!
//! # Algorithm
//!
//! Maintain a working set holding every name. Each round, collect the
//! "free" subset: names whose `requires` set is disjoint from the working
//! set, meaning all their dependencies have already been emitted. Emit the
//! free names and remove them from the working set. A round that frees
//! nothing while the working set is non-empty means the remainder forms, or
//! is entangled with, a cycle.
//!
//! Cost is quadratic in element count, which is acceptable at the scale
//! this engine targets (interactive graphs of up to a few thousand
//! elements).
//!
//! # Determinism
//!
//! Hash-set iteration order must not leak into results, so simultaneously
//! free names are emitted in lexicographic order, and the stuck set in a
//! `CycleDetected` report is sorted the same way. Two constructions with
//! the same elements always order, and fail, identically.

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use super::element::Element;
use crate::error::{GraphError, GraphResult};

/// Compute a dependency ordering of every name in the store.
///
/// Every name appears after all names in its `requires` set. Fails with
/// [`GraphError::CycleDetected`] naming the unorderable remainder.
pub(crate) fn dependency_order<V>(
    elements: &IndexMap<String, Element<V>>,
) -> GraphResult<Vec<String>> {
    let mut pending: IndexSet<String> = elements.keys().cloned().collect();
    let mut ordered = Vec::with_capacity(elements.len());

    while !pending.is_empty() {
        let mut free: SmallVec<[String; 8]> = pending
            .iter()
            .filter(|name| {
                elements
                    .get(name.as_str())
                    .and_then(Element::requires)
                    .map_or(true, |requires| requires.is_disjoint(&pending))
            })
            .cloned()
            .collect();

        if free.is_empty() {
            let mut stuck: Vec<String> = pending.into_iter().collect();
            stuck.sort();
            return Err(GraphError::CycleDetected { stuck });
        }

        free.sort();
        for name in free {
            pending.shift_remove(&name);
            ordered.push(name);
        }
    }

    Ok(ordered)
}
