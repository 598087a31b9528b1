//! Construction Graph
//!
//! This module implements the dependency-aware computation graph: a store
//! of named elements whose values are either directly supplied or derived
//! by rules over other elements.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes are named elements, placed or constructed
//! - Edges run from each constructed element to the elements its rule reads
//!
//! When a placed element's value changes, the engine walks the reverse
//! edges to find every transitive dependent and recomputes them in
//! dependency order. When an element is removed, the same closure is
//! deleted instead.
//!
//! # Design Decisions
//!
//! 1. A centralized store rather than distributed per-node links, because
//!    it keeps topological ordering and cycle detection simple and gives
//!    one place where the edge-mirroring invariant is maintained.
//!
//! 2. The store is an `IndexMap` keyed by name: O(1) lookup with
//!    insertion-order iteration, so diagnostics and error output are
//!    reproducible run to run.
//!
//! 3. Both forward (`requires`) and reverse (`required_by`) edge sets are
//!    maintained, enabling efficient traversal in either direction.
//!
//! 4. Insertion-time checks keep cycles out of the edge sets, but the
//!    traversals in propagation and cascade removal still carry revisit
//!    guards: a cycle deliberately introduced via `replace` is an
//!    invariant violation to detect and fail fast on, not to loop over.

mod construction;
mod element;
mod order;

pub use construction::Construction;
pub use element::{Definition, Rule, Scope};
