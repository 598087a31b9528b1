//! Tracery Core
//!
//! This crate provides the core engine for Tracery construction graphs:
//! containers of named elements that are either directly supplied values
//! ("placed") or values derived by a rule over other named elements
//! ("constructed").
//!
//! The engine maintains the dependency relation between elements and
//! drives its consequences:
//!
//! - Topological ordering of all elements, with cycle detection
//! - Incremental recomputation of every transitive dependent when a
//!   placed value changes
//! - Cascading deletion of every transitive dependent when an element is
//!   removed
//! - Redefinition of an element that preserves its dependents
//!
//! Value payloads are opaque to the engine; rules see the graph only
//! through a narrow read-only accessor.
//!
//! # Architecture
//!
//! - `graph`: the element store, dependency ordering, and the
//!   recompute/cascade engine
//! - `error`: the failure taxonomy shared by every operation
//!
//! # Example
//!
//! ```rust,ignore
//! use tracery_core::{Construction, Scope};
//!
//! let mut figure = Construction::new();
//! figure.place("a", 1.0)?;
//! figure.place("b", 2.0)?;
//! figure.construct(
//!     "midpoint",
//!     |scope: &dyn Scope<f64>| Ok((scope.get("a")? + scope.get("b")?) / 2.0),
//!     ["a", "b"],
//! )?;
//!
//! figure.modify("a", 5.0)?; // "midpoint" recomputes automatically
//! assert_eq!(*figure.get("midpoint")?, 3.5);
//! ```
//!
//! # Concurrency
//!
//! The engine is single-threaded and synchronous: every operation,
//! including any recompute or cascade it triggers, runs to completion
//! before returning. There is no internal locking; concurrent use from
//! multiple threads requires an external exclusive lock around every
//! mutating call, because invariants are transiently broken during a
//! mutation.

pub mod error;
pub mod graph;

pub use error::{GraphError, GraphResult, RuleError};
pub use graph::{Construction, Definition, Rule, Scope};
