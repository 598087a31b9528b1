//! Integration Tests for the Construction Graph
//!
//! These tests exercise the public operation surface end to end:
//! creation, modification, redefinition, removal, ordering, and the
//! diagnostic dump.

use tracery_core::{Construction, Definition, GraphError, RuleError, Scope};

fn sum(names: &'static [&'static str]) -> impl Fn(&dyn Scope<i32>) -> Result<i32, RuleError> + Send + Sync {
    move |scope| {
        let mut total = 0;
        for name in names {
            total += *scope.get(name)?;
        }
        Ok(total)
    }
}

fn product(names: &'static [&'static str]) -> impl Fn(&dyn Scope<i32>) -> Result<i32, RuleError> + Send + Sync {
    move |scope| {
        let mut total = 1;
        for name in names {
            total *= *scope.get(name)?;
        }
        Ok(total)
    }
}

/// order() returns a permutation of all names where every name's index
/// exceeds the index of every name in its requires set.
#[test]
fn order_is_a_consistent_permutation() {
    let mut figure = Construction::new();
    figure.place("x", 1).unwrap();
    figure.place("y", 2).unwrap();
    figure.construct("u", sum(&["x"]), ["x"]).unwrap();
    figure.construct("v", sum(&["u", "y"]), ["u", "y"]).unwrap();
    figure.construct("w", sum(&["v", "x"]), ["v", "x"]).unwrap();

    let order = figure.order().unwrap();
    assert_eq!(order.len(), figure.len());

    let index = |name: &str| order.iter().position(|n| n == name).unwrap();
    for name in ["x", "y", "u", "v", "w"] {
        for dep in figure.requires(name).unwrap() {
            assert!(
                index(&dep) < index(name),
                "{dep} must precede {name} in {order:?}"
            );
        }
    }
}

/// modify on a placed element recomputes every transitive dependent, and
/// the new value is observable afterwards.
#[test]
fn modify_flows_through_a_sum() {
    let mut figure = Construction::new();
    figure.place("a", 1).unwrap();
    figure.place("b", 2).unwrap();
    figure.construct("s", sum(&["a", "b"]), ["a", "b"]).unwrap();

    assert_eq!(*figure.get("s").unwrap(), 3);

    figure.modify("a", 5).unwrap();
    assert_eq!(*figure.get("a").unwrap(), 5);
    assert_eq!(*figure.get("s").unwrap(), 7);
}

/// remove deletes the element and every transitive dependent; unrelated
/// elements are untouched.
#[test]
fn remove_cascades_and_spares_the_rest() {
    let mut figure = Construction::new();
    figure.place("a", 1).unwrap();
    figure.place("b", 2).unwrap();
    figure.construct("s", sum(&["a", "b"]), ["a", "b"]).unwrap();

    figure.remove("a").unwrap();

    assert!(matches!(figure.get("a"), Err(GraphError::ElementNotFound(_))));
    assert!(matches!(figure.get("s"), Err(GraphError::ElementNotFound(_))));
    assert_eq!(*figure.get("b").unwrap(), 2);
    assert_eq!(figure.len(), 1);
}

/// replace preserves an element's dependents and recomputes them against
/// the new definition.
#[test]
fn replace_keeps_dependents_alive() {
    let mut figure = Construction::new();
    figure.place("a", 1).unwrap();
    figure.place("b", 2).unwrap();
    figure.construct("s", sum(&["a", "b"]), ["a", "b"]).unwrap();
    assert_eq!(*figure.get("s").unwrap(), 3);

    // Swap a placed value: the dependent sum recomputes.
    figure.replace("b", Definition::placed(10)).unwrap();
    assert_eq!(*figure.get("s").unwrap(), 11);

    // Swap a constructed definition under the same name.
    figure
        .replace("s", Definition::constructed(["a", "b"], product(&["a", "b"])))
        .unwrap();
    assert_eq!(*figure.get("s").unwrap(), 10);
}

/// A placed element can be promoted to a constructed one and back, with
/// dependents surviving both redefinitions.
#[test]
fn replace_switches_element_kind() {
    let mut figure = Construction::new();
    figure.place("base", 4).unwrap();
    figure.place("offset", 1).unwrap();
    figure
        .construct("result", sum(&["base", "offset"]), ["base", "offset"])
        .unwrap();

    // Promote `offset` to a constructed element.
    figure
        .replace("offset", Definition::constructed(["base"], product(&["base", "base"])))
        .unwrap();
    assert_eq!(*figure.get("offset").unwrap(), 16);
    assert_eq!(*figure.get("result").unwrap(), 20);

    // Demote it back to a placed value.
    figure.replace("offset", Definition::placed(0)).unwrap();
    assert_eq!(*figure.get("result").unwrap(), 4);
    figure.modify("base", 7).unwrap();
    assert_eq!(*figure.get("result").unwrap(), 7);
}

/// Introducing a cycle via replace is detected by order() and by
/// propagation, and reverting to an acyclic definition restores
/// consistent recomputed values.
#[test]
fn cycle_introduced_by_replace_is_detected_and_recoverable() {
    let mut figure = Construction::new();
    figure.place("x", 1).unwrap();
    figure
        .construct(
            "y",
            |scope: &dyn Scope<i32>| Ok(*scope.get("x")? + 1),
            ["x"],
        )
        .unwrap();
    assert_eq!(*figure.get("y").unwrap(), 2);

    // Redefine `x` in terms of `y`: x -> y -> x.
    let result = figure.replace(
        "x",
        Definition::constructed(["y"], |scope: &dyn Scope<i32>| Ok(*scope.get("y")? * 10)),
    );
    match result {
        Err(GraphError::UpdateStalled { stuck }) => assert_eq!(stuck, ["x", "y"]),
        other => panic!("expected UpdateStalled, got {other:?}"),
    }
    match figure.order() {
        Err(GraphError::CycleDetected { stuck }) => assert_eq!(stuck, ["x", "y"]),
        other => panic!("expected CycleDetected, got {other:?}"),
    }

    // Revert `x` to a placed value: ordering succeeds again and the
    // dependent recomputes consistently.
    figure.replace("x", Definition::placed(41)).unwrap();
    assert_eq!(figure.order().unwrap(), ["x", "y"]);
    assert_eq!(*figure.get("y").unwrap(), *figure.get("x").unwrap() + 1);
}

/// construct with an unknown dependency fails and leaves the store
/// unchanged.
#[test]
fn unknown_dependency_is_rejected_cleanly() {
    let mut figure = Construction::new();
    figure.place("a", 1).unwrap();

    let result = figure.construct("s", sum(&["a", "missing"]), ["a", "missing"]);
    match result {
        Err(GraphError::UnknownDependency { missing }) => assert_eq!(missing, ["missing"]),
        other => panic!("expected UnknownDependency, got {other:?}"),
    }
    assert_eq!(figure.len(), 1);
    assert!(!figure.contains("s"));
}

/// modify on a constructed element fails and leaves the store unchanged.
#[test]
fn modify_rejects_constructed_elements() {
    let mut figure = Construction::new();
    figure.place("a", 1).unwrap();
    figure.construct("s", sum(&["a"]), ["a"]).unwrap();

    assert!(matches!(
        figure.modify("s", 9),
        Err(GraphError::NotAPlacedElement(_))
    ));
    assert_eq!(*figure.get("s").unwrap(), 1);
}

/// A deep dependency chain recomputes end to end from a single modify.
#[test]
fn long_chain_recomputes_end_to_end() {
    let mut figure = Construction::new();
    figure.place("n0", 0).unwrap();
    for i in 1..50 {
        let prev = format!("n{}", i - 1);
        let read = prev.clone();
        figure
            .construct(
                format!("n{i}"),
                move |scope: &dyn Scope<i32>| Ok(*scope.get(&read)? + 1),
                [prev],
            )
            .unwrap();
    }

    assert_eq!(*figure.get("n49").unwrap(), 49);
    figure.modify("n0", 100).unwrap();
    assert_eq!(*figure.get("n49").unwrap(), 149);
}

/// describe degrades gracefully on a cyclic store instead of propagating
/// CycleDetected to a display-only caller.
#[test]
fn describe_survives_a_cycle() {
    let mut figure = Construction::new();
    figure.place("a", 1).unwrap();
    figure.place("b", 2).unwrap();
    figure.construct("s", sum(&["a", "b"]), ["a", "b"]).unwrap();

    let dump = figure.describe();
    assert!(dump.contains("s <- [a, b] = 3"));

    // Introduce a cycle; the dump reports it but still lists every
    // element.
    let _ = figure.replace(
        "a",
        Definition::constructed(["s"], |scope: &dyn Scope<i32>| Ok(*scope.get("s")?)),
    );
    let dump = figure.describe();
    assert!(dump.starts_with("unorderable:"));
    for name in ["a", "b", "s"] {
        assert!(dump.contains(name));
    }
}
