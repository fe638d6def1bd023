use super::*;
use chrono::Utc;

fn edge(id: u64, task_id: u64, depends_on_id: u64) -> Edge {
    Edge {
        id: EdgeId(id),
        task_id: TaskId(task_id),
        depends_on_id: TaskId(depends_on_id),
        created_at: Utc::now(),
    }
}

fn graph_with(tasks: u64, edges: &[(u64, u64)]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for id in 1..=tasks {
        graph.add_task(TaskId(id));
    }
    for (i, (from, to)) in edges.iter().enumerate() {
        graph
            .try_insert_edge(&edge(i as u64 + 1, *from, *to))
            .unwrap();
    }
    graph
}

/// D(4) depends on B(2) and C(3); B and C both depend on A(1).
fn diamond() -> DependencyGraph {
    graph_with(4, &[(4, 2), (4, 3), (2, 1), (3, 1)])
}

fn ids(raw: &[u64]) -> Vec<TaskId> {
    raw.iter().copied().map(TaskId).collect()
}

fn assert_path_is_cycle(graph: &DependencyGraph, path: &CyclePath, candidate: (u64, u64)) {
    let ids = path.ids();
    assert!(ids.len() >= 3, "cycle too short: {path}");
    assert_eq!(ids.first(), ids.last());
    assert_eq!(ids[0], TaskId(candidate.0));
    assert_eq!(ids[1], TaskId(candidate.1));
    for pair in ids[1..].windows(2) {
        assert!(
            graph.find_edge(pair[0], pair[1]).is_some(),
            "{} -> {} is not an edge",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn cycle_path_through_chain() {
    // A(1) depends on B(2), B depends on C(3); C -> A closes the loop.
    let graph = graph_with(3, &[(1, 2), (2, 3)]);

    let path = graph.would_create_cycle(TaskId(3), TaskId(1)).unwrap();
    assert_eq!(path.ids(), ids(&[3, 1, 2, 3]).as_slice());
}

#[test]
fn forward_edge_in_chain_is_not_a_cycle() {
    let graph = graph_with(3, &[(1, 2), (2, 3)]);
    assert!(graph.would_create_cycle(TaskId(1), TaskId(3)).is_none());
}

#[test]
fn self_dependency_is_a_trivial_cycle() {
    let graph = graph_with(1, &[]);
    let path = graph.would_create_cycle(TaskId(1), TaskId(1)).unwrap();
    assert_eq!(path.ids(), ids(&[1, 1]).as_slice());
}

#[test]
fn diamond_does_not_trigger_false_cycle() {
    let graph = diamond();

    // Redundant shortcut D -> A is fine.
    assert!(graph.would_create_cycle(TaskId(4), TaskId(1)).is_none());
    // A new task depending on D is fine.
    let mut extended = graph.clone();
    extended.add_task(TaskId(5));
    assert!(extended.would_create_cycle(TaskId(5), TaskId(4)).is_none());
    // B -> C across the diamond is fine.
    assert!(graph.would_create_cycle(TaskId(2), TaskId(3)).is_none());
}

#[test]
fn diamond_back_edge_reports_real_cycle() {
    let graph = diamond();
    let path = graph.would_create_cycle(TaskId(1), TaskId(4)).unwrap();
    assert_path_is_cycle(&graph, &path, (1, 4));
    assert_eq!(path.ids().len(), 4);
}

#[test]
fn stacked_diamonds_terminate() {
    // Layers of diamonds: every node depends on both nodes of the layer below.
    let mut graph = DependencyGraph::new();
    let layers = 30u64;
    for id in 1..=layers * 2 {
        graph.add_task(TaskId(id));
    }
    let mut next_edge = 1;
    for layer in 1..layers {
        for upper in [layer * 2 + 1, layer * 2 + 2] {
            for lower in [layer * 2 - 1, layer * 2] {
                graph
                    .try_insert_edge(&edge(next_edge, upper, lower))
                    .unwrap();
                next_edge += 1;
            }
        }
    }

    assert!(graph.would_create_cycle(TaskId(layers * 2), TaskId(1)).is_none());
    let path = graph.would_create_cycle(TaskId(1), TaskId(layers * 2)).unwrap();
    assert_path_is_cycle(&graph, &path, (1, layers * 2));
}

#[test]
fn deep_chain_does_not_overflow_stack() {
    let n = 20_000u64;
    let mut graph = DependencyGraph::new();
    for id in 1..=n {
        graph.add_task(TaskId(id));
    }
    for id in 1..n {
        graph.insert_edge(&edge(id, id, id + 1)).unwrap();
    }

    let path = graph.would_create_cycle(TaskId(n), TaskId(1)).unwrap();
    assert_eq!(path.ids().len(), n as usize + 1);
    assert_eq!(graph.transitive_dependents(TaskId(n)).len(), n as usize - 1);
}

#[test]
fn rejected_insert_leaves_graph_unchanged() {
    let mut graph = graph_with(3, &[(1, 2), (2, 3)]);
    let before = graph.clone();

    let err = graph.try_insert_edge(&edge(99, 3, 1)).unwrap_err();
    assert!(matches!(err, Error::CircularDependency { .. }));
    assert_eq!(graph, before);
    assert_eq!(graph.edge_set(), before.edge_set());

    assert!(matches!(
        graph.try_insert_edge(&edge(100, 1, 2)),
        Err(Error::DuplicateDependency { .. })
    ));
    assert!(matches!(
        graph.try_insert_edge(&edge(101, 2, 2)),
        Err(Error::SelfDependency(TaskId(2)))
    ));
    assert!(matches!(
        graph.try_insert_edge(&edge(102, 1, 42)),
        Err(Error::TaskNotFound(TaskId(42)))
    ));
    assert_eq!(graph, before);
}

#[test]
fn direct_neighbors() {
    let graph = diamond();
    assert_eq!(graph.dependencies(TaskId(4)), BTreeSet::from([TaskId(2), TaskId(3)]));
    assert_eq!(graph.dependents(TaskId(1)), BTreeSet::from([TaskId(2), TaskId(3)]));
    assert!(graph.dependents(TaskId(4)).is_empty());
    assert!(graph.dependencies(TaskId(77)).is_empty());
}

#[test]
fn transitive_dependents_are_topologically_ordered() {
    // 5 depends on 4 and 2; 4 depends on 3; 3 and 2 depend on 1.
    let graph = graph_with(5, &[(2, 1), (3, 1), (4, 3), (5, 4), (5, 2)]);
    let order = graph.transitive_dependents(TaskId(1));

    assert_eq!(order.len(), 4);
    assert!(!order.contains(&TaskId(1)));
    let position = |id: u64| order.iter().position(|t| *t == TaskId(id)).unwrap();
    for (dependent, prerequisite) in graph.edge_set() {
        if prerequisite == TaskId(1) {
            continue;
        }
        assert!(position(prerequisite.0) < position(dependent.0));
    }
}

#[test]
fn propagation_order_merges_roots() {
    // 3 depends on 1 and 2; 4 depends on 3.
    let graph = graph_with(4, &[(3, 1), (3, 2), (4, 3)]);
    let order = graph.propagation_order(&[TaskId(2), TaskId(1)]);

    assert_eq!(order.len(), 4);
    let position = |id: u64| order.iter().position(|t| *t == TaskId(id)).unwrap();
    assert!(position(1) < position(3));
    assert!(position(2) < position(3));
    assert!(position(3) < position(4));
}

#[test]
fn ancestors_and_descendants() {
    let graph = diamond();
    assert_eq!(
        graph.ancestors(TaskId(4)),
        BTreeSet::from([TaskId(1), TaskId(2), TaskId(3)])
    );
    assert_eq!(
        graph.descendants(TaskId(1)),
        BTreeSet::from([TaskId(2), TaskId(3), TaskId(4)])
    );
    assert!(graph.ancestors(TaskId(1)).is_empty());
}

#[test]
fn topological_order_puts_prerequisites_first() {
    let graph = diamond();
    let order = graph.topological_order().unwrap();
    assert_eq!(order.first(), Some(&TaskId(1)));
    assert_eq!(order.last(), Some(&TaskId(4)));
}

#[test]
fn remove_edge_and_task() {
    let mut graph = diamond();

    assert_eq!(graph.remove_edge(TaskId(4), TaskId(2)), Some(EdgeId(1)));
    assert_eq!(graph.remove_edge(TaskId(4), TaskId(2)), None);

    let removed = graph.remove_task(TaskId(1));
    assert_eq!(removed, vec![EdgeId(3), EdgeId(4)]);
    assert!(!graph.contains_task(TaskId(1)));
    assert_eq!(graph.edge_set(), BTreeSet::from([(TaskId(4), TaskId(3))]));
    // Remaining indices still resolve after removal.
    assert_eq!(graph.dependencies(TaskId(4)), BTreeSet::from([TaskId(3)]));
}

#[test]
fn from_records_skips_bad_edges() {
    let edges = vec![
        edge(1, 1, 2),
        edge(2, 2, 3),
        edge(3, 3, 1),
        edge(4, 1, 2),
        edge(5, 1, 9),
    ];
    let graph = DependencyGraph::from_records(ids(&[1, 2, 3]), &edges);

    assert!(graph.is_acyclic());
    assert_eq!(
        graph.edge_set(),
        BTreeSet::from([(TaskId(1), TaskId(2)), (TaskId(2), TaskId(3))])
    );
}

#[test]
fn unserialized_check_then_insert_can_build_a_cycle() {
    // Two writers each validate against the same snapshot, then both insert.
    let mut graph = graph_with(2, &[]);

    let first_ok = graph.would_create_cycle(TaskId(1), TaskId(2)).is_none();
    let second_ok = graph.would_create_cycle(TaskId(2), TaskId(1)).is_none();
    assert!(first_ok && second_ok);

    graph.insert_edge(&edge(1, 1, 2)).unwrap();
    // The second writer acts on its stale check; the graph now has a loop.
    let from = graph.node_map[&TaskId(2)];
    let to = graph.node_map[&TaskId(1)];
    graph.graph.add_edge(from, to, EdgeId(2));

    assert!(!graph.is_acyclic());
}
