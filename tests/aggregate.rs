//! Tests for aggregate module

use chrono::{DateTime, Duration, TimeZone, Utc};
use geo::{Geometry, Point, polygon};
use voyagenet::{
    GraphKind, LinkageGraph, Node, NodeRef, NodeSet, Observation, PipelineConfig, VoyageError,
    add_all_linkages, add_direct_linkages, build_graphs, process_entity,
};

fn seq(labels: &[&str]) -> Vec<NodeRef> {
    labels.iter().map(|l| NodeRef::from_label(l)).collect()
}

fn config() -> PipelineConfig {
    PipelineConfig::default()
}

// ============================================================================
// Direct linkages
// ============================================================================

#[test]
fn test_direct_linkages_follow_sequence() {
    let g = add_direct_linkages(&seq(&["A", "B", "C", "B"]), &LinkageGraph::directed(), &config())
        .unwrap();
    assert_eq!(g.weight("A", "B"), Some(1));
    assert_eq!(g.weight("B", "C"), Some(1));
    assert_eq!(g.weight("C", "B"), Some(1));
    assert_eq!(g.edge_count(), 3);
}

#[test]
fn test_direct_linkages_skip_breaks() {
    let g = add_direct_linkages(&seq(&["A", "_BREAK", "B"]), &LinkageGraph::directed(), &config())
        .unwrap();
    assert!(!g.contains_edge("A", "B"));
    assert!(!g.contains_node("_BREAK"));
    assert_eq!(g.edge_count(), 0);
}

#[test]
fn test_direct_self_loops_are_optional() {
    let sequence = seq(&["A", "A", "B"]);
    let without = add_direct_linkages(&sequence, &LinkageGraph::directed(), &config()).unwrap();
    assert!(!without.contains_edge("A", "A"));
    assert_eq!(without.weight("A", "B"), Some(1));

    let with =
        add_direct_linkages(&sequence, &LinkageGraph::directed(), &config().with_self_loops(true))
            .unwrap();
    assert_eq!(with.weight("A", "A"), Some(1));
}

#[test]
fn test_direct_linkages_accumulate_weights() {
    let once =
        add_direct_linkages(&seq(&["A", "B"]), &LinkageGraph::directed(), &config()).unwrap();
    let twice = add_direct_linkages(&seq(&["A", "B"]), &once, &config()).unwrap();
    assert_eq!(twice.weight("A", "B"), Some(2));

    let flat = add_direct_linkages(&seq(&["A", "B"]), &once, &config().with_weighted(false))
        .unwrap();
    assert_eq!(flat.weight("A", "B"), Some(1));
}

#[test]
fn test_sentinels_other_than_break_are_linked() {
    let g = add_direct_linkages(
        &seq(&["A", "_MULTI_MANUAL", "_MULTI_MANUAL", "B"]),
        &LinkageGraph::directed(),
        &config(),
    )
    .unwrap();
    assert_eq!(g.weight("A", "_MULTI_MANUAL"), Some(1));
    assert_eq!(g.weight("_MULTI_MANUAL", "B"), Some(1));
    assert!(!g.contains_edge("_MULTI_MANUAL", "_MULTI_MANUAL"));
}

// ============================================================================
// All linkages
// ============================================================================

#[test]
fn test_all_linkages_pair_every_node_in_a_run() {
    let sequence = seq(&["P", "Q", "R"]);
    let g = add_all_linkages(&sequence, &LinkageGraph::undirected(), &config()).unwrap();
    assert_eq!(g.edge_count(), 3);
    for (a, b) in [("P", "Q"), ("P", "R"), ("Q", "R")] {
        assert_eq!(g.weight(a, b), Some(1));
    }

    let again = add_all_linkages(&sequence, &g, &config()).unwrap();
    for (a, b) in [("P", "Q"), ("P", "R"), ("Q", "R")] {
        assert_eq!(again.weight(b, a), Some(2));
    }
}

#[test]
fn test_all_linkages_count_repeats_once() {
    let g = add_all_linkages(&seq(&["P", "Q", "P", "Q"]), &LinkageGraph::undirected(), &config())
        .unwrap();
    assert_eq!(g.weight("P", "Q"), Some(1));
    assert!(!g.contains_edge("P", "P"));
}

#[test]
fn test_all_linkages_split_at_breaks() {
    let g = add_all_linkages(
        &seq(&["A", "B", "_BREAK", "C", "D"]),
        &LinkageGraph::undirected(),
        &config(),
    )
    .unwrap();
    assert_eq!(g.weight("A", "B"), Some(1));
    assert_eq!(g.weight("C", "D"), Some(1));
    assert!(!g.contains_edge("A", "C"));
    assert!(!g.contains_edge("B", "D"));
    assert!(!g.contains_node("_BREAK"));
}

#[test]
fn test_unweighted_all_linkages_record_presence() {
    let cfg = config().with_weighted(false);
    let sequence = seq(&["P", "Q", "R"]);
    let once = add_all_linkages(&sequence, &LinkageGraph::undirected(), &cfg).unwrap();
    let twice = add_all_linkages(&seq(&["R", "Q", "P"]), &once, &cfg).unwrap();
    for (a, b) in [("P", "Q"), ("P", "R"), ("Q", "R")] {
        assert_eq!(twice.weight(a, b), Some(1));
    }
    assert_eq!(twice.total_weight(), 3);
}

#[test]
fn test_all_linkages_self_pairs_on_request() {
    let g = add_all_linkages(
        &seq(&["P", "Q"]),
        &LinkageGraph::undirected(),
        &config().with_self_loops(true),
    )
    .unwrap();
    assert_eq!(g.weight("P", "P"), Some(1));
    assert_eq!(g.weight("Q", "Q"), Some(1));
    assert_eq!(g.weight("P", "Q"), Some(1));
}

// ============================================================================
// Graph handling
// ============================================================================

#[test]
fn test_updates_do_not_touch_the_input_graph() {
    let mut base = LinkageGraph::directed();
    base.increment("X", "Y", true);
    let snapshot = base.clone();

    let next = add_direct_linkages(&seq(&["X", "Y", "Z"]), &base, &config()).unwrap();
    assert_eq!(base, snapshot);
    assert_eq!(next.weight("X", "Y"), Some(2));
}

#[test]
fn test_wrong_graph_kind_is_rejected() {
    let err = add_direct_linkages(&seq(&["A", "B"]), &LinkageGraph::undirected(), &config())
        .unwrap_err();
    assert_eq!(
        err,
        VoyageError::GraphKindMismatch {
            expected: GraphKind::Directed,
            found: GraphKind::Undirected,
        }
    );
    assert!(add_all_linkages(&seq(&["A", "B"]), &LinkageGraph::directed(), &config()).is_err());
}

#[test]
fn test_order_of_sequences_does_not_matter() {
    let s1 = seq(&["A", "B", "C", "_BREAK", "A"]);
    let s2 = seq(&["C", "B", "A", "B"]);
    let cfg = config();

    let empty = LinkageGraph::directed();
    let after_s1 = add_direct_linkages(&s1, &empty, &cfg).unwrap();
    let after_s2 = add_direct_linkages(&s2, &empty, &cfg).unwrap();
    let ab = add_direct_linkages(&s2, &after_s1, &cfg).unwrap();
    let ba = add_direct_linkages(&s1, &after_s2, &cfg).unwrap();
    assert_eq!(ab, ba);
    assert_eq!(ab, after_s1.merge(&after_s2, true).unwrap());

    let g1 = add_all_linkages(&s1, &LinkageGraph::undirected(), &cfg).unwrap();
    let g2 = add_all_linkages(&s2, &LinkageGraph::undirected(), &cfg).unwrap();
    let merged = g1.merge(&g2, true).unwrap();
    let sequential = add_all_linkages(&s2, &g1, &cfg).unwrap();
    assert_eq!(merged, sequential);
}

// ============================================================================
// Pipeline
// ============================================================================

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1935, 7, 1, 0, 0, 0).unwrap()
}

fn port(label: &str, x: f64) -> Node {
    Node::with_representative_point(
        label,
        Geometry::Polygon(polygon![
            (x: x - 0.5, y: -0.5),
            (x: x + 0.5, y: -0.5),
            (x: x + 0.5, y: 0.5),
            (x: x - 0.5, y: 0.5),
        ]),
        Point::new(x, 0.0),
    )
}

fn ports() -> NodeSet {
    NodeSet::new(vec![port("A", 0.0), port("B", 3.0), port("C", 6.0), port("D", 40.0)])
}

/// Two reports a day apart in each listed port, six hours of sailing between.
fn voyage(id: &str, stops: &[f64], start_h: i64) -> Vec<Observation> {
    let mut rows = Vec::new();
    let mut h = start_h;
    for &x in stops {
        rows.push(Observation::new(id, Some(t0() + Duration::hours(h)), 0.1, x));
        h += 30;
        rows.push(Observation::new(id, Some(t0() + Duration::hours(h)), -0.1, x + 0.1));
        h += 6;
    }
    rows
}

#[test]
fn test_process_entity_builds_tables() {
    let obs = voyage("S", &[0.0, 3.0, 6.0], 0);
    let result = process_entity("S", &obs, &ports(), &config()).unwrap();
    assert_eq!(result.segment_count, 5);
    assert_eq!(result.sequence.labels(), vec!["A", "B", "C"]);
    assert_eq!(result.edges.len(), 3);
    assert_eq!(result.degenerate_resolutions, 0);
}

#[test]
fn test_process_entity_ignores_other_entities() {
    let mut obs = voyage("S", &[0.0, 3.0], 0);
    obs.extend(voyage("T", &[6.0], 0));
    let result = process_entity("S", &obs, &ports(), &config()).unwrap();
    assert_eq!(result.sequence.labels(), vec!["A", "B"]);
    assert!(process_entity("nobody", &obs, &ports(), &config()).is_none());
}

#[test]
fn test_build_graphs_across_entities() {
    let mut obs = voyage("S", &[0.0, 3.0, 6.0], 0);
    obs.extend(voyage("T", &[0.0, 3.0], 100));
    obs.push(Observation::new("sparse", Some(t0()), 0.0, 0.0));

    let output = build_graphs(&obs, &ports(), &config()).unwrap();
    assert_eq!(output.direct.weight("A", "B"), Some(2));
    assert_eq!(output.direct.weight("B", "C"), Some(1));
    assert_eq!(output.all.weight("A", "B"), Some(2));
    assert_eq!(output.all.weight("A", "C"), Some(1));

    assert_eq!(output.stats.entities, 2);
    assert_eq!(output.stats.skipped_entities, 1);
    assert_eq!(output.stats.visits, 5);
    assert_eq!(output.edges.len(), 5);
}

#[test]
fn test_break_between_ports_splits_voyages() {
    // C at x=6 to D at x=40 is a single unreported passage
    let obs = voyage("S", &[0.0, 6.0, 40.0, 40.0], 0);
    let output = build_graphs(&obs, &ports(), &config()).unwrap();

    assert_eq!(output.sequence.labels(), vec!["A", "C", "_BREAK", "D", "D"]);
    assert_eq!(output.direct.weight("A", "C"), Some(1));
    assert!(!output.direct.contains_edge("C", "D"));
    assert!(!output.all.contains_edge("A", "D"));
    assert!(!output.all.contains_edge("C", "D"));
}

#[test]
fn test_build_graphs_rejects_bad_config() {
    let cfg = config().with_dist_break(-1.0);
    assert!(matches!(
        build_graphs(&[], &ports(), &cfg),
        Err(VoyageError::InvalidConfig(_))
    ));
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_matches_sequential() {
    use voyagenet::build_graphs_parallel;

    let stops = [0.0, 3.0, 6.0, 40.0, 3.0, 0.0];
    let mut obs = Vec::new();
    for i in 0..12 {
        let rotated: Vec<f64> = stops
            .iter()
            .cycle()
            .skip(i % stops.len())
            .take(4)
            .copied()
            .collect();
        obs.extend(voyage(&format!("V{i:02}"), &rotated, i as i64 * 10));
    }

    let configs = [
        config(),
        config().with_weighted(false),
        config().with_self_loops(true),
        config().with_weighted(false).with_self_loops(true),
    ];
    for cfg in &configs {
        let sequential = build_graphs(&obs, &ports(), cfg).unwrap();
        let parallel = build_graphs_parallel(&obs, &ports(), cfg).unwrap();
        assert_eq!(sequential, parallel);
    }

    // V05 calls at A twice in a row
    let looped = build_graphs_parallel(&obs, &ports(), &configs[2]).unwrap();
    assert!(looped.direct.contains_edge("A", "A"));
    let flat = build_graphs_parallel(&obs, &ports(), &configs[1]).unwrap();
    assert!(flat.direct.edges().iter().all(|e| e.weight == 1));
    assert!(flat.all.edges().iter().all(|e| e.weight == 1));
}
