//! Transition tables.
//!
//! The edge sequencer walks one entity's candidate segments in time order,
//! carrying the previous node (starting at `_START`) and the pending
//! departure time (starting unset). Every candidate emits exactly one edge
//! from the previous node to its own node, arriving at the segment's `t1`;
//! the segment's `t2` becomes the next departure.
//!
//! Unlike the node sequence, multi-port stops are not expanded here: they
//! collapse to a single `_MULTIPLE` node, and stops with no port appear as
//! `_UNKNOWN`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::accumulate_direct;
use crate::classify::{ClassifiedSegment, classify_segments};
use crate::error::Result;
use crate::graph::LinkageGraph;
use crate::nodes::NodeSet;
use crate::segments::single_entity;
use crate::{NodeRef, PipelineConfig, Segment};

/// One transition between resolved nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub entity_id: String,
    pub from: NodeRef,
    pub to: NodeRef,
    /// End of the previous candidate segment; unset for the first edge
    pub departure: Option<DateTime<Utc>>,
    /// Start of this candidate segment
    pub arrival: DateTime<Utc>,
    pub intersection_count: usize,
}

/// Fold classified segments into transitions.
pub fn edges_from_classified(classified: &[ClassifiedSegment]) -> Vec<Edge> {
    let mut edges = Vec::with_capacity(classified.len());
    let mut prev = NodeRef::Start;
    let mut departure: Option<DateTime<Utc>> = None;

    for item in classified {
        let node = item.classification.collapsed_node();
        edges.push(Edge {
            entity_id: item.segment.entity_id.clone(),
            from: prev,
            to: node.clone(),
            departure,
            arrival: item.segment.t1,
            intersection_count: item.intersection_count,
        });
        prev = node;
        departure = Some(item.segment.t2);
    }

    edges
}

/// Edge table for a single entity's segment table.
pub fn edge_sequence(
    segments: &[Segment],
    nodes: &NodeSet,
    config: &PipelineConfig,
) -> Result<Vec<Edge>> {
    single_entity(segments.iter().map(|s| s.entity_id.as_str()))?;
    let classified = classify_segments(segments, nodes, config);
    Ok(edges_from_classified(&classified))
}

/// Build a graph of direct linkages from an edge table.
///
/// The arrival nodes form the sequence. With `config.remove_unknown`, rows
/// leaving or arriving at `_UNKNOWN` are dropped first, so the port reached
/// straight after an unidentified stop is lost along with the stop.
pub fn direct_graph_from_edges(edges: &[Edge], config: &PipelineConfig) -> LinkageGraph {
    let sequence: Vec<NodeRef> = edges
        .iter()
        .filter(|e| !(config.remove_unknown && touches_unknown(e)))
        .map(|e| e.to.clone())
        .collect();

    let mut graph = LinkageGraph::directed();
    accumulate_direct(&sequence, &mut graph, config);
    graph
}

fn touches_unknown(edge: &Edge) -> bool {
    edge.from == NodeRef::Unknown || edge.to == NodeRef::Unknown
}
