//! Segment classification against the port reference set.
//!
//! Every segment is first tested for a voyage break, then for a stop. Breaks
//! and stops are candidates; everything else is transit and is dropped.
//!
//! For a stop, the segment is tested against every node:
//! - no intersection: `Unknown`, reported separately for review
//! - one intersection: `Stop(label)`
//! - several: the ports are ordered along the direction of travel by
//!   projecting each port's representative point onto the segment's line
//!
//! Ordering is indeterminate when the segment is vertical or two ports
//! project to the same x-coordinate. Those rows carry the `_MULTI_MANUAL`
//! sentinel so a person can resolve them later.

use chrono::{DateTime, Utc};
use geo::Line;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geo_utils::{is_vertical, project_onto_line};
use crate::nodes::{Node, NodeSet};
use crate::segments::single_entity;
use crate::{NodeRef, PipelineConfig, Segment};

/// Why a multi-port segment could not be ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegenerateReason {
    /// Segment endpoints share a longitude
    VerticalSegment,
    /// Two ports project to the same position on the segment
    TiedProjection,
    /// A port has no representative point and no centroid
    MissingAnchor,
}

/// Outcome of ordering the ports crossed by one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MultiResolution {
    /// Port labels in order of travel
    Ordered(Vec<String>),
    /// Needs manual review; one `_MULTI_MANUAL` row per intersected port
    Indeterminate {
        count: usize,
        reason: DegenerateReason,
    },
}

impl MultiResolution {
    /// Node references in output order.
    pub fn nodes(&self) -> Vec<NodeRef> {
        match self {
            MultiResolution::Ordered(labels) => {
                labels.iter().map(|l| NodeRef::Port(l.clone())).collect()
            }
            MultiResolution::Indeterminate { count, .. } => vec![NodeRef::ManualReview; *count],
        }
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, MultiResolution::Indeterminate { .. })
    }
}

/// What a candidate segment means for the voyage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Classification {
    Break,
    Stop(String),
    Unknown,
    MultiStop(MultiResolution),
}

impl Classification {
    /// Expanded node rows for the node sequence. `Unknown` contributes none.
    pub fn expanded_nodes(&self) -> Vec<NodeRef> {
        match self {
            Classification::Break => vec![NodeRef::Break],
            Classification::Stop(label) => vec![NodeRef::Port(label.clone())],
            Classification::Unknown => Vec::new(),
            Classification::MultiStop(resolution) => resolution.nodes(),
        }
    }

    /// The single node an edge table uses for this segment.
    pub fn collapsed_node(&self) -> NodeRef {
        match self {
            Classification::Break => NodeRef::Break,
            Classification::Stop(label) => NodeRef::Port(label.clone()),
            Classification::Unknown => NodeRef::Unknown,
            Classification::MultiStop(_) => NodeRef::Multiple,
        }
    }
}

/// A candidate segment with its classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSegment {
    pub segment: Segment,
    pub classification: Classification,
    /// Number of intersected nodes; a break counts as one
    pub intersection_count: usize,
}

/// One row of a node sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeVisit {
    pub entity_id: String,
    pub node: NodeRef,
    pub t1: DateTime<Utc>,
    pub t2: DateTime<Utc>,
    pub intersection_count: usize,
}

/// A stop-length segment that touched no node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnknownSegment {
    pub entity_id: String,
    pub t1: DateTime<Utc>,
    pub t2: DateTime<Utc>,
    pub line: Line<f64>,
}

/// Node sequence of one or more entities plus the segments needing review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSequence {
    pub visits: Vec<NodeVisit>,
    pub unknown: Vec<UnknownSegment>,
}

impl NodeSequence {
    /// Build the sequence tables from classified segments.
    pub fn from_classified(classified: &[ClassifiedSegment]) -> Self {
        let mut sequence = Self::default();
        for item in classified {
            let seg = &item.segment;
            if item.classification == Classification::Unknown {
                sequence.unknown.push(UnknownSegment {
                    entity_id: seg.entity_id.clone(),
                    t1: seg.t1,
                    t2: seg.t2,
                    line: seg.line,
                });
                continue;
            }
            for node in item.classification.expanded_nodes() {
                sequence.visits.push(NodeVisit {
                    entity_id: seg.entity_id.clone(),
                    node,
                    t1: seg.t1,
                    t2: seg.t2,
                    intersection_count: item.intersection_count,
                });
            }
        }
        sequence
    }

    /// Resolved nodes in order, as consumed by the graph aggregator.
    pub fn nodes(&self) -> Vec<NodeRef> {
        self.visits.iter().map(|v| v.node.clone()).collect()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.visits.iter().map(|v| v.node.label()).collect()
    }

    pub fn extend(&mut self, other: NodeSequence) {
        self.visits.extend(other.visits);
        self.unknown.extend(other.unknown);
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty() && self.unknown.is_empty()
    }
}

/// Long enough in both longitude frames to be a voyage boundary.
pub fn is_break(segment: &Segment, config: &PipelineConfig) -> bool {
    segment.length() >= config.dist_break && segment.shifted_length() >= config.dist_break
}

/// Long enough in time to be a possible stop.
pub fn meets_stop_duration(segment: &Segment, config: &PipelineConfig) -> bool {
    segment.duration_hours() >= config.stop_duration_hours
}

/// Classify one segment. Returns `None` for transit segments.
pub fn classify_segment(
    segment: &Segment,
    nodes: &NodeSet,
    config: &PipelineConfig,
) -> Option<ClassifiedSegment> {
    if is_break(segment, config) {
        return Some(ClassifiedSegment {
            segment: segment.clone(),
            classification: Classification::Break,
            intersection_count: 1,
        });
    }
    if !meets_stop_duration(segment, config) {
        return None;
    }

    let hits = nodes.intersecting(&segment.line);
    let classification = match hits.as_slice() {
        [] => Classification::Unknown,
        [node] => Classification::Stop(node.label.clone()),
        many => {
            let resolution = resolve_multi(&segment.line, many);
            if let MultiResolution::Indeterminate { count, reason } = &resolution {
                warn!(
                    "[Classify] {} {}..{}: {} ports need manual ordering ({:?})",
                    segment.entity_id, segment.t1, segment.t2, count, reason
                );
            }
            Classification::MultiStop(resolution)
        }
    };

    Some(ClassifiedSegment {
        segment: segment.clone(),
        classification,
        intersection_count: hits.len(),
    })
}

/// Classify a time-ordered segment table, keeping only candidates.
pub fn classify_segments(
    segments: &[Segment],
    nodes: &NodeSet,
    config: &PipelineConfig,
) -> Vec<ClassifiedSegment> {
    let classified: Vec<ClassifiedSegment> = segments
        .iter()
        .filter_map(|s| classify_segment(s, nodes, config))
        .collect();
    debug!(
        "[Classify] {} of {} segments are breaks or stops",
        classified.len(),
        segments.len()
    );
    classified
}

/// Node sequence and unknown-segment table for a single entity.
///
/// Fails with [`VoyageError::MultipleEntities`](crate::VoyageError) when the
/// segment table mixes entities.
pub fn node_sequence(
    segments: &[Segment],
    nodes: &NodeSet,
    config: &PipelineConfig,
) -> Result<NodeSequence> {
    single_entity(segments.iter().map(|s| s.entity_id.as_str()))?;
    let classified = classify_segments(segments, nodes, config);
    Ok(NodeSequence::from_classified(&classified))
}

/// Order the ports crossed by one segment in the direction of travel.
///
/// Each port's anchor is projected onto the line through the segment and
/// the ports are sorted by projected x-coordinate: ascending when the
/// segment runs west to east, descending otherwise.
pub fn resolve_multi(line: &Line<f64>, nodes: &[&Node]) -> MultiResolution {
    let indeterminate = |reason| MultiResolution::Indeterminate {
        count: nodes.len(),
        reason,
    };

    if is_vertical(line) {
        return indeterminate(DegenerateReason::VerticalSegment);
    }

    let mut positions: Vec<(f64, &str)> = Vec::with_capacity(nodes.len());
    for node in nodes {
        let Some(projected) = node.anchor().and_then(|a| project_onto_line(a, line)) else {
            return indeterminate(DegenerateReason::MissingAnchor);
        };
        positions.push((projected.x, node.label.as_str()));
    }

    positions.sort_by(|a, b| a.0.total_cmp(&b.0));
    if positions.windows(2).any(|w| w[0].0 == w[1].0) {
        return indeterminate(DegenerateReason::TiedProjection);
    }

    if line.start.x > line.end.x {
        positions.reverse();
    }
    MultiResolution::Ordered(positions.into_iter().map(|(_, l)| l.to_string()).collect())
}
