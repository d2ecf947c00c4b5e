//! Port reference set.
//!
//! Nodes are loaded once and only read by the pipeline. Lookups are a linear
//! scan in insertion order, so results are reproducible for a given input.

use geo::{Centroid, Coord, Geometry, Intersects, Line, Point};
use serde::{Deserialize, Serialize};

/// A labeled port geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub label: String,
    /// Area (or point) a stop segment must touch to count as a port call
    pub geometry: Geometry<f64>,
    /// Point used to order ports crossed by the same segment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub representative_point: Option<Point<f64>>,
}

impl Node {
    /// Create a node without an explicit representative point.
    pub fn new(label: impl Into<String>, geometry: Geometry<f64>) -> Self {
        Self {
            label: label.into(),
            geometry,
            representative_point: None,
        }
    }

    /// Create a node with the point used for multi-port ordering.
    pub fn with_representative_point(
        label: impl Into<String>,
        geometry: Geometry<f64>,
        point: Point<f64>,
    ) -> Self {
        Self {
            label: label.into(),
            geometry,
            representative_point: Some(point),
        }
    }

    /// Representative point, falling back to the geometry centroid.
    pub fn anchor(&self) -> Option<Coord<f64>> {
        self.representative_point
            .or_else(|| self.geometry.centroid())
            .map(|p| p.0)
    }

    pub fn intersects(&self, line: &Line<f64>) -> bool {
        self.geometry.intersects(line)
    }
}

/// Immutable collection of nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSet {
    nodes: Vec<Node>,
}

impl NodeSet {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// All nodes whose geometry touches the line, in set order.
    pub fn intersecting(&self, line: &Line<f64>) -> Vec<&Node> {
        self.nodes.iter().filter(|n| n.intersects(line)).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<Node> for NodeSet {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
