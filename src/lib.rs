//! # voyagenet
//!
//! Reconstruct port-call networks from irregularly sampled vessel positions.
//!
//! This library provides:
//! - Segmentation of per-vessel position reports into timed line segments
//! - Dual-frame (-180..180 and 0..360) break detection across the date line
//! - Port classification of stop segments, including ordering of segments
//!   that cross several ports by directional projection
//! - Edge tables of port-to-port transitions with departure/arrival times
//! - Aggregation into a graph of direct linkages (directed) and a graph of
//!   all linkages (undirected)
//! - Parallel per-vessel processing with rayon
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel processing with rayon (default)
//! - **`synthetic`** - Seeded synthetic fleet generator for benchmarks
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use geo::{polygon, Geometry};
//! use voyagenet::{build_graphs, Node, NodeSet, Observation, PipelineConfig};
//!
//! let nodes = NodeSet::new(vec![
//!     Node::new("Kobe", Geometry::Polygon(polygon![
//!         (x: 134.9, y: 34.4), (x: 135.4, y: 34.4), (x: 135.4, y: 34.8), (x: 134.9, y: 34.8),
//!     ])),
//!     Node::new("Yokohama", Geometry::Polygon(polygon![
//!         (x: 139.4, y: 35.2), (x: 139.9, y: 35.2), (x: 139.9, y: 35.6), (x: 139.4, y: 35.6),
//!     ])),
//! ]);
//!
//! let at = |day: u32| Some(Utc.with_ymd_and_hms(1901, 3, day, 0, 0, 0).unwrap());
//! let observations = vec![
//!     Observation::new("ship-1", at(1), 34.60, 135.10),
//!     Observation::new("ship-1", at(3), 34.62, 135.12),
//!     Observation::new("ship-1", at(4), 35.00, 137.00),
//!     Observation::new("ship-1", at(6), 35.40, 139.60),
//!     Observation::new("ship-1", at(8), 35.42, 139.62),
//! ];
//!
//! let output = build_graphs(&observations, &nodes, &PipelineConfig::default()).unwrap();
//! assert_eq!(output.direct.weight("Kobe", "Yokohama"), Some(1));
//! assert_eq!(output.all.weight("Yokohama", "Kobe"), Some(1));
//! ```

use chrono::{DateTime, Utc};
use geo::{Coord, Line};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, VoyageError};

// Planar geometry helpers (longitude wrap, lengths, projection)
pub mod geo_utils;

// Point table -> segment table
pub mod segments;
pub use segments::{batch_segments, build_segments, partition_by_entity, require_segments};

// Port reference set
pub mod nodes;
pub use nodes::{Node, NodeSet};

// Break / stop / unknown / multi-port classification
pub mod classify;
pub use classify::{
    Classification, ClassifiedSegment, DegenerateReason, MultiResolution, NodeSequence, NodeVisit,
    UnknownSegment, classify_segment, classify_segments, node_sequence, resolve_multi,
};

// Transition tables
pub mod edges;
pub use edges::{Edge, direct_graph_from_edges, edge_sequence, edges_from_classified};

// Graph storage
pub mod graph;
pub use graph::{GraphKind, GraphSnapshot, LinkageGraph, WeightedEdge};

// GDL / GAL accumulation and the batch pipeline
pub mod aggregate;
#[cfg(feature = "parallel")]
pub use aggregate::build_graphs_parallel;
pub use aggregate::{
    EntityResult, PipelineOutput, PipelineStats, add_all_linkages, add_direct_linkages,
    build_graphs, process_entity,
};

// Synthetic fleet generator for benchmarks and stress tests
#[cfg(feature = "synthetic")]
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A single position report for one vessel.
///
/// Longitude is expected on the -180..180 scale. A report with no timestamp
/// or a non-finite coordinate counts as a missing value and is dropped before
/// segmentation.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use voyagenet::Observation;
///
/// let t = Utc.with_ymd_and_hms(1923, 9, 1, 12, 0, 0).unwrap();
/// let obs = Observation::new("JBOA", Some(t), 34.68, 135.19);
/// assert!(obs.is_valid());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub entity_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Observation {
    /// Create a new observation.
    pub fn new(
        entity_id: impl Into<String>,
        timestamp: Option<DateTime<Utc>>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            timestamp,
            latitude,
            longitude,
        }
    }

    /// Check that the observation has a timestamp and finite coordinates.
    pub fn is_valid(&self) -> bool {
        self.timestamp.is_some() && self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Planar coordinate (x = longitude, y = latitude).
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }
}

/// A straight movement between two temporally adjacent observations.
///
/// Invariant: `t1 < t2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub entity_id: String,
    /// Time of the first observation
    pub t1: DateTime<Utc>,
    /// Time of the second observation
    pub t2: DateTime<Utc>,
    /// Endpoints in (longitude, latitude) order
    pub line: Line<f64>,
}

impl Segment {
    /// Time between the two observations in fractional hours.
    pub fn duration_hours(&self) -> f64 {
        (self.t2 - self.t1).num_milliseconds() as f64 / 3_600_000.0
    }

    /// Planar length in the native -180..180 frame.
    pub fn length(&self) -> f64 {
        geo_utils::planar_length(&self.line)
    }

    /// Planar length after shifting negative longitudes onto 0..360.
    pub fn shifted_length(&self) -> f64 {
        geo_utils::planar_length(&geo_utils::shift_to_360(&self.line))
    }
}

// ============================================================================
// Node References
// ============================================================================

pub const START_LABEL: &str = "_START";
pub const BREAK_LABEL: &str = "_BREAK";
pub const UNKNOWN_LABEL: &str = "_UNKNOWN";
pub const MULTIPLE_LABEL: &str = "_MULTIPLE";
pub const MANUAL_LABEL: &str = "_MULTI_MANUAL";

/// A resolved position in a voyage: either a named port or a sentinel.
///
/// Sentinels keep their historical labels so that graphs and tables written
/// by downstream tools stay comparable with older runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeRef {
    /// Predecessor of the first transition of a vessel
    Start,
    /// Voyage boundary: a gap too long to be continuous travel
    Break,
    /// Stop that intersects no port
    Unknown,
    /// Stop that intersects several ports, collapsed to one row
    Multiple,
    /// Multi-port stop whose order could not be resolved geometrically
    ManualReview,
    /// A labeled port
    Port(String),
}

impl NodeRef {
    /// Label used in tables and graphs.
    pub fn label(&self) -> &str {
        match self {
            NodeRef::Start => START_LABEL,
            NodeRef::Break => BREAK_LABEL,
            NodeRef::Unknown => UNKNOWN_LABEL,
            NodeRef::Multiple => MULTIPLE_LABEL,
            NodeRef::ManualReview => MANUAL_LABEL,
            NodeRef::Port(label) => label,
        }
    }

    /// Parse a label back into a node reference. Unreserved labels are ports.
    pub fn from_label(label: &str) -> Self {
        match label {
            START_LABEL => NodeRef::Start,
            BREAK_LABEL => NodeRef::Break,
            UNKNOWN_LABEL => NodeRef::Unknown,
            MULTIPLE_LABEL => NodeRef::Multiple,
            MANUAL_LABEL => NodeRef::ManualReview,
            other => NodeRef::Port(other.to_string()),
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self, NodeRef::Break)
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, NodeRef::Port(_))
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for segment classification and graph accumulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Segment length (degrees, planar) at or above which a segment is a
    /// voyage break. Must hold in both longitude frames.
    /// Default: 10.0
    pub dist_break: f64,

    /// Minimum hours between two reports for the segment to count as a
    /// possible stop.
    /// Default: 24.0
    pub stop_duration_hours: f64,

    /// Accumulate transition counts. When false every edge has weight 1.
    /// Default: true
    pub weighted: bool,

    /// Keep A->A transitions and A-A co-occurrences.
    /// Default: false
    pub self_loops: bool,

    /// Drop `_UNKNOWN` targets when building a graph from an edge table.
    /// Default: true
    pub remove_unknown: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dist_break: 10.0,
            stop_duration_hours: 24.0,
            weighted: true,
            self_loops: false,
            remove_unknown: true,
        }
    }
}

impl PipelineConfig {
    pub fn with_dist_break(mut self, dist_break: f64) -> Self {
        self.dist_break = dist_break;
        self
    }

    pub fn with_stop_duration_hours(mut self, hours: f64) -> Self {
        self.stop_duration_hours = hours;
        self
    }

    pub fn with_weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    pub fn with_self_loops(mut self, self_loops: bool) -> Self {
        self.self_loops = self_loops;
        self
    }

    pub fn with_remove_unknown(mut self, remove_unknown: bool) -> Self {
        self.remove_unknown = remove_unknown;
        self
    }

    /// Reject thresholds that would make every comparison meaningless.
    pub fn validate(&self) -> Result<()> {
        if !self.dist_break.is_finite() || self.dist_break < 0.0 {
            return Err(VoyageError::InvalidConfig(format!(
                "dist_break must be a non-negative finite number, got {}",
                self.dist_break
            )));
        }
        if !self.stop_duration_hours.is_finite() || self.stop_duration_hours < 0.0 {
            return Err(VoyageError::InvalidConfig(format!(
                "stop_duration_hours must be a non-negative finite number, got {}",
                self.stop_duration_hours
            )));
        }
        Ok(())
    }
}
