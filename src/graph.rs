//! Weighted linkage graphs.
//!
//! Labels are interned to small integer ids and the adjacency lives in a
//! petgraph `GraphMap` keyed by id pairs. Equality is defined on labels, so
//! two graphs built from the same transitions in a different order compare
//! equal even though their ids differ.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use petgraph::EdgeType;
use petgraph::graphmap::{DiGraphMap, GraphMap, UnGraphMap};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VoyageError};

type NodeId = u32;

/// Direction kind of a linkage graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphKind {
    /// Graph of direct linkages
    Directed,
    /// Graph of all linkages
    Undirected,
}

impl fmt::Display for GraphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphKind::Directed => f.write_str("directed"),
            GraphKind::Undirected => f.write_str("undirected"),
        }
    }
}

/// An edge with its endpoints' labels.
///
/// For undirected graphs `source <= target`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeightedEdge {
    pub source: String,
    pub target: String,
    pub weight: u64,
}

/// Serializable form of a graph, for persistence collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub kind: GraphKind,
    pub nodes: Vec<String>,
    pub edges: Vec<WeightedEdge>,
}

#[derive(Debug, Clone)]
enum Adjacency {
    Directed(DiGraphMap<NodeId, u64>),
    Undirected(UnGraphMap<NodeId, u64>),
}

/// Weighted simple graph over node labels.
#[derive(Debug, Clone)]
pub struct LinkageGraph {
    labels: Vec<String>,
    ids: HashMap<String, NodeId>,
    adjacency: Adjacency,
}

impl LinkageGraph {
    /// Empty graph of direct linkages.
    pub fn directed() -> Self {
        Self::with_kind(GraphKind::Directed)
    }

    /// Empty graph of all linkages.
    pub fn undirected() -> Self {
        Self::with_kind(GraphKind::Undirected)
    }

    pub fn with_kind(kind: GraphKind) -> Self {
        let adjacency = match kind {
            GraphKind::Directed => Adjacency::Directed(DiGraphMap::new()),
            GraphKind::Undirected => Adjacency::Undirected(UnGraphMap::new()),
        };
        Self {
            labels: Vec::new(),
            ids: HashMap::new(),
            adjacency,
        }
    }

    pub fn kind(&self) -> GraphKind {
        match self.adjacency {
            Adjacency::Directed(_) => GraphKind::Directed,
            Adjacency::Undirected(_) => GraphKind::Undirected,
        }
    }

    /// Fail with [`VoyageError::GraphKindMismatch`] unless the kind matches.
    pub fn ensure_kind(&self, expected: GraphKind) -> Result<()> {
        let found = self.kind();
        if found == expected {
            Ok(())
        } else {
            Err(VoyageError::GraphKindMismatch { expected, found })
        }
    }

    fn intern(&mut self, label: &str) -> NodeId {
        if let Some(&id) = self.ids.get(label) {
            return id;
        }
        let id = self.labels.len() as NodeId;
        self.labels.push(label.to_string());
        self.ids.insert(label.to_string(), id);
        match &mut self.adjacency {
            Adjacency::Directed(g) => {
                g.add_node(id);
            }
            Adjacency::Undirected(g) => {
                g.add_node(id);
            }
        }
        id
    }

    /// Add a node without edges.
    pub fn add_node(&mut self, label: &str) {
        self.intern(label);
    }

    /// Record one observation of `source -> target`.
    ///
    /// A new edge starts at weight 1. An existing edge gains 1 when
    /// `weighted`, and otherwise stays at its current weight.
    pub fn increment(&mut self, source: &str, target: &str, weighted: bool) {
        self.add_weight(source, target, 1, weighted);
    }

    /// Copy of this graph with one more observation of `source -> target`.
    pub fn with_increment(&self, source: &str, target: &str, weighted: bool) -> Self {
        let mut next = self.clone();
        next.increment(source, target, weighted);
        next
    }

    fn add_weight(&mut self, source: &str, target: &str, weight: u64, weighted: bool) {
        let a = self.intern(source);
        let b = self.intern(target);
        match &mut self.adjacency {
            Adjacency::Directed(g) => bump(g, a, b, weight, weighted),
            Adjacency::Undirected(g) => bump(g, a, b, weight, weighted),
        }
    }

    /// Weight of an edge, if present.
    pub fn weight(&self, source: &str, target: &str) -> Option<u64> {
        let a = *self.ids.get(source)?;
        let b = *self.ids.get(target)?;
        match &self.adjacency {
            Adjacency::Directed(g) => g.edge_weight(a, b).copied(),
            Adjacency::Undirected(g) => g.edge_weight(a, b).copied(),
        }
    }

    pub fn contains_node(&self, label: &str) -> bool {
        self.ids.contains_key(label)
    }

    pub fn contains_edge(&self, source: &str, target: &str) -> bool {
        self.weight(source, target).is_some()
    }

    /// Node labels in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.labels.len()
    }

    pub fn edge_count(&self) -> usize {
        match &self.adjacency {
            Adjacency::Directed(g) => g.edge_count(),
            Adjacency::Undirected(g) => g.edge_count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Sum of all edge weights.
    pub fn total_weight(&self) -> u64 {
        self.edges().iter().map(|e| e.weight).sum()
    }

    /// All edges sorted by (source, target).
    pub fn edges(&self) -> Vec<WeightedEdge> {
        let mut edges: Vec<WeightedEdge> = match &self.adjacency {
            Adjacency::Directed(g) => g
                .all_edges()
                .map(|(a, b, w)| self.edge_row(a, b, *w, false))
                .collect(),
            Adjacency::Undirected(g) => g
                .all_edges()
                .map(|(a, b, w)| self.edge_row(a, b, *w, true))
                .collect(),
        };
        edges.sort();
        edges
    }

    fn edge_row(&self, a: NodeId, b: NodeId, weight: u64, normalize: bool) -> WeightedEdge {
        let mut source = &self.labels[a as usize];
        let mut target = &self.labels[b as usize];
        if normalize && source > target {
            std::mem::swap(&mut source, &mut target);
        }
        WeightedEdge {
            source: source.clone(),
            target: target.clone(),
            weight,
        }
    }

    /// Combine two graphs of the same kind.
    ///
    /// With `weighted`, weights of shared edges are summed; otherwise the
    /// result only records presence (weight 1).
    pub fn merge(&self, other: &LinkageGraph, weighted: bool) -> Result<Self> {
        other.ensure_kind(self.kind())?;
        let mut merged = self.clone();
        for label in other.nodes() {
            merged.add_node(label);
        }
        for edge in other.edges() {
            let weight = if weighted { edge.weight } else { 1 };
            merged.add_weight(&edge.source, &edge.target, weight, weighted);
        }
        Ok(merged)
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            kind: self.kind(),
            nodes: self.labels.clone(),
            edges: self.edges(),
        }
    }

    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        let mut graph = Self::with_kind(snapshot.kind);
        for label in &snapshot.nodes {
            graph.add_node(label);
        }
        for edge in &snapshot.edges {
            graph.add_weight(&edge.source, &edge.target, edge.weight, true);
        }
        graph
    }
}

fn bump<Ty: EdgeType>(
    graph: &mut GraphMap<NodeId, u64, Ty>,
    a: NodeId,
    b: NodeId,
    weight: u64,
    weighted: bool,
) {
    match graph.edge_weight_mut(a, b) {
        Some(w) if weighted => *w += weight,
        Some(_) => {}
        None => {
            graph.add_edge(a, b, weight);
        }
    }
}

impl PartialEq for LinkageGraph {
    fn eq(&self, other: &Self) -> bool {
        let nodes_a: BTreeSet<&str> = self.nodes().collect();
        let nodes_b: BTreeSet<&str> = other.nodes().collect();
        self.kind() == other.kind() && nodes_a == nodes_b && self.edges() == other.edges()
    }
}

impl Eq for LinkageGraph {}
