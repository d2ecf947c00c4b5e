//! Graph accumulation and the batch pipeline.
//!
//! Two graphs are built from resolved node sequences:
//! - the graph of direct linkages (GDL): a directed edge for every pair of
//!   consecutive nodes, never across a `_BREAK`
//! - the graph of all linkages (GAL): an undirected edge for every pair of
//!   distinct nodes that share an unbroken voyage run
//!
//! Both update functions take the caller's graph by reference and return a
//! new graph, so partial graphs can be combined in any order. Entities are
//! independent until this point; the batch drivers partition by entity,
//! process each one, and reduce the partial graphs by summing weights.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::classify::{ClassifiedSegment, NodeSequence, classify_segments};
use crate::edges::{Edge, edges_from_classified};
use crate::error::Result;
use crate::graph::{GraphKind, LinkageGraph};
use crate::nodes::NodeSet;
use crate::segments::{partition_by_entity, segments_for};
use crate::{Classification, NodeRef, Observation, PipelineConfig};

/// Add direct linkages from one node sequence to a copy of `graph`.
///
/// Pairs touching a break are skipped, not bridged. Self-transitions are
/// only kept when `config.self_loops` is set.
pub fn add_direct_linkages(
    sequence: &[NodeRef],
    graph: &LinkageGraph,
    config: &PipelineConfig,
) -> Result<LinkageGraph> {
    graph.ensure_kind(GraphKind::Directed)?;
    let mut next = graph.clone();
    accumulate_direct(sequence, &mut next, config);
    Ok(next)
}

/// Add all-linkage pairs from one node sequence to a copy of `graph`.
///
/// The sequence is split into runs at each break. Within a run every pair of
/// distinct labels gains one co-occurrence, including `(a, a)` pairs when
/// `config.self_loops` is set.
pub fn add_all_linkages(
    sequence: &[NodeRef],
    graph: &LinkageGraph,
    config: &PipelineConfig,
) -> Result<LinkageGraph> {
    graph.ensure_kind(GraphKind::Undirected)?;
    let mut next = graph.clone();
    accumulate_all(sequence, &mut next, config);
    Ok(next)
}

pub(crate) fn accumulate_direct(
    sequence: &[NodeRef],
    graph: &mut LinkageGraph,
    config: &PipelineConfig,
) {
    for pair in sequence.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        if from.is_break() || to.is_break() {
            continue;
        }
        if from == to && !config.self_loops {
            continue;
        }
        graph.increment(from.label(), to.label(), config.weighted);
    }
}

pub(crate) fn accumulate_all(
    sequence: &[NodeRef],
    graph: &mut LinkageGraph,
    config: &PipelineConfig,
) {
    let offset = if config.self_loops { 0 } else { 1 };
    for run in sequence.split(NodeRef::is_break) {
        let mut unique: Vec<&str> = Vec::new();
        for node in run {
            if !unique.contains(&node.label()) {
                unique.push(node.label());
            }
        }
        for i in 0..unique.len() {
            for j in (i + offset)..unique.len() {
                graph.increment(unique[i], unique[j], config.weighted);
            }
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Everything the pipeline derives for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityResult {
    pub entity_id: String,
    pub segment_count: usize,
    pub sequence: NodeSequence,
    pub edges: Vec<Edge>,
    /// Multi-port segments left for manual ordering
    pub degenerate_resolutions: usize,
}

impl EntityResult {
    fn from_classified(
        entity_id: &str,
        segment_count: usize,
        classified: &[ClassifiedSegment],
    ) -> Self {
        let degenerate_resolutions = classified
            .iter()
            .filter(|c| {
                matches!(&c.classification, Classification::MultiStop(r) if r.is_indeterminate())
            })
            .count();
        Self {
            entity_id: entity_id.to_string(),
            segment_count,
            sequence: NodeSequence::from_classified(classified),
            edges: edges_from_classified(classified),
            degenerate_resolutions,
        }
    }
}

/// Run segmentation, classification, and sequencing for one entity.
///
/// Returns `None` when the entity has fewer than two valid observations.
/// Rows belonging to other entities are ignored.
pub fn process_entity(
    entity_id: &str,
    observations: &[Observation],
    nodes: &NodeSet,
    config: &PipelineConfig,
) -> Option<EntityResult> {
    let rows = observations.iter().filter(|o| o.entity_id == entity_id);
    process_rows(entity_id, rows, nodes, config)
}

fn process_rows<'a, I>(
    entity_id: &str,
    rows: I,
    nodes: &NodeSet,
    config: &PipelineConfig,
) -> Option<EntityResult>
where
    I: Iterator<Item = &'a Observation>,
{
    let segments = segments_for(entity_id, rows);
    if segments.is_empty() {
        debug!("[Aggregate] Skipping {}: too few valid points", entity_id);
        return None;
    }
    let classified = classify_segments(&segments, nodes, config);
    Some(EntityResult::from_classified(entity_id, segments.len(), &classified))
}

/// Counters for a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub entities: usize,
    pub skipped_entities: usize,
    pub segments: usize,
    pub visits: usize,
    pub unknown_segments: usize,
    pub degenerate_resolutions: usize,
}

/// Tables and graphs produced by a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Node sequences of all entities, entity by entity
    pub sequence: NodeSequence,
    pub edges: Vec<Edge>,
    /// Graph of direct linkages
    pub direct: LinkageGraph,
    /// Graph of all linkages
    pub all: LinkageGraph,
    pub stats: PipelineStats,
}

impl PipelineOutput {
    fn empty() -> Self {
        Self {
            sequence: NodeSequence::default(),
            edges: Vec::new(),
            direct: LinkageGraph::directed(),
            all: LinkageGraph::undirected(),
            stats: PipelineStats::default(),
        }
    }

    /// Fold one entity's result into the run.
    fn absorb(&mut self, result: EntityResult, config: &PipelineConfig) {
        let nodes = result.sequence.nodes();
        accumulate_direct(&nodes, &mut self.direct, config);
        accumulate_all(&nodes, &mut self.all, config);
        self.record(result);
    }

    /// Append one entity's tables and counters, leaving the graphs alone.
    fn record(&mut self, result: EntityResult) {
        self.stats.entities += 1;
        self.stats.segments += result.segment_count;
        self.stats.visits += result.sequence.visits.len();
        self.stats.unknown_segments += result.sequence.unknown.len();
        self.stats.degenerate_resolutions += result.degenerate_resolutions;
        self.sequence.extend(result.sequence);
        self.edges.extend(result.edges);
    }

    fn log_summary(&self) {
        info!(
            "[Aggregate] {} entities ({} skipped), {} segments, {} visits, {} unknown, {} manual",
            self.stats.entities,
            self.stats.skipped_entities,
            self.stats.segments,
            self.stats.visits,
            self.stats.unknown_segments,
            self.stats.degenerate_resolutions
        );
        info!(
            "[Aggregate] GDL: {} nodes / {} edges, GAL: {} nodes / {} edges",
            self.direct.node_count(),
            self.direct.edge_count(),
            self.all.node_count(),
            self.all.edge_count()
        );
    }
}

/// Run the full pipeline over a mixed observation table.
///
/// Entities are processed in order of first appearance; sparse entities are
/// counted in `stats.skipped_entities` and otherwise ignored.
pub fn build_graphs(
    observations: &[Observation],
    nodes: &NodeSet,
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    config.validate()?;
    let mut output = PipelineOutput::empty();

    for (entity_id, rows) in partition_by_entity(observations) {
        match process_rows(entity_id, rows.into_iter(), nodes, config) {
            Some(result) => output.absorb(result, config),
            None => output.stats.skipped_entities += 1,
        }
    }

    output.log_summary();
    Ok(output)
}

/// Parallel version of [`build_graphs`].
///
/// Entities are processed on the rayon pool. Each worker folds its entities
/// into private graphs, which are then merged by summing weights. Tables are
/// reassembled in entity order, so the output equals the sequential run.
#[cfg(feature = "parallel")]
pub fn build_graphs_parallel(
    observations: &[Observation],
    nodes: &NodeSet,
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    use rayon::prelude::*;

    config.validate()?;
    let partitions = partition_by_entity(observations);

    let results: Vec<Option<EntityResult>> = partitions
        .par_iter()
        .map(|(entity_id, rows)| process_rows(entity_id, rows.iter().copied(), nodes, config))
        .collect();

    let empty_graphs = || (LinkageGraph::directed(), LinkageGraph::undirected());
    let (direct, all) = results
        .par_iter()
        .flatten()
        .fold(empty_graphs, |(mut direct, mut all), result| {
            let nodes = result.sequence.nodes();
            accumulate_direct(&nodes, &mut direct, config);
            accumulate_all(&nodes, &mut all, config);
            (direct, all)
        })
        .map(Ok::<_, crate::VoyageError>)
        .try_reduce(empty_graphs, |(d1, a1), (d2, a2)| {
            Ok((d1.merge(&d2, config.weighted)?, a1.merge(&a2, config.weighted)?))
        })?;

    let mut output = PipelineOutput::empty();
    for result in results {
        match result {
            Some(result) => output.record(result),
            None => output.stats.skipped_entities += 1,
        }
    }
    output.direct = direct;
    output.all = all;

    output.log_summary();
    Ok(output)
}
