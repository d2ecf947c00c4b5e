//! Unified error handling.
//!
//! Only conditions that stop a call are errors. Geometric dead ends such as
//! a vertical segment crossing two ports are data outcomes and travel through
//! the node sequence as `_MULTI_MANUAL` rows instead.

use thiserror::Error;

use crate::graph::GraphKind;

/// Errors raised by the voyage pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VoyageError {
    /// A single-entity operation received rows for several entities.
    #[error("expected a single entity id, found {found} ({})", .ids.join(", "))]
    MultipleEntities { found: usize, ids: Vec<String> },

    /// Not enough valid observations to build a single segment.
    #[error(
        "entity {entity_id} has {point_count} points, at least {minimum_required} are required"
    )]
    InsufficientPoints {
        entity_id: String,
        point_count: usize,
        minimum_required: usize,
    },

    /// Aggregation was handed a graph of the wrong direction kind.
    #[error("expected {expected} graph, got {found} graph")]
    GraphKindMismatch { expected: GraphKind, found: GraphKind },

    /// A pipeline threshold is negative or not finite.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, VoyageError>;

/// Convenience conversions from `Option` into pipeline errors.
pub trait OptionExt<T> {
    fn ok_or_insufficient_points(
        self,
        entity_id: &str,
        point_count: usize,
        minimum_required: usize,
    ) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_insufficient_points(
        self,
        entity_id: &str,
        point_count: usize,
        minimum_required: usize,
    ) -> Result<T> {
        self.ok_or_else(|| VoyageError::InsufficientPoints {
            entity_id: entity_id.to_string(),
            point_count,
            minimum_required,
        })
    }
}
