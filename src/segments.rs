//! Segment construction from position reports.
//!
//! A vessel's reports are sorted by time, reports with missing values are
//! dropped, and every pair of consecutive reports becomes one [`Segment`].

use std::collections::HashMap;

use geo::Line;
use log::debug;

use crate::error::{OptionExt, Result, VoyageError};
use crate::{Observation, Segment};

/// Minimum number of valid reports needed to form a segment.
pub const MIN_POINTS: usize = 2;

/// Group observations by entity id.
///
/// Entities appear in the order their first observation appears; rows keep
/// their relative order within an entity.
pub fn partition_by_entity(observations: &[Observation]) -> Vec<(&str, Vec<&Observation>)> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&Observation>)> = Vec::new();

    for obs in observations {
        let slot = *slots.entry(obs.entity_id.as_str()).or_insert_with(|| {
            groups.push((obs.entity_id.as_str(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(obs);
    }

    groups
}

/// Return the single entity id of a table, or an error naming all of them.
///
/// An empty table yields `Ok(None)`.
pub(crate) fn single_entity<'a, I>(ids: I) -> Result<Option<&'a str>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: Vec<&str> = Vec::new();
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    match seen.len() {
        0 => Ok(None),
        1 => Ok(Some(seen[0])),
        found => Err(VoyageError::MultipleEntities {
            found,
            ids: seen.into_iter().map(str::to_string).collect(),
        }),
    }
}

/// Build the segment table for one entity's observations.
///
/// Returns an empty table when fewer than two valid observations remain,
/// and [`VoyageError::MultipleEntities`] when the rows mix entities.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use voyagenet::{build_segments, Observation};
///
/// let t = |h| Some(Utc.with_ymd_and_hms(1910, 1, 1, h, 0, 0).unwrap());
/// let obs = vec![
///     Observation::new("A", t(6), 1.0, 1.0),
///     Observation::new("A", t(0), 0.0, 0.0),
///     Observation::new("A", t(12), 2.0, 2.0),
/// ];
/// let segments = build_segments(&obs).unwrap();
/// assert_eq!(segments.len(), 2);
/// assert_eq!(segments[0].line.start.x, 0.0);
/// ```
pub fn build_segments(observations: &[Observation]) -> Result<Vec<Segment>> {
    let entity_id = match single_entity(observations.iter().map(|o| o.entity_id.as_str()))? {
        Some(id) => id,
        None => return Ok(Vec::new()),
    };
    Ok(segments_for(entity_id, observations.iter()))
}

/// Like [`build_segments`], but a track too sparse to segment is an error.
pub fn require_segments(observations: &[Observation]) -> Result<Vec<Segment>> {
    let segments = build_segments(observations)?;
    let entity_id = observations
        .first()
        .map(|o| o.entity_id.as_str())
        .unwrap_or_default();
    let valid = observations.iter().filter(|o| o.is_valid()).count();
    (!segments.is_empty())
        .then_some(segments)
        .ok_or_insufficient_points(entity_id, valid, MIN_POINTS)
}

/// Build segments for every entity in a mixed table.
///
/// Entities with fewer than two valid observations are skipped.
pub fn batch_segments(observations: &[Observation]) -> Vec<Segment> {
    let mut result = Vec::new();
    for (entity_id, rows) in partition_by_entity(observations) {
        let segments = segments_for(entity_id, rows.into_iter());
        if segments.is_empty() {
            debug!("[Segments] Skipping {}: fewer than {} valid points", entity_id, MIN_POINTS);
            continue;
        }
        result.extend(segments);
    }
    result
}

/// Sort, drop invalid and duplicate-time rows, and pair consecutive points.
pub(crate) fn segments_for<'a, I>(entity_id: &str, rows: I) -> Vec<Segment>
where
    I: Iterator<Item = &'a Observation>,
{
    let mut points: Vec<_> = rows
        .filter(|o| o.is_valid())
        .filter_map(|o| o.timestamp.map(|t| (t, o.coord())))
        .collect();

    // Stable sort keeps the first of any tied reports, which the dedup keeps.
    points.sort_by_key(|(t, _)| *t);
    points.dedup_by_key(|(t, _)| *t);

    if points.len() < MIN_POINTS {
        return Vec::new();
    }

    points
        .windows(2)
        .map(|pair| Segment {
            entity_id: entity_id.to_string(),
            t1: pair[0].0,
            t2: pair[1].0,
            line: Line::new(pair[0].1, pair[1].1),
        })
        .collect()
}
