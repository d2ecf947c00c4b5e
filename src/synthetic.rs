//! Synthetic fleet generator for stress testing and benchmarking.
//!
//! Generates a grid of square ports and a fleet of vessels that hop between
//! them, dwelling long enough at each port to register a stop and reporting
//! at short intervals while under way. Some passages are left unreported,
//! which produces long segments that register as breaks when the ports are
//! far enough apart.
//!
//! Feature-gated behind `synthetic`.
//!
//! # Example
//!
//! ```rust
//! use voyagenet::synthetic::FleetScenario;
//!
//! let scenario = FleetScenario {
//!     vessel_count: 20,
//!     seed: 7,
//!     ..FleetScenario::default()
//! };
//!
//! let fleet = scenario.generate();
//! assert_eq!(fleet.port_calls.len(), 20);
//! assert_eq!(fleet.nodes.len(), 16);
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use geo::{Coord, Geometry, LineString, Point, Polygon};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Node, NodeSet, Observation};

// ============================================================================
// Types
// ============================================================================

/// Scenario configuration for generating a synthetic fleet.
#[derive(Debug, Clone)]
pub struct FleetScenario {
    /// South-west corner of the port grid (longitude, latitude).
    pub origin: (f64, f64),
    /// Ports per grid side; the grid holds `port_grid * port_grid` ports.
    pub port_grid: usize,
    /// Distance between neighbouring port centres in degrees.
    pub port_spacing: f64,
    /// Half the side length of each square port in degrees.
    pub port_half_width: f64,
    /// Number of vessels to generate.
    pub vessel_count: usize,
    /// Port calls per vessel.
    pub calls_per_vessel: usize,
    /// Hours between the two reports made inside a port.
    pub dwell_hours: i64,
    /// Hours between reports while under way.
    pub transit_step_hours: i64,
    /// Maximum distance covered between two under-way reports, in degrees.
    pub transit_step: f64,
    /// Probability that a passage is not reported at all (0.0-1.0).
    pub gap_probability: f64,
    /// RNG seed for deterministic reproduction.
    pub seed: u64,
}

impl Default for FleetScenario {
    fn default() -> Self {
        Self {
            origin: (120.0, 20.0),
            port_grid: 4,
            port_spacing: 5.0,
            port_half_width: 0.25,
            vessel_count: 50,
            calls_per_vessel: 8,
            dwell_hours: 48,
            transit_step_hours: 6,
            transit_step: 0.5,
            gap_probability: 0.1,
            seed: 42,
        }
    }
}

/// Metadata about a generated fleet.
#[derive(Debug, Clone)]
pub struct FleetMetadata {
    pub total_observations: usize,
    pub unreported_passages: usize,
}

/// A generated fleet with ground truth.
pub struct SyntheticFleet {
    /// Reports of all vessels, vessel by vessel in time order.
    pub observations: Vec<Observation>,
    /// The port grid.
    pub nodes: NodeSet,
    /// Ports visited by each vessel, in order.
    pub port_calls: HashMap<String, Vec<String>>,
    pub metadata: FleetMetadata,
}

// ============================================================================
// Generation
// ============================================================================

fn square_port(label: String, centre: Coord<f64>, half_width: f64) -> Node {
    let ring = LineString::from(vec![
        (centre.x - half_width, centre.y - half_width),
        (centre.x + half_width, centre.y - half_width),
        (centre.x + half_width, centre.y + half_width),
        (centre.x - half_width, centre.y + half_width),
        (centre.x - half_width, centre.y - half_width),
    ]);
    Node::with_representative_point(
        label,
        Geometry::Polygon(Polygon::new(ring, vec![])),
        Point(centre),
    )
}

/// Random point inside a port, away from its edges.
fn jitter(centre: Coord<f64>, half_width: f64, rng: &mut StdRng) -> Coord<f64> {
    let r = half_width * 0.8;
    Coord {
        x: centre.x + rng.gen_range(-r..r),
        y: centre.y + rng.gen_range(-r..r),
    }
}

impl FleetScenario {
    /// Generate a complete synthetic fleet from this scenario.
    pub fn generate(&self) -> SyntheticFleet {
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut ports: Vec<(String, Coord<f64>)> = Vec::new();
        for row in 0..self.port_grid {
            for col in 0..self.port_grid {
                let centre = Coord {
                    x: self.origin.0 + col as f64 * self.port_spacing,
                    y: self.origin.1 + row as f64 * self.port_spacing,
                };
                ports.push((format!("P{:02}{:02}", row, col), centre));
            }
        }
        let nodes: NodeSet = ports
            .iter()
            .map(|(label, centre)| square_port(label.clone(), *centre, self.port_half_width))
            .collect();

        let epoch: DateTime<Utc> = Utc
            .with_ymd_and_hms(1900, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default();

        let mut observations = Vec::new();
        let mut port_calls = HashMap::new();
        let mut unreported_passages = 0;

        for vessel_idx in 0..self.vessel_count {
            let vessel_id = format!("vessel_{:04}", vessel_idx);
            let mut t = epoch + Duration::hours(rng.gen_range(0..24 * 365));
            let mut calls: Vec<String> = Vec::with_capacity(self.calls_per_vessel);
            let mut current = rng.gen_range(0..ports.len());

            for call in 0..self.calls_per_vessel {
                if call > 0 {
                    let mut next = rng.gen_range(0..ports.len());
                    if next == current {
                        next = (next + 1) % ports.len();
                    }
                    let from = ports[current].1;
                    let to = ports[next].1;

                    if rng.r#gen::<f64>() < self.gap_probability {
                        unreported_passages += 1;
                    } else {
                        // Evenly spaced under-way reports strictly between the ports
                        let dx = to.x - from.x;
                        let dy = to.y - from.y;
                        let steps = ((dx.hypot(dy) / self.transit_step).ceil() as usize).max(2);
                        for step in 1..steps {
                            let f = step as f64 / steps as f64;
                            t += Duration::hours(self.transit_step_hours);
                            let c = Coord {
                                x: from.x + dx * f,
                                y: from.y + dy * f,
                            };
                            observations.push(Observation::new(&vessel_id, Some(t), c.y, c.x));
                        }
                    }
                    t += Duration::hours(self.transit_step_hours);
                    current = next;
                }

                let (label, centre) = &ports[current];
                calls.push(label.clone());
                let arrival = jitter(*centre, self.port_half_width, &mut rng);
                observations.push(Observation::new(&vessel_id, Some(t), arrival.y, arrival.x));
                t += Duration::hours(self.dwell_hours);
                let departure = jitter(*centre, self.port_half_width, &mut rng);
                observations.push(Observation::new(&vessel_id, Some(t), departure.y, departure.x));
            }

            port_calls.insert(vessel_id, calls);
        }

        SyntheticFleet {
            metadata: FleetMetadata {
                total_observations: observations.len(),
                unreported_passages,
            },
            observations,
            nodes,
            port_calls,
        }
    }
}
