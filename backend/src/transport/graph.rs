//! Ladle-car rail network between bays
//!
//! `BayGraph` holds the bays and the directed edges between them. Shortest
//! paths (by travel time) between every pair of bays are computed once at
//! construction, so dispatch decisions only do lookups.

use crate::config::{bay_adjacency, ConfigError, PlantConfig};
use crate::models::bay::Bay;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

/// Directed rail edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BayEdge {
    pub from: String,
    pub to: String,
    pub distance: f64,
    pub travel_time: f64,
}

/// Shortest car route between two bays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarPath {
    pub travel_time: f64,
    pub distance: f64,
    /// Bays visited, both ends included
    pub bays: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BayGraph {
    bays: BTreeMap<String, Bay>,
    edges: BTreeMap<String, Vec<BayEdge>>,
    paths: BTreeMap<(String, String), CarPath>,
}

#[derive(PartialEq)]
struct Frontier {
    time: f64,
    bay: String,
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.bay.cmp(&self.bay))
    }
}

impl BayGraph {
    /// Build bays and edges from the configuration
    ///
    /// Edge travel time: explicit `travel_time`, else `distance /
    /// ladle_car_speed`, else centre-to-centre distance / speed.
    pub fn new(config: &PlantConfig) -> Result<Self, ConfigError> {
        let bay_configs = config.effective_bays();
        let mut bays = BTreeMap::new();
        for (id, bay_config) in &bay_configs {
            bays.insert(id.clone(), Bay::from_config(id, bay_config)?);
        }

        let mut edges: BTreeMap<String, Vec<BayEdge>> =
            bays.keys().map(|id| (id.clone(), Vec::new())).collect();
        let speed = config.ladle_car_speed;
        let centre_distance = |a: &str, b: &str| -> Result<f64, ConfigError> {
            let from = bays.get(a).ok_or_else(|| ConfigError::UnknownBay(a.to_string()))?;
            let to = bays.get(b).ok_or_else(|| ConfigError::UnknownBay(b.to_string()))?;
            Ok(from.distance_to(to))
        };

        if config.bay_connections.is_empty() {
            for (from, targets) in bay_adjacency(config, &bay_configs) {
                for to in targets {
                    let distance = centre_distance(&from, &to)?;
                    edges.entry(from.clone()).or_default().push(BayEdge {
                        from: from.clone(),
                        to,
                        distance,
                        travel_time: distance / speed,
                    });
                }
            }
        } else {
            for connection in &config.bay_connections {
                let distance = match connection.distance {
                    Some(d) => d,
                    None => centre_distance(&connection.from, &connection.to)?,
                };
                let travel_time = connection.travel_time.unwrap_or(distance / speed);
                edges.entry(connection.from.clone()).or_default().push(BayEdge {
                    from: connection.from.clone(),
                    to: connection.to.clone(),
                    distance,
                    travel_time,
                });
            }
        }

        let mut graph = Self {
            bays,
            edges,
            paths: BTreeMap::new(),
        };
        graph.compute_paths();
        Ok(graph)
    }

    fn compute_paths(&mut self) {
        let sources: Vec<String> = self.bays.keys().cloned().collect();
        for source in sources {
            for (target, path) in self.dijkstra(&source) {
                self.paths.insert((source.clone(), target), path);
            }
        }
    }

    fn dijkstra(&self, source: &str) -> BTreeMap<String, CarPath> {
        let mut best: BTreeMap<String, CarPath> = BTreeMap::new();
        let mut heap = BinaryHeap::new();
        best.insert(
            source.to_string(),
            CarPath {
                travel_time: 0.0,
                distance: 0.0,
                bays: vec![source.to_string()],
            },
        );
        heap.push(Frontier {
            time: 0.0,
            bay: source.to_string(),
        });

        while let Some(Frontier { time, bay }) = heap.pop() {
            let Some(current) = best.get(&bay).cloned() else {
                continue;
            };
            if time > current.travel_time {
                continue;
            }
            for edge in self.edges.get(&bay).into_iter().flatten() {
                let candidate = time + edge.travel_time;
                let improves = best
                    .get(&edge.to)
                    .map_or(true, |known| candidate < known.travel_time);
                if improves {
                    let mut bays = current.bays.clone();
                    bays.push(edge.to.clone());
                    best.insert(
                        edge.to.clone(),
                        CarPath {
                            travel_time: candidate,
                            distance: current.distance + edge.distance,
                            bays,
                        },
                    );
                    heap.push(Frontier {
                        time: candidate,
                        bay: edge.to.clone(),
                    });
                }
            }
        }
        best
    }

    pub fn bay(&self, id: &str) -> Option<&Bay> {
        self.bays.get(id)
    }

    pub fn bays(&self) -> &BTreeMap<String, Bay> {
        &self.bays
    }

    pub(crate) fn bay_mut(&mut self, id: &str) -> Option<&mut Bay> {
        self.bays.get_mut(id)
    }

    /// Travel time of the direct edge `from → to`
    pub fn edge_time(&self, from: &str, to: &str) -> Option<f64> {
        self.edges
            .get(from)?
            .iter()
            .find(|e| e.to == to)
            .map(|e| e.travel_time)
    }

    pub fn edges(&self) -> impl Iterator<Item = &BayEdge> {
        self.edges.values().flatten()
    }

    /// Shortest route `from → to`; a zero-length path when `from == to`
    pub fn path(&self, from: &str, to: &str) -> Option<&CarPath> {
        self.paths.get(&(from.to_string(), to.to_string()))
    }

    pub fn reachable(&self, from: &str, to: &str) -> bool {
        self.path(from, to).is_some()
    }
}
