//! In-memory road network.
//!
//! Serves the gateway queries from a graph held in memory. Useful for tests,
//! for small extracts exported from the database, and for running the
//! planner without PostGIS.
//!
//! # File format
//!
//! ```json
//! {
//!   "vertices": [{ "id": 1, "x": 0.0, "y": 0.0 }, { "id": 2, "x": 100.0, "y": 0.0 }],
//!   "edges": [{ "source": 1, "target": 2, "bidirectional": true }]
//! }
//! ```
//!
//! An edge without `cost` costs its straight-line length.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use geo::{Closest, ClosestPoint, Distance, Euclidean, Line, Point};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geo::ProjectedPoint;

use super::{Edge, GatewayError, RoadPoint, SpatialGateway, Vertex, VertexId};

/// Serialized form of a road network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadNetwork {
    pub vertices: Vec<VertexRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexRecord {
    pub id: VertexId,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: VertexId,
    pub target: VertexId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default)]
    pub bidirectional: bool,
}

impl RoadNetwork {
    /// Parse a network from JSON text.
    pub fn from_json(text: &str) -> Result<Self, GatewayError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a network from a JSON file.
    pub fn load(path: &Path) -> Result<Self, GatewayError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// Gateway over an in-memory graph.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    // Ordered so nearest-vertex ties resolve to the lowest id
    vertices: BTreeMap<VertexId, ProjectedPoint>,
    adjacency: HashMap<VertexId, Vec<(VertexId, f64)>>,
    roads: Vec<Line<f64>>,
    edge_count: usize,
}

impl InMemoryGateway {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a gateway from a deserialized network.
    pub fn from_network(network: &RoadNetwork) -> Result<Self, GatewayError> {
        let mut gateway = Self::new();
        for vertex in &network.vertices {
            gateway.add_vertex(vertex.id, ProjectedPoint::new(vertex.x, vertex.y))?;
        }
        for edge in &network.edges {
            let cost = match edge.cost {
                Some(cost) => cost,
                None => gateway.straight_line(edge.source, edge.target)?,
            };
            gateway.add_edge(edge.source, edge.target, cost)?;
            if edge.bidirectional {
                gateway.add_edge(edge.target, edge.source, cost)?;
            }
        }

        debug!(
            vertices = gateway.vertex_count(),
            edges = gateway.edge_count(),
            "Road network loaded"
        );
        Ok(gateway)
    }

    /// Load a gateway from a JSON network file.
    pub fn load(path: &Path) -> Result<Self, GatewayError> {
        Self::from_network(&RoadNetwork::load(path)?)
    }

    /// Add a vertex.
    ///
    /// # Errors
    ///
    /// Fails if the id is already taken or the coordinate is not finite.
    pub fn add_vertex(&mut self, id: VertexId, point: ProjectedPoint) -> Result<(), GatewayError> {
        if !point.x.is_finite() || !point.y.is_finite() {
            return Err(GatewayError::InvalidData(format!(
                "vertex {} has a non-finite coordinate",
                id
            )));
        }
        if self.vertices.contains_key(&id) {
            return Err(GatewayError::InvalidData(format!("duplicate vertex {}", id)));
        }
        self.vertices.insert(id, point);
        Ok(())
    }

    /// Add a directed edge between two known vertices.
    ///
    /// # Errors
    ///
    /// Fails if either vertex is unknown or the cost is negative or NaN.
    pub fn add_edge(&mut self, source: VertexId, target: VertexId, cost: f64) -> Result<(), GatewayError> {
        let from = self.point(source)?;
        let to = self.point(target)?;
        if cost.is_nan() || cost < 0.0 {
            return Err(GatewayError::InvalidData(format!(
                "edge {} -> {} has invalid cost {}",
                source, target, cost
            )));
        }

        self.adjacency.entry(source).or_default().push((target, cost));
        self.roads.push(Line::new(from, to));
        self.edge_count += 1;
        Ok(())
    }

    /// Add a two-way road costing its straight-line length.
    pub fn add_road(&mut self, a: VertexId, b: VertexId) -> Result<(), GatewayError> {
        let cost = self.straight_line(a, b)?;
        self.add_edge(a, b, cost)?;
        self.add_edge(b, a, cost)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    fn point(&self, id: VertexId) -> Result<ProjectedPoint, GatewayError> {
        self.vertices
            .get(&id)
            .copied()
            .ok_or_else(|| GatewayError::InvalidData(format!("unknown vertex {}", id)))
    }

    fn straight_line(&self, a: VertexId, b: VertexId) -> Result<f64, GatewayError> {
        Ok(self.point(a)?.distance_to(&self.point(b)?))
    }
}

impl SpatialGateway for InMemoryGateway {
    fn nearest_road_point(&self, at: ProjectedPoint) -> Result<RoadPoint, GatewayError> {
        let target: Point<f64> = at.into();
        let mut best: Option<RoadPoint> = None;

        for road in &self.roads {
            let closest = match road.closest_point(&target) {
                Closest::Intersection(point) | Closest::SinglePoint(point) => point,
                Closest::Indeterminate => continue,
            };
            let distance = Euclidean.distance(closest, target);
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(RoadPoint {
                    point: closest.into(),
                    distance,
                });
            }
        }

        best.ok_or_else(|| GatewayError::NotFound("road".to_string()))
    }

    fn nearest_vertex(&self, at: ProjectedPoint) -> Result<Vertex, GatewayError> {
        let mut best: Option<(f64, Vertex)> = None;
        for (&id, point) in &self.vertices {
            let distance = point.distance_to(&at);
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, Vertex::new(id, *point)));
            }
        }

        best.map(|(_, vertex)| vertex)
            .ok_or_else(|| GatewayError::NotFound("road vertex".to_string()))
    }

    fn outgoing_edges(&self, vertex: VertexId) -> Result<Vec<Edge>, GatewayError> {
        let Some(edges) = self.adjacency.get(&vertex) else {
            return Ok(Vec::new());
        };

        edges
            .iter()
            .map(|&(target, cost)| {
                Ok(Edge {
                    target: Vertex::new(target, self.point(target)?),
                    cost,
                })
            })
            .collect()
    }
}
