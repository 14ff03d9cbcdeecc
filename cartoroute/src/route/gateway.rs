//! The spatial data gateway seen by the planner.

use std::sync::Arc;

use crate::geo::ProjectedPoint;

use super::GatewayError;

/// Identity of a road graph vertex.
pub type VertexId = i64;

/// A road graph vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub id: VertexId,
    pub point: ProjectedPoint,
}

impl Vertex {
    pub fn new(id: VertexId, point: ProjectedPoint) -> Self {
        Self { id, point }
    }
}

/// A directed edge leaving some vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub target: Vertex,
    /// Traversal cost as stored by the data source. Non-negative.
    pub cost: f64,
}

/// Closest point on any road to a query coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadPoint {
    pub point: ProjectedPoint,
    pub distance: f64,
}

/// Queries the road network.
///
/// Every call may block on a round trip to the backing store.
pub trait SpatialGateway {
    /// Nearest point on any road feature. The point may lie mid-edge.
    fn nearest_road_point(&self, at: ProjectedPoint) -> Result<RoadPoint, GatewayError>;

    /// Nearest routable graph vertex.
    fn nearest_vertex(&self, at: ProjectedPoint) -> Result<Vertex, GatewayError>;

    /// Edges leaving `vertex`. An unknown or dead-end vertex has none.
    fn outgoing_edges(&self, vertex: VertexId) -> Result<Vec<Edge>, GatewayError>;
}

impl<G: SpatialGateway + ?Sized> SpatialGateway for &G {
    fn nearest_road_point(&self, at: ProjectedPoint) -> Result<RoadPoint, GatewayError> {
        (**self).nearest_road_point(at)
    }

    fn nearest_vertex(&self, at: ProjectedPoint) -> Result<Vertex, GatewayError> {
        (**self).nearest_vertex(at)
    }

    fn outgoing_edges(&self, vertex: VertexId) -> Result<Vec<Edge>, GatewayError> {
        (**self).outgoing_edges(vertex)
    }
}

impl<G: SpatialGateway + ?Sized> SpatialGateway for Box<G> {
    fn nearest_road_point(&self, at: ProjectedPoint) -> Result<RoadPoint, GatewayError> {
        (**self).nearest_road_point(at)
    }

    fn nearest_vertex(&self, at: ProjectedPoint) -> Result<Vertex, GatewayError> {
        (**self).nearest_vertex(at)
    }

    fn outgoing_edges(&self, vertex: VertexId) -> Result<Vec<Edge>, GatewayError> {
        (**self).outgoing_edges(vertex)
    }
}

impl<G: SpatialGateway + ?Sized> SpatialGateway for Arc<G> {
    fn nearest_road_point(&self, at: ProjectedPoint) -> Result<RoadPoint, GatewayError> {
        (**self).nearest_road_point(at)
    }

    fn nearest_vertex(&self, at: ProjectedPoint) -> Result<Vertex, GatewayError> {
        (**self).nearest_vertex(at)
    }

    fn outgoing_edges(&self, vertex: VertexId) -> Result<Vec<Edge>, GatewayError> {
        (**self).outgoing_edges(vertex)
    }
}
