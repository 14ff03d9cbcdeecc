//! The path planner.

use tracing::{debug, info, warn};

use crate::geo::ProjectedPoint;

use super::error::Endpoint;
use super::search::{self, SearchStats};
use super::{GatewayError, PlanError, RoadPoint, SpatialGateway, VertexId};

/// A planned route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    /// The literal start point, the interior road vertices, then the literal
    /// end point. Empty when no route exists.
    pub points: Vec<ProjectedPoint>,
    /// Every graph vertex on the path, including the resolved endpoints.
    pub vertices: Vec<VertexId>,
    /// Accumulated edge cost along `vertices`.
    pub cost: f64,
}

impl Route {
    /// The "no route" result.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Plans driving routes over a [`SpatialGateway`].
///
/// Each call runs its own search with call-local state, so one planner can
/// serve any number of sequential requests.
///
/// # Example
///
/// ```
/// use cartoroute::geo::ProjectedPoint;
/// use cartoroute::route::{InMemoryGateway, PathPlanner};
///
/// let mut roads = InMemoryGateway::new();
/// roads.add_vertex(1, ProjectedPoint::new(0.0, 0.0)).unwrap();
/// roads.add_vertex(2, ProjectedPoint::new(100.0, 0.0)).unwrap();
/// roads.add_road(1, 2).unwrap();
///
/// let planner = PathPlanner::new(roads);
/// let route = planner.find_path(ProjectedPoint::new(-5.0, 3.0), ProjectedPoint::new(104.0, 2.0));
/// assert_eq!(route.points.len(), 2);
/// assert_eq!(route.vertices, vec![1, 2]);
/// ```
#[derive(Debug)]
pub struct PathPlanner<G> {
    gateway: G,
}

impl<G: SpatialGateway> PathPlanner<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Closest point on any road, for anchoring a marker to the map.
    pub fn nearest_road_point(&self, at: ProjectedPoint) -> Result<RoadPoint, GatewayError> {
        let road = self.gateway.nearest_road_point(at)?;
        debug!(at = %at, road = %road.point, distance = road.distance, "Snapped to road");
        Ok(road)
    }

    /// Plan a route, keeping "unreachable" and "gateway failed" apart.
    ///
    /// # Returns
    ///
    /// `Ok(Some(route))` when a path exists, `Ok(None)` when the resolved
    /// endpoints are not connected.
    ///
    /// # Errors
    ///
    /// Returns `PlanError` if any gateway query fails. Nothing is retried.
    pub fn try_find_path(
        &self,
        start: ProjectedPoint,
        end: ProjectedPoint,
    ) -> Result<Option<Route>, PlanError> {
        let (route, _) = self.plan(start, end)?;
        Ok(route)
    }

    /// Like [`try_find_path`](Self::try_find_path), also returning how much
    /// work the search did.
    pub fn plan(
        &self,
        start: ProjectedPoint,
        end: ProjectedPoint,
    ) -> Result<(Option<Route>, SearchStats), PlanError> {
        let from = self
            .gateway
            .nearest_vertex(start)
            .map_err(|source| PlanError::Resolve {
                endpoint: Endpoint::Start,
                source,
            })?;
        let to = self
            .gateway
            .nearest_vertex(end)
            .map_err(|source| PlanError::Resolve {
                endpoint: Endpoint::End,
                source,
            })?;
        debug!(from = from.id, to = to.id, "Route endpoints resolved");

        let (found, stats) = search::find(&self.gateway, from, to)?;
        let route = found.map(|path| {
            let interior = match path.vertices.len() {
                0..=2 => &[][..],
                n => &path.vertices[1..n - 1],
            };

            let mut points = Vec::with_capacity(interior.len() + 2);
            points.push(start);
            points.extend(interior.iter().map(|v| v.point));
            points.push(end);

            Route {
                points,
                vertices: path.vertices.iter().map(|v| v.id).collect(),
                cost: path.cost,
            }
        });

        Ok((route, stats))
    }

    /// Plan a route, returning an empty route when there is none or a gateway
    /// query failed. The two cases are told apart only in the log.
    pub fn find_path(&self, start: ProjectedPoint, end: ProjectedPoint) -> Route {
        match self.try_find_path(start, end) {
            Ok(Some(route)) => {
                info!(
                    points = route.points.len(),
                    cost = route.cost,
                    "Route found"
                );
                route
            }
            Ok(None) => {
                info!(start = %start, end = %end, "No route between points");
                Route::empty()
            }
            Err(e) => {
                warn!(start = %start, end = %end, error = %e, "Route planning failed");
                Route::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{Edge, InMemoryGateway, Vertex};
    use std::cell::Cell;

    fn point(x: f64, y: f64) -> ProjectedPoint {
        ProjectedPoint::new(x, y)
    }

    #[test]
    fn test_single_direct_edge_has_no_intermediate_points() {
        let mut gateway = InMemoryGateway::new();
        gateway.add_vertex(1, point(0.0, 0.0)).unwrap();
        gateway.add_vertex(2, point(100.0, 0.0)).unwrap();
        gateway.add_edge(1, 2, 7.5).unwrap();

        let start = point(-3.0, 4.0);
        let end = point(101.0, -2.0);
        let route = PathPlanner::new(gateway).find_path(start, end);

        assert_eq!(route.points, vec![start, end]);
        assert_eq!(route.vertices, vec![1, 2]);
        assert_eq!(route.cost, 7.5);
    }

    #[test]
    fn test_same_vertex_degenerates_to_endpoints() {
        let mut gateway = InMemoryGateway::new();
        gateway.add_vertex(1, point(0.0, 0.0)).unwrap();
        gateway.add_vertex(2, point(500.0, 0.0)).unwrap();
        gateway.add_road(1, 2).unwrap();

        let start = point(1.0, 1.0);
        let end = point(-2.0, 3.0);
        let route = PathPlanner::new(gateway).try_find_path(start, end).unwrap().unwrap();

        assert_eq!(route.points, vec![start, end]);
        assert_eq!(route.vertices, vec![1]);
        assert_eq!(route.cost, 0.0);
    }

    #[test]
    fn test_disconnected_components_yield_empty_route() {
        let mut gateway = InMemoryGateway::new();
        gateway.add_vertex(1, point(0.0, 0.0)).unwrap();
        gateway.add_vertex(2, point(10.0, 0.0)).unwrap();
        gateway.add_vertex(3, point(1000.0, 0.0)).unwrap();
        gateway.add_vertex(4, point(1010.0, 0.0)).unwrap();
        gateway.add_road(1, 2).unwrap();
        gateway.add_road(3, 4).unwrap();

        let planner = PathPlanner::new(gateway);
        let start = point(0.0, 0.0);
        let end = point(1010.0, 0.0);

        assert!(planner.try_find_path(start, end).unwrap().is_none());
        assert!(planner.find_path(start, end).is_empty());
    }

    #[test]
    fn test_diamond_uses_cheaper_branch() {
        let mut gateway = InMemoryGateway::new();
        gateway.add_vertex(1, point(0.0, 0.0)).unwrap();
        gateway.add_vertex(2, point(1.0, 1.0)).unwrap();
        gateway.add_vertex(3, point(1.0, -1.0)).unwrap();
        gateway.add_vertex(4, point(2.0, 0.0)).unwrap();
        // Expensive branch through 2, cheap one through 3
        gateway.add_edge(1, 2, 5.0).unwrap();
        gateway.add_edge(2, 4, 5.0).unwrap();
        gateway.add_edge(1, 3, 1.0).unwrap();
        gateway.add_edge(3, 4, 1.0).unwrap();

        let start = point(-0.1, 0.0);
        let end = point(2.1, 0.0);
        let route = PathPlanner::new(gateway).find_path(start, end);

        assert_eq!(route.points, vec![start, point(1.0, -1.0), end]);
        assert_eq!(route.vertices, vec![1, 3, 4]);
        assert_eq!(route.cost, 2.0);
    }

    #[test]
    fn test_route_follows_one_way_edges() {
        let mut gateway = InMemoryGateway::new();
        gateway.add_vertex(1, point(0.0, 0.0)).unwrap();
        gateway.add_vertex(2, point(10.0, 0.0)).unwrap();
        gateway.add_edge(1, 2, 10.0).unwrap();

        let planner = PathPlanner::new(gateway);
        assert!(!planner.find_path(point(0.0, 0.0), point(10.0, 0.0)).is_empty());
        assert!(planner.find_path(point(10.0, 0.0), point(0.0, 0.0)).is_empty());
    }

    /// Gateway whose edge queries can be made to fail.
    struct FlakyGateway {
        inner: InMemoryGateway,
        fail_edges: bool,
        fail_resolve: bool,
        edge_calls: Cell<usize>,
    }

    impl SpatialGateway for FlakyGateway {
        fn nearest_road_point(&self, at: ProjectedPoint) -> Result<RoadPoint, GatewayError> {
            self.inner.nearest_road_point(at)
        }

        fn nearest_vertex(&self, at: ProjectedPoint) -> Result<Vertex, GatewayError> {
            if self.fail_resolve {
                return Err(GatewayError::Connection("connection refused".to_string()));
            }
            self.inner.nearest_vertex(at)
        }

        fn outgoing_edges(&self, vertex: VertexId) -> Result<Vec<Edge>, GatewayError> {
            self.edge_calls.set(self.edge_calls.get() + 1);
            if self.fail_edges {
                return Err(GatewayError::Query("statement timeout".to_string()));
            }
            self.inner.outgoing_edges(vertex)
        }
    }

    fn flaky(fail_resolve: bool, fail_edges: bool) -> FlakyGateway {
        let mut inner = InMemoryGateway::new();
        inner.add_vertex(1, point(0.0, 0.0)).unwrap();
        inner.add_vertex(2, point(10.0, 0.0)).unwrap();
        inner.add_road(1, 2).unwrap();
        FlakyGateway {
            inner,
            fail_edges,
            fail_resolve,
            edge_calls: Cell::new(0),
        }
    }

    #[test]
    fn test_resolution_failure_is_an_error() {
        let planner = PathPlanner::new(flaky(true, false));
        let result = planner.try_find_path(point(0.0, 0.0), point(10.0, 0.0));
        assert!(matches!(
            result,
            Err(PlanError::Resolve {
                endpoint: Endpoint::Start,
                ..
            })
        ));
        assert!(planner.find_path(point(0.0, 0.0), point(10.0, 0.0)).is_empty());
    }

    #[test]
    fn test_expansion_failure_is_not_retried() {
        let planner = PathPlanner::new(flaky(false, true));
        let result = planner.try_find_path(point(0.0, 0.0), point(10.0, 0.0));

        assert!(matches!(result, Err(PlanError::Expand { vertex: 1, .. })));
        assert_eq!(planner.gateway().edge_calls.get(), 1);
    }

    #[test]
    fn test_plan_reports_search_stats() {
        let planner = PathPlanner::new(flaky(false, false));
        let (route, stats) = planner.plan(point(0.0, 0.0), point(10.0, 0.0)).unwrap();

        assert!(route.is_some());
        assert_eq!(stats.expanded, 1);
        assert_eq!(stats.edge_queries, 1);
    }

    #[test]
    fn test_nearest_road_point_passthrough() {
        let planner = PathPlanner::new(flaky(false, false));
        let road = planner.nearest_road_point(point(5.0, 2.0)).unwrap();
        assert_eq!(road.point, point(5.0, 0.0));
        assert_eq!(road.distance, 2.0);
    }
}
