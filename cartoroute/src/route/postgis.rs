//! PostGIS / pgRouting gateway.
//!
//! Queries an osm2pgsql line table for road geometry and a pgRouting edge
//! table plus its vertex table for topology. All geometry is EPSG:3857.
//!
//! The gateway is synchronous: it drives an async `sqlx` pool on a private
//! single-threaded runtime. Do not call it from inside another tokio runtime.

use std::fmt;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use crate::geo::ProjectedPoint;

use super::{Edge, GatewayError, RoadPoint, RoadTables, SpatialGateway, Vertex, VertexId};

#[derive(sqlx::FromRow)]
struct RoadPointRow {
    x: f64,
    y: f64,
    distance: f64,
}

#[derive(sqlx::FromRow)]
struct VertexRow {
    id: i64,
    x: f64,
    y: f64,
}

#[derive(sqlx::FromRow)]
struct EdgeRow {
    target: i64,
    x: f64,
    y: f64,
    cost: f64,
}

/// Query text with table names filled in.
struct Queries {
    nearest_road_point: String,
    nearest_vertex: String,
    outgoing_edges: String,
}

impl Queries {
    fn new(tables: &RoadTables) -> Self {
        let nearest_road_point = format!(
            r#"
            SELECT
                ST_X(nearest.point) AS x,
                ST_Y(nearest.point) AS y,
                nearest.distance AS distance
            FROM (
                SELECT
                    ST_ClosestPoint(way, ST_SetSRID(ST_MakePoint($1, $2), 3857)) AS point,
                    ST_Distance(way, ST_SetSRID(ST_MakePoint($1, $2), 3857)) AS distance
                FROM {roads}
                WHERE highway IS NOT NULL
                ORDER BY distance
                LIMIT 1
            ) nearest
            "#,
            roads = tables.roads
        );

        // Source vertex of the nearest edge, so the vertex is always routable
        let nearest_vertex = format!(
            r#"
            SELECT
                v.id::bigint AS id,
                ST_X(v.the_geom) AS x,
                ST_Y(v.the_geom) AS y
            FROM {edges} r
            JOIN {vertices} v ON v.id = r.source
            ORDER BY ST_Distance(r.geom, ST_SetSRID(ST_MakePoint($1, $2), 3857))
            LIMIT 1
            "#,
            edges = tables.edges,
            vertices = tables.vertices
        );

        let outgoing_edges = format!(
            r#"
            SELECT
                r.target::bigint AS target,
                ST_X(v.the_geom) AS x,
                ST_Y(v.the_geom) AS y,
                r.length::float8 AS cost
            FROM {edges} r
            JOIN {vertices} v ON v.id = r.target
            WHERE r.source = $1
            "#,
            edges = tables.edges,
            vertices = tables.vertices
        );

        Self {
            nearest_road_point,
            nearest_vertex,
            outgoing_edges,
        }
    }
}

/// Gateway backed by a PostGIS database.
pub struct PostgisGateway {
    runtime: Runtime,
    pool: PgPool,
    queries: Queries,
}

impl PostgisGateway {
    /// Connect to `url` (e.g. `postgres://mapper@localhost/gis`).
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidData` for bad table names and
    /// `GatewayError::Connection` if the database cannot be reached.
    pub fn connect(url: &str, tables: RoadTables) -> Result<Self, GatewayError> {
        tables.validate()?;

        let runtime = Builder::new_current_thread().enable_all().build()?;
        // One connection: searches are sequential
        let pool = runtime
            .block_on(PgPoolOptions::new().max_connections(1).connect(url))
            .map_err(|e| GatewayError::Connection(e.to_string()))?;

        info!(
            roads = %tables.roads,
            edges = %tables.edges,
            vertices = %tables.vertices,
            "Connected to spatial database"
        );

        Ok(Self {
            runtime,
            pool,
            queries: Queries::new(&tables),
        })
    }
}

impl SpatialGateway for PostgisGateway {
    fn nearest_road_point(&self, at: ProjectedPoint) -> Result<RoadPoint, GatewayError> {
        let row: Option<RoadPointRow> = self
            .runtime
            .block_on(
                sqlx::query_as(&self.queries.nearest_road_point)
                    .bind(at.x)
                    .bind(at.y)
                    .fetch_optional(&self.pool),
            )
            .map_err(query_error)?;

        let row = row.ok_or_else(|| GatewayError::NotFound("road".to_string()))?;
        Ok(RoadPoint {
            point: ProjectedPoint::new(row.x, row.y),
            distance: row.distance,
        })
    }

    fn nearest_vertex(&self, at: ProjectedPoint) -> Result<Vertex, GatewayError> {
        let row: Option<VertexRow> = self
            .runtime
            .block_on(
                sqlx::query_as(&self.queries.nearest_vertex)
                    .bind(at.x)
                    .bind(at.y)
                    .fetch_optional(&self.pool),
            )
            .map_err(query_error)?;

        let row = row.ok_or_else(|| GatewayError::NotFound("road vertex".to_string()))?;
        Ok(Vertex::new(row.id, ProjectedPoint::new(row.x, row.y)))
    }

    fn outgoing_edges(&self, vertex: VertexId) -> Result<Vec<Edge>, GatewayError> {
        let rows: Vec<EdgeRow> = self
            .runtime
            .block_on(
                sqlx::query_as(&self.queries.outgoing_edges)
                    .bind(vertex)
                    .fetch_all(&self.pool),
            )
            .map_err(query_error)?;

        debug!(vertex, edges = rows.len(), "Fetched outgoing edges");
        Ok(rows
            .into_iter()
            .map(|row| Edge {
                target: Vertex::new(row.target, ProjectedPoint::new(row.x, row.y)),
                cost: row.cost,
            })
            .collect())
    }
}

impl Drop for PostgisGateway {
    fn drop(&mut self) {
        // Close connections while the runtime is still alive
        self.runtime.block_on(self.pool.close());
    }
}

impl fmt::Debug for PostgisGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgisGateway")
            .field("connections", &self.pool.size())
            .finish()
    }
}

fn query_error(e: sqlx::Error) -> GatewayError {
    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            GatewayError::Connection(e.to_string())
        }
        other => GatewayError::Query(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_tables_rejected_before_connecting() {
        let tables = RoadTables {
            edges: "roads--".to_string(),
            ..RoadTables::default()
        };
        let result = PostgisGateway::connect("postgres://localhost/gis", tables);
        assert!(matches!(result, Err(GatewayError::InvalidData(_))));
    }

    #[test]
    fn test_queries_use_configured_tables() {
        let tables = RoadTables {
            roads: "osm.lines".to_string(),
            edges: "net.edges".to_string(),
            vertices: "net.nodes".to_string(),
        };
        let queries = Queries::new(&tables);
        assert!(queries.nearest_road_point.contains("FROM osm.lines"));
        assert!(queries.nearest_vertex.contains("JOIN net.nodes v ON v.id = r.source"));
        assert!(queries.outgoing_edges.contains("FROM net.edges r"));
        assert!(queries.outgoing_edges.contains("WHERE r.source = $1"));
    }
}
