//! Road-network route planning.
//!
//! The planner resolves both endpoints to graph vertices, then runs a
//! best-first search that pulls outgoing edges from a [`SpatialGateway`] one
//! vertex at a time. The graph is never loaded as a whole.
//!
//! Two gateways are provided:
//!
//! - [`InMemoryGateway`] - a graph held in memory, loadable from JSON
//! - `PostgisGateway` - pgRouting tables in a PostGIS database (`postgis`
//!   feature)

mod error;
mod gateway;
mod memory;
mod planner;
#[cfg(feature = "postgis")]
mod postgis;
mod search;
mod tables;

pub use error::{Endpoint, GatewayError, PlanError};
pub use gateway::{Edge, RoadPoint, SpatialGateway, Vertex, VertexId};
pub use memory::{EdgeRecord, InMemoryGateway, RoadNetwork, VertexRecord};
pub use planner::{PathPlanner, Route};
#[cfg(feature = "postgis")]
pub use postgis::PostgisGateway;
pub use search::SearchStats;
pub use tables::{is_table_name, RoadTables};
