//! Projected coordinate types shared by the renderer and the planner.
//!
//! All coordinates are Web Mercator (EPSG:3857) meters. The map grid at zoom
//! level `z` splits the world extent into `2^z` tiles per axis, with tile
//! `(0, 0)` in the south-west corner.

mod types;

pub use types::{
    GeoError, ProjectedPoint, ProjectedRect, TileCoord, MAX_ZOOM, TILE_SIZE_PX, WORLD_BOUND,
};
