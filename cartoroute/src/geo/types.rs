//! Point, rectangle and tile coordinate types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Half the width of the Web Mercator world extent in meters.
pub const WORLD_BOUND: f64 = 20_037_508.342_789_244;

/// Highest zoom level the map grid supports.
pub const MAX_ZOOM: u32 = 22;

/// Edge length of a rendered tile in pixels.
pub const TILE_SIZE_PX: u32 = 256;

/// Errors produced when building grid coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// Zoom level above [`MAX_ZOOM`].
    #[error("Invalid zoom level {0} (max: {})", MAX_ZOOM)]
    InvalidZoom(u32),

    /// Tile index outside the `2^zoom` grid.
    #[error("Tile {x}:{y} is outside the grid at zoom {zoom}")]
    TileOutOfRange { x: u32, y: u32, zoom: u32 },

    /// Coordinate text could not be parsed.
    #[error("Invalid coordinate '{0}', expected X,Y")]
    InvalidCoordinate(String),
}

// =============================================================================
// Projected Point
// =============================================================================

/// A point in projected (EPSG:3857) meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
}

impl ProjectedPoint {
    /// Create a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Straight-line distance to another point in meters.
    pub fn distance_to(&self, other: &ProjectedPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl fmt::Display for ProjectedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl std::str::FromStr for ProjectedPoint {
    type Err = GeoError;

    /// Parses `X,Y` (whitespace around either value is ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GeoError::InvalidCoordinate(s.to_string());
        let (x, y) = s.split_once(',').ok_or_else(invalid)?;
        let x = x.trim().parse::<f64>().map_err(|_| invalid())?;
        let y = y.trim().parse::<f64>().map_err(|_| invalid())?;
        if !x.is_finite() || !y.is_finite() {
            return Err(invalid());
        }
        Ok(Self { x, y })
    }
}

impl From<ProjectedPoint> for geo::Point<f64> {
    fn from(point: ProjectedPoint) -> Self {
        geo::Point::new(point.x, point.y)
    }
}

impl From<geo::Point<f64>> for ProjectedPoint {
    fn from(point: geo::Point<f64>) -> Self {
        Self::new(point.x(), point.y())
    }
}

impl From<ProjectedPoint> for geo::Coord<f64> {
    fn from(point: ProjectedPoint) -> Self {
        geo::Coord {
            x: point.x,
            y: point.y,
        }
    }
}

// =============================================================================
// Projected Rectangle
// =============================================================================

/// An axis-aligned rectangle given by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectedRect {
    pub min: ProjectedPoint,
    pub max: ProjectedPoint,
}

impl ProjectedRect {
    /// Create a rectangle from its corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min: ProjectedPoint::new(min_x, min_y),
            max: ProjectedPoint::new(max_x, max_y),
        }
    }

    /// The whole Web Mercator world extent.
    pub fn world() -> Self {
        Self::new(-WORLD_BOUND, -WORLD_BOUND, WORLD_BOUND, WORLD_BOUND)
    }

    /// The extent covered by `tile` at `zoom`.
    ///
    /// # Errors
    ///
    /// Returns `GeoError` if the zoom level is unsupported or the tile lies
    /// outside the `2^zoom × 2^zoom` grid.
    pub fn for_tile(tile: TileCoord, zoom: u32) -> Result<Self, GeoError> {
        tile.validate(zoom)?;

        let tile_length = 2.0 * WORLD_BOUND / TileCoord::axis_count(zoom) as f64;
        let min_x = -WORLD_BOUND + tile.x as f64 * tile_length;
        let min_y = -WORLD_BOUND + tile.y as f64 * tile_length;

        Ok(Self::new(
            min_x,
            min_y,
            min_x + tile_length,
            min_y + tile_length,
        ))
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

// =============================================================================
// Tile Coordinate
// =============================================================================

/// Grid index of a tile. `y` counts upward from the southern edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    /// Create a new tile coordinate.
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Number of tiles per axis at `zoom`.
    pub fn axis_count(zoom: u32) -> u64 {
        1u64 << zoom.min(MAX_ZOOM)
    }

    /// Check that this tile exists at `zoom`.
    pub fn validate(&self, zoom: u32) -> Result<(), GeoError> {
        if zoom > MAX_ZOOM {
            return Err(GeoError::InvalidZoom(zoom));
        }
        let count = Self::axis_count(zoom);
        if u64::from(self.x) >= count || u64::from(self.y) >= count {
            return Err(GeoError::TileOutOfRange {
                x: self.x,
                y: self.y,
                zoom,
            });
        }
        Ok(())
    }

    /// Iterate every tile of the grid at `zoom`, column by column.
    pub fn grid(zoom: u32) -> impl Iterator<Item = TileCoord> {
        let count = Self::axis_count(zoom) as u32;
        (0..count).flat_map(move |x| (0..count).map(move |y| TileCoord::new(x, y)))
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

impl std::str::FromStr for TileCoord {
    type Err = GeoError;

    /// Parses `X:Y`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GeoError::InvalidCoordinate(s.to_string());
        let (x, y) = s.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            x: x.trim().parse().map_err(|_| invalid())?,
            y: y.trim().parse().map_err(|_| invalid())?,
        })
    }
}
