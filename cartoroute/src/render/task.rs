//! Rendering task and rendered tile types.

use image::DynamicImage;

use crate::geo::{GeoError, ProjectedRect, TileCoord};

/// Request to render one tile.
///
/// Immutable once created. The queue owns it until it is written to a
/// worker, after which it is dropped.
///
/// # Example
///
/// ```
/// use cartoroute::geo::TileCoord;
/// use cartoroute::render::RenderTask;
///
/// let task = RenderTask::for_tile(TileCoord::new(1, 0), 1).unwrap();
/// assert_eq!(task.zoom(), 1);
/// assert_eq!(task.rect().min.x, 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTask {
    rect: ProjectedRect,
    tile: TileCoord,
    zoom: u32,
}

impl RenderTask {
    /// Create a task from explicit parts.
    ///
    /// No consistency check is made between `rect` and `tile`; callers that
    /// render a custom extent (e.g. an overview image) use this directly.
    pub fn new(rect: ProjectedRect, tile: TileCoord, zoom: u32) -> Self {
        Self { rect, tile, zoom }
    }

    /// Create a task for a tile of the map grid, deriving its extent.
    pub fn for_tile(tile: TileCoord, zoom: u32) -> Result<Self, GeoError> {
        let rect = ProjectedRect::for_tile(tile, zoom)?;
        Ok(Self { rect, tile, zoom })
    }

    /// Geographic extent to render.
    pub fn rect(&self) -> &ProjectedRect {
        &self.rect
    }

    /// Tile grid index.
    pub fn tile(&self) -> TileCoord {
        self.tile
    }

    /// Zoom level.
    pub fn zoom(&self) -> u32 {
        self.zoom
    }
}

/// A finished tile delivered to the [`TileSink`](super::TileSink).
///
/// Completions may arrive in any order. Consumers compare `zoom` against the
/// zoom level they currently display and drop stale tiles.
#[derive(Debug, Clone)]
pub struct RenderedTile {
    pub image: DynamicImage,
    pub tile: TileCoord,
    pub zoom: u32,
    /// Pool slot of the worker that rendered the tile.
    pub worker: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_tile_derives_rect() {
        let task = RenderTask::for_tile(TileCoord::new(2, 3), 2).unwrap();
        assert_eq!(task.tile(), TileCoord::new(2, 3));
        assert_eq!(task.zoom(), 2);
        assert_eq!(
            *task.rect(),
            ProjectedRect::for_tile(TileCoord::new(2, 3), 2).unwrap()
        );
    }

    #[test]
    fn test_for_tile_rejects_out_of_grid() {
        assert!(RenderTask::for_tile(TileCoord::new(2, 0), 1).is_err());
    }

    #[test]
    fn test_new_keeps_custom_extent() {
        let rect = ProjectedRect::new(-10.0, -20.0, 30.0, 40.0);
        let task = RenderTask::new(rect, TileCoord::new(0, 0), 7);
        assert_eq!(*task.rect(), rect);
        assert_eq!(task.zoom(), 7);
    }
}
