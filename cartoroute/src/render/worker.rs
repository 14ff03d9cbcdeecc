//! Worker side of the rendering protocol.
//!
//! [`serve_worker`] is the main loop of a render worker process: read a
//! request, render it, write the image to the worker's artifact path, then
//! announce completion. The actual drawing is delegated to a
//! [`TileRenderer`]; the cartography engine lives behind that trait.
//!
//! If rendering a tile fails, the worker still answers with a solid magenta
//! placeholder so the dispatcher's slot is released and the failure is
//! visible on the map instead of stalling the pool.

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::OnceLock;

use image::{ImageFormat, Rgba, RgbaImage};
use tracing::{debug, error, info};

use crate::geo::TILE_SIZE_PX;

use super::protocol::{self, TileCompletion};
use super::{RenderError, RenderTask};

/// Draws one tile.
pub trait TileRenderer: Send + Sync {
    /// Render the extent of `task` into an image.
    fn render(&self, task: &RenderTask) -> Result<RgbaImage, RenderError>;
}

/// Run the worker loop until `input` is exhausted.
///
/// # Arguments
///
/// * `index` - Worker identity (for logging)
/// * `artifact` - Where every rendered image is written
/// * `renderer` - Tile renderer
/// * `input` - Request stream
/// * `output` - Completion stream
///
/// # Returns
///
/// Number of tiles served.
///
/// # Errors
///
/// Returns an error on malformed requests, I/O failures on the streams, or
/// when the artifact cannot be written.
pub fn serve_worker<R, W>(
    index: usize,
    artifact: &Path,
    renderer: &dyn TileRenderer,
    mut input: R,
    mut output: W,
) -> Result<usize, RenderError>
where
    R: BufRead,
    W: Write,
{
    info!(worker = index, artifact = %artifact.display(), "Render worker ready");
    let mut served = 0;

    while let Some(task) = protocol::read_request(&mut input)? {
        debug!(worker = index, tile = %task.tile(), zoom = task.zoom(), "Rendering tile");

        let image = match renderer.render(&task) {
            Ok(image) => image,
            Err(e) => {
                error!(worker = index, tile = %task.tile(), error = %e, "Tile rendering failed");
                error_placeholder().clone()
            }
        };

        write_artifact(&image, artifact)?;

        writeln!(output, "{}", TileCompletion::new(task.tile(), task.zoom()))?;
        output.flush()?;
        served += 1;
    }

    info!(worker = index, served, "Render worker input closed");
    Ok(served)
}

/// Write `image` as PNG, replacing the previous artifact in one step.
fn write_artifact(image: &RgbaImage, artifact: &Path) -> Result<(), RenderError> {
    let staging = artifact.with_extension("png.tmp");
    let artifact_error = |reason: String| RenderError::Artifact {
        path: artifact.to_path_buf(),
        reason,
    };

    image
        .save_with_format(&staging, ImageFormat::Png)
        .map_err(|e| artifact_error(e.to_string()))?;
    std::fs::rename(&staging, artifact).map_err(|e| artifact_error(e.to_string()))?;
    Ok(())
}

// =============================================================================
// Placeholder Renderer
// =============================================================================

static ERROR_PLACEHOLDER: OnceLock<RgbaImage> = OnceLock::new();

/// Solid magenta tile returned when rendering fails.
pub fn error_placeholder() -> &'static RgbaImage {
    ERROR_PLACEHOLDER.get_or_init(|| {
        RgbaImage::from_pixel(TILE_SIZE_PX, TILE_SIZE_PX, Rgba([255, 0, 255, 255]))
    })
}

/// Stand-in renderer for running the pipeline without a cartography engine.
///
/// Fills each tile with a colour derived from its grid position and draws a
/// one pixel border, so a mosaic of placeholder tiles shows the grid layout.
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderRenderer {
    size: u32,
}

impl PlaceholderRenderer {
    pub fn new() -> Self {
        Self { size: TILE_SIZE_PX }
    }

    /// Use a custom tile edge length in pixels.
    pub fn with_size(size: u32) -> Self {
        Self { size: size.max(1) }
    }

    fn fill_colour(task: &RenderTask) -> Rgba<u8> {
        let tile = task.tile();
        let mix = tile
            .x
            .wrapping_mul(73_856_093)
            ^ tile.y.wrapping_mul(19_349_663)
            ^ task.zoom().wrapping_mul(83_492_791);
        // Keep the fill light so borders and overlays stay readable
        Rgba([
            160 + (mix & 0x3f) as u8,
            160 + ((mix >> 8) & 0x3f) as u8,
            160 + ((mix >> 16) & 0x3f) as u8,
            255,
        ])
    }
}

impl Default for PlaceholderRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TileRenderer for PlaceholderRenderer {
    fn render(&self, task: &RenderTask) -> Result<RgbaImage, RenderError> {
        let fill = Self::fill_colour(task);
        let border = Rgba([64, 64, 64, 255]);
        let last = self.size - 1;

        Ok(RgbaImage::from_fn(self.size, self.size, |x, y| {
            if x == 0 || y == 0 || x == last || y == last {
                border
            } else {
                fill
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::TileCoord;
    use std::io::Cursor;

    struct FailingRenderer;

    impl TileRenderer for FailingRenderer {
        fn render(&self, _task: &RenderTask) -> Result<RgbaImage, RenderError> {
            Err(RenderError::Renderer("stylesheet missing".to_string()))
        }
    }

    fn request_bytes(tasks: &[RenderTask]) -> Vec<u8> {
        let mut buffer = Vec::new();
        for task in tasks {
            protocol::write_request(&mut buffer, task).unwrap();
        }
        buffer
    }

    #[test]
    fn test_serve_writes_artifact_then_completion() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("renderer_process0_output.png");
        let task = RenderTask::for_tile(TileCoord::new(3, 4), 5).unwrap();

        let mut output = Vec::new();
        let served = serve_worker(
            0,
            &artifact,
            &PlaceholderRenderer::new(),
            Cursor::new(request_bytes(&[task])),
            &mut output,
        )
        .unwrap();

        assert_eq!(served, 1);
        assert_eq!(String::from_utf8(output).unwrap(), "3 4 5\n");

        let image = image::open(&artifact).unwrap();
        assert_eq!(image.width(), TILE_SIZE_PX);
        assert_eq!(image.height(), TILE_SIZE_PX);
        assert!(!artifact.with_extension("png.tmp").exists());
    }

    #[test]
    fn test_serve_multiple_requests_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("out.png");
        let tasks = [
            RenderTask::for_tile(TileCoord::new(0, 0), 1).unwrap(),
            RenderTask::for_tile(TileCoord::new(1, 1), 1).unwrap(),
        ];

        let mut output = Vec::new();
        let served = serve_worker(
            1,
            &artifact,
            &PlaceholderRenderer::with_size(8),
            Cursor::new(request_bytes(&tasks)),
            &mut output,
        )
        .unwrap();

        assert_eq!(served, 2);
        assert_eq!(String::from_utf8(output).unwrap(), "0 0 1\n1 1 1\n");
        // Artifact holds the most recent tile
        assert_eq!(image::open(&artifact).unwrap().width(), 8);
    }

    #[test]
    fn test_serve_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut output = Vec::new();
        let served = serve_worker(
            0,
            &dir.path().join("out.png"),
            &PlaceholderRenderer::new(),
            Cursor::new(Vec::new()),
            &mut output,
        )
        .unwrap();

        assert_eq!(served, 0);
        assert!(output.is_empty());
    }

    #[test]
    fn test_serve_truncated_request() {
        let dir = tempfile::tempdir().unwrap();
        let mut output = Vec::new();
        let result = serve_worker(
            0,
            &dir.path().join("out.png"),
            &PlaceholderRenderer::new(),
            Cursor::new(b"0\n0\n1\n".to_vec()),
            &mut output,
        );

        assert!(matches!(result, Err(RenderError::Protocol { .. })));
        assert!(output.is_empty());
    }

    #[test]
    fn test_renderer_failure_answers_with_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("out.png");
        let task = RenderTask::for_tile(TileCoord::new(0, 0), 0).unwrap();

        let mut output = Vec::new();
        serve_worker(
            0,
            &artifact,
            &FailingRenderer,
            Cursor::new(request_bytes(&[task])),
            &mut output,
        )
        .unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), "0 0 0\n");
        let image = image::open(&artifact).unwrap().to_rgba8();
        assert_eq!(*image.get_pixel(10, 10), Rgba([255, 0, 255, 255]));
    }

    #[test]
    fn test_placeholder_has_border() {
        let task = RenderTask::for_tile(TileCoord::new(2, 1), 3).unwrap();
        let image = PlaceholderRenderer::with_size(16).render(&task).unwrap();

        assert_eq!(*image.get_pixel(0, 0), Rgba([64, 64, 64, 255]));
        assert_eq!(*image.get_pixel(15, 8), Rgba([64, 64, 64, 255]));
        assert_ne!(*image.get_pixel(8, 8), Rgba([64, 64, 64, 255]));
    }

    #[test]
    fn test_placeholder_colour_depends_on_tile() {
        let renderer = PlaceholderRenderer::with_size(4);
        let a = renderer
            .render(&RenderTask::for_tile(TileCoord::new(0, 0), 2).unwrap())
            .unwrap();
        let b = renderer
            .render(&RenderTask::for_tile(TileCoord::new(1, 0), 2).unwrap())
            .unwrap();
        assert_ne!(a.get_pixel(1, 1), b.get_pixel(1, 1));
    }
}
