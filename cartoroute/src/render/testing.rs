//! In-process workers for dispatcher tests.
//!
//! Runs the real worker loop on a thread, connected to the dispatcher with an
//! in-memory pipe instead of process stdio.

use std::io::{self, BufRead, Read, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use image::RgbaImage;
use parking_lot::Mutex;

use crate::geo::TileCoord;

use super::launcher::{WorkerChannels, WorkerLauncher};
use super::{serve_worker, PlaceholderRenderer, RenderError, RenderTask, RenderedTile, TileRenderer, TileSink};

/// Write half of an in-memory pipe.
pub(crate) struct PipeWriter {
    tx: Sender<Vec<u8>>,
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .send(buf.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Read half of an in-memory pipe. Reports end of input once every writer
/// is dropped.
pub(crate) struct PipeReader {
    rx: Receiver<Vec<u8>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl Read for PipeReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for PipeReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        while self.pos >= self.chunk.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Err(_) => return Ok(&[]),
            }
        }
        Ok(&self.chunk[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.chunk.len());
    }
}

pub(crate) fn pipe() -> (PipeWriter, PipeReader) {
    let (tx, rx) = mpsc::channel();
    (
        PipeWriter { tx },
        PipeReader {
            rx,
            chunk: Vec::new(),
            pos: 0,
        },
    )
}

/// Launches workers as threads running [`serve_worker`].
pub(crate) struct InProcessLauncher {
    renderer: Arc<dyn TileRenderer>,
    fail_at: Option<usize>,
}

impl InProcessLauncher {
    pub(crate) fn new(renderer: Arc<dyn TileRenderer>) -> Self {
        Self {
            renderer,
            fail_at: None,
        }
    }

    /// Make the launch of worker `index` fail.
    pub(crate) fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }
}

impl WorkerLauncher for InProcessLauncher {
    fn launch(&self, index: usize, artifact: &Path) -> Result<WorkerChannels, RenderError> {
        if self.fail_at == Some(index) {
            return Err(RenderError::WorkerStart {
                index,
                source: io::Error::new(io::ErrorKind::NotFound, "launch refused by test"),
            });
        }

        let (request_tx, request_rx) = pipe();
        let (done_tx, done_rx) = pipe();
        let renderer = Arc::clone(&self.renderer);
        let artifact = artifact.to_path_buf();

        thread::spawn(move || {
            let _ = serve_worker(index, &artifact, renderer.as_ref(), request_rx, done_tx);
        });

        Ok(WorkerChannels {
            input: Box::new(request_tx),
            output: Box::new(done_rx),
            process: None,
        })
    }
}

/// Renderer that reports each tile it starts and then waits for the test to
/// let it finish. Finishing is also allowed once the gate sender is dropped.
pub(crate) struct GatedRenderer {
    started: Mutex<Sender<TileCoord>>,
    gate: Mutex<Receiver<()>>,
    inner: PlaceholderRenderer,
}

impl GatedRenderer {
    /// Returns the renderer, the "started" receiver and the gate sender.
    pub(crate) fn new() -> (Self, Receiver<TileCoord>, Sender<()>) {
        let (started_tx, started_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel();
        let renderer = Self {
            started: Mutex::new(started_tx),
            gate: Mutex::new(gate_rx),
            inner: PlaceholderRenderer::with_size(4),
        };
        (renderer, started_rx, gate_tx)
    }
}

impl TileRenderer for GatedRenderer {
    fn render(&self, task: &RenderTask) -> Result<RgbaImage, RenderError> {
        let _ = self.started.lock().send(task.tile());
        let _ = self.gate.lock().recv();
        self.inner.render(task)
    }
}

/// Sink forwarding every tile into a channel.
pub(crate) fn channel_sink() -> (impl TileSink, Receiver<RenderedTile>) {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let sink = move |tile: RenderedTile| {
        let _ = tx.lock().send(tile);
    };
    (sink, rx)
}
