//! Integration tests for the `cartoroute` binary.
//!
//! These tests run the real executable:
//! - a single worker process driven by hand over its pipes
//! - a dispatcher pool of worker processes
//! - the `init` and `config` commands against a temporary config file
//!
//! Run with: `cargo test -p cartoroute-cli --test worker_process`

use std::collections::HashSet;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use cartoroute::geo::{TileCoord, TILE_SIZE_PX};
use cartoroute::render::protocol::{write_request, TileCompletion};
use cartoroute::render::{
    artifact_path, DispatcherConfig, ProcessLauncher, RenderDispatcher, RenderTask, RenderedTile,
};

const BINARY: &str = env!("CARGO_BIN_EXE_cartoroute");

// ============================================================================
// Helper Functions
// ============================================================================

fn cartoroute(config: &Path, args: &[&str]) -> Output {
    Command::new(BINARY)
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("run cartoroute")
}

fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ============================================================================
// Worker Process
// ============================================================================

#[test]
fn test_worker_process_answers_each_request() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = artifact_path(dir.path(), 0);

    let mut child = Command::new(BINARY)
        .arg("worker")
        .arg("0")
        .arg(&artifact)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn worker");

    let mut stdin = child.stdin.take().unwrap();
    let mut stdout = BufReader::new(child.stdout.take().unwrap());

    for (x, y) in [(1, 2), (3, 0)] {
        let task = RenderTask::for_tile(TileCoord::new(x, y), 2).unwrap();
        write_request(&mut stdin, &task).unwrap();

        let mut line = String::new();
        stdout.read_line(&mut line).unwrap();
        let completion = TileCompletion::parse(&line).unwrap();
        assert_eq!(completion, TileCompletion::new(TileCoord::new(x, y), 2));

        let image = image::open(&artifact).unwrap();
        assert_eq!(image.width(), TILE_SIZE_PX);
        assert_eq!(image.height(), TILE_SIZE_PX);
    }

    drop(stdin);
    let status = child.wait().unwrap();
    assert!(status.success());
}

#[test]
fn test_dispatcher_over_worker_processes() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = ProcessLauncher::new(BINARY).with_args(["worker"]);
    let config = DispatcherConfig::new(dir.path()).with_worker_count(2);

    let (sender, receiver) = mpsc::channel();
    let mut dispatcher = RenderDispatcher::start(config, &launcher, move |tile: RenderedTile| {
        let _ = sender.send(tile);
    })
    .unwrap();

    let tiles: Vec<TileCoord> = TileCoord::grid(1).collect();
    for &tile in &tiles {
        dispatcher.submit(RenderTask::for_tile(tile, 1).unwrap()).unwrap();
    }

    let mut seen = HashSet::new();
    for _ in 0..tiles.len() {
        let rendered = receiver
            .recv_timeout(Duration::from_secs(30))
            .expect("tile rendered");
        assert_eq!(rendered.zoom, 1);
        assert!(rendered.worker < 2);
        assert_eq!(rendered.image.width(), TILE_SIZE_PX);
        seen.insert(rendered.tile);
    }
    assert_eq!(seen, tiles.into_iter().collect::<HashSet<_>>());

    dispatcher.shutdown();
    let snapshot = dispatcher.metrics();
    assert_eq!(snapshot.submitted, 4);
    assert_eq!(snapshot.completed, 4);
    assert_eq!(snapshot.failed, 0);
    assert!(dir.path().join("renderer_process0_output.png").exists());
}

// ============================================================================
// Configuration Commands
// ============================================================================

#[test]
fn test_init_then_set_and_get() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("conf").join("config.ini");

    let out = stdout_of(&cartoroute(&config, &["init"]));
    assert!(out.contains("Created configuration file"));
    assert!(config.exists());

    stdout_of(&cartoroute(&config, &["config", "set", "renderer.workers", "3"]));
    let out = stdout_of(&cartoroute(&config, &["config", "get", "renderer.workers"]));
    assert_eq!(out.trim(), "3");

    let out = stdout_of(&cartoroute(&config, &["config", "get", "database.url"]));
    assert_eq!(out.trim(), "(not set)");

    let out = stdout_of(&cartoroute(&config, &["config", "path"]));
    assert_eq!(out.trim(), config.display().to_string());
}

#[test]
fn test_config_rejects_bad_input() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.ini");

    let unknown = cartoroute(&config, &["config", "get", "renderer.colour"]);
    assert!(!unknown.status.success());
    assert!(String::from_utf8_lossy(&unknown.stderr).contains("Unknown configuration key"));

    let invalid = cartoroute(&config, &["config", "set", "renderer.workers", "0"]);
    assert!(!invalid.status.success());
    assert!(!config.exists());
}

#[test]
fn test_route_over_graph_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.ini");
    let graph = dir.path().join("roads.json");
    let mut file = std::fs::File::create(&graph).unwrap();
    file.write_all(
        br#"{
          "vertices": [
            { "id": 1, "x": 0.0, "y": 0.0 },
            { "id": 2, "x": 100.0, "y": 0.0 },
            { "id": 3, "x": 100.0, "y": 100.0 }
          ],
          "edges": [
            { "source": 1, "target": 2, "bidirectional": true },
            { "source": 2, "target": 3, "bidirectional": true }
          ]
        }"#,
    )
    .unwrap();
    let graph = graph.to_str().unwrap();

    let out = stdout_of(&cartoroute(
        &config,
        &["route", "--from", "-5,0", "--to", "100,105", "--graph", graph],
    ));
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines[0].starts_with("Route: 3 points over 3 vertices"));
    assert_eq!(&lines[1..4], &["-5,0", "100,0", "100,105"]);

    let out = stdout_of(&cartoroute(&config, &["nearest", "--at", "50,-20", "--graph", graph]));
    assert_eq!(out.lines().next(), Some("50,0"));
    assert!(out.contains("Distance: 20.0 m"));
}
