//! Cartoroute - map tile rendering dispatch and road-network routing
//!
//! This library is the non-visual backend of an interactive map viewer. It
//! provides two subsystems:
//!
//! - [`render`] - a thread-safe queue of tile rendering tasks consumed by a
//!   fixed pool of long-lived worker processes speaking a line-based protocol.
//! - [`route`] - a best-first search over a road network held in a spatial
//!   store, expanding vertices lazily through gateway queries.
//!
//! Supporting modules hold the projected coordinate types ([`geo`]), the
//! configuration file ([`config`]) and dispatcher counters ([`telemetry`]).

pub mod config;
pub mod geo;
pub mod render;
pub mod route;
pub mod telemetry;
