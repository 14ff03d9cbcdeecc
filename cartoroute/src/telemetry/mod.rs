//! Dispatcher telemetry.
//!
//! Lock-free atomic counters updated by the render dispatcher and its
//! completion readers, plus a plain snapshot type for reporting.
//!
//! ```text
//! Dispatch loop ──┐
//!                 ├──► DispatchMetrics ──► DispatchSnapshot ──► CLI / logs
//! Completions ────┘    (atomic counters)   (point-in-time copy)
//! ```
//!
//! # Example
//!
//! ```
//! use cartoroute::telemetry::DispatchMetrics;
//!
//! let metrics = DispatchMetrics::new();
//! metrics.task_submitted();
//! metrics.task_dispatched();
//! metrics.task_completed();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.completed, 1);
//! assert_eq!(snapshot.in_flight, 0);
//! ```

mod metrics;
mod snapshot;

pub use metrics::DispatchMetrics;
pub use snapshot::DispatchSnapshot;
