//! Error types for the spatial gateway and the path planner.

use std::io;

use thiserror::Error;

use super::VertexId;

/// Errors raised by a [`SpatialGateway`](super::SpatialGateway).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The spatial store could not be reached.
    #[error("Spatial database connection failed: {0}")]
    Connection(String),

    /// A query was rejected or failed while running.
    #[error("Spatial query failed: {0}")]
    Query(String),

    /// The query ran but matched nothing.
    #[error("No {0} found")]
    NotFound(String),

    /// The store returned or was given data that makes no sense.
    #[error("Invalid road network data: {0}")]
    InvalidData(String),

    /// Reading a road network file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A road network file is not valid JSON.
    #[error("Failed to parse road network: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which endpoint of a route request failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    End,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Start => write!(f, "start"),
            Endpoint::End => write!(f, "end"),
        }
    }
}

/// Errors that abort a route search.
///
/// A route that genuinely does not exist is not an error; see
/// [`PathPlanner::try_find_path`](super::PathPlanner::try_find_path).
#[derive(Debug, Error)]
pub enum PlanError {
    /// An endpoint could not be snapped to a graph vertex.
    #[error("Failed to resolve {endpoint} point to the road network: {source}")]
    Resolve {
        endpoint: Endpoint,
        #[source]
        source: GatewayError,
    },

    /// Outgoing edges of a vertex could not be fetched.
    #[error("Failed to expand vertex {vertex}: {source}")]
    Expand {
        vertex: VertexId,
        #[source]
        source: GatewayError,
    },
}

impl PlanError {
    /// The gateway failure behind this error.
    pub fn gateway_error(&self) -> &GatewayError {
        match self {
            PlanError::Resolve { source, .. } | PlanError::Expand { source, .. } => source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = GatewayError::NotFound("road vertex".to_string());
        assert_eq!(err.to_string(), "No road vertex found");
    }

    #[test]
    fn test_resolve_error_names_endpoint() {
        let err = PlanError::Resolve {
            endpoint: Endpoint::End,
            source: GatewayError::Connection("refused".to_string()),
        };
        let text = err.to_string();
        assert!(text.contains("end point"));
        assert!(text.contains("refused"));
    }

    #[test]
    fn test_expand_error_keeps_gateway_cause() {
        let err = PlanError::Expand {
            vertex: 42,
            source: GatewayError::Query("timeout".to_string()),
        };
        assert!(err.to_string().contains("42"));
        assert!(matches!(err.gateway_error(), GatewayError::Query(_)));
    }
}
