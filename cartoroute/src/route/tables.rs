//! Database table names for the road network.

use super::GatewayError;

/// Names of the tables a database gateway reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoadTables {
    /// osm2pgsql line table with `way` geometry and a `highway` tag column.
    pub roads: String,
    /// pgRouting edge table with `source`, `target`, `length` and `geom`.
    pub edges: String,
    /// pgRouting vertex table with `id` and `the_geom`.
    pub vertices: String,
}

impl Default for RoadTables {
    fn default() -> Self {
        Self {
            roads: "planet_osm_line".to_string(),
            edges: "roads".to_string(),
            vertices: "roads_vertices_pgr".to_string(),
        }
    }
}

impl RoadTables {
    /// Check every name with [`is_table_name`]. The names are spliced into
    /// query text.
    pub fn validate(&self) -> Result<(), GatewayError> {
        for name in [&self.roads, &self.edges, &self.vertices] {
            if !is_table_name(name) {
                return Err(GatewayError::InvalidData(format!(
                    "invalid table name '{}'",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Whether `name` is a plain, optionally schema-qualified SQL identifier.
pub fn is_table_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables() {
        let tables = RoadTables::default();
        assert_eq!(tables.roads, "planet_osm_line");
        assert_eq!(tables.edges, "roads");
        assert_eq!(tables.vertices, "roads_vertices_pgr");
        assert!(tables.validate().is_ok());
    }

    #[test]
    fn test_table_name_validation() {
        assert!(is_table_name("roads"));
        assert!(is_table_name("osm.planet_osm_line"));
        assert!(is_table_name("_private2"));
        assert!(!is_table_name(""));
        assert!(!is_table_name("2roads"));
        assert!(!is_table_name("roads; DROP TABLE roads"));
        assert!(!is_table_name("a.b.c"));
        assert!(!is_table_name("roads."));
    }

    #[test]
    fn test_validate_names_offender() {
        let tables = RoadTables {
            vertices: "nodes--".to_string(),
            ..RoadTables::default()
        };
        let err = tables.validate().unwrap_err();
        assert!(err.to_string().contains("nodes--"));
    }
}
