//! Request bodies and validation for the HTTP endpoints.

use std::path::{Component, Path, PathBuf};

use cityroute_lib::{Coordinate, NodeId, RouteAlgorithm};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Visualization file written when the request names none.
pub const DEFAULT_VISUALIZATION_FILE: &str = "route_visualization.png";

/// Validation applied after a body has been deserialized.
pub trait Validate {
    fn validate(&self) -> Result<(), ServiceError>;
}

/// Body of `POST /shortest_path`. Coordinates are `[latitude, longitude]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortestPathRequest {
    pub origin_coords: [f64; 2],
    pub destination_coords: [f64; 2],
    #[serde(default)]
    pub algorithm: RouteAlgorithm,
}

impl ShortestPathRequest {
    pub fn origin(&self) -> Coordinate {
        Coordinate::new(self.origin_coords[0], self.origin_coords[1])
    }

    pub fn destination(&self) -> Coordinate {
        Coordinate::new(self.destination_coords[0], self.destination_coords[1])
    }
}

impl Validate for ShortestPathRequest {
    fn validate(&self) -> Result<(), ServiceError> {
        for (field, coordinate) in [
            ("origin_coords", self.origin()),
            ("destination_coords", self.destination()),
        ] {
            if !coordinate.is_valid() {
                return Err(ServiceError::bad_request(format!(
                    "'{field}' must be [latitude, longitude] within WGS84 bounds, got [{coordinate}]"
                )));
            }
        }
        Ok(())
    }
}

/// Body of `POST /visualize_route`.
///
/// With `location_name`, the route is drawn over that stored map tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizeRouteRequest {
    pub path: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
}

impl VisualizeRouteRequest {
    pub fn output_file(&self) -> &str {
        self.output_file
            .as_deref()
            .unwrap_or(DEFAULT_VISUALIZATION_FILE)
    }
}

impl Validate for VisualizeRouteRequest {
    fn validate(&self) -> Result<(), ServiceError> {
        if self
            .location_name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(ServiceError::bad_request("'location_name' cannot be empty"));
        }
        validate_output_file(self.output_file())
    }
}

/// Body of `POST /save_route_as_geojson`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRouteRequest {
    pub path: Vec<NodeId>,
    pub output_file: String,
}

impl Validate for SaveRouteRequest {
    fn validate(&self) -> Result<(), ServiceError> {
        validate_output_file(&self.output_file)
    }
}

/// Output files must be relative paths that stay inside the output directory.
fn validate_output_file(file: &str) -> Result<(), ServiceError> {
    if file.trim().is_empty() {
        return Err(ServiceError::bad_request(
            "'output_file' is required and cannot be empty",
        ));
    }

    let path = Path::new(file);
    let escapes = path.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(ServiceError::bad_request(format!(
            "'output_file' must be a relative path without '..', got '{file}'"
        )));
    }
    Ok(())
}

/// Validate `file` and join it onto `output_dir`.
pub fn resolve_output_path(output_dir: &Path, file: &str) -> Result<PathBuf, ServiceError> {
    validate_output_file(file)?;
    Ok(output_dir.join(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn shortest_path_defaults_to_a_star() {
        let request: ShortestPathRequest = serde_json::from_value(json!({
            "origin_coords": [10.882311, 106.782409],
            "destination_coords": [10.759388, 106.667391],
        }))
        .unwrap();
        assert_eq!(request.algorithm, RouteAlgorithm::AStar);
        assert_eq!(request.origin(), Coordinate::new(10.882311, 106.782409));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn shortest_path_accepts_dijkstra() {
        let request: ShortestPathRequest = serde_json::from_value(json!({
            "origin_coords": [0.0, 0.0],
            "destination_coords": [1.0, 1.0],
            "algorithm": "dijkstra",
        }))
        .unwrap();
        assert_eq!(request.algorithm, RouteAlgorithm::Dijkstra);
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let request = ShortestPathRequest {
            origin_coords: [106.78, 10.88],
            destination_coords: [10.75, 106.66],
            algorithm: RouteAlgorithm::AStar,
        };
        let err = request.validate().unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("origin_coords"));
    }

    #[test]
    fn visualization_defaults_its_file_name() {
        let request: VisualizeRouteRequest =
            serde_json::from_value(json!({"path": [1, 2, 3]})).unwrap();
        assert_eq!(request.output_file(), "route_visualization.png");
        assert_eq!(request.location_name, None);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn blank_tile_location_is_rejected() {
        let request: VisualizeRouteRequest =
            serde_json::from_value(json!({"path": [1, 2], "location_name": " "})).unwrap();
        let err = request.validate().unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("location_name"));
    }

    #[test]
    fn output_paths_cannot_escape_the_output_directory() {
        let base = Path::new("/srv/out");
        assert_eq!(
            resolve_output_path(base, "routes/a.geojson").unwrap(),
            PathBuf::from("/srv/out/routes/a.geojson")
        );
        assert!(resolve_output_path(base, "../etc/passwd").is_err());
        assert!(resolve_output_path(base, "/etc/passwd").is_err());
        assert!(resolve_output_path(base, " ").is_err());
    }

    #[test]
    fn save_request_requires_output_file() {
        let result: Result<SaveRouteRequest, _> =
            serde_json::from_value(json!({"path": [1, 2]}));
        assert!(result.is_err());
    }
}
