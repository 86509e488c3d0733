//! OpenAPI specification generation for the tagwatch status API.

use axum::Json;
use tagwatch_core::{DeviceView, Snapshot};
use utoipa::OpenApi;

use super::error::ErrorResponse;
use super::health::HealthResponse;

/// Serve the OpenAPI specification as JSON at `/api/openapi.json`.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as pretty JSON. Used by the
/// gen-openapi binary.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> serde_json::Result<String> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for tagwatch.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "tagwatch API",
        version = "0.1.0",
        description = r"
# tagwatch API

Read-only view of the FindMy accessories tagwatch is tracking.

Devices are listed longest-tracked first. A device that keeps appearing over
a long period, especially an AirTag that is not registered to an owner
nearby, is the one to look for.

`times_seen` counts sightings and `scan_count` counts completed scan
windows, so `times_seen / scan_count` approximates how consistently a
device has been present.
",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local tagwatch instance")
    ),
    tags(
        (name = "system", description = "Health checks"),
        (name = "devices", description = "Tracked FindMy devices")
    ),
    paths(
        super::health::health_check,
        super::devices::list_devices,
        super::devices::get_device,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            Snapshot,
            DeviceView,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "tagwatch API");
        assert!(spec.paths.paths.contains_key("/api/devices/{address}"));
    }

    #[test]
    fn test_openapi_json_serialization() {
        let json = get_openapi_json().unwrap();
        assert!(json.contains("\"openapi\":"));
        assert!(json.contains("\"DeviceView\""));
    }
}
