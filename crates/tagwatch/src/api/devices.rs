//! Device endpoints backed by the latest snapshot.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use tagwatch_core::{DeviceView, Snapshot};

use crate::api::error::{ApiError, ApiResult};
use crate::state::SharedState;

/// Creates the devices router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_devices))
        .route("/{address}", get(get_device))
}

/// Latest snapshot of tracked devices.
#[utoipa::path(
    get,
    path = "/api/devices",
    tag = "devices",
    operation_id = "listDevices",
    summary = "List tracked devices",
    description = "Returns the most recent snapshot: FindMy devices ordered by how long \
        they have been tracked, longest first, with the scan window count.",
    responses(
        (status = 200, description = "Latest snapshot", body = Snapshot),
        (status = 503, description = "No snapshot yet", body = super::error::ErrorResponse)
    )
)]
pub async fn list_devices(State(state): State<SharedState>) -> ApiResult<Json<Snapshot>> {
    state.latest().await.map(Json).ok_or_else(ApiError::no_snapshot)
}

/// One device from the latest snapshot.
#[utoipa::path(
    get,
    path = "/api/devices/{address}",
    tag = "devices",
    operation_id = "getDevice",
    summary = "Get a tracked device",
    params(
        ("address" = String, Path, description = "Advertiser address", example = "C4:1F:0A:22:9B:73")
    ),
    responses(
        (status = 200, description = "Device view", body = DeviceView),
        (status = 404, description = "Device not tracked", body = super::error::ErrorResponse),
        (status = 503, description = "No snapshot yet", body = super::error::ErrorResponse)
    )
)]
pub async fn get_device(
    State(state): State<SharedState>,
    Path(address): Path<String>,
) -> ApiResult<Json<DeviceView>> {
    let snapshot = state.latest().await.ok_or_else(ApiError::no_snapshot)?;
    snapshot
        .device(&address)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::device_not_found(&address))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use chrono::Utc;

    use crate::api::create_router;
    use crate::state::AppState;
    use tagwatch_core::{DeviceView, Snapshot};

    fn device(address: &str) -> DeviceView {
        let now = Utc::now();
        DeviceView {
            address: address.to_string(),
            local_name: None,
            company_id: Some(0x004C),
            company_name: "Apple, Inc.".to_string(),
            manufacturer_data: vec![0x07, 0x19, 0x01],
            is_airtag: true,
            is_registered: false,
            first_seen: now,
            last_seen: now,
            times_seen: 1,
            tracked_for_secs: 0,
        }
    }

    #[tokio::test]
    async fn test_devices_unavailable_before_first_snapshot() {
        let server = TestServer::new(create_router(AppState::new())).unwrap();

        let response = server.get("/api/devices").await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.text().contains("no_snapshot"));

        server
            .get("/api/devices/AA:BB")
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_devices_serve_latest_snapshot() {
        let state = AppState::new();
        state
            .publish(Snapshot {
                devices: vec![device("C4:1F:0A:22:9B:73")],
                scan_count: 4,
                taken_at: Utc::now(),
            })
            .await;
        let server = TestServer::new(create_router(state)).unwrap();

        let snapshot: Snapshot = server.get("/api/devices").await.json();
        assert_eq!(snapshot.scan_count, 4);
        assert_eq!(snapshot.len(), 1);

        let view: DeviceView = server.get("/api/devices/C4:1F:0A:22:9B:73").await.json();
        assert!(view.is_airtag);

        server
            .get("/api/devices/00:00:00:00:00:00")
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_health_reports_snapshot_size() {
        let state = AppState::new();
        let server = TestServer::new(create_router(state.clone())).unwrap();

        let body: serde_json::Value = server.get("/health").await.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["devices"], 0);

        state
            .publish(Snapshot {
                devices: vec![device("A"), device("B")],
                scan_count: 9,
                taken_at: Utc::now(),
            })
            .await;
        let body: serde_json::Value = server.get("/health").await.json();
        assert_eq!(body["devices"], 2);
        assert_eq!(body["scan_count"], 9);
    }
}
