//! JSON REST API and Prometheus endpoint.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use fanwatch_hw::{Fan, Feature, Sensor};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::state::AppState;

/// Error body returned by the API.
#[derive(Debug, Serialize)]
struct ApiResult {
    name: String,
    message: String,
}

/// Sensor as returned by the API.
#[derive(Debug, Serialize)]
struct SensorView {
    id: String,
    moving_avg: f64,
}

/// Fan as returned by the API. Values are null when they cannot be read.
#[derive(Debug, Serialize)]
struct FanView {
    id: String,
    pwm: Option<u8>,
    rpm: Option<u32>,
}

/// Creates the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/alive", get(alive))
        .route("/sensors", get(sensors_list))
        .route("/sensors/:id", get(sensor_get))
        .route("/fans", get(fans_list))
        .route("/fans/:id", get(fan_get))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /alive - Liveness check
async fn alive() -> StatusCode {
    StatusCode::OK
}

/// GET /sensors - All sensors
async fn sensors_list(State(state): State<Arc<AppState>>) -> Json<Vec<SensorView>> {
    Json(state.sensors().iter().map(|s| sensor_view(s.as_ref())).collect())
}

/// GET /sensors/:id - One sensor
async fn sensor_get(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.sensor(&id) {
        Some(sensor) => Json(sensor_view(sensor.as_ref())).into_response(),
        None => not_found(&id),
    }
}

/// GET /fans - All fans
async fn fans_list(State(state): State<Arc<AppState>>) -> Json<Vec<FanView>> {
    let mut views = Vec::with_capacity(state.fans().len());
    for fan in state.fans() {
        views.push(fan_view(fan.as_ref()).await);
    }
    Json(views)
}

/// GET /fans/:id - One fan
async fn fan_get(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.fan(&id) {
        Some(fan) => Json(fan_view(fan.as_ref()).await).into_response(),
        None => not_found(&id),
    }
}

/// GET /metrics - Prometheus exposition
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics().render(state.sensors(), state.fans()).await {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to render metrics: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Unknown Error", e.to_string())
        }
    }
}

fn sensor_view(sensor: &dyn Sensor) -> SensorView {
    SensorView {
        id: sensor.id().to_string(),
        moving_avg: sensor.moving_avg(),
    }
}

async fn fan_view(fan: &dyn Fan) -> FanView {
    let rpm = if fan.supports(Feature::RpmSensor) {
        fan.rpm().await.ok()
    } else {
        None
    };
    FanView {
        id: fan.id().to_string(),
        pwm: fan.pwm().await.ok(),
        rpm,
    }
}

fn not_found(id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "Not found",
        format!("No item with id '{}' found", id),
    )
}

fn error_response(status: StatusCode, name: &str, message: String) -> Response {
    (
        status,
        Json(ApiResult {
            name: name.to_string(),
            message,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::metrics::tests::{StaticFan, StaticSensor};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use fanwatch_hw::MovingAverage;
    use tower::ServiceExt;

    fn router() -> Router {
        let sensors: Vec<Arc<dyn Sensor>> = vec![Arc::new(StaticSensor {
            id: "cpu",
            avg: MovingAverage::new(51.25),
        })];
        let fans: Vec<Arc<dyn Fan>> = vec![Arc::new(StaticFan {
            id: "cpu_fan",
            pwm: Some(200),
            rpm: None,
        })];
        let state = AppState::with_devices(
            Config::default(),
            std::path::Path::new("/dev/null"),
            sensors,
            fans,
        )
        .unwrap();
        create_router(Arc::new(state))
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn test_alive() {
        let (status, _) = get_json("/alive").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_sensor_list_and_get() {
        let (status, body) = get_json("/sensors").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], "cpu");
        assert_eq!(body[0]["moving_avg"], 51.25);

        let (status, body) = get_json("/sensors/cpu").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["moving_avg"], 51.25);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let (status, body) = get_json("/sensors/gpu").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["name"], "Not found");
        assert_eq!(body["message"], "No item with id 'gpu' found");

        let (status, _) = get_json("/fans/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_fan_without_rpm() {
        let (status, body) = get_json("/fans/cpu_fan").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pwm"], 200);
        assert!(body["rpm"].is_null());
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let response = router()
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("fanwatch_sensor_moving_avg{id=\"cpu\"} 51.25"));
        assert!(text.contains("fanwatch_fan_pwm{id=\"cpu_fan\"} 200"));
    }
}
