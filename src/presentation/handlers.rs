// HTTP request handlers
use crate::application::console_service::{ConsoleStatus, ParametersError, TelemetryView};
use crate::application::serial_link::SendError;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<ParametersError> for ApiError {
    fn from(err: ParametersError) -> Self {
        let status = match &err {
            ParametersError::Invalid(_) => StatusCode::BAD_REQUEST,
            ParametersError::Send(SendError::NotConnected) => StatusCode::CONFLICT,
            ParametersError::Send(SendError::Transport(_)) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

/// Link operations block on the port; keep them off the async workers.
async fn blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

#[derive(Deserialize)]
pub struct ConnectRequest {
    pub port: String,
    pub baud_rate: Option<u32>,
}

/// A form field sent either as text, as typed by the operator, or as a number.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

impl FieldValue {
    fn into_text(self) -> String {
        match self {
            FieldValue::Text(text) => text,
            FieldValue::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
pub struct ParametersRequest {
    pub setpoint: FieldValue,
    pub kp: FieldValue,
    pub ki: FieldValue,
    pub kd: FieldValue,
}

#[derive(Debug, Serialize)]
pub struct ParametersResponse {
    pub sent: String,
}

#[derive(Deserialize)]
pub struct WindowQuery {
    pub seconds: Option<f64>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_ports(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    let console = state.console.clone();
    let ports = blocking(move || console.list_ports()).await?.map_err(|e| {
        tracing::error!("Error listing serial ports: {:#}", e);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
    })?;
    Ok(Json(ports))
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<ConsoleStatus> {
    Json(state.console.status())
}

pub async fn connect(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConnectRequest>,
) -> Result<Json<ConsoleStatus>, ApiError> {
    let baud_rate = request.baud_rate.unwrap_or(state.default_baud_rate);
    let console = state.console.clone();
    blocking(move || console.connect(&request.port, baud_rate))
        .await?
        .map_err(|e| ApiError::new(StatusCode::BAD_GATEWAY, e.to_string()))?;
    Ok(Json(state.console.status()))
}

pub async fn disconnect(State(state): State<Arc<AppState>>) -> Result<Json<ConsoleStatus>, ApiError> {
    let console = state.console.clone();
    blocking(move || console.disconnect()).await?;
    Ok(Json(state.console.status()))
}

pub async fn send_parameters(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ParametersRequest>,
) -> Result<Json<ParametersResponse>, ApiError> {
    let console = state.console.clone();
    let sent = blocking(move || {
        console.send_parameters(
            &request.setpoint.into_text(),
            &request.kp.into_text(),
            &request.ki.into_text(),
            &request.kd.into_text(),
        )
    })
    .await??;

    Ok(Json(ParametersResponse {
        sent: sent.trim_end().to_string(),
    }))
}

pub async fn telemetry(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<TelemetryView>, ApiError> {
    if let Some(seconds) = query.seconds.filter(|s| !s.is_finite()) {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("seconds must be a finite number, got {seconds}"),
        ));
    }
    Ok(Json(state.console.telemetry(query.seconds)))
}

pub async fn reset_telemetry(State(state): State<Arc<AppState>>) -> Json<ConsoleStatus> {
    state.console.reset();
    Json(state.console.status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::console_service::tests::{PORT, console};
    use crate::application::serial_link::LinkState;
    use crate::application::serial_ports::fake::{FakePorts, wait_until};

    fn app_state() -> (Arc<FakePorts>, Arc<AppState>) {
        let (ports, console) = console(true);
        let state = Arc::new(AppState {
            console,
            default_baud_rate: 9600,
        });
        (ports, state)
    }

    fn parameters(setpoint: &str, kp: &str, ki: &str, kd: &str) -> ParametersRequest {
        let text = |s: &str| FieldValue::Text(s.to_string());
        ParametersRequest {
            setpoint: text(setpoint),
            kp: text(kp),
            ki: text(ki),
            kd: text(kd),
        }
    }

    async fn connect_fake(state: &Arc<AppState>) {
        let request = ConnectRequest {
            port: PORT.to_string(),
            baud_rate: None,
        };
        let Json(status) = connect(State(state.clone()), Json(request)).await.unwrap();
        assert_eq!(status.link.state, LinkState::Connected);
    }

    #[tokio::test]
    async fn test_health_check() {
        assert_eq!(health_check().await, "ok");
    }

    #[tokio::test]
    async fn test_list_ports() {
        let (_ports, state) = app_state();
        let Json(ports) = list_ports(State(state)).await.unwrap();
        assert_eq!(ports, vec![PORT.to_string()]);
    }

    #[tokio::test]
    async fn test_connect_uses_default_baud_rate() {
        let (ports, state) = app_state();
        connect_fake(&state).await;
        assert_eq!(ports.opened(), vec![(PORT.to_string(), 9600)]);

        let Json(status) = disconnect(State(state)).await.unwrap();
        assert_eq!(status.link.state, LinkState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_failure_is_bad_gateway() {
        let (_ports, state) = app_state();
        let request = ConnectRequest {
            port: "/dev/missing".to_string(),
            baud_rate: Some(115_200),
        };
        let err = connect(State(state.clone()), Json(request)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);

        let Json(status) = status(State(state)).await;
        assert_eq!(status.link.state, LinkState::Disconnected);
    }

    #[tokio::test]
    async fn test_parameters_error_statuses() {
        let (_ports, state) = app_state();

        let err = send_parameters(State(state.clone()), Json(parameters("10", "1", "0", "0")))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        connect_fake(&state).await;
        let err = send_parameters(State(state), Json(parameters("10", "one", "0", "0")))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("kp"));
    }

    #[tokio::test]
    async fn test_send_parameters() {
        let (ports, state) = app_state();
        connect_fake(&state).await;

        let request = ParametersRequest {
            setpoint: FieldValue::Number(10.0),
            kp: FieldValue::Text("1.5".to_string()),
            ki: FieldValue::Number(0.0),
            kd: FieldValue::Text("0.25".to_string()),
        };
        let Json(response) = send_parameters(State(state), Json(request)).await.unwrap();
        assert_eq!(response.sent, "30,1.5,0,0.25");
        assert_eq!(ports.written(), "30,1.5,0,0.25\n");
    }

    #[tokio::test]
    async fn test_telemetry_window_and_reset() {
        let (ports, state) = app_state();
        connect_fake(&state).await;
        ports.feed("Posicion 10.0\nnoise\nPosicion 10.5\n");
        assert!(wait_until(|| state.console.status().buffered == 2));

        let query = WindowQuery { seconds: Some(60.0) };
        let Json(view) = telemetry(State(state.clone()), Query(query)).await.unwrap();
        let distances: Vec<f64> = view.samples.iter().map(|s| s.distance).collect();
        assert_eq!(distances, vec![10.0, 10.5]);
        assert_eq!(view.readout.unwrap().position, 10.5);

        let Json(status) = reset_telemetry(State(state.clone())).await;
        assert_eq!(status.buffered, 0);

        let Json(view) = telemetry(State(state), Query(WindowQuery { seconds: None }))
            .await
            .unwrap();
        assert_eq!(view.window_seconds, 3.0);
        assert!(view.samples.is_empty());
        assert!(view.readout.is_none());
    }

    #[tokio::test]
    async fn test_telemetry_rejects_non_finite_window() {
        let (ports, state) = app_state();
        connect_fake(&state).await;
        ports.feed("Posicion 10.0\n");
        assert!(wait_until(|| state.console.status().buffered == 1));

        for seconds in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let query = WindowQuery {
                seconds: Some(seconds),
            };
            let err = telemetry(State(state.clone()), Query(query)).await.unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST);
            assert!(err.message.contains("seconds"));
        }
    }

    #[test]
    fn test_field_value_accepts_text_and_numbers() {
        let request: ParametersRequest = serde_json::from_str(
            r#"{"setpoint": "12.5", "kp": 2, "ki": 0.5, "kd": " 1 "}"#,
        )
        .unwrap();
        assert_eq!(request.setpoint.into_text(), "12.5");
        assert_eq!(request.kp.into_text(), "2");
        assert_eq!(request.ki.into_text(), "0.5");
        assert_eq!(request.kd.into_text(), " 1 ");
    }
}
