//! Webhook ingress router and server bootstrap.
//!
//! The webhook endpoint acknowledges with HTTP 200 plain text even when
//! internal handling fails (errors surface via logs only); the single
//! exception is a missing tenant configuration, reported as HTTP 400 with a
//! JSON error body so the helpdesk operator notices the misconfiguration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use iris_correlate::{
    webhook_acknowledgment, CorrelationError, RestHelpdeskApiFactory, SessionRegistry,
};
use iris_helpdesk::HelpdeskConfig;
use iris_transport::TransportClientRegistry;

use crate::gateway_config_store::TenantConfigStore;

/// Shared state behind the gateway router.
pub struct GatewayState {
    pub registry: Arc<SessionRegistry>,
    pub config_store: Arc<TenantConfigStore>,
}

#[derive(Debug, Clone, Deserialize)]
/// Body of a tenant config upsert; the session id comes from the path.
pub struct ConfigUpsertRequest {
    pub base_url: String,
    pub agent_token: String,
    pub bot_token: String,
    pub inbox_identifier: String,
    pub account_id: String,
}

#[derive(Debug, Clone)]
/// Settings for the standalone gateway server.
pub struct GatewayServerConfig {
    pub bind: String,
    pub state_dir: PathBuf,
    /// Mirror mapping tables to `{state_dir}/mapping-snapshots/` when set.
    pub mapping_snapshots: bool,
}

pub fn build_gateway_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/webhook/{session_id}", post(handle_webhook))
        .route(
            "/config/{session_id}",
            put(handle_config_put).get(handle_config_get),
        )
        .route("/status", get(handle_status))
        .with_state(state)
}

async fn handle_webhook(
    State(state): State<Arc<GatewayState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<Value>,
) -> Response {
    let engine = match state.registry.engine_for(&session_id).await {
        Ok(engine) => engine,
        Err(CorrelationError::ConfigurationMissing(detail)) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "helpdesk configuration missing for session",
                    "detail": detail,
                })),
            )
                .into_response();
        }
        Err(error) => {
            tracing::error!(
                session_id = %session_id,
                %error,
                "webhook dropped: engine unavailable"
            );
            return (StatusCode::OK, "Webhook received!").into_response();
        }
    };

    let outcome = engine.lock().await.handle_webhook_event(&payload).await;
    tracing::debug!(session_id = %session_id, ?outcome, "webhook handled");
    (StatusCode::OK, webhook_acknowledgment(&outcome)).into_response()
}

async fn handle_config_put(
    State(state): State<Arc<GatewayState>>,
    Path(session_id): Path<String>,
    Json(body): Json<ConfigUpsertRequest>,
) -> Response {
    let config = HelpdeskConfig {
        session_id: session_id.clone(),
        base_url: body.base_url,
        agent_token: body.agent_token,
        bot_token: body.bot_token,
        inbox_identifier: body.inbox_identifier,
        account_id: body.account_id,
    };
    if let Err(error) = state.config_store.save(&config) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response();
    }
    // Drop any cached engine so the next event rebuilds against the new
    // configuration; lazy reconstruction keeps this idempotent.
    state.registry.remove(&session_id).await;
    tracing::info!(session_id = %session_id, "helpdesk configuration updated");
    (StatusCode::OK, Json(json!({ "saved": true }))).into_response()
}

async fn handle_config_get(
    State(state): State<Arc<GatewayState>>,
    Path(session_id): Path<String>,
) -> Response {
    match state.config_store.load(&session_id) {
        Ok(Some(config)) => (StatusCode::OK, Json(config)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no configuration for session '{session_id}'") })),
        )
            .into_response(),
        Err(error) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response(),
    }
}

async fn handle_status(State(state): State<Arc<GatewayState>>) -> Response {
    let active_sessions = state.registry.active_session_count().await;
    (
        StatusCode::OK,
        Json(json!({ "active_sessions": active_sessions })),
    )
        .into_response()
}

/// Runs the webhook gateway until ctrl-c. The transport registry is owned by
/// the session supervisor and shared in.
pub async fn run_webhook_gateway_server(
    config: GatewayServerConfig,
    transports: Arc<TransportClientRegistry>,
) -> Result<()> {
    std::fs::create_dir_all(&config.state_dir)
        .with_context(|| format!("failed to create {}", config.state_dir.display()))?;
    let bind_addr = config
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid gateway bind address '{}'", config.bind))?;

    let config_store = Arc::new(TenantConfigStore::new(&config.state_dir));
    let snapshot_dir = config
        .mapping_snapshots
        .then(|| config.state_dir.join("mapping-snapshots"));
    let registry = Arc::new(SessionRegistry::new(
        config_store.clone(),
        transports,
        Arc::new(RestHelpdeskApiFactory),
        snapshot_dir,
    ));
    let state = Arc::new(GatewayState {
        registry,
        config_store,
    });

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind webhook gateway on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound gateway address")?;
    tracing::info!(
        addr = %local_addr,
        state_dir = %config.state_dir.display(),
        "webhook gateway listening"
    );

    axum::serve(listener, build_gateway_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("webhook gateway exited unexpectedly")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use iris_correlate::{HelpdeskApiFactory, SessionRegistry};
    use iris_helpdesk::{
        HelpdeskApi, HelpdeskApiError, HelpdeskConfig, ScriptedHelpdeskApi,
    };
    use iris_transport::{RecordingTransportClient, TransportClientRegistry};

    use super::{build_gateway_router, GatewayState};
    use crate::gateway_config_store::TenantConfigStore;

    struct SharedScriptedFactory {
        api: Arc<ScriptedHelpdeskApi>,
    }

    impl HelpdeskApiFactory for SharedScriptedFactory {
        fn build(
            &self,
            _config: &HelpdeskConfig,
        ) -> Result<Arc<dyn HelpdeskApi>, HelpdeskApiError> {
            Ok(self.api.clone())
        }
    }

    struct TestGateway {
        base_url: String,
        helpdesk: Arc<ScriptedHelpdeskApi>,
        transport: Arc<RecordingTransportClient>,
        _tempdir: tempfile::TempDir,
    }

    async fn start_gateway() -> TestGateway {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let helpdesk = Arc::new(ScriptedHelpdeskApi::new());
        let transport = Arc::new(RecordingTransportClient::new());

        let transports = Arc::new(TransportClientRegistry::new());
        transports.register("session-1", transport.clone()).await;

        let config_store = Arc::new(TenantConfigStore::new(tempdir.path()));
        let registry = Arc::new(SessionRegistry::new(
            config_store.clone(),
            transports,
            Arc::new(SharedScriptedFactory {
                api: helpdesk.clone(),
            }),
            None,
        ));
        let state = Arc::new(GatewayState {
            registry,
            config_store,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, build_gateway_router(state)).await;
        });

        TestGateway {
            base_url: format!("http://{addr}"),
            helpdesk,
            transport,
            _tempdir: tempdir,
        }
    }

    fn config_body() -> serde_json::Value {
        json!({
            "base_url": "https://desk.example.com",
            "agent_token": "agent-token",
            "bot_token": "bot-token",
            "inbox_identifier": "inbox-key",
            "account_id": "7"
        })
    }

    fn agent_reply_payload(message_id: i64) -> serde_json::Value {
        json!({
            "event": "message_created",
            "id": message_id,
            "content": "hello from agent",
            "content_type": "text",
            "message_type": "outgoing",
            "sender": { "name": "Ana Agent" },
            "conversation": {
                "id": 11,
                "contact_inbox": { "contact_id": 42 }
            },
            "attachments": []
        })
    }

    #[tokio::test]
    async fn regression_webhook_for_unconfigured_session_returns_400_json() {
        let gateway = start_gateway().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/webhook/session-1", gateway.base_url))
            .json(&agent_reply_payload(812))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status().as_u16(), 400);
        let body = response.json::<serde_json::Value>().await.expect("json");
        assert!(body["error"]
            .as_str()
            .expect("error field")
            .contains("configuration missing"));
    }

    #[tokio::test]
    async fn functional_configured_session_relays_webhook_and_acknowledges() {
        let gateway = start_gateway().await;
        gateway
            .helpdesk
            .seed_contact(42, "+6281234567890", "Dina", "src-42", 3, &[11])
            .await;
        let client = reqwest::Client::new();

        let put = client
            .put(format!("{}/config/session-1", gateway.base_url))
            .json(&config_body())
            .send()
            .await
            .expect("put config");
        assert_eq!(put.status().as_u16(), 200);

        let first = client
            .post(format!("{}/webhook/session-1", gateway.base_url))
            .json(&agent_reply_payload(812))
            .send()
            .await
            .expect("webhook");
        assert_eq!(first.status().as_u16(), 200);
        assert_eq!(first.text().await.expect("body"), "Webhook received!");

        let duplicate = client
            .post(format!("{}/webhook/session-1", gateway.base_url))
            .json(&agent_reply_payload(812))
            .send()
            .await
            .expect("webhook");
        assert_eq!(duplicate.status().as_u16(), 200);
        assert_eq!(
            duplicate.text().await.expect("body"),
            "Duplicate webhook ignored!"
        );

        assert_eq!(gateway.transport.recorded_calls().await.len(), 1);
    }

    #[tokio::test]
    async fn functional_config_get_round_trips_after_put() {
        let gateway = start_gateway().await;
        let client = reqwest::Client::new();

        let missing = client
            .get(format!("{}/config/session-1", gateway.base_url))
            .send()
            .await
            .expect("get");
        assert_eq!(missing.status().as_u16(), 404);

        client
            .put(format!("{}/config/session-1", gateway.base_url))
            .json(&config_body())
            .send()
            .await
            .expect("put");

        let found = client
            .get(format!("{}/config/session-1", gateway.base_url))
            .send()
            .await
            .expect("get");
        assert_eq!(found.status().as_u16(), 200);
        let body = found.json::<serde_json::Value>().await.expect("json");
        assert_eq!(body["session_id"], "session-1");
        assert_eq!(body["inbox_identifier"], "inbox-key");
    }

    #[tokio::test]
    async fn regression_invalid_config_body_is_rejected_with_400() {
        let gateway = start_gateway().await;
        let client = reqwest::Client::new();

        let mut body = config_body();
        body["agent_token"] = json!("");
        let response = client
            .put(format!("{}/config/session-1", gateway.base_url))
            .json(&body)
            .send()
            .await
            .expect("put");
        assert_eq!(response.status().as_u16(), 400);
    }
}
