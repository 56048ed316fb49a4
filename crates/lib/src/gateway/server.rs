//! Gateway HTTP server.

use crate::actions::{self, Outcome};
use crate::assistant::AssistantClient;
use crate::compose;
use crate::config::{self, Config};
use crate::directive;
use crate::directory::Directory;
use crate::message::IncomingMessage;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Fixed apology for the only fatal path (conversational service unreachable
/// or useless). Business-rule failures never produce it.
const APOLOGY: &str =
    "Lo siento, ha ocurrido un problema al procesar tu mensaje. Inténtalo de nuevo en unos minutos.";

/// Shared state for the gateway (config, assistant client, directory handle).
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub assistant: AssistantClient,
    pub directory: Arc<dyn Directory>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: String,
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Blocks until shutdown (Ctrl+C or SIGTERM).
pub async fn run_gateway(config: Config, directory: Arc<dyn Directory>) -> Result<()> {
    let webhook_url = config::resolve_webhook_url(&config);
    log::info!("assistant webhook: {}", webhook_url);
    let assistant = AssistantClient::new(Some(webhook_url))?;

    let state = GatewayState {
        config: Arc::new(config.clone()),
        assistant,
        directory,
    };
    let app = Router::new()
        .route("/", get(health_http))
        .route("/message", post(post_message))
        .with_state(state);

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
    }))
}

/// Caller identity injected by the upstream auth collaborator. All three
/// headers are required; the pipeline never runs for an anonymous caller.
fn caller_identity(headers: &HeaderMap) -> Option<(String, String, String)> {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    Some((get("x-user-id")?, get("x-user-role")?, get("x-tenant-id")?))
}

fn chat_envelope(response: &str) -> Value {
    json!({
        "success": true,
        "response": response,
        "timestamp": Utc::now().to_rfc3339(),
    })
}

fn failure_envelope(response: &str) -> Value {
    json!({
        "success": false,
        "response": response,
        "timestamp": Utc::now().to_rfc3339(),
    })
}

/// Soft validation failures stay 200 (the reply is a conversational prompt);
/// unresolved entities and collaborator rejections are 400. Business-rule
/// failures are never 500.
fn outcome_status(outcome: &Outcome) -> StatusCode {
    match outcome {
        Outcome::Dispatched { .. } | Outcome::MissingField { .. } => StatusCode::OK,
        Outcome::EntityNotFound { .. } | Outcome::DispatchFailed { .. } => StatusCode::BAD_REQUEST,
    }
}

/// POST /message runs the whole pipeline: assistant call, directive
/// extraction, routing, and response composition.
async fn post_message(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(body): Json<MessageBody>,
) -> (StatusCode, Json<Value>) {
    let Some((user_id, role, tenant_id)) = caller_identity(&headers) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(failure_envelope("No se pudo identificar al usuario.")),
        );
    };
    let incoming = IncomingMessage {
        text: body.message,
        tenant_id,
        user_id,
        role,
    };

    let reply = match state.assistant.send(&incoming).await {
        Ok(reply) => reply,
        Err(e) => {
            log::error!("assistant call failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(failure_envelope(APOLOGY)),
            );
        }
    };

    let Some(directive) = directive::extract_directive(&reply) else {
        // plain chat turn; strip anything after the sentinel anyway
        return (StatusCode::OK, Json(chat_envelope(compose::clean_reply(&reply))));
    };

    log::info!(
        "dispatching directive {:?} for tenant {}",
        directive.action,
        incoming.tenant_id
    );
    let outcome = actions::route(state.directory.as_ref(), &incoming.tenant_id, &directive).await;
    let status = outcome_status(&outcome);
    match serde_json::to_value(outcome.into_result()) {
        Ok(envelope) => (status, Json(envelope)),
        Err(e) => {
            log::error!("serializing action result failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(failure_envelope(APOLOGY)),
            )
        }
    }
}
