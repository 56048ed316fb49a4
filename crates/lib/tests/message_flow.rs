//! Integration: start the gateway with an in-memory directory and a stub
//! assistant webhook, then drive POST /message end to end. Does not require
//! the real conversational service. Server tasks are left running when each
//! test ends.

use axum::{routing::post, Json, Router};
use lib::config::Config;
use lib::directory::{Directory, MemoryDirectory, NewClient, NewExpediente, Origen};
use lib::gateway;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

/// Stub conversational service: always answers with the given reply text in
/// the `output` field. Returns the webhook URL.
async fn start_stub_assistant(reply: &str) -> String {
    let port = free_port();
    let reply = reply.to_string();
    let app = Router::new().route(
        "/webhook/asistente",
        post(move |_body: Json<Value>| {
            let reply = reply.clone();
            async move { Json(json!({ "output": reply })) }
        }),
    );
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .expect("bind stub assistant");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://127.0.0.1:{}/webhook/asistente", port)
}

/// Start the gateway against the given directory and webhook URL; waits for
/// the health route before returning the base URL.
async fn start_gateway(directory: Arc<dyn Directory>, webhook_url: String) -> String {
    let port = free_port();
    let mut config = Config::default();
    config.gateway.port = port;
    config.gateway.bind = "127.0.0.1".to_string();
    config.assistant.webhook_url = Some(webhook_url);

    tokio::spawn(async move {
        let _ = gateway::run_gateway(config, directory).await;
    });

    let base = format!("http://127.0.0.1:{}", port);
    let client = reqwest::Client::new();
    for _ in 0..100 {
        if let Ok(resp) = client.get(&base).send().await {
            if resp.status().is_success() {
                return base;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("gateway at {} did not become healthy within 5s", base);
}

async fn post_message(base: &str, tenant: &str, message: &str) -> (u16, Value) {
    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/message", base))
        .header("x-user-id", "u1")
        .header("x-user-role", "abogado")
        .header("x-tenant-id", tenant)
        .json(&json!({ "message": message }))
        .send()
        .await
        .expect("post /message");
    let status = res.status().as_u16();
    let body: Value = res.json().await.expect("parse envelope");
    (status, body)
}

#[tokio::test]
async fn plain_chat_reply_passes_through() {
    let webhook = start_stub_assistant("Hola, ¿en qué puedo ayudarte?").await;
    let directory = Arc::new(MemoryDirectory::new());
    let base = start_gateway(directory, webhook).await;

    let (status, body) = post_message(&base, "t1", "hola").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["response"], json!("Hola, ¿en qué puedo ayudarte?"));
    assert!(body.get("client").is_none());
}

#[tokio::test]
async fn directive_block_never_reaches_the_caller() {
    let webhook = start_stub_assistant(
        "Claro, un momento.\n\nACCION_JSON { esto no es json válido",
    )
    .await;
    let directory = Arc::new(MemoryDirectory::new());
    let base = start_gateway(directory, webhook).await;

    let (status, body) = post_message(&base, "t1", "crea algo").await;
    assert_eq!(status, 200);
    assert_eq!(body["response"], json!("Claro, un momento."));
}

#[tokio::test]
async fn create_client_directive_round_trip() {
    let webhook = start_stub_assistant(
        r#"Voy a darlo de alta. ACCION_JSON {"action":"createClient","data":{"name":"Ana","mail":"a@x.com","phone":"555"}}"#,
    )
    .await;
    let directory = Arc::new(MemoryDirectory::new());
    let as_dyn: Arc<dyn Directory> = directory.clone();
    let base = start_gateway(as_dyn, webhook).await;

    let (status, body) = post_message(&base, "t1", "alta de cliente").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["response"], json!("Cliente creado con éxito."));
    assert_eq!(body["client"]["email"], json!("a@x.com"));

    // persisted under the caller's tenant only
    assert_eq!(directory.list_clients("t1").await.unwrap().len(), 1);
    assert!(directory.list_clients("t2").await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_expediente_is_a_400_with_the_number_named() {
    let webhook = start_stub_assistant(
        r#"Agendo la cita. ACCION_JSON {"action":"agendarCita","data":{"caseId":"EXP-1","fecha":"2025-01-10","hora":"10:00"}}"#,
    )
    .await;
    let directory = Arc::new(MemoryDirectory::new());
    let base = start_gateway(directory, webhook).await;

    let (status, body) = post_message(&base, "t1", "cita para EXP-1").await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], json!(false));
    let response = body["response"].as_str().unwrap_or_default();
    assert!(response.contains("EXP-1"), "response was: {}", response);
}

#[tokio::test]
async fn cita_round_trip_through_an_existing_expediente() {
    let webhook = start_stub_assistant(
        r#"Listo. ACCION_JSON {"action":"agendarCita","data":{"caseId":"EXP-1","fecha":"2025-01-10","hora":"10:00","estado":"Completada"}}"#,
    )
    .await;
    let directory = Arc::new(MemoryDirectory::new());
    let client = directory
        .create_client(
            "t1",
            NewClient {
                name: "Ana García".to_string(),
                email: "ana@x.com".to_string(),
                phone: "555".to_string(),
            },
        )
        .await
        .unwrap();
    directory
        .create_expediente(
            "t1",
            NewExpediente {
                numero_expediente: "EXP-1".to_string(),
                client_id: client.id.clone(),
                client_name: client.name.clone(),
                title: "Divorcio".to_string(),
                status: "abierto".to_string(),
                due_date: None,
                origen: Origen::Manual,
            },
        )
        .await
        .unwrap();
    let as_dyn: Arc<dyn Directory> = directory.clone();
    let base = start_gateway(as_dyn, webhook).await;

    let (status, body) = post_message(&base, "t1", "cita para EXP-1").await;
    assert_eq!(status, 200);
    assert_eq!(body["response"], json!("Cita agendada con éxito."));
    assert_eq!(body["cita"]["estado"], json!("completada"));
    assert_eq!(body["cita"]["clientId"], json!(client.id));
}

#[tokio::test]
async fn missing_identity_headers_are_rejected() {
    let webhook = start_stub_assistant("Hola").await;
    let directory = Arc::new(MemoryDirectory::new());
    let base = start_gateway(directory, webhook).await;

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/message", base))
        .json(&json!({ "message": "hola" }))
        .send()
        .await
        .expect("post without identity");
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn unreachable_assistant_is_a_500_apology() {
    // point the gateway at a port nothing listens on
    let dead_webhook = format!("http://127.0.0.1:{}/webhook/asistente", free_port());
    let directory = Arc::new(MemoryDirectory::new());
    let base = start_gateway(directory, dead_webhook).await;

    let (status, body) = post_message(&base, "t1", "hola").await;
    assert_eq!(status, 500);
    assert_eq!(body["success"], json!(false));
    let response = body["response"].as_str().unwrap_or_default();
    assert!(response.starts_with("Lo siento"), "response was: {}", response);
}
