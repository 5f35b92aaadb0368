use super::*;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use serde_json::json;
use shared::{
    domain::Sender,
    error::FailureKind,
    protocol::{ChatLogEntry, EngineReply},
};
use tokio::{net::TcpListener, sync::oneshot};

#[derive(Clone)]
struct EngineState {
    tx: Arc<Mutex<Option<oneshot::Sender<ChatRequest>>>>,
    body: Value,
    status: StatusCode,
}

async fn handle_chat(
    State(state): State<EngineState>,
    Json(payload): Json<ChatRequest>,
) -> (StatusCode, Json<Value>) {
    if let Some(tx) = state.tx.lock().await.take() {
        let _ = tx.send(payload);
    }
    (state.status, Json(state.body.clone()))
}

async fn handle_root() -> Json<Value> {
    Json(json!({"message": "running"}))
}

async fn spawn_engine(
    status: StatusCode,
    body: Value,
) -> anyhow::Result<(String, oneshot::Receiver<ChatRequest>)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, rx) = oneshot::channel();
    let state = EngineState {
        tx: Arc::new(Mutex::new(Some(tx))),
        body,
        status,
    };
    let app = Router::new()
        .route("/", get(handle_root))
        .route("/chat", post(handle_chat))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), rx))
}

fn sample_request() -> ChatRequest {
    ChatRequest {
        scenario_id: "scenario1".to_string(),
        message: "I would talk to my teammates".to_string(),
        chat_log: vec![
            ChatLogEntry {
                sender: Sender::System,
                text: "Starting: Student — Group project conflict".to_string(),
            },
            ChatLogEntry {
                sender: Sender::User,
                text: "I would talk to my teammates".to_string(),
            },
        ],
    }
}

#[tokio::test]
async fn http_engine_posts_chat_request_and_decodes_reply() {
    let (url, request_rx) = spawn_engine(StatusCode::OK, json!({"reply": "Good approach"}))
        .await
        .expect("spawn engine");
    let engine = HttpDialogueEngine::new(format!("{url}/"));

    let response = engine.exchange(&sample_request()).await.expect("exchange");
    assert_eq!(
        response.into_engine_reply().expect("reply"),
        EngineReply::Reply("Good approach".to_string())
    );

    let seen = request_rx.await.expect("request");
    assert_eq!(seen, sample_request());
}

#[tokio::test]
async fn http_engine_decodes_evaluation() {
    let (url, _rx) = spawn_engine(
        StatusCode::OK,
        json!({"evaluation": {"scores": {"Communication": 85}, "total": 330, "max": 400}}),
    )
    .await
    .expect("spawn engine");
    let engine = HttpDialogueEngine::new(url);

    let reply = engine
        .exchange(&sample_request())
        .await
        .expect("exchange")
        .into_engine_reply()
        .expect("evaluation");
    let EngineReply::Evaluation(payload) = reply else {
        panic!("expected evaluation");
    };
    assert_eq!(payload.total, Some(json!(330)));
}

#[tokio::test]
async fn http_engine_maps_error_status_to_transport() {
    let (url, _rx) = spawn_engine(StatusCode::INTERNAL_SERVER_ERROR, json!({}))
        .await
        .expect("spawn engine");
    let engine = HttpDialogueEngine::new(url);

    let err = engine
        .exchange(&sample_request())
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), FailureKind::Transport);
}

#[tokio::test]
async fn http_engine_maps_non_object_body_to_protocol() {
    let (url, _rx) = spawn_engine(StatusCode::OK, json!("just text"))
        .await
        .expect("spawn engine");
    let engine = HttpDialogueEngine::new(url);

    let err = engine
        .exchange(&sample_request())
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), FailureKind::Protocol);
}

#[tokio::test]
async fn http_engine_reports_unreachable_engine_as_transport() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let engine = HttpDialogueEngine::new(format!("http://{addr}"));
    let err = engine
        .exchange(&sample_request())
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), FailureKind::Transport);
    assert!(engine.health().await.is_err());
}

#[tokio::test]
async fn http_engine_health_checks_root_route() {
    let (url, _rx) = spawn_engine(StatusCode::OK, json!({}))
        .await
        .expect("spawn engine");
    let engine = HttpDialogueEngine::new(url);
    engine.health().await.expect("healthy");
}

fn follow_up_request(user_turns: usize) -> ChatRequest {
    let mut request = sample_request();
    for turn in 1..user_turns {
        request.chat_log.push(ChatLogEntry {
            sender: Sender::Bot,
            text: format!("reply {turn}"),
        });
        request.chat_log.push(ChatLogEntry {
            sender: Sender::User,
            text: format!("turn {turn}"),
        });
    }
    request
}

#[tokio::test]
async fn scripted_engine_replays_in_order_then_runs_dry() {
    let engine = ScriptedDialogueEngine::new([
        Ok(ChatResponse::reply("first")),
        Ok(ChatResponse::evaluation(json!({"total": 1}))),
    ]);
    assert_eq!(engine.remaining().await, 2);

    let first = engine.exchange(&sample_request()).await.expect("first");
    assert_eq!(first, ChatResponse::reply("first"));
    let second = engine.exchange(&sample_request()).await.expect("second");
    assert_eq!(second, ChatResponse::evaluation(json!({"total": 1})));

    let err = engine
        .exchange(&sample_request())
        .await
        .expect_err("exhausted");
    assert_eq!(err.kind(), FailureKind::Transport);
    assert_eq!(engine.requests().await.len(), 3);
}

#[tokio::test]
async fn roleplay_script_restarts_with_each_conversation() {
    let engine = ScriptedDialogueEngine::roleplay(&["first"], json!({"total": 1}));

    for _ in 0..2 {
        let opening = engine.exchange(&follow_up_request(1)).await.expect("opening");
        assert_eq!(opening, ChatResponse::reply("first"));
        let closing = engine.exchange(&follow_up_request(2)).await.expect("closing");
        assert_eq!(closing, ChatResponse::evaluation(json!({"total": 1})));
        assert_eq!(engine.remaining().await, 0);
    }

    let err = engine
        .exchange(&follow_up_request(3))
        .await
        .expect_err("exhausted");
    assert_eq!(err.kind(), FailureKind::Transport);
}
