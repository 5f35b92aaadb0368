//! Dialogue engine seam: the remote service that answers each user turn.

use std::collections::VecDeque;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::{
    domain::Sender,
    error::EngineError,
    protocol::{ChatRequest, ChatResponse},
};
use tokio::sync::Mutex;
use tracing::debug;

#[async_trait]
pub trait DialogueEngine: Send + Sync {
    /// Performs one exchange. The response is returned unvalidated; the
    /// controller checks the reply/evaluation contract.
    async fn exchange(&self, request: &ChatRequest) -> Result<ChatResponse, EngineError>;
}

fn transport(err: reqwest::Error) -> EngineError {
    if err.is_timeout() {
        EngineError::Timeout
    } else {
        EngineError::Transport(err.to_string())
    }
}

pub struct HttpDialogueEngine {
    http: Client,
    base_url: String,
}

impl HttpDialogueEngine {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Checks that the engine answers on its root route.
    pub async fn health(&self) -> Result<(), EngineError> {
        self.http
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        Ok(())
    }
}

#[async_trait]
impl DialogueEngine for HttpDialogueEngine {
    async fn exchange(&self, request: &ChatRequest) -> Result<ChatResponse, EngineError> {
        debug!(
            scenario_id = %request.scenario_id,
            chat_log_len = request.chat_log.len(),
            "engine: posting chat turn"
        );
        let body = self
            .http
            .post(format!("{}/chat", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?
            .bytes()
            .await
            .map_err(transport)?;

        serde_json::from_slice(&body)
            .map_err(|e| EngineError::Protocol(format!("undecodable engine response: {e}")))
    }
}

type ScriptStep = Result<ChatResponse, EngineError>;

/// Replays queued responses in order and records every request it sees.
///
/// Used for offline practice and as a test double.
pub struct ScriptedDialogueEngine {
    script: Mutex<VecDeque<ScriptStep>>,
    /// Reloaded into `script` at the first user turn of each conversation.
    replay: Option<Vec<ScriptStep>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedDialogueEngine {
    /// Plays `script` once; further calls fail as a transport error.
    pub fn new(script: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            replay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A short roleplay that answers `replies` and then hands back
    /// `evaluation`. Every new conversation starts the script over.
    pub fn roleplay(replies: &[&str], evaluation: Value) -> Self {
        let script: Vec<ScriptStep> = replies
            .iter()
            .map(|reply| Ok(ChatResponse::reply(*reply)))
            .chain(std::iter::once(Ok(ChatResponse::evaluation(evaluation))))
            .collect();
        Self {
            script: Mutex::new(script.iter().cloned().collect()),
            replay: Some(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn remaining(&self) -> usize {
        self.script.lock().await.len()
    }
}

#[async_trait]
impl DialogueEngine for ScriptedDialogueEngine {
    async fn exchange(&self, request: &ChatRequest) -> Result<ChatResponse, EngineError> {
        self.requests.lock().await.push(request.clone());
        let mut script = self.script.lock().await;
        if let Some(replay) = self.replay.as_ref().filter(|_| opens_conversation(request)) {
            *script = replay.iter().cloned().collect();
        }
        script
            .pop_front()
            .unwrap_or_else(|| Err(EngineError::Transport("script exhausted".to_string())))
    }
}

fn opens_conversation(request: &ChatRequest) -> bool {
    request
        .chat_log
        .iter()
        .filter(|entry| entry.sender == Sender::User)
        .count()
        == 1
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
