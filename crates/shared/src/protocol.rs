use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    domain::{Sender, TranscriptEntry},
    error::EngineError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLogEntry {
    pub sender: Sender,
    pub text: String,
}

impl From<&TranscriptEntry> for ChatLogEntry {
    fn from(entry: &TranscriptEntry) -> Self {
        Self {
            sender: entry.sender,
            text: entry.text.clone(),
        }
    }
}

/// Body posted to the dialogue engine for every user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub scenario_id: String,
    pub message: String,
    pub chat_log: Vec<ChatLogEntry>,
}

/// Evaluation result produced by the engine once a roleplay is over.
///
/// Every field is optional and kept as raw JSON; the report stage coerces
/// values when it builds its view model. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Value>,
}

impl EvaluationPayload {
    /// Fails only when `value` is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if !value.is_object() {
            return Err(serde::de::Error::custom(format!(
                "expected an object, got {value}"
            )));
        }
        serde_json::from_value(value)
    }

    pub fn scores_map(&self) -> Option<&Map<String, Value>> {
        self.scores.as_ref().and_then(Value::as_object)
    }

    pub fn feedback_items(&self) -> &[Value] {
        self.feedback
            .as_ref()
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Raw engine response. Exactly one of the two fields is expected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Value>,
}

impl ChatResponse {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            reply: Some(Value::String(text.into())),
            evaluation: None,
        }
    }

    pub fn evaluation(payload: Value) -> Self {
        Self {
            reply: None,
            evaluation: Some(payload),
        }
    }

    /// Validates the exactly-one-of contract.
    ///
    /// A blank reply string or a `null` evaluation counts as absent.
    pub fn into_engine_reply(self) -> Result<EngineReply, EngineError> {
        let reply = match self.reply {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) if text.trim().is_empty() => None,
            Some(Value::String(text)) => Some(text),
            Some(other) => {
                return Err(EngineError::Protocol(format!(
                    "reply must be a string, got {other}"
                )))
            }
        };
        let evaluation = self.evaluation.filter(|value| !value.is_null());

        match (reply, evaluation) {
            (Some(text), None) => Ok(EngineReply::Reply(text)),
            (None, Some(value)) => EvaluationPayload::from_value(value)
                .map(EngineReply::Evaluation)
                .map_err(|e| EngineError::Protocol(format!("malformed evaluation payload: {e}"))),
            (Some(_), Some(_)) => Err(EngineError::Protocol(
                "response carried both reply and evaluation".to_string(),
            )),
            (None, None) => Err(EngineError::Protocol(
                "response carried neither reply nor evaluation".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineReply {
    Reply(String),
    Evaluation(EvaluationPayload),
}
