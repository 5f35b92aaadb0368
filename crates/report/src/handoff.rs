//! Carries an evaluation payload from the chat stage to the report stage as a
//! `?data=<json>` query parameter.

use std::borrow::Cow;

use serde_json::{json, Value};
use shared::protocol::EvaluationPayload;
use thiserror::Error;
use url::{form_urlencoded, Url};

pub const REPORT_PATH: &str = "/evaluation";
pub const DATA_PARAM: &str = "data";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("no evaluation data found")]
    MissingData,
    #[error("evaluation data is not valid JSON: {0}")]
    Json(String),
    #[error("evaluation data must be a JSON object")]
    NotAnObject,
}

pub fn encode_report_link(
    base: &Url,
    payload: &EvaluationPayload,
) -> Result<Url, serde_json::Error> {
    let data = serde_json::to_string(payload)?;
    let mut link = base.clone();
    link.set_path(REPORT_PATH);
    link.set_fragment(None);
    link.query_pairs_mut().clear().append_pair(DATA_PARAM, &data);
    Ok(link)
}

/// Accepts a full link, a path with query, a bare `data=` query, a
/// percent-encoded value or plain JSON.
pub fn decode_report_data(raw: &str) -> Result<EvaluationPayload, DecodeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DecodeError::MissingData);
    }

    let data = extract_data(raw)?;
    let value: Value =
        serde_json::from_str(&data).map_err(|e| DecodeError::Json(e.to_string()))?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    EvaluationPayload::from_value(value).map_err(|e| DecodeError::Json(e.to_string()))
}

fn extract_data(raw: &str) -> Result<Cow<'_, str>, DecodeError> {
    if raw.starts_with('{') {
        return Ok(Cow::Borrowed(raw));
    }

    if let Ok(url) = Url::parse(raw) {
        if matches!(url.scheme(), "http" | "https") {
            return data_param(url.query().unwrap_or_default()).map(Cow::Owned);
        }
    }

    if let Some((_, query)) = raw.split_once('?') {
        return data_param(query).map(Cow::Owned);
    }
    if raw.starts_with("data=") {
        return data_param(raw).map(Cow::Owned);
    }

    let decoded: String = form_urlencoded::parse(format!("{DATA_PARAM}={raw}").as_bytes())
        .map(|(_, value)| value.into_owned())
        .next()
        .unwrap_or_default();
    if decoded.trim().is_empty() {
        return Err(DecodeError::MissingData);
    }
    Ok(Cow::Owned(decoded))
}

fn data_param(query: &str) -> Result<String, DecodeError> {
    form_urlencoded::parse(query.split('#').next().unwrap_or_default().as_bytes())
        .find(|(key, _)| key == DATA_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.trim().is_empty())
        .ok_or(DecodeError::MissingData)
}

/// Demo payload offered when the report stage has nothing to show.
pub fn sample_payload() -> EvaluationPayload {
    EvaluationPayload {
        scores: Some(json!({
            "Communication": 85,
            "Leadership": 75,
            "Teamwork": 90,
            "Problem Solving": 80
        })),
        total: Some(json!(330)),
        max: Some(json!(400)),
        feedback: Some(json!([
            "Great clarity in answers.",
            "Consider delegating more often."
        ])),
    }
}
