use std::{sync::Arc, time::Duration};

use shared::{
    domain::{find_scenario, ScenarioDescriptor, SessionId, SessionPhase, TranscriptEntry},
    error::{EngineError, FailureKind, ValidationError},
    protocol::{ChatLogEntry, ChatRequest, ChatResponse, EngineReply, EvaluationPayload},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

pub mod config;
pub mod engine;

pub use engine::{DialogueEngine, HttpDialogueEngine, ScriptedDialogueEngine};

pub const OPENING_LINE: &str =
    "Hello! I'm your AI roleplay partner. Let's begin - how would you handle this situation?";
pub const APOLOGY_LINE: &str = "Sorry, I encountered an error. Please try again.";

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One attempt at a scenario, from confirmation to completion or reset.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub scenario: &'static ScenarioDescriptor,
    pub transcript: Vec<TranscriptEntry>,
    pub phase: SessionPhase,
    pub pending_request: bool,
    pub evaluation: Option<EvaluationPayload>,
}

impl Session {
    fn start(scenario: &'static ScenarioDescriptor) -> Self {
        Self {
            id: SessionId::new(),
            scenario,
            transcript: vec![
                TranscriptEntry::system(format!("Starting: {}", scenario.title)),
                TranscriptEntry::bot(OPENING_LINE),
            ],
            phase: SessionPhase::Active,
            pending_request: false,
            evaluation: None,
        }
    }

    fn chat_log(&self) -> Vec<ChatLogEntry> {
        self.transcript.iter().map(ChatLogEntry::from).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PhaseChanged {
        from: SessionPhase,
        to: SessionPhase,
    },
    SelectionChanged {
        scenario_id: Option<&'static str>,
    },
    EntryAppended {
        session_id: SessionId,
        entry: TranscriptEntry,
    },
    TypingChanged(bool),
    EvaluationReady {
        session_id: SessionId,
        payload: EvaluationPayload,
    },
    TurnFailed {
        session_id: SessionId,
        kind: FailureKind,
    },
}

/// What became of a send that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Replied(String),
    Ended(EvaluationPayload),
    /// The engine call failed; an apology entry was appended instead.
    Failed(EngineError),
    /// The session that issued the call was replaced before it resolved.
    /// Not produced while resets are refused during a pending turn.
    Discarded,
}

/// Read model handed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub selected_scenario: Option<&'static ScenarioDescriptor>,
    pub session: Option<Session>,
}

impl SessionSnapshot {
    pub fn typing(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.pending_request)
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        self.session
            .as_ref()
            .map(|session| session.transcript.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Default)]
struct ControllerState {
    selected: Option<&'static ScenarioDescriptor>,
    session: Option<Session>,
}

impl ControllerState {
    fn phase(&self) -> SessionPhase {
        match (&self.session, self.selected) {
            (Some(session), _) => session.phase,
            (None, Some(_)) => SessionPhase::Selecting,
            (None, None) => SessionPhase::Welcome,
        }
    }

    fn pending(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.pending_request)
    }
}

/// Drives the conversation lifecycle for a single user.
///
/// All transitions run under one async mutex. The dialogue-engine call is the
/// only await point made without holding it, and `pending_request` refuses
/// overlapping sends while that call is in flight.
pub struct SessionController {
    engine: Arc<dyn DialogueEngine>,
    request_timeout: Option<Duration>,
    inner: Arc<Mutex<ControllerState>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    pub fn new(engine: Arc<dyn DialogueEngine>) -> Arc<Self> {
        Self::new_with_timeout(engine, None)
    }

    pub fn new_with_timeout(
        engine: Arc<dyn DialogueEngine>,
        request_timeout: Option<Duration>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            engine,
            request_timeout,
            inner: Arc::new(Mutex::new(ControllerState::default())),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        SessionSnapshot {
            phase: inner.phase(),
            selected_scenario: inner.selected,
            session: inner.session.clone(),
        }
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.lock().await.phase()
    }

    /// Chooses a scenario without starting it. An empty id clears the
    /// selection. Selecting after a finished session discards that session.
    pub async fn select_scenario(&self, scenario_id: &str) -> Result<(), ValidationError> {
        let mut inner = self.inner.lock().await;
        let from = inner.phase();
        if from == SessionPhase::Active {
            return Err(self.refuse(ValidationError::InvalidTransition {
                from,
                action: "select a scenario",
            }));
        }

        let scenario_id = scenario_id.trim();
        let selected = if scenario_id.is_empty() {
            None
        } else {
            Some(find_scenario(scenario_id).ok_or_else(|| {
                self.refuse(ValidationError::UnknownScenario(scenario_id.to_string()))
            })?)
        };

        inner.session = None;
        inner.selected = selected;
        self.emit(SessionEvent::SelectionChanged {
            scenario_id: selected.map(|scenario| scenario.id),
        });
        self.emit_phase_change(from, inner.phase());
        Ok(())
    }

    /// Starts a new session for the selected scenario.
    pub async fn confirm_scenario(&self) -> Result<SessionId, ValidationError> {
        let mut inner = self.inner.lock().await;
        let from = inner.phase();
        if from == SessionPhase::Active {
            return Err(self.refuse(ValidationError::InvalidTransition {
                from,
                action: "start a scenario",
            }));
        }
        let Some(scenario) = inner.selected else {
            return Err(self.refuse(ValidationError::NoScenarioSelected));
        };

        let session = Session::start(scenario);
        let session_id = session.id;
        info!(
            session_id = %session_id,
            scenario_id = scenario.id,
            "session: scenario started"
        );
        for entry in &session.transcript {
            self.emit(SessionEvent::EntryAppended {
                session_id,
                entry: entry.clone(),
            });
        }
        inner.session = Some(session);
        self.emit_phase_change(from, SessionPhase::Active);
        Ok(session_id)
    }

    pub async fn start_scenario(&self, scenario_id: &str) -> Result<SessionId, ValidationError> {
        self.select_scenario(scenario_id).await?;
        self.confirm_scenario().await
    }

    /// Discards the current session and selection.
    pub async fn return_to_welcome(&self) -> Result<(), ValidationError> {
        let mut inner = self.inner.lock().await;
        if inner.pending() {
            return Err(self.refuse(ValidationError::RequestPending));
        }

        let from = inner.phase();
        if let Some(session) = inner.session.take() {
            info!(session_id = %session.id, "session: discarded");
        }
        inner.selected = None;
        self.emit_phase_change(from, SessionPhase::Welcome);
        Ok(())
    }

    /// Sends one user turn and applies the engine's answer.
    ///
    /// Refusals leave the session untouched and never reach the engine.
    /// Engine failures are absorbed: an apology entry is appended and the
    /// session stays active so the user can retry. Dropping the returned
    /// future before it resolves cancels the call and settles the turn the
    /// same way.
    pub async fn send_message(&self, text: &str) -> Result<TurnOutcome, ValidationError> {
        let (session_id, request) = {
            let mut inner = self.inner.lock().await;
            let Some(session) = inner.session.as_mut() else {
                return Err(self.refuse(ValidationError::NoActiveSession));
            };
            if session.phase == SessionPhase::Ended {
                return Err(self.refuse(ValidationError::SessionEnded));
            }
            if session.pending_request {
                return Err(self.refuse(ValidationError::RequestPending));
            }
            if text.trim().is_empty() {
                return Err(self.refuse(ValidationError::EmptyMessage));
            }

            let entry = TranscriptEntry::user(text);
            session.transcript.push(entry.clone());
            session.pending_request = true;
            self.emit(SessionEvent::EntryAppended {
                session_id: session.id,
                entry,
            });
            self.emit(SessionEvent::TypingChanged(true));

            let request = ChatRequest {
                scenario_id: session.scenario.id.to_string(),
                message: text.to_string(),
                chat_log: session.chat_log(),
            };
            (session.id, request)
        };

        let mut turn = InFlightTurn {
            session_id,
            inner: Arc::clone(&self.inner),
            events: self.events.clone(),
            settled: false,
        };
        debug!(
            session_id = %session_id,
            chat_log_len = request.chat_log.len(),
            "session: awaiting dialogue engine"
        );
        let result = self
            .exchange(&request)
            .await
            .and_then(|response| response.into_engine_reply());

        let mut inner = self.inner.lock().await;
        turn.settled = true;
        // Guard only: resets are refused while a turn is pending.
        let Some(session) = inner
            .session
            .as_mut()
            .filter(|session| session.id == session_id)
        else {
            warn!(session_id = %session_id, "session: dropping engine result for replaced session");
            return Ok(TurnOutcome::Discarded);
        };

        session.pending_request = false;
        self.emit(SessionEvent::TypingChanged(false));

        match result {
            Ok(EngineReply::Reply(reply)) => {
                let entry = TranscriptEntry::bot(reply.clone());
                session.transcript.push(entry.clone());
                self.emit(SessionEvent::EntryAppended { session_id, entry });
                Ok(TurnOutcome::Replied(reply))
            }
            Ok(EngineReply::Evaluation(payload)) => {
                session.phase = SessionPhase::Ended;
                session.evaluation = Some(payload.clone());
                info!(session_id = %session_id, "session: evaluation received, conversation ended");
                self.emit_phase_change(SessionPhase::Active, SessionPhase::Ended);
                self.emit(SessionEvent::EvaluationReady {
                    session_id,
                    payload: payload.clone(),
                });
                Ok(TurnOutcome::Ended(payload))
            }
            Err(err) => {
                match err.kind() {
                    FailureKind::Transport => {
                        warn!(session_id = %session_id, error = %err, "session: engine unreachable")
                    }
                    FailureKind::Protocol => {
                        error!(session_id = %session_id, error = %err, "session: engine broke reply contract")
                    }
                }
                append_apology(session, &self.events, err.kind());
                Ok(TurnOutcome::Failed(err))
            }
        }
    }

    /// Evaluation of the current session, once it has ended.
    pub async fn evaluation(&self) -> Option<EvaluationPayload> {
        self.inner
            .lock()
            .await
            .session
            .as_ref()
            .and_then(|session| session.evaluation.clone())
    }

    async fn exchange(&self, request: &ChatRequest) -> Result<ChatResponse, EngineError> {
        match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, self.engine.exchange(request))
                .await
                .unwrap_or(Err(EngineError::Timeout)),
            None => self.engine.exchange(request).await,
        }
    }

    fn refuse(&self, reason: ValidationError) -> ValidationError {
        debug!(%reason, "session: action refused");
        reason
    }

    fn emit_phase_change(&self, from: SessionPhase, to: SessionPhase) {
        if from != to {
            self.emit(SessionEvent::PhaseChanged { from, to });
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine; the controller runs headless in tests.
        let _ = self.events.send(event);
    }
}

fn append_apology(
    session: &mut Session,
    events: &broadcast::Sender<SessionEvent>,
    kind: FailureKind,
) {
    let entry = TranscriptEntry::bot(APOLOGY_LINE);
    session.transcript.push(entry.clone());
    let _ = events.send(SessionEvent::EntryAppended {
        session_id: session.id,
        entry,
    });
    let _ = events.send(SessionEvent::TurnFailed {
        session_id: session.id,
        kind,
    });
}

/// Settles a turn whose `send_message` future was dropped mid-call.
struct InFlightTurn {
    session_id: SessionId,
    inner: Arc<Mutex<ControllerState>>,
    events: broadcast::Sender<SessionEvent>,
    settled: bool,
}

impl InFlightTurn {
    fn abandon(
        state: &mut ControllerState,
        events: &broadcast::Sender<SessionEvent>,
        id: SessionId,
    ) {
        let Some(session) = state
            .session
            .as_mut()
            .filter(|session| session.id == id && session.pending_request)
        else {
            return;
        };
        warn!(session_id = %id, "session: turn abandoned before the engine answered");
        session.pending_request = false;
        let _ = events.send(SessionEvent::TypingChanged(false));
        append_apology(session, events, FailureKind::Transport);
    }
}

impl Drop for InFlightTurn {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Ok(mut state) = self.inner.try_lock() {
            Self::abandon(&mut state, &self.events, self.session_id);
            return;
        }

        // Lock is busy: finish the cleanup on the runtime instead.
        let inner = Arc::clone(&self.inner);
        let events = self.events.clone();
        let session_id = self.session_id;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let mut state = inner.lock().await;
                    Self::abandon(&mut state, &events, session_id);
                });
            }
            Err(_) => error!(session_id = %session_id, "session: abandoned turn left pending"),
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
