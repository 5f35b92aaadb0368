use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Student,
    Expat,
    Recruiter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn label(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioDescriptor {
    pub id: &'static str,
    pub title: &'static str,
    pub persona: Persona,
    pub difficulty: Difficulty,
}

macro_rules! scenario {
    ($id:literal, $title:literal, $persona:ident, $difficulty:ident) => {
        ScenarioDescriptor {
            id: $id,
            title: $title,
            persona: Persona::$persona,
            difficulty: Difficulty::$difficulty,
        }
    };
}

/// Fixed scenario catalog offered on the welcome screen.
pub const SCENARIOS: [ScenarioDescriptor; 9] = [
    scenario!("scenario1", "Student — Group project conflict", Student, Easy),
    scenario!("scenario2", "Student — Classroom debate / directness", Student, Medium),
    scenario!("scenario3", "Student — Presentation & time expectations", Student, Medium),
    scenario!("scenario4", "Corporate Expat — Supplier negotiation", Expat, Hard),
    scenario!("scenario5", "Corporate Expat — Performance feedback", Expat, Hard),
    scenario!("scenario6", "Corporate Expat — Leading mixed meeting", Expat, Hard),
    scenario!("scenario7", "Recruiter — Interview: indirect answers", Recruiter, Medium),
    scenario!("scenario8", "Recruiter — Panel disagreement", Recruiter, Hard),
    scenario!("scenario9", "Recruiter — Onboarding instructions", Recruiter, Hard),
];

pub fn scenario_catalog() -> &'static [ScenarioDescriptor] {
    &SCENARIOS
}

pub fn find_scenario(id: &str) -> Option<&'static ScenarioDescriptor> {
    SCENARIOS.iter().find(|scenario| scenario.id == id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Sender::System, text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Welcome,
    Selecting,
    Active,
    Ended,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Welcome => "welcome",
            Self::Selecting => "selecting",
            Self::Active => "active",
            Self::Ended => "ended",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn catalog_ids_are_unique() {
        let ids: HashSet<_> = scenario_catalog().iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), SCENARIOS.len());
    }

    #[test]
    fn finds_scenario_by_id() {
        let scenario = find_scenario("scenario4").expect("scenario4");
        assert_eq!(scenario.persona, Persona::Expat);
        assert_eq!(scenario.difficulty, Difficulty::Hard);
        assert!(find_scenario("scenario10").is_none());
        assert!(find_scenario("").is_none());
    }

    #[test]
    fn sender_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Sender::Bot).expect("json"), "\"bot\"");
        assert_eq!(
            serde_json::to_string(&Sender::System).expect("json"),
            "\"system\""
        );
    }
}
