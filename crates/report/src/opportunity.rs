//! Keyword heuristic that turns a feedback sentence into a coaching suggestion.
//!
//! The heuristic is an ordered rule list: the first rule with a keyword found
//! in the lowercased evidence wins. Callers who want different wording pass
//! their own rules to [`suggest_with_rules`].

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityCategory {
    Strength,
    Directive,
    Delegation,
    Communication,
    General,
    Unusable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpportunityRule {
    pub category: OpportunityCategory,
    /// Lowercase substrings; any one of them triggers the rule.
    pub keywords: &'static [&'static str],
    pub suggestion: &'static str,
}

impl OpportunityRule {
    pub fn matches(&self, lowered_evidence: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| lowered_evidence.contains(keyword))
    }
}

pub const DEFAULT_RULES: &[OpportunityRule] = &[
    OpportunityRule {
        category: OpportunityCategory::Strength,
        keywords: &["great", "excellent", "strong"],
        suggestion: "Build on this strength by mentoring peers and taking stretch assignments.",
    },
    OpportunityRule {
        category: OpportunityCategory::Directive,
        keywords: &["consider", "should"],
        suggestion:
            "Define a small, measurable action to try in the next 2 weeks and track outcomes.",
    },
    OpportunityRule {
        category: OpportunityCategory::Delegation,
        keywords: &["delegate", "delegat"],
        suggestion: "Experiment with delegating one task per week and establish clear handoffs.",
    },
    OpportunityRule {
        category: OpportunityCategory::Communication,
        keywords: &["clarity", "communication"],
        suggestion: "Practice concise summaries and solicit feedback after key meetings.",
    },
];

pub const GENERAL_SUGGESTION: &str =
    "Create a focused plan: set one concrete goal, schedule short practice sessions, and review progress.";

pub const UNUSABLE_EVIDENCE_SUGGESTION: &str = "Consider targeted development in this area.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Suggestion {
    pub category: OpportunityCategory,
    pub text: &'static str,
}

pub fn suggest_with_rules(rules: &[OpportunityRule], evidence: Option<&str>) -> Suggestion {
    let Some(evidence) = evidence.filter(|text| !text.is_empty()) else {
        return Suggestion {
            category: OpportunityCategory::Unusable,
            text: UNUSABLE_EVIDENCE_SUGGESTION,
        };
    };

    let lowered = evidence.to_lowercase();
    rules
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map(|rule| Suggestion {
            category: rule.category,
            text: rule.suggestion,
        })
        .unwrap_or(Suggestion {
            category: OpportunityCategory::General,
            text: GENERAL_SUGGESTION,
        })
}

pub fn suggest_opportunity(evidence: Option<&str>) -> &'static str {
    suggest_with_rules(DEFAULT_RULES, evidence).text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(evidence: &str) -> OpportunityCategory {
        suggest_with_rules(DEFAULT_RULES, Some(evidence)).category
    }

    #[test]
    fn matches_are_case_insensitive() {
        assert_eq!(category("STRONG opener"), OpportunityCategory::Strength);
        assert_eq!(category("You Should pause more"), OpportunityCategory::Directive);
    }

    #[test]
    fn earlier_rules_win() {
        assert_eq!(category("Great clarity"), OpportunityCategory::Strength);
        assert_eq!(
            category("Consider delegating more often."),
            OpportunityCategory::Directive
        );
        assert_eq!(category("Delegation was uneven"), OpportunityCategory::Delegation);
        assert_eq!(
            category("Communication lacked clarity"),
            OpportunityCategory::Communication
        );
    }

    #[test]
    fn unmatched_evidence_gets_general_plan() {
        assert_eq!(
            suggest_opportunity(Some("Timing was off")),
            GENERAL_SUGGESTION
        );
    }

    #[test]
    fn missing_or_empty_evidence_is_unusable() {
        assert_eq!(suggest_opportunity(None), UNUSABLE_EVIDENCE_SUGGESTION);
        assert_eq!(suggest_opportunity(Some("")), UNUSABLE_EVIDENCE_SUGGESTION);
    }

    #[test]
    fn custom_rules_replace_defaults() {
        const RULES: &[OpportunityRule] = &[OpportunityRule {
            category: OpportunityCategory::Communication,
            keywords: &["listen"],
            suggestion: "Paraphrase before answering.",
        }];
        let suggestion = suggest_with_rules(RULES, Some("Great, but listen first"));
        assert_eq!(suggestion.text, "Paraphrase before answering.");
        let fallback = suggest_with_rules(RULES, Some("Great work"));
        assert_eq!(fallback.category, OpportunityCategory::General);
    }
}
