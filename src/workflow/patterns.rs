//! Design-pattern advisor.
//!
//! Keyword heuristics over use-case text. No backend calls.

use std::fmt;

use serde::Serialize;

use super::documents::DesignDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PatternCategory {
    Creational,
    Structural,
    Behavioral,
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How likely the pattern is to pay off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Likelihood {
    High,
    Medium,
    Low,
}

impl fmt::Display for Likelihood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A suggested pattern with the evidence that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSuggestion {
    pub id: &'static str,
    pub name: &'static str,
    pub category: PatternCategory,
    pub applicability: &'static str,
    pub consequences: &'static str,
    pub likelihood: Likelihood,
    pub reason: &'static str,
    pub matched_keywords: Vec<&'static str>,
}

struct PatternRule {
    id: &'static str,
    name: &'static str,
    category: PatternCategory,
    applicability: &'static str,
    consequences: &'static str,
    likelihood: Likelihood,
    reason: &'static str,
    keywords: &'static [&'static str],
}

const CATALOGUE: &[PatternRule] = &[
    PatternRule {
        id: "observer",
        name: "Observer",
        category: PatternCategory::Behavioral,
        applicability: "An abstraction has two aspects, one depending on the other, or a change to one object requires changing others.",
        consequences: "Abstract coupling between subject and observers. Supports broadcast communication.",
        likelihood: Likelihood::High,
        reason: "Use cases mention event notification or propagating changes.",
        keywords: &["notify", "alert", "broadcast", "subscribe", "listener", "when a change occurs"],
    },
    PatternRule {
        id: "strategy",
        name: "Strategy",
        category: PatternCategory::Behavioral,
        applicability: "Related classes differ only in behavior, or several variants of an algorithm are needed.",
        consequences: "Families of interchangeable algorithms. An alternative to subclassing.",
        likelihood: Likelihood::High,
        reason: "Use cases describe varying algorithms or interchangeable behavior.",
        keywords: &["algorithm", "calculation method", "sorting", "payment method", "mode", "interchangeable"],
    },
    PatternRule {
        id: "state",
        name: "State",
        category: PatternCategory::Behavioral,
        applicability: "An object's behavior depends on its state and must change at run time as the state changes.",
        consequences: "State-specific behavior is localized. Transitions become explicit.",
        likelihood: Likelihood::Medium,
        reason: "Use cases mention states, transitions, or a lifecycle.",
        keywords: &["state", "transition", "status", "lifecycle", "phase"],
    },
    PatternRule {
        id: "factory-method",
        name: "Factory Method",
        category: PatternCategory::Creational,
        applicability: "A class cannot anticipate the class of objects it must create.",
        consequences: "Gives subclasses a hook for creation. Connects parallel class hierarchies.",
        likelihood: Likelihood::Medium,
        reason: "Use cases need flexible object creation.",
        keywords: &["create", "instantiate", "types of", "various kinds of"],
    },
    PatternRule {
        id: "singleton",
        name: "Singleton",
        category: PatternCategory::Creational,
        applicability: "Exactly one instance of a class must exist, reachable from a well-known access point.",
        consequences: "Controlled access to the sole instance. Reduced global name space.",
        likelihood: Likelihood::Low,
        reason: "Use cases mention a single shared resource such as a manager or configuration.",
        keywords: &["global", "single instance", "central manager", "configuration"],
    },
];

/// Suggest patterns for a document, in catalogue order.
pub fn suggest_patterns(document: &DesignDocument) -> Vec<PatternSuggestion> {
    let text = document
        .use_cases()
        .iter()
        .map(|uc| format!("{} {}", uc.title, uc.narrative))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if text.trim().is_empty() {
        return Vec::new();
    }

    CATALOGUE
        .iter()
        .filter_map(|rule| {
            let matched: Vec<&'static str> =
                rule.keywords.iter().copied().filter(|k| text.contains(k)).collect();
            if matched.is_empty() {
                return None;
            }
            Some(PatternSuggestion {
                id: rule.id,
                name: rule.name,
                category: rule.category,
                applicability: rule.applicability,
                consequences: rule.consequences,
                likelihood: rule.likelihood,
                reason: rule.reason,
                matched_keywords: matched,
            })
        })
        .collect()
}
