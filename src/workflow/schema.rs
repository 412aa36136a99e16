//! Schema validation for structured model output.
//!
//! Payloads are deserialized into typed records first; the field rules serde
//! cannot express (non-empty ids, narrative length, at least one actor) are
//! checked afterwards. Every violation is collected as a `path: message`
//! string and typed output is only returned when there are none.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::documents::{
    Constraint, FunctionalRequirement, Priority, QualityRequirement, RequirementsUpdate, Stakeholder,
    UseCase,
};

/// Minimum narrative length, in characters.
pub const MIN_NARRATIVE_CHARS: usize = 10;

/// Validated use-case extraction response.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatAnalysisResponse {
    pub reply: String,
    pub use_cases: Vec<UseCase>,
}

/// Validated requirements extraction response.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementsAnalysisResponse {
    pub reply: String,
    pub update: RequirementsUpdate,
}

// Array items stay raw so a bad element is reported under its own index.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatAnalysisPayload {
    reply: String,
    #[serde(default)]
    use_cases: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequirementsPayload {
    reply: String,
    #[serde(default)]
    project_purpose: Option<String>,
    #[serde(default)]
    stakeholders: Option<Vec<Value>>,
    #[serde(default)]
    constraints: Option<Vec<Value>>,
    #[serde(default)]
    functional_requirements: Option<Vec<Value>>,
    #[serde(default)]
    quality_requirements: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct StakeholderPayload {
    id: String,
    name: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    interests: Vec<String>,
}

impl From<StakeholderPayload> for Stakeholder {
    fn from(p: StakeholderPayload) -> Self {
        Self { id: p.id, name: p.name, role: p.role.unwrap_or_default(), interests: p.interests }
    }
}

#[derive(Debug, Deserialize)]
struct FunctionalRequirementPayload {
    id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    priority: Priority,
}

impl From<FunctionalRequirementPayload> for FunctionalRequirement {
    fn from(p: FunctionalRequirementPayload) -> Self {
        Self { id: p.id, title: p.title, description: p.description.unwrap_or_default(), priority: p.priority }
    }
}

/// Validate a use-case extraction payload.
pub fn validate_chat_analysis(value: &Value) -> Result<ChatAnalysisResponse, Vec<String>> {
    let payload: ChatAnalysisPayload = decode(value)?;
    let mut issues = Issues::default();

    issues.non_empty("reply", &payload.reply);
    let use_cases: Vec<UseCase> =
        issues.items(payload.use_cases.as_deref().unwrap_or_default(), "useCases");
    for (i, use_case) in use_cases.iter().enumerate() {
        check_use_case(&mut issues, use_case, &format!("useCases[{i}]"));
    }

    issues.finish(ChatAnalysisResponse { reply: payload.reply, use_cases })
}

/// Validate a requirements extraction payload.
pub fn validate_requirements_analysis(
    value: &Value,
) -> Result<RequirementsAnalysisResponse, Vec<String>> {
    let payload: RequirementsPayload = decode(value)?;
    let mut issues = Issues::default();

    issues.non_empty("reply", &payload.reply);

    let stakeholders = payload.stakeholders.map(|items| {
        let parsed: Vec<StakeholderPayload> = issues.items(&items, "stakeholders");
        for (i, s) in parsed.iter().enumerate() {
            issues.non_empty(&format!("stakeholders[{i}].id"), &s.id);
            issues.non_empty(&format!("stakeholders[{i}].name"), &s.name);
        }
        parsed.into_iter().map(Stakeholder::from).collect()
    });

    let constraints = payload.constraints.map(|items| {
        let parsed: Vec<Constraint> = issues.items(&items, "constraints");
        for (i, c) in parsed.iter().enumerate() {
            issues.non_empty(&format!("constraints[{i}].id"), &c.id);
            issues.non_empty(&format!("constraints[{i}].description"), &c.description);
        }
        parsed
    });

    let functional_requirements = payload.functional_requirements.map(|items| {
        let parsed: Vec<FunctionalRequirementPayload> = issues.items(&items, "functionalRequirements");
        for (i, r) in parsed.iter().enumerate() {
            issues.non_empty(&format!("functionalRequirements[{i}].id"), &r.id);
            issues.non_empty(&format!("functionalRequirements[{i}].title"), &r.title);
        }
        parsed.into_iter().map(FunctionalRequirement::from).collect()
    });

    let quality_requirements = payload.quality_requirements.map(|items| {
        let parsed: Vec<QualityRequirement> = issues.items(&items, "qualityRequirements");
        for (i, q) in parsed.iter().enumerate() {
            issues.non_empty(&format!("qualityRequirements[{i}].id"), &q.id);
            issues.non_empty(&format!("qualityRequirements[{i}].description"), &q.description);
        }
        parsed
    });

    issues.finish(RequirementsAnalysisResponse {
        reply: payload.reply,
        update: RequirementsUpdate {
            project_purpose: payload.project_purpose,
            stakeholders,
            constraints,
            functional_requirements,
            quality_requirements,
        },
    })
}

fn check_use_case(issues: &mut Issues, use_case: &UseCase, path: &str) {
    issues.non_empty(&format!("{path}.id"), &use_case.id);
    issues.non_empty(&format!("{path}.title"), &use_case.title);
    if use_case.narrative.chars().count() < MIN_NARRATIVE_CHARS {
        issues.push(
            &format!("{path}.narrative"),
            format!("must be at least {MIN_NARRATIVE_CHARS} characters"),
        );
    }
    if use_case.actors.is_empty() {
        issues.push(&format!("{path}.actors"), "must contain at least 1 item(s)");
    }
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, Vec<String>> {
    T::deserialize(value).map_err(|e| vec![format!("$: {e}")])
}

#[derive(Debug, Default)]
struct Issues(Vec<String>);

impl Issues {
    fn push(&mut self, path: &str, message: impl std::fmt::Display) {
        self.0.push(format!("{path}: {message}"));
    }

    fn non_empty(&mut self, path: &str, value: &str) {
        if value.is_empty() {
            self.push(path, "must not be empty");
        }
    }

    /// Deserialize each element, recording failures under `path[i]`.
    fn items<T: DeserializeOwned>(&mut self, values: &[Value], path: &str) -> Vec<T> {
        values
            .iter()
            .enumerate()
            .filter_map(|(i, value)| match T::deserialize(value) {
                Ok(item) => Some(item),
                Err(e) => {
                    self.push(&format!("{path}[{i}]"), e);
                    None
                }
            })
            .collect()
    }

    fn finish<T>(self, value: T) -> Result<T, Vec<String>> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::workflow::documents::ConstraintType;

    #[test]
    fn test_valid_chat_analysis() {
        let value = json!({
            "reply": "X",
            "useCases": [{"id": "1", "title": "T", "narrative": "0123456789", "actors": ["A"]}]
        });
        let parsed = validate_chat_analysis(&value).unwrap();
        assert_eq!(parsed.reply, "X");
        assert_eq!(parsed.use_cases.len(), 1);
        assert_eq!(parsed.use_cases[0].title, "T");
    }

    #[test]
    fn test_use_cases_default_to_empty() {
        let parsed = validate_chat_analysis(&json!({"reply": "Tell me more"})).unwrap();
        assert!(parsed.use_cases.is_empty());

        let parsed = validate_chat_analysis(&json!({"reply": "Tell me more", "useCases": null})).unwrap();
        assert!(parsed.use_cases.is_empty());
    }

    #[test]
    fn test_short_narrative_rejected() {
        let value = json!({
            "reply": "X",
            "useCases": [{"id": "1", "title": "T", "narrative": "012345678", "actors": ["A"]}]
        });
        let issues = validate_chat_analysis(&value).unwrap_err();
        assert_eq!(issues, vec!["useCases[0].narrative: must be at least 10 characters"]);
    }

    #[test]
    fn test_narrative_length_counts_whitespace() {
        let value = json!({
            "reply": "X",
            "useCases": [{"id": "1", "title": "T", "narrative": "  pay now ", "actors": [""]}]
        });
        let parsed = validate_chat_analysis(&value).unwrap();
        assert_eq!(parsed.use_cases[0].narrative, "  pay now ");
        assert_eq!(parsed.use_cases[0].actors, vec![String::new()]);
    }

    #[test]
    fn test_collects_every_issue() {
        let value = json!({
            "reply": "",
            "useCases": [
                {"id": "", "title": "T", "narrative": "long enough text", "actors": []},
                {"id": "2", "title": "T"}
            ]
        });
        let issues = validate_chat_analysis(&value).unwrap_err();
        assert!(issues.contains(&"reply: must not be empty".to_string()));
        assert!(issues.contains(&"useCases[0].id: must not be empty".to_string()));
        assert!(issues.contains(&"useCases[0].actors: must contain at least 1 item(s)".to_string()));
        assert!(issues.iter().any(|i| i.starts_with("useCases[1]: missing field")));
    }

    #[test]
    fn test_non_object_root() {
        let issues = validate_chat_analysis(&json!("just text")).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].starts_with("$: invalid type"), "{issues:?}");
    }

    #[test]
    fn test_missing_reply() {
        let issues = validate_chat_analysis(&json!({"useCases": []})).unwrap_err();
        assert_eq!(issues, vec!["$: missing field `reply`"]);
    }

    #[test]
    fn test_requirements_partial_update() {
        let value = json!({
            "reply": "Noted",
            "constraints": [{"id": "c1", "type": "regulatory", "description": "GDPR"}],
            "functionalRequirements": [{"id": "fr1", "title": "Login", "priority": "high"}],
            "stakeholders": [{"id": "s1", "name": "Owner"}]
        });
        let parsed = validate_requirements_analysis(&value).unwrap();
        assert!(parsed.update.project_purpose.is_none());
        assert!(parsed.update.quality_requirements.is_none());
        assert_eq!(parsed.update.constraints.unwrap()[0].kind, ConstraintType::Regulatory);

        let functional = parsed.update.functional_requirements.unwrap();
        assert_eq!(functional[0].priority, Priority::High);
        assert_eq!(functional[0].description, "");

        let stakeholders = parsed.update.stakeholders.unwrap();
        assert_eq!(stakeholders[0].role, "");
        assert!(stakeholders[0].interests.is_empty());
    }

    #[test]
    fn test_requirements_bad_enum() {
        let value = json!({
            "reply": "Noted",
            "qualityRequirements": [{"id": "q1", "category": "speed", "description": "fast"}]
        });
        let issues = validate_requirements_analysis(&value).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].starts_with("qualityRequirements[0]: unknown variant `speed`"), "{issues:?}");
    }

    #[test]
    fn test_requirements_empty_fields() {
        let value = json!({
            "reply": "Noted",
            "constraints": [{"id": "c1", "type": "business", "description": ""}],
            "functionalRequirements": [{"id": "", "title": "Login", "priority": "low"}]
        });
        let issues = validate_requirements_analysis(&value).unwrap_err();
        assert_eq!(
            issues,
            vec![
                "constraints[0].description: must not be empty",
                "functionalRequirements[0].id: must not be empty",
            ]
        );
    }
}
