//! Shared types for the submission pipeline.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::wizard::model::FormState;

use super::artifact::ArtifactHandle;

// ── Outbound request ────────────────────────────────────────────────

/// Body posted to the schedule service.
///
/// Built fresh for every attempt from an immutable [`FormState`] snapshot.
/// There is no phone field: the contact number never leaves the wizard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRequest {
    pub name: String,
    pub daily_hours: f64,
    pub weekly_days: u8,
    pub knowledge_level: String,
    pub program_format: String,
    pub objective: String,
    /// Name of the document being generated. Sent only when it replaces
    /// `objective`.
    #[serde(skip)]
    pub label: String,
}

impl SubmissionRequest {
    pub fn from_form(form: &FormState, label_as_objective: bool) -> Self {
        let name = form.name.trim().to_string();
        let label = artifact_label(&name);
        let objective = if label_as_objective {
            label.clone()
        } else {
            form.objective.wire_value().to_string()
        };
        Self {
            name,
            daily_hours: form.daily_hours,
            weekly_days: form.weekly_days,
            knowledge_level: form.knowledge_level.wire_value().to_string(),
            program_format: form.program_format.wire_value().to_string(),
            objective,
            label,
        }
    }
}

/// Label naming the generated document for a given person.
pub fn artifact_label(name: &str) -> String {
    format!("Cronograma de Estudo - {name}")
}

// ── Inbound response ────────────────────────────────────────────────

/// Raw submission response, before interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// What the submission response points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLocator {
    /// Document to be fetched with a `GET`.
    Remote(String),
    /// The response already was the document.
    Inline(Vec<u8>),
}

// ── Outcome ─────────────────────────────────────────────────────────

/// Pipeline stage, for error attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    Submission,
    Interpretation,
    ArtifactFetch,
    Materialization,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Submission => "submission",
            Self::Interpretation => "interpretation",
            Self::ArtifactFetch => "artifact_fetch",
            Self::Materialization => "materialization",
        };
        write!(f, "{s}")
    }
}

/// Error taxonomy surfaced to the presenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Service,
    MalformedResponse,
    ArtifactFetch,
    Materialization,
    Timeout,
}

/// Failure details carried by [`PipelineOutcome::Failure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&PipelineError> for ErrorInfo {
    fn from(err: &PipelineError) -> Self {
        Self {
            stage: err.stage(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result of one pipeline run. Exactly one per run.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    Success(ArtifactHandle),
    Failure(ErrorInfo),
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn artifact(&self) -> Option<&ArtifactHandle> {
        match self {
            Self::Success(handle) => Some(handle),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            Self::Success(_) => None,
            Self::Failure(info) => Some(info),
        }
    }
}

impl From<Result<ArtifactHandle, PipelineError>> for PipelineOutcome {
    fn from(result: Result<ArtifactHandle, PipelineError>) -> Self {
        match result {
            Ok(handle) => Self::Success(handle),
            Err(err) => Self::Failure(ErrorInfo::from(&err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::model::{KnowledgeLevel, Objective};

    fn form() -> FormState {
        FormState {
            name: " Ana Souza ".into(),
            phone: "5521999998888".into(),
            daily_hours: 2.5,
            weekly_days: 3,
            knowledge_level: KnowledgeLevel::Advanced,
            objective: Objective::Money,
            ..Default::default()
        }
    }

    #[test]
    fn request_body_has_exactly_the_contract_fields() {
        let request = SubmissionRequest::from_form(&form(), false);
        let json = serde_json::to_value(&request).unwrap();
        let obj = json.as_object().unwrap();

        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(
            keys,
            ["daily_hours", "knowledge_level", "name", "objective", "program_format", "weekly_days"]
        );
        assert_eq!(json["name"], "Ana Souza");
        assert_eq!(json["daily_hours"], 2.5);
        assert_eq!(json["weekly_days"], 3);
        assert_eq!(json["knowledge_level"], "Avançado");
        assert_eq!(json["program_format"], "default");
        assert_eq!(json["objective"], "Dinheiro");
        assert!(!json.to_string().contains("5521999998888"));
    }

    #[test]
    fn label_can_replace_objective() {
        let request = SubmissionRequest::from_form(&form(), true);
        assert_eq!(request.label, "Cronograma de Estudo - Ana Souza");
        assert_eq!(request.objective, request.label);
    }

    #[test]
    fn error_info_from_pipeline_error() {
        let err = PipelineError::MalformedResponse {
            reason: "no locator".into(),
        };
        let info = ErrorInfo::from(&err);
        assert_eq!(info.stage, Stage::Interpretation);
        assert_eq!(info.kind, ErrorKind::MalformedResponse);
        assert!(info.message.contains("no locator"));
    }

    #[test]
    fn stage_display_matches_serde() {
        for stage in [
            Stage::Validation,
            Stage::Submission,
            Stage::Interpretation,
            Stage::ArtifactFetch,
            Stage::Materialization,
        ] {
            assert_eq!(
                format!("\"{stage}\""),
                serde_json::to_string(&stage).unwrap()
            );
        }
    }
}
