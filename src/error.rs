//! Error types for the study planner.

use std::time::Duration;

use crate::pipeline::types::{ErrorKind, Stage};
use crate::wizard::state::{WizardEvent, WizardStep};

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Step sequencer errors.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("Cannot apply {event} while on step {step}")]
    InvalidTransition { step: WizardStep, event: WizardEvent },

    #[error("Step {step} is incomplete: {}", problems.join("; "))]
    StepInvalid {
        step: WizardStep,
        problems: Vec<String>,
    },

    #[error("The form can no longer be edited on step {step}")]
    FormLocked { step: WizardStep },

    #[error("A submission is already in flight")]
    SubmissionInFlight,
}

/// Submission pipeline errors.
///
/// Every variant maps onto a [`Stage`] and an [`ErrorKind`], which is what
/// the result presenter surfaces.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid form: {}", problems.join("; "))]
    Validation { problems: Vec<String> },

    #[error("{}", service_message(*status, body))]
    Service { status: Option<u16>, body: String },

    #[error("Could not interpret the service response: {reason}")]
    MalformedResponse { reason: String },

    #[error("{}", fetch_message(*status, reason))]
    ArtifactFetch { status: Option<u16>, reason: String },

    #[error("Could not prepare the document: {0}")]
    Materialization(#[from] ArtifactError),

    #[error("{stage} timed out after {timeout:?}")]
    Timeout { stage: Stage, timeout: Duration },
}

impl PipelineError {
    /// The pipeline stage this error originated from.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Validation { .. } => Stage::Validation,
            Self::Service { .. } => Stage::Submission,
            Self::MalformedResponse { .. } => Stage::Interpretation,
            Self::ArtifactFetch { .. } => Stage::ArtifactFetch,
            Self::Materialization(_) => Stage::Materialization,
            Self::Timeout { stage, .. } => *stage,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Service { .. } => ErrorKind::Service,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::ArtifactFetch { .. } => ErrorKind::ArtifactFetch,
            Self::Materialization(_) => ErrorKind::Materialization,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }
}

fn service_message(status: Option<u16>, body: &str) -> String {
    match (status, body.trim()) {
        (Some(code), "") => format!("Server responded with {code}"),
        (Some(code), text) => format!("Server responded with {code}: {text}"),
        (None, text) => format!("Could not reach the server: {text}"),
    }
}

fn fetch_message(status: Option<u16>, reason: &str) -> String {
    match status {
        Some(code) => format!("Document download responded with {code}: {reason}"),
        None => format!("Could not download the document: {reason}"),
    }
}

/// Local artifact errors.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("The service returned an empty document")]
    Empty,

    #[error("Artifact {id} has already been released")]
    Released { id: uuid::Uuid },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the planner.
pub type Result<T> = std::result::Result<T, Error>;
