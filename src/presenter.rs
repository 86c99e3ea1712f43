//! Result presenter — what the user sees once a submission finishes.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::config::PlannerConfig;
use crate::error::ArtifactError;
use crate::pipeline::{ArtifactHandle, ErrorKind, PipelineOutcome, Stage};
use crate::wizard::prompts::screen;
use crate::wizard::state::WizardStep;

/// Shown when the failure carries no message of its own.
const FALLBACK_ERROR_MESSAGE: &str = "Erro de conexão com o servidor";

const SUPPORT_SUBJECT: &str = "Erro na geração de cronograma";

/// View model for the result screens.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResultView {
    Ready(SuccessView),
    Failed(FailureView),
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessView {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub artifact_id: Uuid,
    pub bytes: usize,
    /// Fixed name the document is downloaded under.
    pub file_name: String,
    /// Embeddable preview source; `None` once the artifact is released.
    pub preview_source: Option<String>,
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    handle: ArtifactHandle,
}

impl SuccessView {
    pub fn handle(&self) -> &ArtifactHandle {
        &self.handle
    }

    /// Copy the document into `dir` under the download file name.
    pub async fn save_to(&self, dir: &Path) -> Result<PathBuf, ArtifactError> {
        self.handle.save_as(dir, &self.file_name).await
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureView {
    pub title: &'static str,
    pub explanation: &'static str,
    /// The underlying error, verbatim.
    pub message: String,
    pub stage: Stage,
    pub kind: ErrorKind,
    pub retry_available: bool,
    /// `mailto:` link for out-of-band support.
    pub support_link: String,
}

/// Turns pipeline outcomes into result views.
#[derive(Debug, Clone)]
pub struct ResultPresenter {
    download_file_name: String,
    support_email: String,
}

impl ResultPresenter {
    pub fn new(config: &PlannerConfig) -> Self {
        Self {
            download_file_name: config.download_file_name.clone(),
            support_email: config.support_email.clone(),
        }
    }

    pub fn present(&self, outcome: &PipelineOutcome) -> ResultView {
        match outcome {
            PipelineOutcome::Success(handle) => {
                let copy = screen(WizardStep::Success);
                ResultView::Ready(SuccessView {
                    title: copy.title,
                    subtitle: copy.subtitle.unwrap_or_default(),
                    artifact_id: handle.id(),
                    bytes: handle.len(),
                    file_name: self.download_file_name.clone(),
                    preview_source: handle.preview_source().ok(),
                    source_url: handle.source_url().map(String::from),
                    created_at: handle.created_at(),
                    handle: handle.clone(),
                })
            }
            PipelineOutcome::Failure(info) => {
                let copy = screen(WizardStep::Error);
                let message = if info.message.trim().is_empty() {
                    FALLBACK_ERROR_MESSAGE.to_string()
                } else {
                    info.message.clone()
                };
                ResultView::Failed(FailureView {
                    title: copy.title,
                    explanation: copy.subtitle.unwrap_or_default(),
                    message,
                    stage: info.stage,
                    kind: info.kind,
                    retry_available: true,
                    support_link: self.support_link(),
                })
            }
        }
    }

    pub fn download_file_name(&self) -> &str {
        &self.download_file_name
    }

    fn support_link(&self) -> String {
        let address = format!("mailto:{}", self.support_email);
        match reqwest::Url::parse(&address) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("subject", SUPPORT_SUBJECT);
                url.to_string()
            }
            Err(e) => {
                warn!(email = %self.support_email, error = %e, "Support address is not a valid mailto URL");
                address
            }
        }
    }
}
