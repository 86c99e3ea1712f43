//! Submission pipeline — turns a completed form into a local document.
//!
//! Flow:
//! 1. Structural validation
//! 2. Build the request (phone excluded)
//! 3. Submit to the schedule service
//! 4. Interpret the response (JSON locator, link fallback, inline PDF)
//! 5. Fetch the document
//! 6. Materialize it, install it, release the previous one
//!
//! Every failure short-circuits into a single [`PipelineOutcome::Failure`].
//! Nothing is retried here; retries are user-initiated and rerun the whole
//! flow.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::PlannerConfig;
use crate::error::PipelineError;
use crate::wizard::model::FormState;

use super::artifact::{ArtifactHandle, ArtifactStore};
use super::client::ScheduleService;
use super::response::interpret;
use super::types::{ArtifactLocator, PipelineOutcome, SubmissionRequest};

pub struct SubmissionPipeline {
    service: Arc<dyn ScheduleService>,
    artifacts: ArtifactStore,
    label_as_objective: bool,
}

impl SubmissionPipeline {
    pub fn new(service: Arc<dyn ScheduleService>, config: &PlannerConfig) -> Self {
        Self {
            service,
            artifacts: ArtifactStore::new(config.artifact_dir.clone()),
            label_as_objective: config.label_as_objective,
        }
    }

    /// Run one attempt. Always yields exactly one outcome.
    pub async fn run(&self, form: &FormState) -> PipelineOutcome {
        let outcome = PipelineOutcome::from(self.attempt(form).await);
        match &outcome {
            PipelineOutcome::Success(handle) => info!(
                artifact = %handle.id(),
                bytes = handle.len(),
                "Study schedule generated"
            ),
            PipelineOutcome::Failure(info) => warn!(
                stage = %info.stage,
                kind = ?info.kind,
                "Study schedule generation failed: {}",
                info.message
            ),
        }
        outcome
    }

    async fn attempt(&self, form: &FormState) -> Result<ArtifactHandle, PipelineError> {
        let problems = form.structural_problems();
        if !problems.is_empty() {
            return Err(PipelineError::Validation { problems });
        }

        let request = SubmissionRequest::from_form(form, self.label_as_objective);
        debug!(label = %request.label, "Submission request built");

        let response = self.service.submit(&request).await?;
        let (bytes, source_url) = match interpret(&response)? {
            ArtifactLocator::Remote(url) => {
                debug!(url = %url, "Service returned a document link");
                let bytes = self.service.fetch_artifact(&url).await?;
                (bytes, Some(url))
            }
            ArtifactLocator::Inline(bytes) => {
                debug!(bytes = bytes.len(), "Service returned the document inline");
                (bytes, None)
            }
        };

        let handle = self.artifacts.materialize(bytes, source_url).await?;
        self.artifacts.install(handle.clone());
        Ok(handle)
    }

    /// The artifact produced by the latest successful run, if still live.
    pub fn current_artifact(&self) -> Option<ArtifactHandle> {
        self.artifacts.current().filter(|h| !h.is_released())
    }

    /// Number of materialized documents whose files still exist.
    pub fn live_artifacts(&self) -> usize {
        self.artifacts.live_count()
    }

    /// Release the current artifact (e.g. when the session ends).
    pub fn release_artifact(&self) {
        self.artifacts.clear();
    }
}
