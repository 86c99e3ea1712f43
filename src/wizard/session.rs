//! Wizard session — one user's trip through the steps.
//!
//! The session is the single owner of the form state. Screens never touch
//! the form directly; they send a [`FormPatch`] through
//! [`WizardSession::update`] and move with `start`/`forward`/`back`/`retry`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::WizardError;
use crate::pipeline::SubmissionPipeline;
use crate::presenter::{ResultPresenter, ResultView};

use super::model::{FormPatch, FormState, Weekday, is_valid_daily_hours, normalize_phone};
use super::state::{Transition, WizardEvent, WizardStep};

/// Snapshot of a session, as exposed to surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub step: WizardStep,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_percent: Option<u8>,
    pub form: FormState,
    pub selected_days: Vec<Weekday>,
    pub submitting: bool,
    pub attempts: u32,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub can_retry: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultView>,
}

/// Clears the in-flight flag however the submission ends, including when
/// the future is dropped mid-flight.
struct SubmittingGuard(Arc<AtomicBool>);

impl SubmittingGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, WizardError> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| WizardError::SubmissionInFlight)?;
        Ok(Self(Arc::clone(flag)))
    }
}

impl Drop for SubmittingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct WizardSession {
    id: Uuid,
    step: WizardStep,
    form: FormState,
    selected_days: Vec<Weekday>,
    submitting: Arc<AtomicBool>,
    attempts: u32,
    result: Option<ResultView>,
    pipeline: SubmissionPipeline,
    presenter: ResultPresenter,
}

impl WizardSession {
    pub fn new(pipeline: SubmissionPipeline, presenter: ResultPresenter) -> Self {
        let form = FormState::default();
        let selected_days = Weekday::default_selection(form.weekly_days);
        Self {
            id: Uuid::new_v4(),
            step: WizardStep::default(),
            form,
            selected_days,
            submitting: Arc::new(AtomicBool::new(false)),
            attempts: 0,
            result: None,
            pipeline,
            presenter,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn selected_days(&self) -> &[Weekday] {
        &self.selected_days
    }

    pub fn result(&self) -> Option<&ResultView> {
        self.result.as_ref()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn pipeline(&self) -> &SubmissionPipeline {
        &self.pipeline
    }

    pub fn presenter(&self) -> &ResultPresenter {
        &self.presenter
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    /// Shared in-flight flag, readable without holding the session.
    pub fn submitting_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.submitting)
    }

    /// Merge a partial form update.
    ///
    /// Input is only accepted while the user is still filling the form, so
    /// a retry always resubmits exactly what was collected.
    pub fn update(&mut self, patch: FormPatch) -> Result<(), WizardError> {
        if !(self.step == WizardStep::Intro || self.step.is_input_step()) {
            return Err(WizardError::FormLocked { step: self.step });
        }
        if let Some(days) = patch.weekly_days {
            self.selected_days = Weekday::default_selection(days);
        }
        self.form.apply(patch);
        Ok(())
    }

    /// Pick the concrete study days; the count becomes `weekly_days`.
    pub fn select_days(&mut self, days: &[Weekday]) -> Result<(), WizardError> {
        if !(self.step == WizardStep::Intro || self.step.is_input_step()) {
            return Err(WizardError::FormLocked { step: self.step });
        }
        let mut days = days.to_vec();
        days.sort();
        days.dedup();
        self.form.weekly_days = days.len() as u8;
        self.selected_days = days;
        Ok(())
    }

    /// Toggle one study day on or off.
    pub fn toggle_day(&mut self, day: Weekday) -> Result<(), WizardError> {
        let mut days = self.selected_days.clone();
        match days.iter().position(|d| *d == day) {
            Some(index) => {
                days.remove(index);
            }
            None => days.push(day),
        }
        self.select_days(&days)
    }

    pub fn start(&mut self) -> Result<WizardStep, WizardError> {
        self.ensure_idle()?;
        match self.accept(WizardEvent::Start)? {
            Transition::To(next) => Ok(self.move_to(next)),
            Transition::Submit => Ok(self.step),
        }
    }

    pub fn back(&mut self) -> Result<WizardStep, WizardError> {
        self.ensure_idle()?;
        match self.accept(WizardEvent::Back)? {
            Transition::To(next) => Ok(self.move_to(next)),
            Transition::Submit => Ok(self.step),
        }
    }

    /// Advance past the current step, validating it first. From the
    /// objective step the whole form is checked again, since earlier
    /// answers may have been patched since, and then submitted.
    pub async fn forward(&mut self) -> Result<WizardStep, WizardError> {
        self.ensure_idle()?;
        let transition = self.accept(WizardEvent::Forward)?;

        let problems = match transition {
            Transition::Submit => form_problems(&self.form, &self.selected_days),
            Transition::To(_) => step_problems(self.step, &self.form, &self.selected_days),
        };
        if !problems.is_empty() {
            return Err(WizardError::StepInvalid {
                step: self.step,
                problems,
            });
        }

        match transition {
            Transition::To(next) => Ok(self.move_to(next)),
            Transition::Submit => self.submit().await,
        }
    }

    /// Resubmit the already-collected form after a failure.
    pub async fn retry(&mut self) -> Result<WizardStep, WizardError> {
        self.ensure_idle()?;
        match self.accept(WizardEvent::Retry)? {
            Transition::Submit => self.submit().await,
            Transition::To(next) => Ok(self.move_to(next)),
        }
    }

    pub fn status(&self) -> SessionStatus {
        let submitting = self.is_submitting();
        SessionStatus {
            session_id: self.id,
            step: self.step,
            progress_percent: self.step.progress_percent(),
            form: self.form.clone(),
            selected_days: self.selected_days.clone(),
            submitting,
            attempts: self.attempts,
            can_go_back: !submitting && self.step.accepts(WizardEvent::Back),
            can_go_forward: !submitting && self.step.accepts(WizardEvent::Forward),
            can_retry: !submitting && self.step.accepts(WizardEvent::Retry),
            result: self.result.clone(),
        }
    }

    async fn submit(&mut self) -> Result<WizardStep, WizardError> {
        let _guard = SubmittingGuard::acquire(&self.submitting)?;
        self.attempts += 1;
        info!(session = %self.id, attempt = self.attempts, "Submitting study preferences");

        let outcome = self.pipeline.run(&self.form).await;
        self.result = Some(self.presenter.present(&outcome));
        let next = if outcome.is_success() {
            WizardStep::Success
        } else {
            WizardStep::Error
        };
        Ok(self.move_to(next))
    }

    fn accept(&self, event: WizardEvent) -> Result<Transition, WizardError> {
        self.step
            .transition(event)
            .ok_or(WizardError::InvalidTransition {
                step: self.step,
                event,
            })
    }

    fn move_to(&mut self, next: WizardStep) -> WizardStep {
        debug!(session = %self.id, from = %self.step, to = %next, "Wizard step change");
        self.step = next;
        next
    }

    fn ensure_idle(&self) -> Result<(), WizardError> {
        if self.is_submitting() {
            return Err(WizardError::SubmissionInFlight);
        }
        Ok(())
    }
}

/// Problems that keep the user on `step`.
pub fn step_problems(step: WizardStep, form: &FormState, selected_days: &[Weekday]) -> Vec<String> {
    let mut problems = Vec::new();
    match step {
        WizardStep::PersonalInfo => {
            if form.name.trim().is_empty() {
                problems.push("Nome é obrigatório".to_string());
            }
            let phone = normalize_phone(&form.phone);
            if phone.is_empty() {
                problems.push("Telefone é obrigatório".to_string());
            } else if !(10..=15).contains(&phone.len()) {
                problems.push("Telefone inválido. Use o formato: 552199999999".to_string());
            }
        }
        WizardStep::Schedule => {
            if selected_days.is_empty() || form.weekly_days == 0 {
                problems.push("Selecione pelo menos um dia da semana".to_string());
            } else if !(1..=7).contains(&form.weekly_days)
                || usize::from(form.weekly_days) != selected_days.len()
            {
                problems.push(format!(
                    "Dias por semana inválidos: {} (selecionados: {})",
                    form.weekly_days,
                    selected_days.len()
                ));
            }
            if !is_valid_daily_hours(form.daily_hours) {
                problems.push("Escolha entre 30 minutos e 8 horas por dia".to_string());
            }
        }
        _ => {}
    }
    problems
}

/// Everything that must hold before the form is submitted.
pub fn form_problems(form: &FormState, selected_days: &[Weekday]) -> Vec<String> {
    let mut problems = step_problems(WizardStep::PersonalInfo, form, selected_days);
    problems.extend(step_problems(WizardStep::Schedule, form, selected_days));
    if problems.is_empty() {
        problems = form.structural_problems();
    }
    problems
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;
    use crate::config::PlannerConfig;
    use crate::error::PipelineError;
    use crate::pipeline::types::RawResponse;
    use crate::pipeline::{ScheduleService, SubmissionRequest};
    use crate::wizard::model::{KnowledgeLevel, Objective};

    /// Fails the first `failures` submissions, then succeeds.
    struct FlakyService {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ScheduleService for FlakyService {
        async fn submit(&self, _request: &SubmissionRequest) -> Result<RawResponse, PipelineError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(PipelineError::Service {
                    status: Some(500),
                    body: String::new(),
                });
            }
            Ok(RawResponse {
                content_type: Some("application/json".into()),
                body: br#"{"url": "https://host/file.pdf"}"#.to_vec(),
            })
        }

        async fn fetch_artifact(&self, _url: &str) -> Result<Vec<u8>, PipelineError> {
            Ok(b"%PDF-1.4".to_vec())
        }
    }

    fn session(failures: usize, dir: &tempfile::TempDir) -> WizardSession {
        let config = PlannerConfig {
            artifact_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let service = Arc::new(FlakyService {
            failures,
            calls: AtomicUsize::new(0),
        });
        WizardSession::new(
            SubmissionPipeline::new(service, &config),
            ResultPresenter::new(&config),
        )
    }

    async fn fill_until_objective(session: &mut WizardSession) {
        session.start().unwrap();
        session
            .update(FormPatch {
                name: Some("Ana".into()),
                phone: Some("+55 (21) 99999-8888".into()),
                ..Default::default()
            })
            .unwrap();
        session.forward().await.unwrap();
        session.forward().await.unwrap();
        session
            .update(FormPatch {
                knowledge_level: Some(KnowledgeLevel::Intermediate),
                ..Default::default()
            })
            .unwrap();
        session.forward().await.unwrap();
        assert_eq!(session.step(), WizardStep::Objective);
    }

    #[tokio::test]
    async fn happy_path_reaches_success() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(0, &dir);
        fill_until_objective(&mut session).await;
        session
            .update(FormPatch {
                objective: Some(Objective::Money),
                ..Default::default()
            })
            .unwrap();

        let step = session.forward().await.unwrap();
        assert_eq!(step, WizardStep::Success);
        assert!(matches!(session.result(), Some(ResultView::Ready(_))));
        assert_eq!(session.attempts(), 1);
        assert!(!session.is_submitting());
    }

    #[tokio::test]
    async fn personal_info_is_validated_before_moving() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(0, &dir);
        session.start().unwrap();

        let err = session.forward().await.unwrap_err();
        match err {
            WizardError::StepInvalid { step, problems } => {
                assert_eq!(step, WizardStep::PersonalInfo);
                assert!(problems.contains(&"Nome é obrigatório".to_string()));
                assert!(problems.contains(&"Telefone é obrigatório".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(session.step(), WizardStep::PersonalInfo);

        session
            .update(FormPatch {
                name: Some("Ana".into()),
                phone: Some("12345".into()),
                ..Default::default()
            })
            .unwrap();
        let err = session.forward().await.unwrap_err();
        assert!(err.to_string().contains("Telefone inválido"));
    }

    #[tokio::test]
    async fn schedule_requires_a_day() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(0, &dir);
        session.start().unwrap();
        session
            .update(FormPatch {
                name: Some("Ana".into()),
                phone: Some("5521999998888".into()),
                ..Default::default()
            })
            .unwrap();
        session.forward().await.unwrap();

        session.select_days(&[]).unwrap();
        assert!(matches!(
            session.forward().await,
            Err(WizardError::StepInvalid { .. })
        ));

        session.toggle_day(Weekday::Saturday).unwrap();
        session.toggle_day(Weekday::Sunday).unwrap();
        assert_eq!(session.form().weekly_days, 2);
        assert_eq!(session.selected_days(), &[Weekday::Sunday, Weekday::Saturday]);
        assert_eq!(session.forward().await.unwrap(), WizardStep::Knowledge);
    }

    /// Patches an earlier answer from the objective step, checks the form is
    /// not submitted, then repairs it and submits.
    async fn assert_submit_gated(bad: FormPatch, repair: FormPatch, expected: &str) {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(0, &dir);
        fill_until_objective(&mut session).await;
        session.update(bad).unwrap();

        match session.forward().await.unwrap_err() {
            WizardError::StepInvalid { step, problems } => {
                assert_eq!(step, WizardStep::Objective);
                assert!(
                    problems.iter().any(|p| p.contains(expected)),
                    "{problems:?}"
                );
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(session.step(), WizardStep::Objective);
        assert_eq!(session.attempts(), 0);
        assert!(session.result().is_none());

        session.update(repair).unwrap();
        assert_eq!(session.forward().await.unwrap(), WizardStep::Success);
        assert_eq!(session.attempts(), 1);
    }

    #[tokio::test]
    async fn out_of_range_hours_are_caught_before_submission() {
        assert_submit_gated(
            FormPatch {
                daily_hours: Some(100.0),
                ..Default::default()
            },
            FormPatch {
                daily_hours: Some(2.0),
                ..Default::default()
            },
            "Escolha entre 30 minutos e 8 horas",
        )
        .await;
    }

    #[tokio::test]
    async fn blank_name_is_caught_before_submission() {
        assert_submit_gated(
            FormPatch {
                name: Some("   ".into()),
                ..Default::default()
            },
            FormPatch {
                name: Some("Ana".into()),
                ..Default::default()
            },
            "Nome é obrigatório",
        )
        .await;
    }

    #[tokio::test]
    async fn nine_weekly_days_are_caught_before_submission() {
        assert_submit_gated(
            FormPatch {
                weekly_days: Some(9),
                ..Default::default()
            },
            FormPatch {
                weekly_days: Some(4),
                ..Default::default()
            },
            "Dias por semana inválidos: 9",
        )
        .await;
    }

    #[test]
    fn schedule_rejects_count_that_disagrees_with_selection() {
        let form = FormState {
            weekly_days: 3,
            ..Default::default()
        };
        let problems = step_problems(
            WizardStep::Schedule,
            &form,
            &[Weekday::Monday, Weekday::Tuesday],
        );
        assert_eq!(problems, vec!["Dias por semana inválidos: 3 (selecionados: 2)"]);

        let form = FormState {
            name: "Ana".into(),
            phone: "5521999998888".into(),
            weekly_days: 2,
            ..Default::default()
        };
        assert!(form_problems(&form, &[Weekday::Monday, Weekday::Tuesday]).is_empty());
    }

    #[tokio::test]
    async fn back_and_invalid_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(0, &dir);

        assert!(matches!(
            session.forward().await,
            Err(WizardError::InvalidTransition {
                step: WizardStep::Intro,
                event: WizardEvent::Forward
            })
        ));
        assert_eq!(session.step(), WizardStep::Intro);

        fill_until_objective(&mut session).await;
        assert_eq!(session.back().unwrap(), WizardStep::Knowledge);
        assert_eq!(session.back().unwrap(), WizardStep::Schedule);
        assert_eq!(session.back().unwrap(), WizardStep::PersonalInfo);
        assert!(session.back().is_err());
        assert_eq!(session.step(), WizardStep::PersonalInfo);
        assert!(session.retry().await.is_err());
    }

    #[tokio::test]
    async fn retry_after_failure_resubmits_same_form() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(1, &dir);
        fill_until_objective(&mut session).await;

        assert_eq!(session.forward().await.unwrap(), WizardStep::Error);
        let status = session.status();
        assert!(status.can_retry);
        assert!(!status.can_go_forward);
        let Some(ResultView::Failed(failure)) = session.result() else {
            panic!("expected failure view");
        };
        assert_eq!(failure.message, "Server responded with 500");

        let before = session.form().clone();
        assert!(matches!(
            session.update(FormPatch {
                name: Some("Outra".into()),
                ..Default::default()
            }),
            Err(WizardError::FormLocked { .. })
        ));

        assert_eq!(session.retry().await.unwrap(), WizardStep::Success);
        assert_eq!(session.form(), &before);
        assert_eq!(session.attempts(), 2);
        assert!(session.status().result.is_some());
    }

    #[tokio::test]
    async fn success_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(0, &dir);
        fill_until_objective(&mut session).await;
        session.forward().await.unwrap();

        assert!(session.forward().await.is_err());
        assert!(session.retry().await.is_err());
        assert!(session.back().is_err());
        assert_eq!(session.step(), WizardStep::Success);
        assert_eq!(session.attempts(), 1);
    }

    #[test]
    fn in_flight_flag_blocks_triggers() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(0, &dir);
        let flag = session.submitting_flag();
        let guard = SubmittingGuard::acquire(&flag).unwrap();

        assert!(session.is_submitting());
        assert!(matches!(session.start(), Err(WizardError::SubmissionInFlight)));
        assert!(matches!(
            SubmittingGuard::acquire(&flag),
            Err(WizardError::SubmissionInFlight)
        ));
        let status = session.status();
        assert!(status.submitting);
        assert!(!status.can_retry);

        drop(guard);
        assert!(!session.is_submitting());
        assert_eq!(session.start().unwrap(), WizardStep::PersonalInfo);
    }
}
