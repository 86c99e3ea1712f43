//! Terminal wizard — drives a [`WizardSession`] over stdin/stdout.

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

use crate::error::WizardError;
use crate::presenter::ResultView;
use crate::wizard::WizardSession;
use crate::wizard::model::{KnowledgeLevel, Objective, Weekday, format_hours, format_phone};
use crate::wizard::prompts::{
    Answer, Command, Field, Screen, knowledge_option, objective_option, parse_answer,
    parse_command, screen,
};
use crate::wizard::state::WizardStep;

enum Flow {
    Continue,
    Quit,
}

/// Line-oriented wizard over any async reader/writer pair.
pub struct TerminalWizard<R, W> {
    session: WizardSession,
    lines: Lines<R>,
    out: W,
}

impl<R, W> TerminalWizard<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(session: WizardSession, input: R, out: W) -> Self {
        Self {
            session,
            lines: input.lines(),
            out,
        }
    }

    pub fn session(&self) -> &WizardSession {
        &self.session
    }

    pub fn into_session(self) -> WizardSession {
        self.session
    }

    /// Run until the user quits or input ends.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            let step = self.session.step();
            let flow = match step {
                WizardStep::Intro => self.intro().await?,
                WizardStep::Success => self.success().await?,
                WizardStep::Error => self.failure().await?,
                _ => self.input_step(step).await?,
            };
            if let Flow::Quit = flow {
                break;
            }
        }
        self.say("Até logo!").await?;
        Ok(())
    }

    async fn intro(&mut self) -> anyhow::Result<Flow> {
        let copy = screen(WizardStep::Intro);
        self.header(&copy).await?;
        self.say("Pressione Enter para criar seu cronograma, ou digite 'sair'.")
            .await?;

        let Some(line) = self.read_line().await? else {
            return Ok(Flow::Quit);
        };
        if let Some(Command::Quit) = parse_command(&line) {
            return Ok(Flow::Quit);
        }
        self.session.start()?;
        Ok(Flow::Continue)
    }

    async fn input_step(&mut self, step: WizardStep) -> anyhow::Result<Flow> {
        let copy = screen(step);
        if let Some(percent) = step.progress_percent() {
            self.say(&format!("\n[{percent:>3}%]")).await?;
        }
        self.header(&copy).await?;
        self.say("(Enter mantém o valor atual, 'voltar' volta uma etapa, 'sair' encerra)")
            .await?;

        for field in copy.fields {
            loop {
                self.ask(*field).await?;
                let Some(line) = self.read_line().await? else {
                    return Ok(Flow::Quit);
                };

                if let Some(command) = parse_command(&line) {
                    match command {
                        Command::Quit => return Ok(Flow::Quit),
                        Command::Back => match self.session.back() {
                            Ok(_) => return Ok(Flow::Continue),
                            Err(e) => self.say(&format!("  ✗ {e}")).await?,
                        },
                        Command::Retry | Command::Save(_) => {
                            self.say("  ✗ Comando indisponível nesta etapa").await?
                        }
                    }
                    continue;
                }

                match parse_answer(*field, &line) {
                    Ok(Answer::Patch(patch)) => {
                        self.session.update(patch)?;
                        break;
                    }
                    Ok(Answer::Days(days)) => {
                        self.session.select_days(&days)?;
                        break;
                    }
                    Ok(Answer::Keep) => break,
                    Err(message) => self.say(&format!("  ✗ {message}")).await?,
                }
            }
        }

        if step == WizardStep::Objective {
            self.say("\nGerando seu cronograma...").await?;
        }
        match self.session.forward().await {
            Ok(_) => Ok(Flow::Continue),
            Err(WizardError::StepInvalid { problems, .. }) => {
                for problem in problems {
                    self.say(&format!("  ✗ {problem}")).await?;
                }
                Ok(Flow::Continue)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn success(&mut self) -> anyhow::Result<Flow> {
        let Some(ResultView::Ready(view)) = self.session.result().cloned() else {
            anyhow::bail!("success step without a generated document");
        };
        self.say(&format!("\n✓ {}", view.title)).await?;
        self.say(view.subtitle).await?;
        if let Some(preview) = &view.preview_source {
            self.say(&format!("  Visualizar: {preview}")).await?;
        }
        self.say(&format!("  Tamanho: {} bytes", view.bytes)).await?;
        self.say("Digite 'salvar [pasta]' para baixar o PDF, ou 'sair'.")
            .await?;

        loop {
            let Some(line) = self.read_line().await? else {
                return Ok(Flow::Quit);
            };
            match parse_command(&line) {
                Some(Command::Quit) => return Ok(Flow::Quit),
                Some(Command::Save(dir)) => {
                    let dir = match dir {
                        Some(dir) => dir,
                        None => std::env::current_dir().context("resolving current directory")?,
                    };
                    match view.save_to(&dir).await {
                        Ok(path) => self.say(&format!("  ✓ Salvo em {}", path.display())).await?,
                        Err(e) => self.say(&format!("  ✗ Não foi possível salvar: {e}")).await?,
                    }
                }
                _ => {
                    self.say("Digite 'salvar [pasta]' ou 'sair'.").await?;
                }
            }
        }
    }

    async fn failure(&mut self) -> anyhow::Result<Flow> {
        let Some(ResultView::Failed(view)) = self.session.result().cloned() else {
            anyhow::bail!("error step without a failure to show");
        };
        self.say(&format!("\n✗ {}", view.title)).await?;
        self.say(view.explanation).await?;
        self.say(&format!("  Erro: {}", view.message)).await?;
        self.say(&format!("  Suporte: {}", view.support_link)).await?;
        self.say("Digite 'tentar' para tentar novamente, ou 'sair'.")
            .await?;

        loop {
            let Some(line) = self.read_line().await? else {
                return Ok(Flow::Quit);
            };
            match parse_command(&line) {
                Some(Command::Quit) => return Ok(Flow::Quit),
                Some(Command::Retry) => {
                    self.say("\nGerando seu cronograma...").await?;
                    self.session.retry().await?;
                    return Ok(Flow::Continue);
                }
                _ => self.say("Digite 'tentar' ou 'sair'.").await?,
            }
        }
    }

    async fn header(&mut self, copy: &Screen) -> anyhow::Result<()> {
        self.say(&format!("\n{}", copy.title)).await?;
        if let Some(subtitle) = copy.subtitle {
            self.say(subtitle).await?;
        }
        Ok(())
    }

    async fn ask(&mut self, field: Field) -> anyhow::Result<()> {
        self.say(&format!("\n{}", field.question())).await?;
        match field {
            Field::StudyDays => {
                let options: Vec<String> = Weekday::ALL
                    .iter()
                    .enumerate()
                    .map(|(i, d)| format!("{}={}", i + 1, d.label()))
                    .collect();
                self.say(&format!("  {}", options.join("  "))).await?;
            }
            Field::KnowledgeLevel => {
                for (i, level) in KnowledgeLevel::ALL.iter().enumerate() {
                    let (title, description) = knowledge_option(*level);
                    self.say(&format!("  {}. {title} ({description})", i + 1))
                        .await?;
                }
            }
            Field::Objective => {
                for (i, objective) in Objective::ALL.iter().enumerate() {
                    let (title, description) = objective_option(*objective);
                    self.say(&format!("  {}. {title} ({description})", i + 1))
                        .await?;
                }
            }
            _ => {}
        }
        let current = self.current_value(field);
        if !current.is_empty() {
            self.say(&format!("  Atual: {current}")).await?;
        }
        Ok(())
    }

    fn current_value(&self, field: Field) -> String {
        let form = self.session.form();
        match field {
            Field::Name => form.name.clone(),
            Field::Phone => format_phone(&form.phone),
            Field::DailyHours => format_hours(form.daily_hours),
            Field::StudyDays => self
                .session
                .selected_days()
                .iter()
                .map(|d| d.label())
                .collect::<Vec<_>>()
                .join(", "),
            Field::KnowledgeLevel => knowledge_option(form.knowledge_level).0.to_string(),
            Field::Objective => objective_option(form.objective).0.to_string(),
        }
    }

    async fn read_line(&mut self) -> anyhow::Result<Option<String>> {
        self.out.write_all(b"> ").await?;
        self.out.flush().await?;
        let line = self.lines.next_line().await.context("reading input")?;
        Ok(line.map(|l| l.trim().to_string()))
    }

    async fn say(&mut self, text: &str) -> anyhow::Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        Ok(())
    }
}

/// Run the wizard on the process's stdin/stdout.
pub async fn run(session: WizardSession) -> anyhow::Result<()> {
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut wizard = TerminalWizard::new(session, input, tokio::io::stdout());
    wizard.run().await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::config::PlannerConfig;
    use crate::error::PipelineError;
    use crate::pipeline::types::RawResponse;
    use crate::pipeline::{ScheduleService, SubmissionPipeline, SubmissionRequest};
    use crate::presenter::ResultPresenter;

    struct ScriptedService {
        fail_first: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ScheduleService for ScriptedService {
        async fn submit(&self, _request: &SubmissionRequest) -> Result<RawResponse, PipelineError> {
            if self.fail_first && self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(PipelineError::Service {
                    status: Some(503),
                    body: "Service Unavailable".into(),
                });
            }
            Ok(RawResponse {
                content_type: Some("application/pdf".into()),
                body: b"%PDF-1.4 inline".to_vec(),
            })
        }

        async fn fetch_artifact(&self, _url: &str) -> Result<Vec<u8>, PipelineError> {
            unreachable!("inline responses skip the fetch")
        }
    }

    fn session(fail_first: bool, dir: &tempfile::TempDir) -> WizardSession {
        let config = PlannerConfig {
            artifact_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let service = Arc::new(ScriptedService {
            fail_first,
            calls: AtomicUsize::new(0),
        });
        WizardSession::new(
            SubmissionPipeline::new(service, &config),
            ResultPresenter::new(&config),
        )
    }

    async fn drive(session: WizardSession, script: &str) -> (WizardSession, String) {
        let mut out = Vec::new();
        let session = {
            let mut wizard = TerminalWizard::new(session, script.as_bytes(), &mut out);
            wizard.run().await.unwrap();
            wizard.into_session()
        };
        (session, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn full_run_saves_document() {
        let artifacts = tempfile::tempdir().unwrap();
        let downloads = tempfile::tempdir().unwrap();
        let script = format!(
            "\nAna\n21999998888\n2h\n2 4 6\n2\n1\nsalvar {}\nsair\n",
            downloads.path().display()
        );

        let (session, output) = drive(session(false, &artifacts), &script).await;

        assert_eq!(session.step(), WizardStep::Success);
        assert_eq!(session.form().daily_hours, 2.0);
        assert_eq!(session.form().weekly_days, 3);
        assert!(output.contains("Seu cronograma está pronto!"));
        assert!(output.contains("[ 75%]"));
        let saved = downloads.path().join("Cronograma_de_Estudos_DevClub.pdf");
        assert_eq!(std::fs::read(saved).unwrap(), b"%PDF-1.4 inline");
    }

    #[tokio::test]
    async fn invalid_answers_are_reasked() {
        let artifacts = tempfile::tempdir().unwrap();
        let script = "\n\n123\nAna\n5521999998888\nmuito\n3\n\nsair\n";

        let (session, output) = drive(session(false, &artifacts), script).await;

        assert!(output.contains("Nome é obrigatório"));
        assert!(output.contains("Telefone inválido"));
        assert!(output.contains("Não entendi"));
        assert_eq!(session.step(), WizardStep::Knowledge);
        assert_eq!(session.form().daily_hours, 3.0);
    }

    #[tokio::test]
    async fn back_returns_to_previous_step() {
        let artifacts = tempfile::tempdir().unwrap();
        let script = "\nAna\n5521999998888\nvoltar\nsair\n";

        let (session, _) = drive(session(false, &artifacts), script).await;
        assert_eq!(session.step(), WizardStep::PersonalInfo);
        assert_eq!(session.form().name, "Ana");
    }

    #[tokio::test]
    async fn failure_offers_retry() {
        let artifacts = tempfile::tempdir().unwrap();
        let script = "\nAna\n5521999998888\n\n\n\n\ntentar\nsair\n";

        let (session, output) = drive(session(true, &artifacts), script).await;

        assert!(output.contains("Ops! Algo deu errado"));
        assert!(output.contains("Server responded with 503: Service Unavailable"));
        assert!(output.contains("mailto:suporte@devclub.com"));
        assert_eq!(session.step(), WizardStep::Success);
        assert_eq!(session.attempts(), 2);
    }

    #[tokio::test]
    async fn end_of_input_quits() {
        let artifacts = tempfile::tempdir().unwrap();
        let (session, output) = drive(session(false, &artifacts), "").await;
        assert_eq!(session.step(), WizardStep::Intro);
        assert!(output.ends_with("Até logo!\n"));
    }
}
