//! Screen copy and answer parsing for the wizard steps.
//!
//! The wording mirrors the public web wizard (Brazilian Portuguese). The
//! parsing side turns a line of user input into a [`FormPatch`] so every
//! surface shares the same rules.

use std::path::PathBuf;

use super::model::{
    FormPatch, KnowledgeLevel, MAX_DAILY_HOURS, MIN_DAILY_HOURS, Objective, Weekday,
    is_valid_daily_hours,
};
use super::state::WizardStep;

/// Static copy for one screen.
#[derive(Debug, Clone, Copy)]
pub struct Screen {
    pub title: &'static str,
    pub subtitle: Option<&'static str>,
    pub fields: &'static [Field],
}

/// One question asked on a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Phone,
    DailyHours,
    StudyDays,
    KnowledgeLevel,
    Objective,
}

impl Field {
    pub fn question(&self) -> &'static str {
        match self {
            Self::Name => "Seu nome completo",
            Self::Phone => "Seu número de telefone (formato: +55 (21) 99999-9999)",
            Self::DailyHours => "Quantas horas por dia você pode dedicar aos estudos? (30min a 8h)",
            Self::StudyDays => "Quais dias da semana você vai estudar?",
            Self::KnowledgeLevel => "Qual seu nível de conhecimento em programação?",
            Self::Objective => "Qual seu principal objetivo?",
        }
    }
}

pub fn screen(step: WizardStep) -> Screen {
    match step {
        WizardStep::Intro => Screen {
            title: "DevClub Cronograma",
            subtitle: Some(
                "Crie um plano de estudos personalizado para alcançar seus objetivos na programação",
            ),
            fields: &[],
        },
        WizardStep::PersonalInfo => Screen {
            title: "Vamos começar com algumas informações básicas",
            subtitle: None,
            fields: &[Field::Name, Field::Phone],
        },
        WizardStep::Schedule => Screen {
            title: "Configure seu tempo de estudo",
            subtitle: None,
            fields: &[Field::DailyHours, Field::StudyDays],
        },
        WizardStep::Knowledge => Screen {
            title: "Qual seu nível de conhecimento em programação?",
            subtitle: Some("Isso nos ajudará a adaptar seu cronograma ao seu nível atual."),
            fields: &[Field::KnowledgeLevel],
        },
        WizardStep::Objective => Screen {
            title: "Qual seu principal objetivo?",
            subtitle: Some(
                "Isso nos ajudará a focar seu cronograma nas habilidades mais relevantes para você.",
            ),
            fields: &[Field::Objective],
        },
        WizardStep::Success => Screen {
            title: "Seu cronograma está pronto!",
            subtitle: Some(
                "Preparamos um plano de estudos personalizado para você alcançar seus objetivos.",
            ),
            fields: &[],
        },
        WizardStep::Error => Screen {
            title: "Ops! Algo deu errado",
            subtitle: Some(
                "Não foi possível gerar seu cronograma de estudos. Por favor, tente novamente.",
            ),
            fields: &[],
        },
    }
}

/// Title and description for each knowledge level option.
pub fn knowledge_option(level: KnowledgeLevel) -> (&'static str, &'static str) {
    match level {
        KnowledgeLevel::Beginner => ("Iniciante", "Pouca ou nenhuma experiência em programação"),
        KnowledgeLevel::Intermediate => (
            "Intermediário",
            "Conhecimento básico de programação, já desenvolveu alguns projetos",
        ),
        KnowledgeLevel::Advanced => (
            "Avançado",
            "Experiência sólida em programação, domínio de várias tecnologias",
        ),
    }
}

pub fn objective_option(objective: Objective) -> (&'static str, &'static str) {
    match objective {
        Objective::Job => (
            "Conseguir um emprego",
            "Cronograma focado em habilidades valorizadas no mercado de trabalho",
        ),
        Objective::Money => (
            "Fazer dinheiro rápido",
            "Foco em habilidades para trabalhos freelancer e projetos de curto prazo",
        ),
    }
}

/// Navigation commands recognized on any screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Back,
    Quit,
    Retry,
    /// Save the artifact, optionally into a given directory.
    Save(Option<PathBuf>),
}

pub fn parse_command(input: &str) -> Option<Command> {
    let trimmed = input.trim();
    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (trimmed, ""),
    };
    match word.to_lowercase().as_str() {
        "voltar" | "back" => Some(Command::Back),
        "sair" | "quit" | "/quit" => Some(Command::Quit),
        "tentar" | "retry" => Some(Command::Retry),
        "salvar" | "save" => Some(Command::Save(
            (!rest.is_empty()).then(|| PathBuf::from(rest)),
        )),
        _ => None,
    }
}

/// A parsed answer to one [`Field`].
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Patch(FormPatch),
    Days(Vec<Weekday>),
    /// Blank input: keep whatever is already there.
    Keep,
}

/// Parse a line of input for `field`. Errors carry the message to show.
pub fn parse_answer(field: Field, input: &str) -> Result<Answer, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Answer::Keep);
    }
    match field {
        Field::Name => Ok(Answer::Patch(FormPatch {
            name: Some(input.to_string()),
            ..Default::default()
        })),
        Field::Phone => Ok(Answer::Patch(FormPatch {
            phone: Some(input.to_string()),
            ..Default::default()
        })),
        Field::DailyHours => {
            let hours = parse_hours(input)?;
            Ok(Answer::Patch(FormPatch {
                daily_hours: Some(hours),
                ..Default::default()
            }))
        }
        Field::StudyDays => parse_days(input).map(Answer::Days),
        Field::KnowledgeLevel => {
            let level = pick_option(input, &KnowledgeLevel::ALL, |l| knowledge_option(*l).0)?;
            Ok(Answer::Patch(FormPatch {
                knowledge_level: Some(level),
                ..Default::default()
            }))
        }
        Field::Objective => {
            let objective = pick_option(input, &Objective::ALL, |o| o.wire_value())?;
            Ok(Answer::Patch(FormPatch {
                objective: Some(objective),
                ..Default::default()
            }))
        }
    }
}

/// Accepts `3.5`, `3,5`, `3h`, `3h30`, `30min`.
fn parse_hours(input: &str) -> Result<f64, String> {
    let lowered = input.to_lowercase().replace(',', ".");
    let hours = if let Some(minutes) = lowered.strip_suffix("min") {
        if let Some((h, m)) = minutes.split_once('h') {
            parse_number(h)? + parse_number(m)? / 60.0
        } else {
            parse_number(minutes)? / 60.0
        }
    } else if let Some((h, m)) = lowered.split_once('h') {
        let minutes = if m.is_empty() { 0.0 } else { parse_number(m)? };
        parse_number(h)? + minutes / 60.0
    } else {
        parse_number(&lowered)?
    };

    if !is_valid_daily_hours(hours) {
        return Err(format!(
            "Escolha entre {MIN_DAILY_HOURS} e {MAX_DAILY_HOURS} horas, em intervalos de 30 minutos"
        ));
    }
    Ok(hours)
}

fn parse_number(raw: &str) -> Result<f64, String> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| format!("Não entendi \"{raw}\" como um número"))
}

/// Accepts day numbers (1 = Domingo .. 7 = Sábado) or label prefixes,
/// separated by commas or spaces.
fn parse_days(input: &str) -> Result<Vec<Weekday>, String> {
    let mut days = Vec::new();
    for token in input.split([',', ' ']).map(str::trim).filter(|t| !t.is_empty()) {
        let day = match token.parse::<usize>() {
            Ok(n) if (1..=7).contains(&n) => Weekday::ALL[n - 1],
            Ok(_) => return Err(format!("Dia inválido: {token}")),
            Err(_) => {
                let needle = token.to_lowercase();
                Weekday::ALL
                    .iter()
                    .copied()
                    .find(|d| d.label().to_lowercase().starts_with(&needle))
                    .ok_or_else(|| format!("Dia inválido: {token}"))?
            }
        };
        if !days.contains(&day) {
            days.push(day);
        }
    }
    if days.is_empty() {
        return Err("Selecione pelo menos um dia".to_string());
    }
    days.sort();
    Ok(days)
}

fn pick_option<T: Copy>(input: &str, options: &[T], label: impl Fn(&T) -> &str) -> Result<T, String> {
    if let Ok(n) = input.parse::<usize>() {
        return options
            .get(n.wrapping_sub(1))
            .copied()
            .ok_or_else(|| format!("Escolha um número entre 1 e {}", options.len()));
    }
    let needle = input.to_lowercase();
    options
        .iter()
        .copied()
        .find(|o| label(o).to_lowercase() == needle)
        .ok_or_else(|| format!("Opção inválida: {input}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_input_step_asks_something() {
        for step in [
            WizardStep::PersonalInfo,
            WizardStep::Schedule,
            WizardStep::Knowledge,
            WizardStep::Objective,
        ] {
            assert!(!screen(step).fields.is_empty(), "{step} has no fields");
        }
        assert!(screen(WizardStep::Success).fields.is_empty());
    }

    #[test]
    fn commands() {
        assert_eq!(parse_command("voltar"), Some(Command::Back));
        assert_eq!(parse_command(" SAIR "), Some(Command::Quit));
        assert_eq!(parse_command("tentar"), Some(Command::Retry));
        assert_eq!(parse_command("salvar"), Some(Command::Save(None)));
        assert_eq!(
            parse_command("salvar /tmp/out"),
            Some(Command::Save(Some(PathBuf::from("/tmp/out"))))
        );
        assert_eq!(parse_command("Ana"), None);
    }

    #[test]
    fn blank_answer_keeps_value() {
        assert_eq!(parse_answer(Field::Name, "   ").unwrap(), Answer::Keep);
    }

    #[test]
    fn hours_formats() {
        let hours = |s: &str| match parse_answer(Field::DailyHours, s).unwrap() {
            Answer::Patch(p) => p.daily_hours.unwrap(),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(hours("3.5"), 3.5);
        assert_eq!(hours("3,5"), 3.5);
        assert_eq!(hours("2h"), 2.0);
        assert_eq!(hours("2h30"), 2.5);
        assert_eq!(hours("1h30min"), 1.5);
        assert_eq!(hours("30min"), 0.5);
        assert!(parse_answer(Field::DailyHours, "9").is_err());
        assert!(parse_answer(Field::DailyHours, "1.2").is_err());
        assert!(parse_answer(Field::DailyHours, "muito").is_err());
    }

    #[test]
    fn days_by_number_and_label() {
        assert_eq!(
            parse_answer(Field::StudyDays, "2, 4 6").unwrap(),
            Answer::Days(vec![Weekday::Monday, Weekday::Wednesday, Weekday::Friday])
        );
        assert_eq!(
            parse_answer(Field::StudyDays, "sáb,dom,dom").unwrap(),
            Answer::Days(vec![Weekday::Sunday, Weekday::Saturday])
        );
        assert!(parse_answer(Field::StudyDays, "8").is_err());
        assert!(parse_answer(Field::StudyDays, "feriado").is_err());
    }

    #[test]
    fn options_by_number_or_label() {
        assert_eq!(
            parse_answer(Field::KnowledgeLevel, "2").unwrap(),
            Answer::Patch(FormPatch {
                knowledge_level: Some(KnowledgeLevel::Intermediate),
                ..Default::default()
            })
        );
        assert_eq!(
            parse_answer(Field::KnowledgeLevel, "avançado").unwrap(),
            Answer::Patch(FormPatch {
                knowledge_level: Some(KnowledgeLevel::Advanced),
                ..Default::default()
            })
        );
        assert_eq!(
            parse_answer(Field::Objective, "dinheiro").unwrap(),
            Answer::Patch(FormPatch {
                objective: Some(Objective::Money),
                ..Default::default()
            })
        );
        assert!(parse_answer(Field::Objective, "0").is_err());
        assert!(parse_answer(Field::Objective, "3").is_err());
    }
}
