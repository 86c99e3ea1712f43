//! Form state collected by the wizard.

use serde::{Deserialize, Serialize};

/// Lowest selectable study time per day, in hours.
pub const MIN_DAILY_HOURS: f64 = 0.5;
/// Highest selectable study time per day, in hours.
pub const MAX_DAILY_HOURS: f64 = 8.0;
/// Daily hours move in half-hour increments.
pub const DAILY_HOURS_STEP: f64 = 0.5;

/// Self-assessed programming knowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KnowledgeLevel {
    #[serde(rename = "Iniciante")]
    #[default]
    Beginner,
    #[serde(rename = "Intermediário")]
    Intermediate,
    #[serde(rename = "Avançado")]
    Advanced,
}

impl KnowledgeLevel {
    pub const ALL: [KnowledgeLevel; 3] = [Self::Beginner, Self::Intermediate, Self::Advanced];

    /// Value sent to the schedule service.
    pub fn wire_value(&self) -> &'static str {
        match self {
            Self::Beginner => "Iniciante",
            Self::Intermediate => "Intermediário",
            Self::Advanced => "Avançado",
        }
    }
}

impl std::fmt::Display for KnowledgeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_value())
    }
}

/// Program format requested from the service. Only one exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramFormat {
    #[default]
    Default,
}

impl ProgramFormat {
    pub fn wire_value(&self) -> &'static str {
        match self {
            Self::Default => "default",
        }
    }
}

/// What the user wants out of the study plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Objective {
    /// Land a job.
    #[serde(rename = "Emprego")]
    #[default]
    Job,
    /// Make money quickly (freelance, short projects).
    #[serde(rename = "Dinheiro")]
    Money,
}

impl Objective {
    pub const ALL: [Objective; 2] = [Self::Job, Self::Money];

    pub fn wire_value(&self) -> &'static str {
        match self {
            Self::Job => "Emprego",
            Self::Money => "Dinheiro",
        }
    }
}

impl std::fmt::Display for Objective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_value())
    }
}

/// Days of the week, Sunday first as shown on the schedule screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Self::Sunday,
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Sunday => "Domingo",
            Self::Monday => "Segunda",
            Self::Tuesday => "Terça",
            Self::Wednesday => "Quarta",
            Self::Thursday => "Quinta",
            Self::Friday => "Sexta",
            Self::Saturday => "Sábado",
        }
    }

    /// Initial day selection for a stored day count.
    ///
    /// Five days means Monday through Friday; any other count takes the
    /// first `count` days starting on Sunday.
    pub fn default_selection(count: u8) -> Vec<Weekday> {
        if count == 5 {
            return vec![
                Self::Monday,
                Self::Tuesday,
                Self::Wednesday,
                Self::Thursday,
                Self::Friday,
            ];
        }
        Self::ALL.iter().copied().take(count as usize).collect()
    }
}

/// Everything the user has entered so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    pub name: String,
    /// Digits only. Used for validation on the personal info step; never
    /// sent to the schedule service.
    pub phone: String,
    pub daily_hours: f64,
    pub weekly_days: u8,
    pub knowledge_level: KnowledgeLevel,
    pub program_format: ProgramFormat,
    pub objective: Objective,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            name: String::new(),
            phone: String::new(),
            daily_hours: 3.5,
            weekly_days: 5,
            knowledge_level: KnowledgeLevel::default(),
            program_format: ProgramFormat::default(),
            objective: Objective::default(),
        }
    }
}

/// A partial update to [`FormState`]. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_days: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_level: Option<KnowledgeLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_format: Option<ProgramFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<Objective>,
}

impl FormPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl FormState {
    /// Merge the fields present in `patch`.
    ///
    /// Phone input is normalized to digits on the way in.
    pub fn apply(&mut self, patch: FormPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(phone) = patch.phone {
            self.phone = normalize_phone(&phone);
        }
        if let Some(hours) = patch.daily_hours {
            self.daily_hours = hours;
        }
        if let Some(days) = patch.weekly_days {
            self.weekly_days = days;
        }
        if let Some(level) = patch.knowledge_level {
            self.knowledge_level = level;
        }
        if let Some(format) = patch.program_format {
            self.program_format = format;
        }
        if let Some(objective) = patch.objective {
            self.objective = objective;
        }
    }

    /// Structural problems that would make a submission meaningless.
    ///
    /// Phone is not checked here; it is validated on the personal info step.
    pub fn structural_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("name is empty".to_string());
        }
        if !is_valid_daily_hours(self.daily_hours) {
            problems.push(format!(
                "daily_hours must be between {MIN_DAILY_HOURS} and {MAX_DAILY_HOURS} in steps of {DAILY_HOURS_STEP}, got {}",
                self.daily_hours
            ));
        }
        if !(1..=7).contains(&self.weekly_days) {
            problems.push(format!(
                "weekly_days must be between 1 and 7, got {}",
                self.weekly_days
            ));
        }
        problems
    }
}

pub fn is_valid_daily_hours(hours: f64) -> bool {
    if !hours.is_finite() || !(MIN_DAILY_HOURS..=MAX_DAILY_HOURS).contains(&hours) {
        return false;
    }
    let steps = hours / DAILY_HOURS_STEP;
    (steps - steps.round()).abs() < 1e-9
}

/// Human readable hours, e.g. `30min`, `2h`, `3h30min`.
pub fn format_hours(hours: f64) -> String {
    let total_minutes = (hours * 60.0).round() as u64;
    match (total_minutes / 60, total_minutes % 60) {
        (0, m) => format!("{m}min"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h{m}min"),
    }
}

/// Strip everything but ASCII digits.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Render a phone number as `+55 (21) 99999-9999`, progressively while the
/// user is still typing.
pub fn format_phone(raw: &str) -> String {
    let digits = normalize_phone(raw);
    let n = digits.len();
    if n < 3 {
        return digits;
    }
    if n <= 4 {
        return format!("+{} ({}", &digits[..2], &digits[2..]);
    }
    if n <= 9 {
        return format!("+{} ({}) {}", &digits[..2], &digits[2..4], &digits[4..]);
    }
    format!(
        "+{} ({}) {}-{}",
        &digits[..2],
        &digits[2..4],
        &digits[4..9],
        &digits[9..n.min(13)]
    )
}
