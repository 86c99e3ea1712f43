//! Step sequencer — which screen the user is on and where they may go.

use serde::{Deserialize, Serialize};

/// The screens of the wizard.
///
/// Progresses Intro → PersonalInfo → Schedule → Knowledge → Objective and
/// then lands on Success or Error depending on the submission outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Intro,
    PersonalInfo,
    Schedule,
    Knowledge,
    Objective,
    Success,
    Error,
}

/// User intents that move the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardEvent {
    Start,
    Forward,
    Back,
    Retry,
}

/// Where an accepted event leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Move to a fixed step.
    To(WizardStep),
    /// Run the submission pipeline; the outcome picks Success or Error.
    Submit,
}

impl WizardStep {
    /// The declared transition table. `None` means the event is not
    /// accepted on this step.
    pub fn transition(&self, event: WizardEvent) -> Option<Transition> {
        use WizardEvent::*;
        use WizardStep::*;
        match (self, event) {
            (Intro, Start) => Some(Transition::To(PersonalInfo)),
            (PersonalInfo, Forward) => Some(Transition::To(Schedule)),
            (Schedule, Forward) => Some(Transition::To(Knowledge)),
            (Knowledge, Forward) => Some(Transition::To(Objective)),
            (Objective, Forward) => Some(Transition::Submit),
            (Schedule, Back) => Some(Transition::To(PersonalInfo)),
            (Knowledge, Back) => Some(Transition::To(Schedule)),
            (Objective, Back) => Some(Transition::To(Knowledge)),
            (Error, Retry) => Some(Transition::Submit),
            _ => None,
        }
    }

    pub fn accepts(&self, event: WizardEvent) -> bool {
        self.transition(event).is_some()
    }

    /// Whether the session is over for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Whether this step collects input.
    pub fn is_input_step(&self) -> bool {
        matches!(
            self,
            Self::PersonalInfo | Self::Schedule | Self::Knowledge | Self::Objective
        )
    }

    /// Completion percentage for the progress bar, hidden outside input steps.
    pub fn progress_percent(&self) -> Option<u8> {
        let index = match self {
            Self::PersonalInfo => 0,
            Self::Schedule => 1,
            Self::Knowledge => 2,
            Self::Objective => 3,
            _ => return None,
        };
        Some(index * 100 / 4)
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Intro => "intro",
            Self::PersonalInfo => "personal_info",
            Self::Schedule => "schedule",
            Self::Knowledge => "knowledge",
            Self::Objective => "objective",
            Self::Success => "success",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for WizardEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::Forward => "forward",
            Self::Back => "back",
            Self::Retry => "retry",
        };
        write!(f, "{s}")
    }
}
