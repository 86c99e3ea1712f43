//! Study schedule wizard — the guided multi-step form.
//!
//! The user moves through a fixed sequence of screens (personal info,
//! schedule, knowledge, objective). The session collects their answers into
//! a `FormState` and, on the last step, hands it to the submission pipeline.

pub mod model;
pub mod prompts;
pub mod session;
pub mod state;

pub use model::{FormPatch, FormState, KnowledgeLevel, Objective, ProgramFormat, Weekday};
pub use session::{SessionStatus, WizardSession};
pub use state::{Transition, WizardEvent, WizardStep};
