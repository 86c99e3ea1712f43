//! Submission pipeline — form state in, study schedule document out.
//!
//! ```text
//! FormState ─▶ validate ─▶ POST endpoint ─▶ interpret ─▶ GET url ─▶ materialize
//!                                               │                       │
//!                                               └── inline PDF ─────────┘
//! ```

pub mod artifact;
pub mod client;
pub mod processor;
pub mod response;
pub mod types;

pub use artifact::{ArtifactHandle, ArtifactStore};
pub use client::{HttpScheduleService, ScheduleService};
pub use processor::SubmissionPipeline;
pub use types::{ErrorInfo, ErrorKind, PipelineOutcome, Stage, SubmissionRequest};
