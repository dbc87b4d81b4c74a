pub mod attach;
pub mod orchestrator;
pub mod state;

pub use attach::{AttachPolicy, AttachmentOutcome, AttachmentStatus};
pub use orchestrator::{FlowSettings, RequestSubmissionFlow, Submission};
pub use state::FlowState;
