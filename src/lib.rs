pub mod api;
pub mod config;
pub mod error;
pub mod flow;
pub mod form;
pub mod presenter;
pub mod session;
pub mod share;
pub mod telemetry;

pub use config::Config;
pub use error::{FlowError, Step};
pub use flow::{AttachPolicy, FlowState, RequestSubmissionFlow};
