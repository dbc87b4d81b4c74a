use std::fmt;

use crate::error::Step;

/// Where the submission flow currently is.
///
/// `Failed` is not terminal: the form stays usable and the next reload or
/// submit starts over from there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    ModulesLoading,
    ModulesLoaded,
    Submitting,
    RequestCreated,
    AttachingModules,
    Complete,
    Failed(Step),
}

impl FlowState {
    /// A network call is outstanding, or was abandoned by dropping its future.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            FlowState::ModulesLoading
                | FlowState::Submitting
                | FlowState::RequestCreated
                | FlowState::AttachingModules
        )
    }

    /// Submitting needs an initialized form and no open share overlay. Busy
    /// states are accepted because the flow is driven through `&mut self`,
    /// so one can only be observed after its call was cancelled.
    pub fn can_submit(&self) -> bool {
        !matches!(self, FlowState::Idle | FlowState::Complete)
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Idle => f.write_str("idle"),
            FlowState::ModulesLoading => f.write_str("loading modules"),
            FlowState::ModulesLoaded => f.write_str("ready"),
            FlowState::Submitting => f.write_str("submitting"),
            FlowState::RequestCreated => f.write_str("request created"),
            FlowState::AttachingModules => f.write_str("attaching modules"),
            FlowState::Complete => f.write_str("complete"),
            FlowState::Failed(step) => write!(f, "failed at {step}"),
        }
    }
}
