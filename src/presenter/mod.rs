//! Operator-facing output of the submission flow.

pub mod recording;
pub mod terminal;

use crate::error::FlowError;
use crate::form::ModuleList;
use crate::share::ShareOverlay;

pub use recording::{PresenterEvent, RecordingPresenter};
pub use terminal::TerminalPresenter;

pub trait Presenter {
    /// Called every time the module list has been (re)rendered.
    fn show_modules(&mut self, modules: &ModuleList);

    fn show_share_overlay(&mut self, overlay: &ShareOverlay);

    fn close_share_overlay(&mut self);

    /// Every failure goes through here; the flow never fails silently.
    fn show_error(&mut self, error: &FlowError);
}
