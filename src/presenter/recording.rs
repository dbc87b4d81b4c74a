use super::Presenter;
use crate::error::FlowError;
use crate::form::ModuleList;
use crate::share::ShareOverlay;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterEvent {
    Modules(Vec<String>),
    ShareOverlay { url: String },
    OverlayClosed,
    Error(String),
}

/// Presenter that keeps everything it was asked to show, for assertions.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub events: Vec<PresenterEvent>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PresenterEvent::Error(msg) => Some(msg.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn last_share_url(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|event| match event {
            PresenterEvent::ShareOverlay { url } => Some(url.as_str()),
            _ => None,
        })
    }
}

impl Presenter for RecordingPresenter {
    fn show_modules(&mut self, modules: &ModuleList) {
        self.events.push(PresenterEvent::Modules(
            modules.options().iter().map(|o| o.value.clone()).collect(),
        ));
    }

    fn show_share_overlay(&mut self, overlay: &ShareOverlay) {
        self.events.push(PresenterEvent::ShareOverlay {
            url: overlay.url().to_string(),
        });
    }

    fn close_share_overlay(&mut self) {
        self.events.push(PresenterEvent::OverlayClosed);
    }

    fn show_error(&mut self, error: &FlowError) {
        self.events.push(PresenterEvent::Error(error.to_string()));
    }
}
