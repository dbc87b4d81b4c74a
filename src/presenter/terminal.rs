use std::io::{self, Write};

use super::Presenter;
use crate::error::{FlowError, Step};
use crate::form::ModuleList;
use crate::share::ShareOverlay;

/// Plain-text presenter for an interactive terminal session.
pub struct TerminalPresenter<W> {
    out: W,
}

impl TerminalPresenter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn prompt(&mut self, label: &str) {
        let result = write!(self.out, "{label}> ").and_then(|_| self.out.flush());
        log_write_error(result);
    }

    pub fn notice(&mut self, message: &str) {
        log_write_error(writeln!(self.out, "{message}"));
    }

    fn write_modules(&mut self, modules: &ModuleList) -> io::Result<()> {
        if modules.is_empty() {
            return writeln!(self.out, "No modules available.");
        }
        writeln!(self.out, "Modules:")?;
        for (i, option) in modules.options().iter().enumerate() {
            let mark = if option.checked { "x" } else { " " };
            writeln!(self.out, "  [{mark}] {}. {}", i + 1, option.label)?;
        }
        Ok(())
    }

    fn write_overlay(&mut self, overlay: &ShareOverlay) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "✓ Request Created Successfully!")?;
        writeln!(self.out, "Customer URL: {}", overlay.url())?;
        if let Some(expires_on) = overlay.expires_on() {
            writeln!(self.out, "Link expires on {expires_on}.")?;
        }
        writeln!(
            self.out,
            "Share this link with your customer to collect their documents."
        )?;
        writeln!(self.out, "[c] Copy   [p] Preview   [d] Done")
    }

    fn write_error(&mut self, error: &FlowError) -> io::Result<()> {
        match error {
            FlowError::PartialAttachment {
                request_id,
                failures,
                ..
            } => {
                writeln!(
                    self.out,
                    "Request {request_id} was created, but these modules need to be added again:"
                )?;
                for failure in failures {
                    writeln!(self.out, "  - {}: {}", failure.kind, failure.reason)?;
                }
                Ok(())
            }
            other => {
                let context = match other.step() {
                    Some(Step::Listing) => "Could not load modules",
                    Some(Step::Creation) => "Could not create the request",
                    Some(Step::Attachment) => "Could not attach modules",
                    None => "Error",
                };
                writeln!(self.out, "{context}: {other}")?;
                writeln!(self.out, "The form is still available; try again.")
            }
        }
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn show_modules(&mut self, modules: &ModuleList) {
        log_write_error(self.write_modules(modules));
    }

    fn show_share_overlay(&mut self, overlay: &ShareOverlay) {
        log_write_error(self.write_overlay(overlay));
    }

    fn close_share_overlay(&mut self) {
        log_write_error(writeln!(self.out));
    }

    fn show_error(&mut self, error: &FlowError) {
        log_write_error(self.write_error(error));
    }
}

fn log_write_error(result: io::Result<()>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "failed to write to terminal");
    }
}
