//! Line-oriented operator session: fills the form from prompts, submits it,
//! and drives the share overlay's Copy / Preview / Done actions.

use std::io::Write;
use std::time::Instant;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::api::HttpClient;
use crate::flow::RequestSubmissionFlow;
use crate::presenter::TerminalPresenter;
use crate::share::{COPY_FEEDBACK, CopyButton, OverlayAction};

enum FormInput {
    Submit,
    Reload,
    Quit,
}

pub struct Session<H, W, R> {
    flow: RequestSubmissionFlow<H, TerminalPresenter<W>>,
    input: Lines<R>,
}

impl<H, W, R> Session<H, W, R>
where
    H: HttpClient,
    W: Write,
    R: AsyncBufRead + Unpin,
{
    pub fn new(flow: RequestSubmissionFlow<H, TerminalPresenter<W>>, input: R) -> Self {
        Self {
            flow,
            input: input.lines(),
        }
    }

    pub fn flow(&self) -> &RequestSubmissionFlow<H, TerminalPresenter<W>> {
        &self.flow
    }

    pub fn into_flow(self) -> RequestSubmissionFlow<H, TerminalPresenter<W>> {
        self.flow
    }

    /// Runs until `:quit` or end of input.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        if self.flow.initialize().await.is_err() {
            self.notice("Type :reload as the nickname to load modules again.");
        }

        loop {
            match self.read_form().await? {
                FormInput::Quit => break,
                FormInput::Reload => {
                    // Failures are already on screen.
                    let _ = self.flow.list_modules().await;
                    continue;
                }
                FormInput::Submit => {}
            }

            match self.flow.submit_form().await {
                Ok(submission) => tracing::info!(
                    request.id = %submission.request.id,
                    modules.attached = submission.attached.len(),
                    "Submission complete"
                ),
                Err(err) => tracing::debug!(error = %err, "Submission did not fully succeed"),
            }

            if self.flow.overlay().is_some() && !self.run_overlay().await? {
                break;
            }
        }

        tracing::info!("Session ended");
        Ok(())
    }

    async fn read_form(&mut self) -> anyhow::Result<FormInput> {
        let Some(nickname) = self.ask("nickname").await? else {
            return Ok(FormInput::Quit);
        };
        match nickname.trim() {
            ":quit" | ":q" => return Ok(FormInput::Quit),
            ":reload" => return Ok(FormInput::Reload),
            _ => {}
        }

        let default_expires = self.flow.form().expires_days;
        let expires_days = loop {
            let label = format!("expires in days [{default_expires}]");
            let Some(raw) = self.ask(&label).await? else {
                return Ok(FormInput::Quit);
            };
            match parse_expires(&raw, default_expires) {
                Ok(days) => break days,
                Err(msg) => self.notice(&msg),
            }
        };

        let module_count = self.flow.form().modules.len();
        let selection = if module_count == 0 {
            Vec::new()
        } else {
            loop {
                let Some(raw) = self.ask("modules (numbers, blank for none)").await? else {
                    return Ok(FormInput::Quit);
                };
                match parse_selection(&raw, module_count) {
                    Ok(selection) => break selection,
                    Err(msg) => self.notice(&msg),
                }
            }
        };

        let form = self.flow.form_mut();
        form.nickname = nickname;
        form.expires_days = expires_days;
        form.modules.uncheck_all();
        for index in selection {
            form.modules.set_checked_at(index, true);
        }
        Ok(FormInput::Submit)
    }

    /// Returns false when input ended while the overlay was open.
    async fn run_overlay(&mut self) -> anyhow::Result<bool> {
        let Some(overlay) = self.flow.overlay().cloned() else {
            return Ok(true);
        };
        let mut button = CopyButton::default();
        let mut copied_at: Option<Instant> = None;

        loop {
            if copied_at.is_some_and(|at| at.elapsed() >= COPY_FEEDBACK) {
                button.restore();
                copied_at = None;
            }

            let label = format!("[c] {} / [p] Preview / [d] Done", button.label());
            let Some(raw) = self.ask(&label).await? else {
                return Ok(false);
            };

            match parse_action(&raw) {
                Some(OverlayAction::Copy) => {
                    let url = overlay.copy(&mut button).to_string();
                    copied_at = Some(Instant::now());
                    self.notice(&format!("{} {url}", button.label()));
                }
                Some(OverlayAction::Preview) => {
                    self.notice(&format!("Open in a new window: {}", overlay.preview()));
                }
                Some(OverlayAction::Done) => {
                    // A failed reload is shown and leaves the form usable.
                    let _ = self.flow.finish().await;
                    return Ok(true);
                }
                None => self.notice("Choose c, p or d."),
            }
        }
    }

    async fn ask(&mut self, label: &str) -> anyhow::Result<Option<String>> {
        self.flow.presenter_mut().prompt(label);
        Ok(self.input.next_line().await?)
    }

    fn notice(&mut self, message: &str) {
        self.flow.presenter_mut().notice(message);
    }
}

/// Blank keeps `default`; anything else must be a whole number.
pub fn parse_expires(raw: &str, default: i64) -> Result<i64, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(default);
    }
    raw.parse()
        .map_err(|_| format!("{raw:?} is not a whole number of days"))
}

/// Parses 1-based option numbers separated by commas or spaces into 0-based
/// indices, keeping the order typed.
pub fn parse_selection(raw: &str, count: usize) -> Result<Vec<usize>, String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| match part.parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => Ok(n - 1),
            _ => Err(format!("{part:?} is not a module number between 1 and {count}")),
        })
        .collect()
}

pub fn parse_action(raw: &str) -> Option<OverlayAction> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "c" | "copy" => Some(OverlayAction::Copy),
        "p" | "preview" => Some(OverlayAction::Preview),
        "d" | "done" => Some(OverlayAction::Done),
        _ => None,
    }
}
