use std::time::Duration;

use chrono::{NaiveDate, TimeDelta};
use reqwest::Url;

use crate::error::FlowError;

pub const CUSTOMER_PATH: &str = "/customer";
pub const COPY_LABEL: &str = "Copy";
pub const COPIED_LABEL: &str = "✓ Copied!";
/// How long the copy button shows its confirmation before reverting.
pub const COPY_FEEDBACK: Duration = Duration::from_secs(2);

/// Builds `{origin}/customer?token={token}`. Any path or query already on the
/// origin is replaced.
pub fn customer_url(origin: &str, token: &str) -> Result<Url, FlowError> {
    let mut url = Url::parse(origin)
        .map_err(|e| FlowError::Config(format!("invalid public origin {origin:?}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(FlowError::Config(format!(
            "public origin {origin:?} cannot carry a path"
        )));
    }

    url.set_path(CUSTOMER_PATH);
    url.set_query(None);
    url.set_fragment(None);
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

/// The date a request created today stops accepting uploads.
pub fn expiry_date(today: NaiveDate, expires_days: i64) -> Option<NaiveDate> {
    today.checked_add_signed(TimeDelta::try_days(expires_days)?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyButton {
    label: String,
}

impl Default for CopyButton {
    fn default() -> Self {
        Self {
            label: COPY_LABEL.to_string(),
        }
    }
}

impl CopyButton {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_showing_feedback(&self) -> bool {
        self.label == COPIED_LABEL
    }

    /// Call once [`COPY_FEEDBACK`] has elapsed.
    pub fn restore(&mut self) {
        self.label = COPY_LABEL.to_string();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayAction {
    Copy,
    Preview,
    Done,
}

/// Result view shown after a request is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareOverlay {
    url: Url,
    request_id: String,
    expires_on: Option<NaiveDate>,
}

impl ShareOverlay {
    pub fn new(url: Url, request_id: impl Into<String>, expires_on: Option<NaiveDate>) -> Self {
        Self {
            url,
            request_id: request_id.into(),
            expires_on,
        }
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn expires_on(&self) -> Option<NaiveDate> {
        self.expires_on
    }

    /// Marks `button` as copied and returns the text for the clipboard.
    pub fn copy(&self, button: &mut CopyButton) -> &str {
        button.label = COPIED_LABEL.to_string();
        self.url()
    }

    /// The URL to open in a new browser context.
    pub fn preview(&self) -> &str {
        self.url()
    }
}
