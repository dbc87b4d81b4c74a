use std::fmt;

use thiserror::Error;

use crate::flow::FlowState;

/// The network-facing step a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Listing,
    Creation,
    Attachment,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Listing => "listing",
            Step::Creation => "creation",
            Step::Attachment => "attachment",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-level failure, before any status code was received.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

/// Why a single module did not get attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Error(String),
    NotAttempted,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Error(msg) => f.write_str(msg),
            FailureReason::NotAttempted => f.write_str("not attempted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFailure {
    pub kind: String,
    pub reason: FailureReason,
}

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("{step} failed: network error: {source}")]
    Network {
        step: Step,
        #[source]
        source: TransportError,
    },

    #[error("{step} failed: server returned {status}: {body}")]
    Server { step: Step, status: u16, body: String },

    #[error("{step} failed: invalid JSON: {source}")]
    Json {
        step: Step,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "request {request_id} was created but {} module(s) were not attached: {}",
        .failures.len(),
        failed_kinds(.failures)
    )]
    PartialAttachment {
        request_id: String,
        token: String,
        failures: Vec<AttachmentFailure>,
    },

    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: FlowState,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

fn failed_kinds(failures: &[AttachmentFailure]) -> String {
    failures
        .iter()
        .map(|f| f.kind.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl FlowError {
    pub fn step(&self) -> Option<Step> {
        match self {
            FlowError::Network { step, .. }
            | FlowError::Server { step, .. }
            | FlowError::Json { step, .. } => Some(*step),
            FlowError::PartialAttachment { .. } => Some(Step::Attachment),
            FlowError::InvalidState { .. } | FlowError::Config(_) => None,
        }
    }

    /// Short label recorded on spans and metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            FlowError::Network {
                source: TransportError::Timeout,
                ..
            } => "timeout",
            FlowError::Network { .. } => "network_error",
            FlowError::Server { status, .. } if *status >= 500 => "server_error",
            FlowError::Server { .. } => "client_error",
            FlowError::Json { .. } => "invalid_response",
            FlowError::PartialAttachment { .. } => "partial_attachment",
            FlowError::InvalidState { .. } => "invalid_state",
            FlowError::Config(_) => "config_error",
        }
    }
}
