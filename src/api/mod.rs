pub mod client;
pub mod http;
pub mod mock;

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};

pub use client::ApiClient;
pub use http::{HttpClient, HttpResponse, ReqwestHttpClient};
pub use mock::{MockCall, MockHttpClient};

pub const MODULES_PATH: &str = "/modules";
pub const REQUESTS_PATH: &str = "/requests";

/// One call against the request service, relative to its base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    pub method: Method,
    pub path: String,
    /// JSON body; sent with `Content-Type: application/json` when present.
    pub body: Option<String>,
}

impl ApiCall {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    pub fn post_json<T: Serialize>(
        path: impl Into<String>,
        body: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            method: Method::POST,
            path: path.into(),
            body: Some(serde_json::to_string(body)?),
        })
    }

    /// Lookup key used by [`MockHttpClient`], e.g. `"POST /requests"`.
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewRequest {
    pub nickname: String,
    pub expires_days: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewAttachment<'a> {
    pub kind: &'a str,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CreatedRequest {
    pub id: RequestId,
    pub token: String,
}

/// Server-assigned request identifier. The service hands out integers, but
/// the client only ever echoes it back into a path, so strings are accepted
/// as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id is percent-encoded as one path segment, so a string id can
    /// never reach another endpoint.
    pub fn modules_path(&self) -> String {
        format!("{REQUESTS_PATH}/{}/modules", encode_segment(&self.0))
    }
}

/// Keeps RFC 3986 unreserved bytes except `.`, so `.` and `..` cannot act as
/// dot segments.
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(id) => RequestId(id.to_string()),
            Raw::Str(id) => RequestId(id),
        })
    }
}
