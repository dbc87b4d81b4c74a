//! Recording [`HttpClient`] for tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use tokio::sync::oneshot;

use super::{ApiCall, HttpClient, HttpResponse};
use crate::error::TransportError;

/// Mock client with FIFO responses per `"METHOD path"` key.
///
/// ```ignore
/// let mock = MockHttpClient::new();
/// mock.add_response("GET /modules", Ok(HttpResponse::ok(r#"["id_card"]"#)));
/// ```
#[derive(Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, Vec<MockResponse>>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

enum MockResponse {
    Immediate(Result<HttpResponse, TransportError>),
    /// Held back until the paired sender fires or is dropped.
    Triggered {
        response: Result<HttpResponse, TransportError>,
        trigger: oneshot::Receiver<()>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub method: Method,
    pub path: String,
    pub body: Option<String>,
}

impl MockCall {
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_str(body).ok())
    }
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_response(&self, key: &str, response: Result<HttpResponse, TransportError>) {
        self.responses
            .lock()
            .entry(key.to_string())
            .or_default()
            .push(MockResponse::Immediate(response));
    }

    /// Shorthand for a 200 response with a JSON body.
    pub fn add_json(&self, key: &str, body: serde_json::Value) {
        self.add_response(key, Ok(HttpResponse::ok(body.to_string())));
    }

    pub fn add_status(&self, key: &str, status: u16, body: &str) {
        self.add_response(
            key,
            Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
        );
    }

    pub fn add_response_with_trigger(
        &self,
        key: &str,
        response: Result<HttpResponse, TransportError>,
    ) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.responses
            .lock()
            .entry(key.to_string())
            .or_default()
            .push(MockResponse::Triggered {
                response,
                trigger: rx,
            });
        tx
    }

    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, key: &str) -> Vec<MockCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| format!("{} {}", call.method, call.path) == key)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were executing at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, call: &ApiCall) -> Result<HttpResponse, TransportError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard {
            in_flight: self.in_flight.clone(),
        };

        self.calls.lock().push(MockCall {
            method: call.method.clone(),
            path: call.path.clone(),
            body: call.body.clone(),
        });

        let key = call.key();
        let next = {
            let mut responses = self.responses.lock();
            responses
                .get_mut(&key)
                .filter(|queue| !queue.is_empty())
                .map(|queue| queue.remove(0))
        };

        match next {
            Some(MockResponse::Immediate(response)) => response,
            Some(MockResponse::Triggered { response, trigger }) => {
                let _ = trigger.await;
                response
            }
            None => Err(TransportError::Other(format!(
                "no mock response configured for {key}"
            ))),
        }
    }
}

struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
