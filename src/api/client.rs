use std::time::Instant;

use opentelemetry::KeyValue;
use serde::de::DeserializeOwned;

use super::{
    ApiCall, CreatedRequest, HttpClient, HttpResponse, MODULES_PATH, NewAttachment, NewRequest,
    REQUESTS_PATH, RequestId,
};
use crate::error::{FlowError, Step};
use crate::telemetry::metrics::{API_CALL_DURATION, API_CALLS_TOTAL};

/// Typed access to the request service's three endpoints.
pub struct ApiClient<H> {
    http: H,
}

impl<H: HttpClient> ApiClient<H> {
    pub fn new(http: H) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &H {
        &self.http
    }

    #[tracing::instrument(name = "api list_modules", skip(self), fields(modules.count))]
    pub async fn list_modules(&self) -> Result<Vec<String>, FlowError> {
        let response = self.send(Step::Listing, ApiCall::get(MODULES_PATH)).await?;
        let modules: Vec<String> = decode(Step::Listing, &response)?;

        tracing::Span::current().record("modules.count", modules.len());
        Ok(modules)
    }

    #[tracing::instrument(
        name = "api create_request",
        skip(self, new),
        fields(request.expires_days = new.expires_days, request.id)
    )]
    pub async fn create_request(&self, new: &NewRequest) -> Result<CreatedRequest, FlowError> {
        let call = ApiCall::post_json(REQUESTS_PATH, new).map_err(|source| FlowError::Json {
            step: Step::Creation,
            source,
        })?;
        let response = self.send(Step::Creation, call).await?;
        let created: CreatedRequest = decode(Step::Creation, &response)?;

        tracing::Span::current().record("request.id", created.id.as_str());
        Ok(created)
    }

    /// The response body is not inspected; any 2xx counts as attached.
    #[tracing::instrument(name = "api attach_module", skip(self), fields(request.id = %request_id))]
    pub async fn attach_module(&self, request_id: &RequestId, kind: &str) -> Result<(), FlowError> {
        let call = ApiCall::post_json(request_id.modules_path(), &NewAttachment { kind }).map_err(
            |source| FlowError::Json {
                step: Step::Attachment,
                source,
            },
        )?;
        self.send(Step::Attachment, call).await?;
        Ok(())
    }

    async fn send(&self, step: Step, call: ApiCall) -> Result<HttpResponse, FlowError> {
        let start = Instant::now();
        let result = self.http.execute(&call).await;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        let status_class = match &result {
            Ok(response) => format!("{}xx", response.status / 100),
            Err(_) => "transport_error".to_string(),
        };
        let attrs = [
            KeyValue::new("api.step", step.as_str()),
            KeyValue::new("http.status_class", status_class),
        ];
        API_CALLS_TOTAL.add(1, &attrs);
        API_CALL_DURATION.record(duration_ms, &attrs);

        match result {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => {
                tracing::warn!(
                    step = %step,
                    status = response.status,
                    path = %call.path,
                    "request service returned an error status"
                );
                Err(FlowError::Server {
                    step,
                    status: response.status,
                    body: truncate(&response.body, 500),
                })
            }
            Err(source) => {
                tracing::warn!(step = %step, path = %call.path, error = %source, "request service unreachable");
                Err(FlowError::Network { step, source })
            }
        }
    }
}

fn decode<T: DeserializeOwned>(step: Step, response: &HttpResponse) -> Result<T, FlowError> {
    serde_json::from_str(&response.body).map_err(|source| FlowError::Json { step, source })
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.char_indices()
            .take_while(|&(i, _)| i < max)
            .map(|(_, c)| c)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::MockHttpClient;
    use crate::error::TransportError;

    fn client() -> (ApiClient<MockHttpClient>, MockHttpClient) {
        let mock = MockHttpClient::new();
        (ApiClient::new(mock.clone()), mock)
    }

    #[tokio::test]
    async fn test_list_modules_preserves_order() {
        let (api, mock) = client();
        mock.add_json("GET /modules", json!(["payslip", "id_card", "ssn"]));

        let modules = api.list_modules().await.unwrap();
        assert_eq!(modules, vec!["payslip", "id_card", "ssn"]);
    }

    #[tokio::test]
    async fn test_list_modules_rejects_non_array() {
        let (api, mock) = client();
        mock.add_json("GET /modules", json!({"modules": ["id_card"]}));

        let err = api.list_modules().await.unwrap_err();
        assert!(matches!(
            err,
            FlowError::Json {
                step: Step::Listing,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_create_request_sends_payload() {
        let (api, mock) = client();
        mock.add_json("POST /requests", json!({"id": 3, "token": "tok_3"}));

        let created = api
            .create_request(&NewRequest {
                nickname: "Alice".to_string(),
                expires_days: 30,
            })
            .await
            .unwrap();

        assert_eq!(created.id, RequestId::new("3"));
        assert_eq!(created.token, "tok_3");
        let calls = mock.calls_to("POST /requests");
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].json_body(),
            Some(json!({"nickname": "Alice", "expires_days": 30}))
        );
    }

    #[tokio::test]
    async fn test_non_success_status_is_server_error() {
        let (api, mock) = client();
        mock.add_status("POST /requests", 422, r#"{"detail":"expires_days"}"#);

        let err = api
            .create_request(&NewRequest {
                nickname: String::new(),
                expires_days: -1,
            })
            .await
            .unwrap_err();

        match err {
            FlowError::Server { step, status, body } => {
                assert_eq!(step, Step::Creation);
                assert_eq!(status, 422);
                assert!(body.contains("expires_days"));
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_attach_module_ignores_response_body() {
        let (api, mock) = client();
        mock.add_response(
            "POST /requests/9/modules",
            Ok(HttpResponse {
                status: 201,
                body: "not json".to_string(),
            }),
        );

        api.attach_module(&RequestId::new("9"), "payslip")
            .await
            .unwrap();

        let calls = mock.get_calls();
        assert_eq!(calls[0].json_body(), Some(json!({"kind": "payslip"})));
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let (api, mock) = client();
        mock.add_response(
            "POST /requests/9/modules",
            Err(TransportError::Connect("refused".to_string())),
        );

        let err = api
            .attach_module(&RequestId::new("9"), "payslip")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::Network {
                step: Step::Attachment,
                ..
            }
        ));
    }

    #[test]
    fn test_truncate_multibyte_safe() {
        let result = truncate("hé世界!", 3);
        assert!(result.len() <= 3);
        assert!(result.is_char_boundary(result.len()));
        assert_eq!(truncate("short", 10), "short");
    }
}
