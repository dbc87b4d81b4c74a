use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use futures::future::join_all;
use opentelemetry::KeyValue;

use crate::api::{ApiClient, HttpClient, RequestId};
use crate::error::{AttachmentFailure, FailureReason, FlowError};
use crate::telemetry::metrics::{ATTACHMENT_FAILURES, MODULES_ATTACHED};

/// How the per-module attach calls are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachPolicy {
    /// One call at a time in selection order; failures do not stop the rest.
    #[default]
    Sequential,
    /// One call at a time; the first failure leaves the rest unattempted.
    AbortOnFirstFailure,
    /// All calls at once; outcomes are still reported in selection order.
    Concurrent,
}

impl AttachPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachPolicy::Sequential => "sequential",
            AttachPolicy::AbortOnFirstFailure => "abort_on_first_failure",
            AttachPolicy::Concurrent => "concurrent",
        }
    }
}

impl fmt::Display for AttachPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttachPolicy {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(AttachPolicy::Sequential),
            "abort_on_first_failure" | "abort" => Ok(AttachPolicy::AbortOnFirstFailure),
            "concurrent" => Ok(AttachPolicy::Concurrent),
            other => Err(FlowError::Config(format!(
                "unknown attach policy {other:?} \
                 (expected sequential, abort_on_first_failure or concurrent)"
            ))),
        }
    }
}

#[derive(Debug)]
pub enum AttachmentStatus {
    Attached,
    Failed(FlowError),
    NotAttempted,
}

#[derive(Debug)]
pub struct AttachmentOutcome {
    pub kind: String,
    pub status: AttachmentStatus,
}

impl AttachmentOutcome {
    pub fn is_attached(&self) -> bool {
        matches!(self.status, AttachmentStatus::Attached)
    }
}

/// First occurrence of each kind, in the order given.
pub fn unique_kinds(kinds: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    kinds
        .iter()
        .map(String::as_str)
        .filter(|kind| seen.insert(*kind))
        .collect()
}

#[tracing::instrument(
    name = "flow_stage attach",
    skip(api, kinds),
    fields(
        request.id = %request_id,
        attach.policy = %policy,
        modules.requested = kinds.len(),
        modules.attached,
        modules.failed,
    )
)]
pub async fn attach_modules<H: HttpClient>(
    api: &ApiClient<H>,
    request_id: &RequestId,
    kinds: &[String],
    policy: AttachPolicy,
) -> Vec<AttachmentOutcome> {
    let kinds = unique_kinds(kinds);

    let outcomes = match policy {
        AttachPolicy::Sequential => {
            let mut outcomes = Vec::with_capacity(kinds.len());
            for kind in kinds {
                let status = status_of(api.attach_module(request_id, kind).await);
                outcomes.push(outcome(kind, status));
            }
            outcomes
        }
        AttachPolicy::AbortOnFirstFailure => {
            let mut outcomes = Vec::with_capacity(kinds.len());
            let mut aborted = false;
            for kind in kinds {
                let status = if aborted {
                    AttachmentStatus::NotAttempted
                } else {
                    status_of(api.attach_module(request_id, kind).await)
                };
                aborted |= matches!(status, AttachmentStatus::Failed(_));
                outcomes.push(outcome(kind, status));
            }
            outcomes
        }
        AttachPolicy::Concurrent => {
            let results = join_all(
                kinds
                    .iter()
                    .map(|kind| api.attach_module(request_id, kind)),
            )
            .await;
            kinds
                .into_iter()
                .zip(results)
                .map(|(kind, result)| outcome(kind, status_of(result)))
                .collect()
        }
    };

    let attached = outcomes.iter().filter(|o| o.is_attached()).count();
    let failed = outcomes.len() - attached;
    let policy_kv = [KeyValue::new("attach.policy", policy.as_str())];
    MODULES_ATTACHED.add(attached as u64, &policy_kv);
    if failed > 0 {
        ATTACHMENT_FAILURES.add(failed as u64, &policy_kv);
    }

    let span = tracing::Span::current();
    span.record("modules.attached", attached);
    span.record("modules.failed", failed);

    outcomes
}

/// Everything that did not get attached, in selection order.
pub fn failures(outcomes: &[AttachmentOutcome]) -> Vec<AttachmentFailure> {
    outcomes
        .iter()
        .filter_map(|o| {
            let reason = match &o.status {
                AttachmentStatus::Attached => return None,
                AttachmentStatus::Failed(err) => FailureReason::Error(err.to_string()),
                AttachmentStatus::NotAttempted => FailureReason::NotAttempted,
            };
            Some(AttachmentFailure {
                kind: o.kind.clone(),
                reason,
            })
        })
        .collect()
}

fn status_of(result: Result<(), FlowError>) -> AttachmentStatus {
    match result {
        Ok(()) => AttachmentStatus::Attached,
        Err(err) => AttachmentStatus::Failed(err),
    }
}

fn outcome(kind: &str, status: AttachmentStatus) -> AttachmentOutcome {
    AttachmentOutcome {
        kind: kind.to_string(),
        status,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::MockHttpClient;

    const ATTACH_KEY: &str = "POST /requests/7/modules";

    fn kinds(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn attached_kinds(mock: &MockHttpClient) -> Vec<String> {
        mock.calls_to(ATTACH_KEY)
            .iter()
            .filter_map(|call| call.json_body())
            .filter_map(|body| body["kind"].as_str().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "sequential".parse::<AttachPolicy>().unwrap(),
            AttachPolicy::Sequential
        );
        assert_eq!(
            " Concurrent ".parse::<AttachPolicy>().unwrap(),
            AttachPolicy::Concurrent
        );
        assert_eq!(
            "abort".parse::<AttachPolicy>().unwrap(),
            AttachPolicy::AbortOnFirstFailure
        );
        assert!("parallel".parse::<AttachPolicy>().is_err());
    }

    #[test]
    fn test_unique_kinds_keeps_first_occurrence() {
        let input = kinds(&["payslip", "id_card", "payslip"]);
        assert_eq!(unique_kinds(&input), vec!["payslip", "id_card"]);
    }

    #[tokio::test]
    async fn test_sequential_continues_after_failure() {
        let mock = MockHttpClient::new();
        mock.add_status(ATTACH_KEY, 500, "boom");
        mock.add_json(ATTACH_KEY, json!({"id": 2}));
        let api = ApiClient::new(mock.clone());

        let outcomes = attach_modules(
            &api,
            &RequestId::new("7"),
            &kinds(&["id_card", "payslip"]),
            AttachPolicy::Sequential,
        )
        .await;

        assert_eq!(attached_kinds(&mock), vec!["id_card", "payslip"]);
        assert_eq!(mock.max_in_flight(), 1);
        let failed = failures(&outcomes);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].kind, "id_card");
        assert!(matches!(failed[0].reason, FailureReason::Error(_)));
        assert!(outcomes[1].is_attached());
    }

    #[tokio::test]
    async fn test_abort_skips_remaining_modules() {
        let mock = MockHttpClient::new();
        mock.add_json(ATTACH_KEY, json!({}));
        mock.add_status(ATTACH_KEY, 404, "request not found");
        let api = ApiClient::new(mock.clone());

        let outcomes = attach_modules(
            &api,
            &RequestId::new("7"),
            &kinds(&["id_card", "payslip", "ssn"]),
            AttachPolicy::AbortOnFirstFailure,
        )
        .await;

        assert_eq!(attached_kinds(&mock), vec!["id_card", "payslip"]);
        let failed = failures(&outcomes);
        assert_eq!(
            failed,
            vec![
                AttachmentFailure {
                    kind: "payslip".to_string(),
                    reason: FailureReason::Error(
                        "attachment failed: server returned 404: request not found".to_string()
                    ),
                },
                AttachmentFailure {
                    kind: "ssn".to_string(),
                    reason: FailureReason::NotAttempted,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicates_are_attached_once() {
        let mock = MockHttpClient::new();
        mock.add_json(ATTACH_KEY, json!({}));
        let api = ApiClient::new(mock.clone());

        let outcomes = attach_modules(
            &api,
            &RequestId::new("7"),
            &kinds(&["id_card", "id_card"]),
            AttachPolicy::Sequential,
        )
        .await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(attached_kinds(&mock), vec!["id_card"]);
    }

    #[tokio::test]
    async fn test_concurrent_issues_all_calls_before_any_completes() {
        let mock = MockHttpClient::new();
        let first = mock.add_response_with_trigger(
            ATTACH_KEY,
            Ok(crate::api::HttpResponse::ok("{}")),
        );
        let second = mock.add_response_with_trigger(
            ATTACH_KEY,
            Ok(crate::api::HttpResponse::ok("{}")),
        );

        let task_mock = mock.clone();
        let handle = tokio::spawn(async move {
            let api = ApiClient::new(task_mock);
            let outcomes = attach_modules(
                &api,
                &RequestId::new("7"),
                &kinds(&["id_card", "payslip"]),
                AttachPolicy::Concurrent,
            )
            .await;
            outcomes.iter().map(|o| o.kind.clone()).collect::<Vec<_>>()
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(mock.in_flight_count(), 2);

        second.send(()).unwrap();
        first.send(()).unwrap();

        let order = handle.await.unwrap();
        assert_eq!(order, vec!["id_card", "payslip"]);
        assert_eq!(mock.max_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_sequential_waits_for_each_call() {
        let mock = MockHttpClient::new();
        let first = mock.add_response_with_trigger(
            ATTACH_KEY,
            Ok(crate::api::HttpResponse::ok("{}")),
        );
        mock.add_json(ATTACH_KEY, json!({}));

        let task_mock = mock.clone();
        let handle = tokio::spawn(async move {
            let api = ApiClient::new(task_mock);
            attach_modules(
                &api,
                &RequestId::new("7"),
                &kinds(&["id_card", "payslip"]),
                AttachPolicy::Sequential,
            )
            .await
            .len()
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(mock.call_count(), 1);

        first.send(()).unwrap();
        assert_eq!(handle.await.unwrap(), 2);
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.max_in_flight(), 1);
    }
}
