//! Seam between the engine and the resource API.

use async_trait::async_trait;
use serde_json::Value;
use trowel_rest::{RestClient, RestRequest, RestResult};

/// Executes resource requests on behalf of a screen.
#[async_trait]
pub trait RecordGateway: Send + Sync {
    /// Execute one request and return the decoded response body.
    async fn send(&self, request: RestRequest) -> RestResult<Value>;
}

#[async_trait]
impl RecordGateway for RestClient {
    async fn send(&self, request: RestRequest) -> RestResult<Value> {
        self.execute(request).await
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex, PoisonError};

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::sync::Semaphore;
    use trowel_rest::{Method, RestError, RestRequest, RestResult, StatusCode};

    use super::RecordGateway;

    /// In-memory gateway that records requests and replays scripted replies.
    #[derive(Default)]
    pub(crate) struct FakeGateway {
        requests: Mutex<Vec<RestRequest>>,
        replies: Mutex<VecDeque<RestResult<Value>>>,
        gate: Option<Arc<Semaphore>>,
    }

    impl FakeGateway {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Gateway whose calls wait for a permit on the returned semaphore.
        pub(crate) fn gated() -> (Self, Arc<Semaphore>) {
            let gate = Arc::new(Semaphore::new(0));
            let gateway = Self {
                gate: Some(Arc::clone(&gate)),
                ..Self::default()
            };
            (gateway, gate)
        }

        pub(crate) fn reply(&self, reply: RestResult<Value>) {
            self.replies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(reply);
        }

        pub(crate) fn requests(&self) -> Vec<RestRequest> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    pub(crate) fn status_error(status: u16, message: &str) -> RestError {
        let body = json!({"message": message});
        RestError::Status {
            method: Method::PATCH,
            url: "http://localhost/edit".into(),
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            raw: body.to_string(),
            body: Some(body),
        }
    }

    #[async_trait]
    impl RecordGateway for FakeGateway {
        async fn send(&self, request: RestRequest) -> RestResult<Value> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request);
            if let Some(gate) = &self.gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
            self.replies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or_else(|| Ok(Value::Array(Vec::new())))
        }
    }
}
