use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RemoteError;

/// The `type` field of a request: `text` for typed questions, otherwise the
/// primary category of the uploaded file's media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    Text,
    Image,
    Application,
}

impl SubmissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionKind::Text => "text",
            SubmissionKind::Image => "image",
            SubmissionKind::Application => "application",
        }
    }
}

/// Body of a submission: `{ "data": ..., "type": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteRequest {
    pub data: String,
    #[serde(rename = "type")]
    pub kind: SubmissionKind,
}

#[derive(Deserialize)]
struct RemoteResponse {
    response: String,
}

/// The endpoint answering submissions. One call, one answer; no retries.
pub trait Remote: Send + Sync + 'static {
    fn send(
        &self,
        request: &RemoteRequest,
    ) -> impl Future<Output = Result<String, RemoteError>> + Send;
}

/// [`Remote`] over HTTP: `POST` JSON, expect `{ "response": "..." }` back.
#[derive(Clone, Debug)]
pub struct HttpRemote {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpRemote {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteError::Transport)?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn classify(&self, err: reqwest::Error) -> RemoteError {
        if err.is_timeout() {
            RemoteError::Timeout(self.timeout)
        } else {
            RemoteError::Transport(err)
        }
    }
}

impl Remote for HttpRemote {
    fn send(
        &self,
        request: &RemoteRequest,
    ) -> impl Future<Output = Result<String, RemoteError>> + Send {
        async move {
            let response = self
                .client
                .post(self.endpoint.clone())
                .json(request)
                .send()
                .await
                .map_err(|e| self.classify(e))?;

            let status = response.status();
            debug!(%status, endpoint = %self.endpoint, "remote responded");
            if !status.is_success() {
                return Err(RemoteError::Status(status.as_u16()));
            }

            let body = response.text().await.map_err(|e| self.classify(e))?;
            let parsed: RemoteResponse = serde_json::from_str(&body)?;
            Ok(parsed.response)
        }
    }
}
