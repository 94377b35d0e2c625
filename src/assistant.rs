//! Assistant gateway
//!
//! Free-text questions go to an external HTTP service as `POST {"message": ...}`;
//! the reply is read from the optional `ai_response` field. One request per
//! question, no retries, bounded by an explicit timeout.
//!
//! Code review goes to a second endpoint as a form post of `file_content` and a
//! JSON `repo_info`; the reply body (HTML) is returned as-is.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::AssistantSection;
use crate::repo::RepositoryContext;

/// Reply used when the service answers but leaves `ai_response` out (or empty)
pub const NO_RESPONSE: &str = "AI did not return a response.";

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("assistant returned HTTP {0}")]
    Unavailable(u16),

    #[error("assistant request timed out after {0:?}")]
    Timeout(Duration),

    #[error("assistant request failed: {0}")]
    Transport(String),

    #[error("assistant sent an unreadable reply: {0}")]
    InvalidResponse(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Material sent for a code review
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    /// Working tree diff, or the file content when the diff is trivial
    pub file_content: String,
    pub repo_info: RepositoryContext,
}

#[async_trait]
pub trait AssistantGateway: Send + Sync {
    async fn ask(&self, text: &str) -> Result<String, AssistantError>;
    async fn review(&self, request: &ReviewRequest) -> Result<String, AssistantError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Serialize)]
struct ReviewForm<'a> {
    file_content: &'a str,
    repo_info: String,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    ai_response: Option<String>,
}

/// Gateway backed by a reqwest client with a fixed request timeout
#[derive(Debug, Clone)]
pub struct HttpAssistant {
    client: reqwest::Client,
    url: String,
    review_url: String,
    timeout: Duration,
}

impl HttpAssistant {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AssistantError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssistantError::Client(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            review_url: AssistantSection::default().review_url,
            timeout,
        })
    }

    pub fn from_config(section: &AssistantSection) -> Result<Self, AssistantError> {
        Ok(Self::new(section.url.clone(), section.timeout())?
            .with_review_url(section.review_url.clone()))
    }

    pub fn with_review_url(mut self, review_url: impl Into<String>) -> Self {
        self.review_url = review_url.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AssistantGateway for HttpAssistant {
    async fn ask(&self, text: &str) -> Result<String, AssistantError> {
        debug!("Forwarding question to assistant at {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&ChatRequest { message: text })
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssistantError::Unavailable(status.as_u16()));
        }

        let reply: ChatReply = response.json().await.map_err(|e| {
            if e.is_timeout() {
                AssistantError::Timeout(self.timeout)
            } else {
                AssistantError::InvalidResponse(e.to_string())
            }
        })?;

        Ok(reply
            .ai_response
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| NO_RESPONSE.to_string()))
    }

    async fn review(&self, request: &ReviewRequest) -> Result<String, AssistantError> {
        debug!("Sending review request to {}", self.review_url);

        let repo_info = serde_json::to_string(&request.repo_info)
            .map_err(|e| AssistantError::Client(e.to_string()))?;
        let response = self
            .client
            .post(&self.review_url)
            .form(&ReviewForm {
                file_content: &request.file_content,
                repo_info,
            })
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssistantError::Unavailable(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        if body.trim().is_empty() {
            return Ok(NO_RESPONSE.to_string());
        }
        Ok(body)
    }
}

impl HttpAssistant {
    fn classify(&self, e: reqwest::Error) -> AssistantError {
        if e.is_timeout() {
            AssistantError::Timeout(self.timeout)
        } else {
            AssistantError::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replies with a fixed answer (or fails) and records every question
    #[derive(Default)]
    pub struct ScriptedAssistant {
        pub reply: String,
        pub fail: bool,
        /// Simulated latency, used to observe overlapping calls
        pub delay: Option<Duration>,
        questions: Mutex<Vec<String>>,
        reviews: Mutex<Vec<ReviewRequest>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedAssistant {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                ..Default::default()
            }
        }

        /// Replies after `delay`, so overlapping calls become observable
        pub fn delayed(reply: &str, delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::replying(reply)
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn questions(&self) -> Vec<String> {
            self.questions.lock().unwrap().clone()
        }

        pub fn reviews(&self) -> Vec<ReviewRequest> {
            self.reviews.lock().unwrap().clone()
        }

        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AssistantGateway for ScriptedAssistant {
        async fn ask(&self, text: &str) -> Result<String, AssistantError> {
            self.questions.lock().unwrap().push(text.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail {
                Err(AssistantError::Unavailable(500))
            } else {
                Ok(self.reply.clone())
            }
        }

        async fn review(&self, request: &ReviewRequest) -> Result<String, AssistantError> {
            self.reviews.lock().unwrap().push(request.clone());
            if self.fail {
                Err(AssistantError::Unavailable(503))
            } else {
                Ok(self.reply.clone())
            }
        }
    }
}
