use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::config::Config;

// The assistants surface is still versioned behind a beta header.
const BETA_HEADER: &str = "OpenAI-Beta";
const BETA_VERSION: &str = "assistants=v2";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("assistants API returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Remote persona record. Created once per session; only the id is used
/// afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct Assistant {
    pub id: String,
    pub name: Option<String>,
    pub model: String,
}

/// Remote conversation container.
#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One content block of a thread message. The service can attach image or
/// tool blocks; the chat only renders text.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: TextContent },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TextContent {
    pub value: String,
}

/// One entry in a remote thread, immutable once created.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: Role,
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Message listing for a thread. The service returns newest first.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageList {
    pub data: Vec<ThreadMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Expired,
    Incomplete,
}

impl RunStatus {
    /// Whether the run has stopped processing. `RequiresAction` counts as
    /// terminal here: the chat never submits tool outputs, so such a run can
    /// only be abandoned.
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling
        )
    }

    pub fn is_success(self) -> bool {
        self == RunStatus::Completed
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    pub code: Option<String>,
    pub message: String,
}

/// Remote execution record for one assistant turn.
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

#[derive(Debug, Serialize)]
struct CreateAssistantRequest<'a> {
    name: &'a str,
    instructions: &'a str,
    tools: Vec<ToolSpec>,
    model: &'a str,
}

#[derive(Debug, Serialize)]
struct ToolSpec {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct CreateMessageRequest<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateRunRequest<'a> {
    assistant_id: &'a str,
}

/// Typed client for the hosted assistants API. Cheap to clone; constructed
/// once at startup and passed to whatever needs it.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.api_base_url, &config.api_key)
    }

    pub async fn create_assistant(
        &self,
        name: &str,
        instructions: &str,
        model: &str,
    ) -> Result<Assistant, ApiError> {
        debug!(%name, %model, "creating assistant");
        self.post_json(
            "/assistants",
            &CreateAssistantRequest {
                name,
                instructions,
                tools: vec![ToolSpec {
                    kind: "code_interpreter",
                }],
                model,
            },
        )
        .await
    }

    pub async fn create_thread(&self) -> Result<Thread, ApiError> {
        debug!("creating thread");
        self.post_json("/threads", &serde_json::json!({})).await
    }

    pub async fn create_message(
        &self,
        thread_id: &str,
        text: &str,
    ) -> Result<ThreadMessage, ApiError> {
        debug!(%thread_id, "appending user message");
        self.post_json(
            &format!("/threads/{thread_id}/messages"),
            &CreateMessageRequest {
                role: Role::User,
                content: text,
            },
        )
        .await
    }

    pub async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, ApiError> {
        debug!(%thread_id, %assistant_id, "starting run");
        self.post_json(
            &format!("/threads/{thread_id}/runs"),
            &CreateRunRequest { assistant_id },
        )
        .await
    }

    pub async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ApiError> {
        self.get_json(&format!("/threads/{thread_id}/runs/{run_id}"))
            .await
    }

    pub async fn list_messages(&self, thread_id: &str) -> Result<MessageList, ApiError> {
        self.get_json(&format!("/threads/{thread_id}/messages"))
            .await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Http {
                url: url.clone(),
                source,
            })?;
        decode(url, response).await
    }

    async fn get_json<T>(&self, path: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_VERSION)
            .send()
            .await
            .map_err(|source| ApiError::Http {
                url: url.clone(),
                source,
            })?;
        decode(url, response).await
    }
}

async fn decode<T>(url: String, response: reqwest::Response) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read error body".to_string());
        error!(%status, %url, "assistants API request failed");
        return Err(ApiError::Status { status, body });
    }
    response
        .json::<T>()
        .await
        .map_err(|source| ApiError::Decode { url, source })
}
