//! Stateful assistant protocol: thread, messages, run, poll, read reply.

use std::fmt;
use std::future::Future;

use crate::config::ProviderConfig;
use crate::http::{decode_json, ensure_success, request_with_retry, RetryPolicy};
use crate::providers::{ChatCompletion, ChatMessage, ChatRequest, LlmProvider, Role, Usage};
use crate::RecipeError;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::sleep;

const SERVICE: &str = "assistant";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Expired,
    RequiresAction,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Statuses after which polling stops. Tool calls are not supported, so
    /// `requires_action` ends the run as well.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed
                | RunStatus::Failed
                | RunStatus::Cancelled
                | RunStatus::Expired
                | RunStatus::RequiresAction
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Deserialize)]
struct ThreadMessage {
    role: Role,
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text {
        text: TextValue,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct TextValue {
    value: String,
}

pub struct AssistantProvider {
    client: Client,
    api_key: String,
    base_url: String,
    assistant_id: String,
    max_poll_attempts: u32,
    retry: RetryPolicy,
}

impl AssistantProvider {
    /// Create a new assistant provider from configuration
    pub fn new(config: &ProviderConfig) -> Result<Self, RecipeError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| RecipeError::MissingCredentials("OPENAI_API_KEY".to_string()))?;
        let assistant_id = config
            .assistant_id
            .clone()
            .ok_or_else(|| RecipeError::Provider("assistant provider requires assistant_id".to_string()))?;

        Ok(AssistantProvider {
            client: Client::new(),
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            assistant_id,
            max_poll_attempts: config.max_poll_attempts,
            retry: RetryPolicy::default(),
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String, assistant_id: String) -> Self {
        AssistantProvider {
            client: Client::new(),
            api_key,
            base_url,
            assistant_id,
            max_poll_attempts: 10,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts;
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/v1{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    pub async fn create_thread(&self) -> Result<String, RecipeError> {
        let response = request_with_retry(&self.retry, || {
            self.request(reqwest::Method::POST, "/threads").json(&json!({}))
        })
        .await?;
        let created: Created = decode_json(SERVICE, ensure_success(SERVICE, response).await?).await?;
        debug!("Created thread {}", created.id);
        Ok(created.id)
    }

    pub async fn add_message(&self, thread_id: &str, message: &ChatMessage) -> Result<(), RecipeError> {
        let path = format!("/threads/{thread_id}/messages");
        let body = json!({ "role": message.role, "content": message.content });
        let response = request_with_retry(&self.retry, || {
            self.request(reqwest::Method::POST, &path).json(&body)
        })
        .await?;
        ensure_success(SERVICE, response).await?;
        Ok(())
    }

    pub async fn create_run(&self, thread_id: &str, instructions: Option<&str>) -> Result<Run, RecipeError> {
        let path = format!("/threads/{thread_id}/runs");
        let mut body = json!({ "assistant_id": self.assistant_id });
        if let Some(instructions) = instructions {
            body["additional_instructions"] = json!(instructions);
        }
        let response = request_with_retry(&self.retry, || {
            self.request(reqwest::Method::POST, &path).json(&body)
        })
        .await?;
        decode_json(SERVICE, ensure_success(SERVICE, response).await?).await
    }

    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, RecipeError> {
        let path = format!("/threads/{thread_id}/runs/{run_id}");
        let response =
            request_with_retry(&self.retry, || self.request(reqwest::Method::GET, &path)).await?;
        decode_json(SERVICE, ensure_success(SERVICE, response).await?).await
    }

    /// Poll `run` with the retry backoff cadence until it finishes.
    pub async fn wait_for_run(&self, thread_id: &str, run: Run) -> Result<Run, RecipeError> {
        let run_id = run.id.clone();
        poll_until_terminal(&self.retry, self.max_poll_attempts, run, || {
            self.get_run(thread_id, &run_id)
        })
        .await
    }

    /// Text of the newest assistant message on the thread.
    pub async fn latest_message(&self, thread_id: &str) -> Result<String, RecipeError> {
        let path = format!("/threads/{thread_id}/messages");
        let response = request_with_retry(&self.retry, || {
            self.request(reqwest::Method::GET, &path)
                .query(&[("order", "desc"), ("limit", "1")])
        })
        .await?;
        let list: MessageList = decode_json(SERVICE, ensure_success(SERVICE, response).await?).await?;

        list.data
            .into_iter()
            .find(|m| m.role == Role::Assistant)
            .map(|m| {
                m.content
                    .into_iter()
                    .filter_map(|part| match part {
                        ContentPart::Text { text } => Some(text.value),
                        ContentPart::Other => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| RecipeError::invalid_response(SERVICE, "thread has no assistant reply"))
    }
}

/// Re-fetch `run` until it reaches a terminal status, at most `max_attempts` times.
pub(crate) async fn poll_until_terminal<F, Fut>(
    policy: &RetryPolicy,
    max_attempts: u32,
    mut run: Run,
    mut fetch: F,
) -> Result<Run, RecipeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Run, RecipeError>>,
{
    let mut attempt = 0;
    while !run.status.is_terminal() {
        if attempt >= max_attempts {
            return Err(RecipeError::PollExhausted {
                run_id: run.id,
                attempts: max_attempts,
            });
        }
        sleep(policy.delay_for(attempt)).await;
        run = fetch().await?;
        debug!("Run {} is {} after {} polls", run.id, run.status, attempt + 1);
        attempt += 1;
    }

    match run.status {
        RunStatus::Completed => Ok(run),
        status => Err(RecipeError::RunFailed {
            run_id: run.id,
            status: status.to_string(),
        }),
    }
}

#[async_trait]
impl LlmProvider for AssistantProvider {
    fn provider_name(&self) -> &str {
        SERVICE
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, RecipeError> {
        let thread_id = self.create_thread().await?;
        for message in request.messages.iter().filter(|m| m.role != Role::System) {
            self.add_message(&thread_id, message).await?;
        }

        let instructions = request.system_prompt();
        let run = self.create_run(&thread_id, instructions.as_deref()).await?;
        let run = self.wait_for_run(&thread_id, run).await?;
        let message = self.latest_message(&thread_id).await?;
        info!("Assistant run {} completed on thread {}", run.id, thread_id);

        Ok(ChatCompletion {
            message,
            usage: run.usage,
        })
    }
}
