use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, Result};
use crate::types::ModelId;

pub const SUMMARY_SYSTEM_PROMPT: &str = "You are an experienced product analyst. You distill \
app store reviews into clear, specific findings a product team can act on. \
Respond with markdown bullet points only.";

pub const RECOMMENDATION_SYSTEM_PROMPT: &str = "You are an experienced product strategist. \
Given summaries of user feedback for an app, you propose concrete, prioritized product \
improvements. Respond with markdown bullet points only.";

/// The external text-completion capability. One call, one generated text;
/// failures surface to the caller untouched and are never retried here.
#[async_trait]
pub trait CompletionApi: Send + Sync {
    async fn complete(&self, system: &str, user: &str, model: ModelId) -> Result<String>;
}

/// Chat-completions client. Holds the key for the whole process lifetime;
/// requests without a configured key fail upstream with the provider's
/// authentication message.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(api_url: String, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[async_trait]
impl CompletionApi for OpenAiClient {
    async fn complete(&self, system: &str, user: &str, model: ModelId) -> Result<String> {
        let body = ChatRequest {
            model: model.as_str(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        debug!(model = %model, user_chars = user.len(), "sending completion request");

        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            // Auth and quota failures arrive as JSON bodies worth relaying.
            let detail = resp.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "completion request failed with status {status}: {detail}"
            )));
        }

        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::Upstream("completion response contained no choices".to_string()))
    }
}

/// Summarize one prepared review prompt.
pub async fn summarize(api: &dyn CompletionApi, prompt: &str, model: ModelId) -> Result<String> {
    api.complete(SUMMARY_SYSTEM_PROMPT, prompt, model).await
}

/// Turn the run's summaries into product recommendations.
pub async fn recommend(
    api: &dyn CompletionApi,
    summaries: &[&str],
    app_name: Option<&str>,
    model: ModelId,
) -> Result<String> {
    let name = app_name.unwrap_or("the app");
    let mut user = format!("Here are summaries of recent user feedback for {name}:\n\n");
    for summary in summaries {
        user.push_str(summary);
        user.push_str("\n\n");
    }
    user.push_str(
        "Based on this feedback, which product improvements would have the most impact? \
Recommend specific changes.",
    );

    api.complete(RECOMMENDATION_SYSTEM_PROMPT, &user, model).await
}
