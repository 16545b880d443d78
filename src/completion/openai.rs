use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CompletionModel, CompletionResult, Message, Role, Usage};

/// OpenAI-compatible chat completion model.
pub struct OpenAICompletionModel {
    model_name: String,
    api_key: String,
    endpoint: String,
    default_max_tokens: u32,
    default_temperature: f64,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageResponse>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct UsageResponse {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl OpenAICompletionModel {
    pub fn new(
        api_base: &str,
        model_name: &str,
        api_key: &str,
        default_max_tokens: u32,
        default_temperature: f64,
    ) -> Self {
        Self {
            model_name: model_name.to_string(),
            api_key: api_key.to_string(),
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            default_max_tokens,
            default_temperature,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CompletionModel for OpenAICompletionModel {
    async fn complete(
        &self,
        messages: &[Message],
        max_tokens: Option<u32>,
        temperature: Option<f64>,
    ) -> anyhow::Result<CompletionResult> {
        let request = ChatRequest {
            model: &self.model_name,
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            max_tokens: Some(max_tokens.unwrap_or(self.default_max_tokens)),
            temperature: Some(temperature.unwrap_or(self.default_temperature)),
        };

        debug!(
            "Sending {} message(s) to {} ({})",
            messages.len(),
            self.endpoint,
            self.model_name
        );

        let resp = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI completion API error ({status}): {body}");
        }

        let response: ChatResponse = resp.json().await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let usage = response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(CompletionResult { content, usage })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
