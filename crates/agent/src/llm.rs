use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use hcplog_core::config::LlmConfig;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Client for any OpenAI-compatible `chat/completions` endpoint (Groq,
/// OpenAI, Ollama).
pub struct HttpLlmClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build llm http client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.resolved_base_url()),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            temperature: 0.0,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut request = self.client.post(&self.endpoint).json(&self.request_body(prompt));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("llm request to {} failed", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("llm provider returned {status}: {}", truncate(&body, 200));
        }

        let body: ChatCompletionResponse =
            response.json().await.context("llm response was not a chat completion")?;

        first_choice_content(body)
    }
}

fn first_choice_content(body: ChatCompletionResponse) -> Result<String> {
    body.choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or_else(|| anyhow!("llm response contained no choices"))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use hcplog_core::config::{AppConfig, LlmProvider};
    use serde_json::json;

    use super::{first_choice_content, truncate, ChatCompletionResponse, HttpLlmClient};

    fn ollama_config() -> hcplog_core::config::LlmConfig {
        let mut config = AppConfig::default().llm;
        config.provider = LlmProvider::Ollama;
        config.model = "llama3.1".to_string();
        config
    }

    #[test]
    fn endpoint_is_derived_from_provider_base_url() {
        let client = HttpLlmClient::from_config(&ollama_config()).expect("client");
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/chat/completions");
        assert_eq!(client.model(), "llama3.1");

        let mut config = ollama_config();
        config.base_url = Some("https://llm.internal.example/v1/".to_string());
        let client = HttpLlmClient::from_config(&config).expect("client");
        assert_eq!(client.endpoint(), "https://llm.internal.example/v1/chat/completions");
    }

    #[test]
    fn request_body_sends_prompt_as_single_user_message() {
        let client = HttpLlmClient::from_config(&ollama_config()).expect("client");
        let body = serde_json::to_value(client.request_body("Return JSON only.")).expect("json");

        assert_eq!(
            body,
            json!({
                "model": "llama3.1",
                "messages": [{ "role": "user", "content": "Return JSON only." }],
                "temperature": 0.0,
            })
        );
    }

    #[test]
    fn first_choice_is_used_and_empty_choices_fail() {
        let body: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [
                { "message": { "role": "assistant", "content": "- Call back" } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ]
        }))
        .expect("parse");
        assert_eq!(first_choice_content(body).expect("content"), "- Call back");

        let empty: ChatCompletionResponse =
            serde_json::from_value(json!({ "choices": [] })).expect("parse");
        assert!(first_choice_content(empty).is_err());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }
}
