//! Client for OpenAI-compatible chat-completions endpoints.
//!
//! Both text collaborators (report summaries and recommendations) ask for a
//! JSON object and validate its shape before handing it to the services.

use std::time::Duration;

use resource_common::{AppError, AppResult, config::AiConfig};
use serde::{Deserialize, de::DeserializeOwned};

/// Thin wrapper over `reqwest` for JSON-mode chat completions.
#[derive(Clone)]
pub struct ChatCompletionClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl ChatCompletionClient {
    /// Build a client with the configured timeout.
    pub fn from_config(config: &AiConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// Send a system and a user prompt; decode the reply as `T`.
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> AppResult<T> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "response_format": {"type": "json_object"},
            "temperature": 0.2,
        });

        let mut request = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Completion request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Completion API error: {status} - {body}"
            )));
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("Failed to parse completion response: {e}"))
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::ExternalService("Empty completion".to_string()))?;

        parse_json_content(&content)
    }
}

/// Decode the model's reply, tolerating a surrounding code fence.
pub(crate) fn parse_json_content<T: DeserializeOwned>(content: &str) -> AppResult<T> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(unfenced.trim())
        .map_err(|e| AppError::ExternalService(format!("Unexpected completion shape: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Reply {
        summary: String,
    }

    #[test]
    fn test_parse_plain_json() {
        let reply: Reply = parse_json_content(r#"{"summary": "ok"}"#).unwrap();
        assert_eq!(reply.summary, "ok");
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply: Reply = parse_json_content("```json\n{\"summary\": \"fenced\"}\n```").unwrap();
        assert_eq!(reply.summary, "fenced");
    }

    #[test]
    fn test_parse_wrong_shape() {
        let result = parse_json_content::<Reply>(r#"{"text": "no summary"}"#);
        assert!(matches!(result, Err(AppError::ExternalService(_))));
    }

    #[test]
    fn test_from_config_trims_base_url() {
        let config = AiConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..AiConfig::default()
        };
        let client = ChatCompletionClient::from_config(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }
}
