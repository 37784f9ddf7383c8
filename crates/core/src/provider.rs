use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::error::{RecapError, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Provider {
    #[default]
    Grok,
    Openai,
    Gemini,
}

pub struct ProviderConfig {
    pub api_url: &'static str,
    pub model: &'static str,
    pub env_var: &'static str,
}

impl Provider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            Provider::Grok => ProviderConfig {
                api_url: "https://api.x.ai/v1/chat/completions",
                model: "grok-4-fast",
                env_var: "XAI_API_KEY",
            },
            Provider::Openai => ProviderConfig {
                api_url: "https://api.openai.com/v1/chat/completions",
                model: "gpt-4o",
                env_var: "OPENAI_API_KEY",
            },
            Provider::Gemini => ProviderConfig {
                api_url: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                model: "gemini-2.5-flash",
                env_var: "GEMINI_API_KEY",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Grok => "Grok",
            Provider::Openai => "OpenAI",
            Provider::Gemini => "Gemini",
        }
    }

    /// Validate that the API key is set for this provider
    pub fn validate_api_key(&self) -> Result<String> {
        let config = self.config();
        std::env::var(config.env_var).map_err(|_| RecapError::MissingApiKey {
            env_var: config.env_var.to_string(),
        })
    }
}

impl FromStr for Provider {
    type Err = RecapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "grok" | "xai" => Ok(Provider::Grok),
            "openai" => Ok(Provider::Openai),
            "gemini" => Ok(Provider::Gemini),
            other => Err(RecapError::invalid_input(format!("unknown provider '{other}'"))),
        }
    }
}

/// One system + user exchange with fixed sampling settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Raw text of the model's answer.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// OpenAI-compatible `/chat/completions` client.
pub struct ChatCompletionsBackend {
    client: reqwest::Client,
    provider: Provider,
    model: String,
    api_key: String,
}

impl ChatCompletionsBackend {
    pub fn new(client: reqwest::Client, provider: Provider, model: Option<String>) -> Result<Self> {
        let api_key = provider.validate_api_key()?;
        let model = model.unwrap_or_else(|| provider.config().model.to_string());
        Ok(Self {
            client,
            provider,
            model,
            api_key,
        })
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionBackend for ChatCompletionsBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let config = self.provider.config();
        debug!(provider = self.provider.name(), model = %self.model, "sending completion request");

        let response = self
            .client
            .post(config.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": &self.model,
                "messages": [
                    {
                        "role": "system",
                        "content": &request.system,
                    },
                    {
                        "role": "user",
                        "content": &request.user,
                    },
                ],
                "temperature": request.temperature,
                "max_tokens": request.max_tokens,
                "response_format": {"type": "json_object"},
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecapError::SummarizationFailed {
                reason: format!("{} answered {}: {}", self.provider.name(), status, body),
            });
        }

        let response = response.json::<serde_json::Value>().await?;

        // Extract content from response
        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| RecapError::SummarizationFailed {
                reason: format!("Invalid API response: {:?}", response),
            })?;

        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers_parse_case_insensitively() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::Openai);
        assert_eq!("xai".parse::<Provider>().unwrap(), Provider::Grok);
        assert_eq!("gemini".parse::<Provider>().unwrap(), Provider::Gemini);
        assert!("claude-ish".parse::<Provider>().unwrap_err().is_client_error());
    }

    #[test]
    fn every_provider_names_its_key_variable() {
        for provider in [Provider::Grok, Provider::Openai, Provider::Gemini] {
            assert!(provider.config().env_var.ends_with("_API_KEY"));
        }
    }
}
