//! Gemini provider (Google Generative Language API).
//!
//! Uses the non-streaming `generateContent` endpoint: one prompt in, the
//! complete reply out.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Value, json};
use tracing::debug;

use super::GenerationProvider;
use super::shared::{
    ProviderError, USER_AGENT, classify_reqwest_error, resolve_api_key, resolve_base_url,
};
use crate::config::Config;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Finish reasons that mean the candidate was withheld.
const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "RECITATION", "LANGUAGE", "BLOCKLIST"];

/// Gemini API configuration.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_output_tokens: Option<u32>,
    pub system_prompt: Option<String>,
    /// Whole-request timeout (None waits indefinitely)
    pub timeout: Option<Duration>,
}

impl GeminiConfig {
    /// Builds the provider config from the loaded app config.
    ///
    /// Authentication resolution order:
    /// 1. `[providers.gemini].api_key` in the config file
    /// 2. `GEMINI_API_KEY` environment variable
    ///
    /// `GEMINI_BASE_URL` overrides `[providers.gemini].base_url`.
    ///
    /// # Errors
    /// Returns an error if no API key is available or the base URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let gemini = &config.providers.gemini;
        let api_key = resolve_api_key(gemini.effective_api_key(), "GEMINI_API_KEY", "gemini")?;
        let base_url = resolve_base_url(
            gemini.effective_base_url(),
            "GEMINI_BASE_URL",
            DEFAULT_BASE_URL,
            "Gemini",
        )?;

        Ok(Self {
            api_key,
            base_url,
            model: config.model.clone(),
            max_output_tokens: config.max_output_tokens,
            system_prompt: config.effective_system_prompt().map(str::to_string),
            timeout: config.request_timeout(),
        })
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("system_prompt", &self.system_prompt)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Gemini client.
pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("build HTTP client")?;
        Ok(Self { config, http })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Sends `prompt` and returns the concatenated text of the first candidate.
    ///
    /// # Errors
    /// Returns a [`ProviderError`] for transport failures, non-2xx statuses,
    /// unparsable bodies and blocked prompts or candidates.
    pub async fn generate_content(&self, prompt: &str) -> Result<String> {
        let request = build_request(
            prompt,
            self.config.system_prompt.as_deref(),
            self.config.max_output_tokens,
        );
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        debug!(model = %self.config.model, prompt_len = prompt.len(), "sending generateContent");

        let response = self
            .http
            .post(&url)
            .headers(build_headers(&self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        if !status.is_success() {
            return Err(ProviderError::http_status(status.as_u16(), &body).into());
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            ProviderError::parse(format!("Invalid Gemini response JSON: {e}")).with_details(&body)
        })?;
        let text = extract_text(&value)?;
        debug!(reply_len = text.len(), "generateContent finished");
        Ok(text)
    }
}

impl GenerationProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_content(prompt).await
    }
}

fn build_request(prompt: &str, system_prompt: Option<&str>, max_output_tokens: Option<u32>) -> Value {
    let mut request = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt }]
        }]
    });

    if let Some(system) = system_prompt {
        request["systemInstruction"] = json!({
            "parts": [{ "text": system }]
        });
    }
    if let Some(max) = max_output_tokens {
        request["generationConfig"] = json!({ "maxOutputTokens": max });
    }

    request
}

fn extract_text(value: &Value) -> Result<String, ProviderError> {
    if let Some(reason) = value
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        return Err(ProviderError::api_error(
            "prompt_blocked",
            &format!("prompt was blocked ({reason})"),
        ));
    }

    let candidate = value
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .ok_or_else(|| {
            ProviderError::parse("Gemini response has no candidates").with_details(value.to_string())
        })?;

    if let Some(reason) = candidate.get("finishReason").and_then(Value::as_str)
        && BLOCKING_FINISH_REASONS.contains(&reason)
    {
        return Err(ProviderError::api_error(
            "candidate_blocked",
            &format!("response was withheld ({reason})"),
        ));
    }

    let text = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter(|part| !part.get("thought").and_then(Value::as_bool).unwrap_or(false))
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default();

    Ok(text)
}

fn build_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-goog-api-key",
        HeaderValue::from_str(api_key).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    headers.insert("accept", HeaderValue::from_static("application/json"));
    headers.insert("content-type", HeaderValue::from_static("application/json"));
    headers
}
