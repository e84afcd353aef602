use crate::config::Settings;
use crate::error::{PipelineError, Result};
use crate::services::ai_types::ModelVariant;

use rand::{thread_rng, Rng};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};

use std::{thread, time::Duration};

const SERVICE: &str = "language model";
const BASE_DELAY_MS: u64 = 800;
const TIMEOUT_SECS: u64 = 120;
const TEMPERATURE: f64 = 0.3;

/// A model that answers one system + user exchange with a JSON object.
///
/// Implementations return the raw reply text; parsing it is the caller's
/// job so that malformed replies can be reported against the word.
pub trait LanguageModel {
    fn complete_json(&self, system: &str, user: &str) -> Result<String>;

    fn name(&self) -> &str;
}

/// OpenAI-compatible HTTP client (OpenAI, DeepSeek and friends).
pub struct ChatClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    variant: ModelVariant,
    max_attempts: usize,
}

impl ChatClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_api_key()?.to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            variant: settings.variant,
            max_attempts: settings.max_attempts.max(1),
        })
    }

    fn send(&self, body: &Value) -> Result<String> {
        let endpoint = endpoint_for(&self.base_url, self.variant);
        let mut last_err = String::from("no attempt made");

        for attempt in 0..self.max_attempts {
            let retry_left = attempt + 1 < self.max_attempts;

            let res = self
                .client
                .post(&endpoint)
                .bearer_auth(&self.api_key)
                .json(body)
                .send();

            match res {
                Ok(resp) => {
                    let status = resp.status();

                    // Read as text first so an error body is not lost when it isn't JSON.
                    let text = match resp.text() {
                        Ok(t) => t,
                        Err(err) => {
                            last_err = err.to_string();
                            if retry_left {
                                thread::sleep(backoff(attempt));
                                continue;
                            }
                            break;
                        }
                    };

                    if !status.is_success() {
                        last_err = extract_error_message(status, &text);
                        if should_retry_http(status) && retry_left {
                            log::warn!("{SERVICE}: {last_err}; retrying");
                            thread::sleep(backoff(attempt));
                            continue;
                        }
                        break;
                    }

                    return Ok(text);
                }
                Err(err) => {
                    last_err = err.to_string();
                    if retry_left {
                        log::warn!("{SERVICE}: {last_err}; retrying");
                        thread::sleep(backoff(attempt));
                        continue;
                    }
                }
            }
        }

        Err(PipelineError::remote(SERVICE, last_err))
    }
}

impl LanguageModel for ChatClient {
    fn complete_json(&self, system: &str, user: &str) -> Result<String> {
        let body = request_body(self.variant, &self.model, system, user);
        let text = self.send(&body)?;

        let envelope: Value = serde_json::from_str(&text)
            .map_err(|e| PipelineError::remote(SERVICE, format!("invalid JSON envelope: {e}")))?;

        extract_reply(self.variant, &envelope).ok_or_else(|| {
            PipelineError::remote(
                SERVICE,
                match self.variant {
                    ModelVariant::Chat => "missing choices[0].message.content",
                    ModelVariant::Reasoning { .. } => "missing output text",
                },
            )
        })
    }

    fn name(&self) -> &str {
        &self.model
    }
}

fn backoff(attempt: usize) -> Duration {
    let jitter: u64 = thread_rng().gen_range(0..200);
    let ms = BASE_DELAY_MS * (2_u64.pow(attempt as u32)) + jitter;
    Duration::from_millis(ms)
}

pub fn endpoint_for(base_url: &str, variant: ModelVariant) -> String {
    let base = base_url.trim_end_matches('/');
    match variant {
        ModelVariant::Chat => format!("{base}/chat/completions"),
        ModelVariant::Reasoning { .. } => format!("{base}/responses"),
    }
}

pub fn request_body(variant: ModelVariant, model: &str, system: &str, user: &str) -> Value {
    let messages = json!([
        { "role": "system", "content": system },
        { "role": "user", "content": user }
    ]);

    match variant {
        ModelVariant::Chat => json!({
            "model": model,
            "messages": messages,
            "temperature": TEMPERATURE,
            "response_format": { "type": "json_object" }
        }),
        ModelVariant::Reasoning { effort } => json!({
            "model": model,
            "input": messages,
            "reasoning": { "effort": effort.as_str() },
            "text": { "format": { "type": "json_object" } },
            "temperature": TEMPERATURE
        }),
    }
}

/// Pull the assistant text out of a provider envelope.
pub fn extract_reply(variant: ModelVariant, envelope: &Value) -> Option<String> {
    match variant {
        ModelVariant::Chat => envelope
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string),
        ModelVariant::Reasoning { .. } => {
            if let Some(t) = envelope.get("output_text").and_then(|t| t.as_str()) {
                return Some(t.to_string());
            }

            let mut out = String::new();
            for item in envelope.get("output")?.as_array()? {
                if item.get("type").and_then(|t| t.as_str()) != Some("message") {
                    continue;
                }
                let Some(parts) = item.get("content").and_then(|c| c.as_array()) else {
                    continue;
                };
                for part in parts {
                    if part.get("type").and_then(|t| t.as_str()) == Some("output_text") {
                        if let Some(t) = part.get("text").and_then(|t| t.as_str()) {
                            out.push_str(t);
                        }
                    }
                }
            }

            if out.is_empty() {
                None
            } else {
                Some(out)
            }
        }
    }
}

fn should_retry_http(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

/// `{ "error": { "message": .. } }`, `{ "message": .. }`, or a body snippet.
pub fn extract_error_message(status: StatusCode, body_text: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(body_text) {
        if let Some(msg) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return format!("HTTP {}: {}", status.as_u16(), msg);
        }
        if let Some(msg) = v.get("message").and_then(|m| m.as_str()) {
            return format!("HTTP {}: {}", status.as_u16(), msg);
        }
    }

    let trimmed = body_text.trim();
    let snippet = if trimmed.chars().count() > 400 {
        format!("{}...", trimmed.chars().take(400).collect::<String>())
    } else {
        trimmed.to_string()
    };

    format!("HTTP {}: {}", status.as_u16(), snippet)
}
