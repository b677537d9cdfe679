//! # OpenRouter Text Generator
//!
//! Requests slide texts from the OpenRouter chat completions API. Models are
//! tried in order with a jittered exponential delay between attempts, and a
//! circuit breaker stops calling the provider after repeated failed
//! generations.

use async_trait::async_trait;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::fallback::fit_slide_count;
use super::{SlideContent, TextGenerator};
use crate::circuit_breaker::CircuitBreaker;
use crate::config::{AiConfig, AiRecoveryConfig};
use crate::errors::AiError;
use crate::localization::t_lang;

const TEMPERATURE: f32 = 0.7;
const MAX_BULLETS: usize = 5;

lazy_static! {
    static ref FENCE_START: Regex =
        Regex::new(r"^```(?:json)?\s*").expect("Fence start pattern should be valid");
    static ref FENCE_END: Regex =
        Regex::new(r"\s*```$").expect("Fence end pattern should be valid");
    static ref JSON_OBJECT: Regex =
        Regex::new(r"(?s)\{.*\}").expect("JSON object pattern should be valid");
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    reasoning: ReasoningOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ReasoningOptions {
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// OpenRouter chat completions client
pub struct OpenRouterClient {
    http: reqwest::Client,
    config: AiConfig,
    circuit_breaker: CircuitBreaker,
}

impl OpenRouterClient {
    pub fn new(config: AiConfig) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.recovery.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            circuit_breaker: CircuitBreaker::new(&config.recovery),
            config,
        })
    }

    async fn request_model(
        &self,
        model: &str,
        topic: &str,
        slide_count: u32,
        language: &str,
    ) -> Result<Vec<SlideContent>, AiError> {
        let prompt = build_prompt(topic, slide_count, language);
        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are an expert at writing presentations.",
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: TEMPERATURE,
            reasoning: ReasoningOptions { enabled: false },
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response: ChatResponse = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        parse_slides(&content, topic, slide_count, language)
    }
}

#[async_trait]
impl TextGenerator for OpenRouterClient {
    async fn generate_slides(
        &self,
        topic: &str,
        slide_count: u32,
        language: &str,
    ) -> Result<Vec<SlideContent>, AiError> {
        if !self.config.is_enabled() {
            return Err(AiError::MissingCredential);
        }
        if self.circuit_breaker.is_open() {
            debug!("Circuit breaker open, skipping AI provider");
            return Err(AiError::CircuitOpen);
        }

        let attempts = self.config.recovery.max_model_attempts.max(1) as usize;
        let mut last_error = AiError::InvalidResponse("no models configured".to_string());

        for (attempt, model) in self.config.models.iter().take(attempts).enumerate() {
            if attempt > 0 {
                let delay = calculate_retry_delay(attempt as u32, &self.config.recovery);
                debug!(model = %model, delay_ms = delay, "Waiting before next model");
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.request_model(model, topic, slide_count, language).await {
                Ok(slides) => {
                    self.circuit_breaker.record_success();
                    info!(model = %model, slides = slides.len(), "Slides generated via OpenRouter");
                    return Ok(slides);
                }
                Err(e) => {
                    warn!(model = %model, error = %e, "OpenRouter generation failed");
                    last_error = e;
                }
            }
        }

        self.circuit_breaker.record_failure();
        Err(last_error)
    }
}

/// Delay before the `attempt`-th retry in milliseconds
///
/// Exponential in the attempt number, capped at `max_retry_delay_ms`, with up
/// to 10% random jitter on top.
pub fn calculate_retry_delay(attempt: u32, recovery: &AiRecoveryConfig) -> u64 {
    let exponent = attempt.saturating_sub(1).min(16);
    let delay = recovery
        .base_retry_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(recovery.max_retry_delay_ms);

    let jitter = rand::thread_rng().gen_range(0..=delay / 10);
    delay + jitter
}

pub fn build_prompt(topic: &str, slide_count: u32, language: &str) -> String {
    let language_name = t_lang("language-name", Some(language));
    format!(
        "Write the text of a presentation in {language_name}.\n\
         Topic: {topic}\n\
         Number of slides: {slide_count}\n\n\
         Return a strict JSON object without markdown or any extra text.\n\
         Format:\n\
         {{\n  \"slides\": [\n    {{\"title\": \"Title\", \"bullets\": [\"point 1\", \"point 2\", \"point 3\"]}}\n  ]\n}}\n\n\
         Requirements:\n\
         - Exactly {slide_count} items in slides.\n\
         - 3-5 short bullets per slide.\n\
         - Bullets must be concrete, without generic phrases."
    )
}

/// Pull the JSON object out of a model reply
///
/// Markdown code fences are stripped; when the rest is not valid JSON the
/// first `{...}` block is tried.
pub fn extract_json(payload: &str) -> Result<Value, AiError> {
    let mut raw = payload.trim().to_string();
    if raw.starts_with("```") {
        raw = FENCE_START.replace(&raw, "").into_owned();
        raw = FENCE_END.replace(&raw, "").into_owned();
    }

    if let Ok(value) = serde_json::from_str(&raw) {
        return Ok(value);
    }

    let block = JSON_OBJECT
        .find(&raw)
        .ok_or_else(|| AiError::InvalidResponse("response does not contain JSON".to_string()))?;
    serde_json::from_str(block.as_str()).map_err(|e| AiError::InvalidResponse(e.to_string()))
}

/// Parse a model reply into exactly `slide_count` normalized slides
pub fn parse_slides(
    content: &str,
    topic: &str,
    slide_count: u32,
    language: &str,
) -> Result<Vec<SlideContent>, AiError> {
    let data = extract_json(content)?;
    let items = data
        .get("slides")
        .and_then(Value::as_array)
        .ok_or_else(|| AiError::InvalidResponse("missing slides array".to_string()))?;

    let lang = Some(language);
    let slides = items
        .iter()
        .take(slide_count as usize)
        .filter(|item| item.is_object())
        .map(|item| {
            let title = item.get("title").map(value_text).unwrap_or_default();
            let title = if title.is_empty() {
                t_lang("untitled-slide", lang)
            } else {
                title
            };

            let mut bullets: Vec<String> = item
                .get("bullets")
                .and_then(Value::as_array)
                .map(|raw| {
                    raw.iter()
                        .map(value_text)
                        .filter(|b| !b.is_empty())
                        .take(MAX_BULLETS)
                        .collect()
                })
                .unwrap_or_default();
            if bullets.is_empty() {
                bullets.push(t_lang("default-bullet", lang));
            }

            SlideContent { title, bullets }
        })
        .collect();

    Ok(fit_slide_count(slides, topic, slide_count, language))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_json() {
        let value = extract_json(r#"{"slides": []}"#).unwrap();
        assert!(value["slides"].is_array());
    }

    #[test]
    fn test_extract_fenced_json() {
        let value = extract_json("```json\n{\"slides\": [{\"title\": \"A\"}]}\n```").unwrap();
        assert_eq!(value["slides"][0]["title"], "A");
    }

    #[test]
    fn test_extract_embedded_json() {
        let value = extract_json("Sure! Here it is: {\"slides\": []} Enjoy.").unwrap();
        assert!(value["slides"].is_array());
    }

    #[test]
    fn test_extract_rejects_text() {
        assert!(matches!(
            extract_json("no json here"),
            Err(AiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_normalizes_slides() {
        let content = r#"{"slides": [
            {"title": "  ", "bullets": ["one", " ", "two", "three", "four", "five", "six"]},
            {"title": "Second", "bullets": []},
            "not an object",
            {"title": "Third", "bullets": [1, "x"]}
        ]}"#;

        let slides = parse_slides(content, "Topic", 4, "en").unwrap();
        assert_eq!(slides.len(), 4);
        assert_eq!(slides[0].title, "Untitled");
        assert_eq!(slides[0].bullets, vec!["one", "two", "three", "four", "five"]);
        assert_eq!(slides[1].bullets, vec!["The main idea of the slide."]);
        assert_eq!(slides[2].title, "Third");
        assert_eq!(slides[2].bullets, vec!["1", "x"]);
        // Padded from the fallback set
        assert_eq!(slides[3].title, "Topic: overview");
    }

    #[test]
    fn test_parse_truncates_extra_slides() {
        let content = r#"{"slides": [{"title": "A", "bullets": ["a"]}, {"title": "B", "bullets": ["b"]}]}"#;
        let slides = parse_slides(content, "Topic", 1, "en").unwrap();
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].title, "A");
    }

    #[test]
    fn test_parse_requires_slides_array() {
        assert!(parse_slides(r#"{"pages": []}"#, "Topic", 3, "en").is_err());
    }

    #[test]
    fn test_retry_delay_grows_and_is_capped() {
        let recovery = AiRecoveryConfig::default();

        let delay1 = calculate_retry_delay(1, &recovery);
        assert!(delay1 >= recovery.base_retry_delay_ms);
        assert!(delay1 <= recovery.base_retry_delay_ms + recovery.base_retry_delay_ms / 10);

        let delay2 = calculate_retry_delay(2, &recovery);
        assert!(delay2 >= recovery.base_retry_delay_ms * 2);

        let delay_max = calculate_retry_delay(30, &recovery);
        assert!(delay_max <= recovery.max_retry_delay_ms + recovery.max_retry_delay_ms / 10);
    }

    #[test]
    fn test_prompt_mentions_count_and_language() {
        let prompt = build_prompt("Rust", 7, "ru");
        assert!(prompt.contains("Topic: Rust"));
        assert!(prompt.contains("Exactly 7 items"));
        assert!(prompt.contains("Russian"));
    }

    #[tokio::test]
    async fn test_missing_key_fails_fast() {
        let client = OpenRouterClient::new(AiConfig::default()).unwrap();
        let err = client.generate_slides("Topic", 3, "en").await.unwrap_err();
        assert_eq!(err, AiError::MissingCredential);
    }

    #[tokio::test]
    async fn test_unreachable_provider_opens_circuit() {
        let config = AiConfig {
            api_key: "test-key".to_string(),
            models: vec!["a/model".to_string()],
            // Nothing listens on port 9 locally
            base_url: "http://127.0.0.1:9".to_string(),
            recovery: AiRecoveryConfig {
                circuit_breaker_threshold: 1,
                ..AiRecoveryConfig::default()
            },
        };
        let client = OpenRouterClient::new(config).unwrap();

        let first = client.generate_slides("Topic", 3, "en").await.unwrap_err();
        assert!(matches!(first, AiError::Http(_) | AiError::Timeout(_)));

        let second = client.generate_slides("Topic", 3, "en").await.unwrap_err();
        assert_eq!(second, AiError::CircuitOpen);
    }
}
