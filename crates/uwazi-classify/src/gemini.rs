//! The Gemini `generateContent` client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use uwazi_core::classify::{Classification, Classifier};

use crate::{Error, Result, reply::parse_reply};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Connection settings for the Gemini API.
///
/// Without an `api_key` every call fails with [`Error::MissingCredentials`]
/// and submissions are labelled by the keyword fallback.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
  pub api_key:      Option<String>,
  pub model:        String,
  pub endpoint:     String,
  pub timeout_secs: u64,
}

impl Default for GeminiConfig {
  fn default() -> Self {
    Self {
      api_key:      None,
      model:        DEFAULT_MODEL.to_owned(),
      endpoint:     DEFAULT_ENDPOINT.to_owned(),
      timeout_secs: DEFAULT_TIMEOUT_SECS,
    }
  }
}

/// Labels submissions with a single `generateContent` call.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct GeminiClassifier {
  client: Client,
  config: GeminiConfig,
}

impl GeminiClassifier {
  pub fn new(config: GeminiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  fn url(&self) -> String {
    format!(
      "{}/v1beta/models/{}:generateContent",
      self.config.endpoint.trim_end_matches('/'),
      self.config.model
    )
  }

  async fn generate(&self, prompt: String) -> Result<String> {
    let api_key = self
      .config
      .api_key
      .as_deref()
      .filter(|k| !k.trim().is_empty())
      .ok_or(Error::MissingCredentials)?;

    let payload = json!({
      "contents": [{ "parts": [{ "text": prompt }] }]
    });

    let response = self
      .client
      .post(self.url())
      .header(API_KEY_HEADER, api_key)
      .json(&payload)
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(Error::Status {
        status,
        body: truncate(&body, 320),
      });
    }

    let body: Value = response.json().await?;
    Ok(reply_text(&body))
  }
}

impl Classifier for GeminiClassifier {
  type Error = Error;

  async fn classify(&self, title: &str, description: &str) -> Result<Classification> {
    let text = self.generate(prompt(title, description)).await?;
    tracing::debug!(model = %self.config.model, reply = %text, "classifier replied");
    parse_reply(&text)
  }
}

fn prompt(title: &str, description: &str) -> String {
  format!(
    "You are categorizing civic issues reported by citizens in Kenya.\n\
     Choose exactly one category from: roads, water, health, security, \
     corruption, education, environment, housing.\n\
     Choose a severity from: low, medium, high, critical, based on urgency \
     and community impact.\n\
     Return only a JSON object like {{\"category\": \"...\", \"severity\": \"...\"}}.\n\n\
     Title: {title}\n\
     Description: {description}\n"
  )
}

/// Join the text parts of the first candidate.
fn reply_text(body: &Value) -> String {
  body["candidates"]
    .as_array()
    .and_then(|candidates| candidates.first())
    .and_then(|candidate| candidate["content"]["parts"].as_array())
    .map(|parts| {
      parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect::<Vec<_>>()
        .join("\n")
    })
    .unwrap_or_default()
    .trim()
    .to_owned()
}

fn truncate(text: &str, max_chars: usize) -> String {
  match text.char_indices().nth(max_chars) {
    Some((idx, _)) => format!("{}…", &text[..idx]),
    None => text.to_owned(),
  }
}
