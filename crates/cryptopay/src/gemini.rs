//! Gemini-backed memo generator.

use serde::{Deserialize, Serialize};

use crate::error::PayError;
use crate::memo::{clean_memo, memo_prompt, MemoGenerator, FALLBACK_MEMO};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API client for payment memos.
pub struct GeminiMemoClient {
    api_key: Option<String>,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<Part>>,
}

impl GeminiMemoClient {
    /// Create a client. Without an API key every request fails with a config error.
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default();

        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
            http,
        }
    }

    /// Point the client at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// The `generateContent` endpoint. The key travels in a header, never the URL.
    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn request_text(&self, api_key: &str, prompt: &str) -> Result<String, PayError> {
        let request = GeminiRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let resp = self
            .http
            .post(self.generate_url())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PayError::Memo(format!("request failed: {}", e.without_url())))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| {
                PayError::Memo(format!("failed to read response: {}", e.without_url()))
            })?;

        if !status.is_success() {
            return Err(PayError::Memo(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        extract_text(&body)
    }
}

/// Pull the first candidate's text out of a `generateContent` response.
fn extract_text(body: &str) -> Result<String, PayError> {
    let parsed: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| PayError::Memo(format!("failed to parse response: {e}")))?;

    Ok(parsed
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .and_then(|c| c.parts)
        .and_then(|p| p.into_iter().next())
        .map(|p| p.text)
        .unwrap_or_default())
}

impl MemoGenerator for GeminiMemoClient {
    async fn generate_memo(&self, context: &str) -> Result<String, PayError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PayError::Config("GEMINI_API_KEY is not set".to_string()))?;

        match self.request_text(api_key, &memo_prompt(context)).await {
            Ok(text) => Ok(clean_memo(&text)),
            Err(e) => {
                tracing::warn!(error = %e, "Gemini API error");
                Ok(FALLBACK_MEMO.to_string())
            }
        }
    }
}
