//! Market intelligence client.
//!
//! Single entry point for every call to the hosted research service. The
//! public methods never fail: a missing key or an exhausted retry budget
//! degrades to a placeholder result (or the caller's input), so the rest of
//! the app works unchanged without the integration.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

const DEFAULT_RESEARCH_URL: &str = "https://research.bloomhub.io";
const MODEL: &str = "insight-1";
const MAX_RETRIES: u32 = 3;

const MISSING_KEY_NOTICE: &str =
    "API key is missing. Add a research API key to the environment to enable \
     Market Intelligence.";
const UNAVAILABLE_NOTICE: &str =
    "Unable to perform research at this time. Please check your connection or API key.";

#[derive(Debug, Error)]
enum ResearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("rate limited after {retries} retries")]
    RateLimited { retries: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSource {
    pub title: String,
    pub uri: String,
}

/// One completed research run, placeholder or real.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketResearch {
    pub query: String,
    pub content: String,
    pub sources: Vec<SearchSource>,
    pub timestamp: DateTime<Utc>,
}

/// A generated campaign idea sketch; the caller fills in the remaining
/// fields before it becomes a real record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IdeaSuggestion {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    search: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
    #[serde(default)]
    sources: Vec<SearchSource>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    error: ServiceErrorBody,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct ResearchClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ResearchClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        ResearchClient {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into(),
            api_key,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let base_url = config
            .research_url
            .clone()
            .unwrap_or_else(|| DEFAULT_RESEARCH_URL.to_string());
        ResearchClient::new(base_url, config.research_api_key.clone())
    }

    /// Runs a search-grounded intelligence report for `query`. Always returns
    /// a result; failures and a missing key produce placeholder content with
    /// no sources.
    pub async fn market_research(&self, query: &str) -> MarketResearch {
        if self.api_key.is_none() {
            warn!("no research API key configured");
            return placeholder(query, MISSING_KEY_NOTICE);
        }
        let prompt = format!(
            "Provide a detailed market intelligence report on: {query}. \
             Focus on actionable insights for a marketing team."
        );
        match self.call(&prompt, true).await {
            Ok(response) => MarketResearch {
                query: query.to_string(),
                content: response.text,
                sources: response.sources,
                timestamp: Utc::now(),
            },
            Err(e) => {
                warn!("market research failed: {e}");
                placeholder(query, UNAVAILABLE_NOTICE)
            }
        }
    }

    /// Generates campaign idea sketches from free-form context. Empty on any
    /// failure.
    pub async fn generate_ideas(&self, context: &str) -> Vec<IdeaSuggestion> {
        if self.api_key.is_none() {
            warn!("no research API key configured");
            return vec![];
        }
        let prompt = format!(
            "You are a creative marketing strategist for a lifestyle retail brand. \
             Generate 3 distinct, innovative marketing campaign ideas based on the \
             following context: \"{context}\". Respond with a JSON array of objects \
             with \"title\", \"description\" and \"tags\" fields."
        );
        match self.call_json(&prompt).await {
            Ok(ideas) => ideas,
            Err(e) => {
                warn!("idea generation failed: {e}");
                vec![]
            }
        }
    }

    /// Tightens marketing copy. Returns the input unchanged on any failure.
    pub async fn refine_copy(&self, text: &str) -> String {
        if self.api_key.is_none() {
            return text.to_string();
        }
        let prompt = format!(
            "Refine the following marketing campaign description to be more punchy, \
             professional, and aligned with a premium brand voice. Keep it under 50 \
             words.\n\nInput text: \"{text}\""
        );
        match self.call(&prompt, false).await {
            Ok(response) if !response.text.trim().is_empty() => response.text,
            Ok(_) => text.to_string(),
            Err(e) => {
                warn!("copy refinement failed: {e}");
                text.to_string()
            }
        }
    }

    /// Retries on 429 and 5xx with exponential backoff; other error statuses
    /// fail immediately with the service's message when it sends one.
    async fn call(&self, prompt: &str, search: bool) -> Result<GenerateResponse, ResearchError> {
        let request_body = GenerateRequest {
            model: MODEL,
            prompt,
            search,
        };
        let api_key = self.api_key.as_deref().unwrap_or_default();
        let url = format!("{}/v1/generate", self.base_url.trim_end_matches('/'));

        let mut last_error: Option<ResearchError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "research call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .header("x-api-key", api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(ResearchError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("research service returned {status}: {body}");
                last_error = Some(ResearchError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ServiceError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(ResearchError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: GenerateResponse = response.json().await?;
            debug!("research call succeeded: {} source(s)", parsed.sources.len());
            return Ok(parsed);
        }

        Err(last_error.unwrap_or(ResearchError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    async fn call_json<T: DeserializeOwned>(&self, prompt: &str) -> Result<T, ResearchError> {
        let response = self.call(prompt, false).await?;
        let text = strip_json_fences(&response.text);
        serde_json::from_str(text).map_err(ResearchError::Parse)
    }
}

fn placeholder(query: &str, content: &str) -> MarketResearch {
    MarketResearch {
        query: query.to_string(),
        content: content.to_string(),
        sources: vec![],
        timestamp: Utc::now(),
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_strip_json_fences_with_and_without_tag() {
        assert_eq!(
            strip_json_fences("```json\n[{\"title\":\"x\"}]\n```"),
            "[{\"title\":\"x\"}]"
        );
        assert_eq!(strip_json_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_json_fences("{}"), "{}");
    }

    #[tokio::test]
    async fn test_missing_key_yields_placeholder_not_error() {
        let client = ResearchClient::new("http://localhost:1", None);
        let result = client.market_research("XHS growth in Malaysia").await;
        assert_eq!(result.query, "XHS growth in Malaysia");
        assert_eq!(result.content, MISSING_KEY_NOTICE);
        assert!(result.sources.is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_refine_returns_input() {
        let client = ResearchClient::new("http://localhost:1", None);
        assert_eq!(client.refine_copy("original copy").await, "original copy");
    }

    #[tokio::test]
    async fn test_market_research_happy_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .and(header("x-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "text": "XHS adoption is accelerating.",
                "sources": [{"title": "Report", "uri": "https://example.com/r"}]
            })))
            .mount(&server)
            .await;

        let client = ResearchClient::new(server.uri(), Some("test-key".into()));
        let result = client.market_research("XHS adoption").await;
        assert_eq!(result.content, "XHS adoption is accelerating.");
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].title, "Report");
    }

    #[tokio::test]
    async fn test_client_error_degrades_to_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "bad prompt"}
            })))
            .mount(&server)
            .await;

        let client = ResearchClient::new(server.uri(), Some("test-key".into()));
        let result = client.market_research("anything").await;
        assert_eq!(result.content, UNAVAILABLE_NOTICE);
        assert!(result.sources.is_empty());
    }

    #[tokio::test]
    async fn test_generate_ideas_parses_fenced_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "text": "```json\n[{\"title\":\"Pop-up\",\"description\":\"A mall pop-up.\",\"tags\":[\"#event\"]}]\n```"
            })))
            .mount(&server)
            .await;

        let client = ResearchClient::new(server.uri(), Some("test-key".into()));
        let ideas = client.generate_ideas("mall activation").await;
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].title, "Pop-up");
        assert_eq!(ideas[0].tags, vec!["#event"]);
    }

    #[tokio::test]
    async fn test_generate_ideas_empty_on_malformed_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"text": "not json at all"})),
            )
            .mount(&server)
            .await;

        let client = ResearchClient::new(server.uri(), Some("test-key".into()));
        assert!(client.generate_ideas("anything").await.is_empty());
    }
}
