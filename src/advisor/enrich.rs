use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{non_blank, EnrichmentConfig};
use crate::error::ClientError;

const SYSTEM_PROMPT: &str = "You are a concise telecom assistant. \
Provide at most 2 short sentences. \
Avoid brand marketing language. \
If unsure, say you are unsure.";

const TEMPERATURE: f64 = 0.2;
const TOP_P: f64 = 0.9;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Optional one-or-two sentence troubleshooting hint for a device
pub struct EnrichmentClient {
    config: EnrichmentConfig,
    api_key: Option<String>,
    http: reqwest::Client,
}

/// Question for the hint model; absent or zero parts are left out.
///
/// Bandwidth is echoed as stored, so text such as `1G` passes through.
pub fn hint_question(
    vendor: Option<&str>,
    model: Option<&str>,
    bandwidth_mbps: Option<&str>,
    region: Option<&str>,
) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(vendor) = vendor.filter(|v| !v.is_empty()) {
        parts.push(vendor.to_string());
    }
    if let Some(model) = model.filter(|m| !m.is_empty()) {
        parts.push(model.to_string());
    }
    if let Some(bw) = bandwidth_mbps.map(str::trim).filter(|bw| !is_blank_or_zero(bw)) {
        parts.push(format!("{} Mbps", bw));
    }
    let region_part = match region.filter(|r| !r.is_empty()) {
        Some(region) => format!(" in {}", region),
        None => String::new(),
    };

    format!(
        "Common causes and quick checks for elevated jitter/CRC on {}{}. Provide 1-2 practical checks.",
        parts.join(" "),
        region_part
    )
}

// Zero-filled KPI columns carry no information
fn is_blank_or_zero(value: &str) -> bool {
    value.is_empty() || value.parse::<f64>().map_or(false, |n| n == 0.0)
}

impl EnrichmentClient {
    pub fn new(config: &EnrichmentConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build enrichment HTTP client: {}", e))?;

        Ok(Self {
            config: config.clone(),
            api_key: config.api_key.clone().and_then(non_blank),
            http,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// `None` when unconfigured or on any failure.
    pub async fn context_hint(
        &self,
        vendor: Option<&str>,
        model: Option<&str>,
        bandwidth_mbps: Option<&str>,
        region: Option<&str>,
    ) -> Option<String> {
        let api_key = self.api_key.as_deref()?;
        let question = hint_question(vendor, model, bandwidth_mbps, region);

        match self.request(api_key, &question).await {
            Ok(hint) => Some(hint),
            Err(ClientError::Empty) => {
                debug!("Enrichment returned no content");
                None
            }
            Err(e) => {
                warn!("Enrichment request failed: {}", e);
                None
            }
        }
    }

    async fn request(&self, api_key: &str, question: &str) -> Result<String, ClientError> {
        let payload = ChatCompletionRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: question,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: TEMPERATURE,
            top_p: TOP_P,
        };

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default();

        let content = content.trim();
        if content.is_empty() {
            Err(ClientError::Empty)
        } else {
            Ok(content.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockServer, UNREACHABLE_URL};
    use serde_json::json;

    fn client(api_url: String, api_key: Option<&str>) -> EnrichmentClient {
        EnrichmentClient::new(&EnrichmentConfig {
            api_key: api_key.map(str::to_string),
            model: "sonar".to_string(),
            api_url,
            max_tokens: 120,
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn completion(content: &str) -> String {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
    }

    #[test]
    fn test_question_with_all_parts() {
        let q = hint_question(Some("Ciena"), Some("6500"), Some("1000"), Some("West"));
        assert_eq!(
            q,
            "Common causes and quick checks for elevated jitter/CRC on Ciena 6500 1000 Mbps in West. Provide 1-2 practical checks."
        );
    }

    #[test]
    fn test_question_skips_missing_parts() {
        let q = hint_question(None, Some("ASR9k"), Some("0"), None);
        assert_eq!(
            q,
            "Common causes and quick checks for elevated jitter/CRC on ASR9k. Provide 1-2 practical checks."
        );
        let q = hint_question(Some("Nokia"), None, Some("2.5"), Some(""));
        assert!(q.contains("Nokia 2.5 Mbps."));
        let q = hint_question(Some("Nokia"), None, Some(" "), None);
        assert!(q.contains("on Nokia. Provide"));
    }

    #[test]
    fn test_question_keeps_textual_bandwidth() {
        let q = hint_question(Some("Juniper"), Some("MX204"), Some("1G"), Some("North"));
        assert!(q.contains("Juniper MX204 1G Mbps in North."));
        let q = hint_question(None, Some("MX204"), Some("0.0"), None);
        assert!(q.contains("on MX204. Provide"));
    }

    #[tokio::test]
    async fn test_no_key_no_call() {
        let server = MockServer::start(200, completion("hint")).await;
        let hint = client(server.url("/chat/completions"), None)
            .context_hint(Some("Ciena"), None, None, None)
            .await;
        assert_eq!(hint, None);
        assert_eq!(server.hits(), 0);
    }

    #[tokio::test]
    async fn test_returns_trimmed_hint() {
        let server = MockServer::start(200, completion("  Check optics levels. Inspect patch cords.\n")).await;
        let hint = client(server.url("/chat/completions"), Some("pplx-key"))
            .context_hint(Some("Ciena"), Some("6500"), Some("1000"), Some("West"))
            .await;
        assert_eq!(hint.as_deref(), Some("Check optics levels. Inspect patch cords."));

        let request = &server.requests()[0];
        assert_eq!(
            request.headers.get("authorization").map(String::as_str),
            Some("Bearer pplx-key")
        );
        let body = request.json();
        assert_eq!(body["model"], "sonar");
        assert_eq!(body["max_tokens"], 120);
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body["messages"][1]["content"].as_str().unwrap().contains("Ciena 6500 1000 Mbps in West"));
    }

    #[tokio::test]
    async fn test_failures_yield_nothing() {
        let server = MockServer::start(500, "boom").await;
        let c = client(server.url("/chat/completions"), Some("k"));
        assert_eq!(c.context_hint(None, None, None, None).await, None);

        let server = MockServer::start(200, json!({"choices": []}).to_string()).await;
        let c = client(server.url("/chat/completions"), Some("k"));
        assert_eq!(c.context_hint(None, None, None, None).await, None);

        let server = MockServer::start(200, completion("   ")).await;
        let c = client(server.url("/chat/completions"), Some("k"));
        assert_eq!(c.context_hint(None, None, None, None).await, None);

        let server = MockServer::start(200, "not json").await;
        let c = client(server.url("/chat/completions"), Some("k"));
        assert_eq!(c.context_hint(None, None, None, None).await, None);

        let c = client(UNREACHABLE_URL.to_string(), Some("k"));
        assert_eq!(c.context_hint(None, None, None, None).await, None);
    }
}
