use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::parse::recommendation_from_text;
use super::types::Recommendation;
use crate::config::{non_blank, RecommenderConfig};
use crate::error::ClientError;
use crate::record::{
    FieldAccess, BANDWIDTH_MBPS, CIRCUIT_ID, CRC_ERR_RATE, JITTER_MS, LATENCY_MS, MODEL,
    PKT_LOSS_PCT, PRODUCT, REGION, SLA_TIER, UTILIZATION_PCT, VENDOR,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "You are a senior telecom network reliability engineer. \
Be concise, precise, and actionable. \
When fields seem missing, state what's missing instead of guessing.";

const JSON_INSTRUCTION: &str = "Return ONLY valid JSON with the following fields:\n\
{\n\
  \"summary\": \"<one-line summary>\",\n\
  \"reasons\": [\"<reason1>\",\"<reason2>\",\"<reason3>\"],\n\
  \"actions\": [\"<action1>\",\"<action2>\",\"<action3>\"],\n\
  \"confidence\": \"low|medium|high\"\n\
}\n\
Do not include markdown fences or extra commentary.";

/// Circuit fields sent to the model, values passed through as stored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitContext {
    pub circuit_id: Option<Value>,
    pub region: Option<Value>,
    pub product: Option<Value>,
    pub bandwidth_mbps: Option<Value>,
    pub vendor: Option<Value>,
    pub model: Option<Value>,
    pub sla_tier: Option<Value>,
    pub latest_kpis: LatestKpis,
    pub risk_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestKpis {
    pub utilization_pct: Option<Value>,
    pub latency_ms: Option<Value>,
    pub jitter_ms: Option<Value>,
    pub pkt_loss_pct: Option<Value>,
    pub crc_err_rate: Option<Value>,
}

impl CircuitContext {
    pub fn from_record<R: FieldAccess + ?Sized>(record: &R, risk_score: Option<f64>) -> Self {
        let get = |key: &str| record.field(key).cloned();
        Self {
            circuit_id: get(CIRCUIT_ID),
            region: get(REGION),
            product: get(PRODUCT),
            bandwidth_mbps: get(BANDWIDTH_MBPS),
            vendor: get(VENDOR),
            model: get(MODEL),
            sla_tier: get(SLA_TIER),
            latest_kpis: LatestKpis {
                utilization_pct: get(UTILIZATION_PCT),
                latency_ms: get(LATENCY_MS),
                jitter_ms: get(JITTER_MS),
                pkt_loss_pct: get(PKT_LOSS_PCT),
                crc_err_rate: get(CRC_ERR_RATE),
            },
            risk_score,
        }
    }

    pub fn user_prompt(&self) -> String {
        let context = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!(
            "Analyze the following circuit context and KPI values, then return an executive-ready recommendation.\n\n\
             Context (JSON): {}\n\n\
             {}\n\
             Keep the total text under 120 words.",
            context, JSON_INSTRUCTION
        )
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

/// Recommendation client over the Anthropic messages API
pub struct RecommendationClient {
    config: RecommenderConfig,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl RecommendationClient {
    pub fn new(config: &RecommenderConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build recommendation HTTP client: {}", e))?;

        let api_key = config.api_key.clone().and_then(non_blank);
        if api_key.is_none() {
            info!("Recommendation client has no API key; recommendations disabled");
        }

        Ok(Self {
            config: config.clone(),
            api_key,
            http,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Advice for one circuit. Every failure becomes a low-confidence result.
    pub async fn generate<R: FieldAccess + ?Sized>(
        &self,
        circuit: &R,
        risk_score: Option<f64>,
    ) -> Recommendation {
        let Some(api_key) = self.api_key.as_deref() else {
            return Recommendation::not_configured();
        };

        let context = CircuitContext::from_record(circuit, risk_score);
        match self.request(api_key, &context.user_prompt()).await {
            Ok(text) => recommendation_from_text(&text),
            Err(ClientError::Status { code, body }) => {
                warn!("Recommendation API returned {}", code);
                Recommendation::failure("Claude API error.", body)
            }
            Err(e) => {
                warn!("Recommendation request failed: {}", e);
                Recommendation::failure("Exception calling Claude.", e.to_string())
            }
        }
    }

    /// Model output text of one messages call
    async fn request(&self, api_key: &str, prompt: &str) -> Result<String, ClientError> {
        let payload = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: SYSTEM_PROMPT,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!("Requesting recommendation from {}", self.config.api_url);
        let response = self
            .http
            .post(&self.config.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
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

        let data: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        Ok(match data.pointer("/content/0/text").and_then(Value::as_str) {
            Some(text) => text.to_string(),
            None => data.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::types::Confidence;
    use crate::record::CircuitRecord;
    use crate::testing::{MockServer, UNREACHABLE_URL};
    use serde_json::json;

    fn circuit() -> CircuitRecord {
        CircuitRecord::new()
            .with(CIRCUIT_ID, "C-1001")
            .with(REGION, "West")
            .with(VENDOR, "Ciena")
            .with(UTILIZATION_PCT, 92)
            .with(JITTER_MS, 18.5)
    }

    fn client(api_url: String, api_key: Option<&str>) -> RecommendationClient {
        RecommendationClient::new(&RecommenderConfig {
            api_key: api_key.map(str::to_string),
            model: "claude-test".to_string(),
            api_url,
            max_tokens: 400,
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn messages_body(text: &str) -> String {
        json!({"content": [{"type": "text", "text": text}]}).to_string()
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_call() {
        let server = MockServer::start(200, messages_body("{}")).await;
        for key in [None, Some(""), Some("   ")] {
            let client = client(server.url("/v1/messages"), key);
            assert!(!client.is_configured());
            let reco = client.generate(&circuit(), Some(71.0)).await;
            assert_eq!(reco.confidence, Confidence::Low);
            assert_eq!(reco.summary, "Claude API key not configured.");
            assert_eq!(reco.raw_text, "Set CLAUDE_API_KEY environment variable.");
        }
        assert_eq!(server.hits(), 0);
    }

    #[tokio::test]
    async fn test_structured_response() {
        let text = r#"{"summary":"Congested uplink","reasons":["92% utilization"],"actions":["Upgrade to 10G"],"confidence":"high"}"#;
        let server = MockServer::start(200, messages_body(text)).await;
        let reco = client(server.url("/v1/messages"), Some("sk-test"))
            .generate(&circuit(), Some(71.25))
            .await;

        assert_eq!(reco.summary, "Congested uplink");
        assert_eq!(reco.reasons, vec!["92% utilization"]);
        assert_eq!(reco.actions, vec!["Upgrade to 10G"]);
        assert_eq!(reco.confidence, Confidence::High);
        assert_eq!(reco.raw_text, text);

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.headers.get("x-api-key").map(String::as_str), Some("sk-test"));
        assert_eq!(
            request.headers.get("anthropic-version").map(String::as_str),
            Some(ANTHROPIC_VERSION)
        );
        let body = request.json();
        assert_eq!(body["model"], "claude-test");
        assert_eq!(body["max_tokens"], 400);
        assert_eq!(body["system"], SYSTEM_PROMPT);
        let prompt = body["messages"][0]["content"].as_str().unwrap();
        assert!(prompt.contains("\"circuit_id\":\"C-1001\""));
        assert!(prompt.contains("\"risk_score\":71.25"));
        assert!(prompt.contains("Keep the total text under 120 words."));
    }

    #[tokio::test]
    async fn test_salvaged_response() {
        let text = "Sure!\n{\"summary\": \"Replace optic\", \"reasons\": [\"CRC\"], \"actions\": [\"Swap SFP\"]}\nThanks";
        let server = MockServer::start(200, messages_body(text)).await;
        let reco = client(server.url("/v1/messages"), Some("k"))
            .generate(&circuit(), None)
            .await;
        assert_eq!(reco.summary, "Replace optic");
        assert_eq!(reco.reasons, vec!["CRC"]);
        assert_eq!(reco.actions, vec!["Swap SFP"]);
        assert_eq!(reco.confidence, Confidence::Medium);
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start(529, r#"{"error":"overloaded"}"#).await;
        let reco = client(server.url("/v1/messages"), Some("k"))
            .generate(&circuit(), None)
            .await;
        assert_eq!(reco.summary, "Claude API error.");
        assert_eq!(reco.confidence, Confidence::Low);
        assert_eq!(reco.raw_text, r#"{"error":"overloaded"}"#);
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_unexpected_envelope_is_echoed() {
        let server = MockServer::start(200, r#"{"id":"msg_1","content":[]}"#).await;
        let reco = client(server.url("/v1/messages"), Some("k"))
            .generate(&circuit(), None)
            .await;
        // whole body re-serialized, then parsed as a recommendation without a summary
        assert!(reco.raw_text.contains("msg_1"));
        assert_eq!(reco.summary, reco.raw_text);
        assert_eq!(reco.confidence, Confidence::Medium);
    }

    #[tokio::test]
    async fn test_non_json_body_is_an_exception() {
        let server = MockServer::start(200, "<html>gateway</html>").await;
        let reco = client(server.url("/v1/messages"), Some("k"))
            .generate(&circuit(), None)
            .await;
        assert_eq!(reco.summary, "Exception calling Claude.");
        assert_eq!(reco.confidence, Confidence::Low);
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let reco = client(format!("{}/v1/messages", UNREACHABLE_URL), Some("k"))
            .generate(&circuit(), None)
            .await;
        assert_eq!(reco.summary, "Exception calling Claude.");
        assert_eq!(reco.confidence, Confidence::Low);
        assert!(!reco.raw_text.is_empty());
    }

    #[test]
    fn test_context_passes_values_through() {
        let context = CircuitContext::from_record(&circuit(), Some(50.0));
        assert_eq!(context.circuit_id, Some(json!("C-1001")));
        assert_eq!(context.latest_kpis.jitter_ms, Some(json!(18.5)));
        assert_eq!(context.product, None);
        let rendered = serde_json::to_value(&context).unwrap();
        assert_eq!(rendered["product"], Value::Null);
        assert_eq!(rendered["latest_kpis"]["utilization_pct"], 92);
    }
}
