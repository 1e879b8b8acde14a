use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    #[default]
    Medium,
    High,
}

impl Confidence {
    /// Case-insensitive; anything unrecognized reads as medium.
    pub fn parse_lenient(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "low" => Confidence::Low,
            "high" => Confidence::High,
            _ => Confidence::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

/// Structured advice for one circuit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub summary: String,
    pub reasons: Vec<String>,
    pub actions: Vec<String>,
    pub confidence: Confidence,
    /// Unparsed model output, or the failure detail
    pub raw_text: String,
}

impl Recommendation {
    /// Low-confidence result explaining why no advice was produced
    pub fn failure(summary: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            reasons: Vec::new(),
            actions: Vec::new(),
            confidence: Confidence::Low,
            raw_text: raw_text.into(),
        }
    }

    pub fn not_configured() -> Self {
        Self::failure(
            "Claude API key not configured.",
            "Set CLAUDE_API_KEY environment variable.",
        )
    }
}
