use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub recommender: RecommenderConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_web_address")]
    pub address: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

/// REST data store (PostgREST-style `/rest/v1/<table>` endpoints)
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_circuits_table")]
    pub circuits_table: String,
    #[serde(default = "default_kpis_table")]
    pub kpis_table: String,
    #[serde(default = "default_recommendations_table")]
    pub recommendations_table: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FallbackConfig {
    #[serde(default = "default_circuits_csv")]
    pub circuits_csv: String,
    #[serde(default = "default_kpis_csv")]
    pub kpis_csv: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecommenderConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_recommender_model")]
    pub model: String,
    #[serde(default = "default_recommender_url")]
    pub api_url: String,
    #[serde(default = "default_recommender_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_recommender_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnrichmentConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_enrichment_model")]
    pub model: String,
    #[serde(default = "default_enrichment_url")]
    pub api_url: String,
    #[serde(default = "default_enrichment_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_enrichment_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    /// Minimum risk score applied when a listing request carries none
    #[serde(default = "default_min_risk")]
    pub default_min_risk: f64,
    /// Max recommendations kept in the in-memory history before rotation
    #[serde(default = "default_history_max")]
    pub history_max_entries: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: default_web_address(),
            port: default_web_port(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: default_store_timeout(),
            circuits_table: default_circuits_table(),
            kpis_table: default_kpis_table(),
            recommendations_table: default_recommendations_table(),
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            circuits_csv: default_circuits_csv(),
            kpis_csv: default_kpis_csv(),
        }
    }
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_recommender_model(),
            api_url: default_recommender_url(),
            max_tokens: default_recommender_max_tokens(),
            timeout_secs: default_recommender_timeout(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_enrichment_model(),
            api_url: default_enrichment_url(),
            max_tokens: default_enrichment_max_tokens(),
            timeout_secs: default_enrichment_timeout(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_min_risk: default_min_risk(),
            history_max_entries: default_history_max(),
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_web_address() -> String { "0.0.0.0".to_string() }
fn default_web_port() -> u16 { 8501 }
fn default_store_timeout() -> u64 { 20 }
fn default_circuits_table() -> String { "circuits".to_string() }
fn default_kpis_table() -> String { "kpis".to_string() }
fn default_recommendations_table() -> String { "recommendations".to_string() }
fn default_circuits_csv() -> String { "data/circuits_sample.csv".to_string() }
fn default_kpis_csv() -> String { "data/kpis_sample.csv".to_string() }
fn default_recommender_model() -> String { "claude-3-sonnet-20240229".to_string() }
fn default_recommender_url() -> String { "https://api.anthropic.com/v1/messages".to_string() }
fn default_recommender_max_tokens() -> u32 { 400 }
fn default_recommender_timeout() -> u64 { 60 }
fn default_enrichment_model() -> String { "sonar".to_string() }
fn default_enrichment_url() -> String { "https://api.perplexity.ai/chat/completions".to_string() }
fn default_enrichment_max_tokens() -> u32 { 120 }
fn default_enrichment_timeout() -> u64 { 45 }
fn default_min_risk() -> f64 { 60.0 }
fn default_history_max() -> usize { 200 }

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config '{}': {}", path, e))?;
        Ok(config)
    }

    /// Load `path` if it exists; `None` when there is no such file
    pub fn load_optional(path: &str) -> anyhow::Result<Option<Self>> {
        if Path::new(path).exists() {
            Self::load(path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Overlay credentials and model names from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    fn apply_env_with<F>(&mut self, mut getter: F)
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut read = |key: &str| getter(key).and_then(non_blank);

        if let Some(url) = read("SUPABASE_URL") {
            self.store.url = Some(url);
        }
        if let Some(key) = read("SUPABASE_KEY") {
            self.store.api_key = Some(key);
        }
        if let Some(key) = read("CLAUDE_API_KEY") {
            self.recommender.api_key = Some(key);
        }
        if let Some(model) = read("CLAUDE_MODEL") {
            self.recommender.model = model;
        }
        if let Some(key) = read("PERPLEXITY_API_KEY") {
            self.enrichment.api_key = Some(key);
        }
        if let Some(model) = read("PERPLEXITY_MODEL") {
            self.enrichment.model = model;
        }
    }
}

/// Blank credentials count as absent
pub fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
