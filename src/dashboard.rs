use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use crate::advisor::{EnrichmentClient, Recommendation, RecommendationClient};
use crate::config::Config;
use crate::filter::{CircuitFilter, FilterOptions};
use crate::history::{HistoryEntry, RecommendationLog};
use crate::record::{FieldAccess, BANDWIDTH_MBPS, MODEL, VENDOR};
use crate::scoring::{explain_risk_score, score_records, RiskBreakdown, ScoredCircuit};
use crate::store::{DataProvider, DataSource, Dataset, RecommendationRow};

/// Scored, filtered view of the loaded circuits
#[derive(Debug, Clone, Serialize)]
pub struct CircuitListing {
    pub source: DataSource,
    pub total: usize,
    pub matched: usize,
    pub min_risk: f64,
    pub options: FilterOptions,
    pub circuits: Vec<ScoredCircuit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CircuitDetail {
    #[serde(flatten)]
    pub circuit: ScoredCircuit,
    pub breakdown: RiskBreakdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationOutcome {
    pub circuit_id: String,
    pub risk_score: f64,
    pub recommendation: Recommendation,
    pub saved: bool,
    pub hint: Option<String>,
    pub entry: HistoryEntry,
}

/// Core dashboard state: loaded circuits and the collaborators acting on them
pub struct Dashboard {
    pub config: Arc<Config>,
    pub provider: Arc<DataProvider>,
    pub recommender: Arc<RecommendationClient>,
    pub enrichment: Arc<EnrichmentClient>,
    pub history: Arc<RecommendationLog>,
    dataset: RwLock<Arc<Dataset>>,
}

impl Dashboard {
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let provider = Arc::new(DataProvider::from_config(&config)?);
        let recommender = Arc::new(RecommendationClient::new(&config.recommender)?);
        let enrichment = Arc::new(EnrichmentClient::new(&config.enrichment)?);
        Ok(Self::with_parts(config, provider, recommender, enrichment))
    }

    pub fn with_parts(
        config: Arc<Config>,
        provider: Arc<DataProvider>,
        recommender: Arc<RecommendationClient>,
        enrichment: Arc<EnrichmentClient>,
    ) -> Self {
        let history = Arc::new(RecommendationLog::new(config.dashboard.history_max_entries));
        Self {
            config,
            provider,
            recommender,
            enrichment,
            history,
            dataset: RwLock::new(Arc::new(Dataset::empty())),
        }
    }

    /// Replace the loaded circuits with a fresh fetch.
    pub async fn reload(&self) -> Arc<Dataset> {
        let dataset = Arc::new(self.provider.fetch_circuits().await);
        if dataset.is_empty() {
            warn!("No circuit data found. Populate the remote store or place sample CSVs under ./data");
        } else {
            info!("📡 {} circuits loaded ({:?})", dataset.len(), dataset.source);
        }
        *self.dataset.write() = dataset.clone();
        dataset
    }

    pub fn dataset(&self) -> Arc<Dataset> {
        self.dataset.read().clone()
    }

    /// Score every loaded circuit and apply `filter`.
    pub fn list(&self, filter: &CircuitFilter) -> CircuitListing {
        let dataset = self.dataset();
        let default_min_risk = self.config.dashboard.default_min_risk;
        let circuits = filter.apply(score_records(&dataset.rows), default_min_risk);

        CircuitListing {
            source: dataset.source,
            total: dataset.len(),
            matched: circuits.len(),
            min_risk: filter.min_risk.unwrap_or(default_min_risk),
            options: FilterOptions::from_records(&dataset.rows),
            circuits,
        }
    }

    pub fn circuit(&self, circuit_id: &str) -> Option<CircuitDetail> {
        let dataset = self.dataset();
        let record = dataset
            .rows
            .iter()
            .find(|r| r.circuit_id().as_deref() == Some(circuit_id))?;
        let breakdown = explain_risk_score(record);
        Some(CircuitDetail {
            circuit: ScoredCircuit {
                record: record.clone(),
                risk_score: breakdown.score,
            },
            breakdown,
        })
    }

    /// Generate, persist and log advice for one circuit, then fetch a hint.
    pub async fn recommend(&self, circuit_id: &str) -> Option<RecommendationOutcome> {
        let detail = self.circuit(circuit_id)?;
        let record = &detail.circuit.record;
        let risk_score = detail.circuit.risk_score;

        let recommendation = self.recommender.generate(record, Some(risk_score)).await;

        let row = RecommendationRow::new(circuit_id, &recommendation, Some(risk_score));
        let saved = self.provider.save_recommendation(&row).await;

        let hint = self
            .enrichment
            .context_hint(
                record.text(VENDOR).as_deref(),
                record.text(MODEL).as_deref(),
                record.text(BANDWIDTH_MBPS).as_deref(),
                record.region().as_deref(),
            )
            .await;

        let entry = self.history.record(
            circuit_id,
            Some(risk_score),
            &recommendation,
            hint.as_deref(),
            saved,
        );
        info!(
            "Recommendation for {} (risk {:.1}, confidence {}, saved: {})",
            circuit_id,
            risk_score,
            recommendation.confidence.as_str(),
            saved
        );

        Some(RecommendationOutcome {
            circuit_id: circuit_id.to_string(),
            risk_score,
            recommendation,
            saved,
            hint,
            entry,
        })
    }

    pub fn get_stats(&self) -> serde_json::Value {
        let dataset = self.dataset();
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "source": dataset.source,
            "circuits": dataset.len(),
            "remote_store": self.provider.has_remote(),
            "recommender_configured": self.recommender.is_configured(),
            "enrichment_configured": self.enrichment.is_configured(),
            "history": self.history.get_stats(),
        })
    }
}
