use serde::Serialize;
use tracing::{info, warn};

use super::fallback;
use super::remote::RestStore;
use crate::advisor::Recommendation;
use crate::config::{Config, FallbackConfig, StoreConfig};
use crate::record::CircuitRecord;

/// Which path supplied a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Remote,
    Fallback,
    /// Both paths failed; the dataset is empty
    Unavailable,
}

/// Ordered rows plus their origin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub source: DataSource,
    pub rows: Vec<CircuitRecord>,
}

impl Dataset {
    pub fn empty() -> Self {
        Self {
            source: DataSource::Unavailable,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Row written back for a generated recommendation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationRow {
    pub circuit_id: String,
    pub summary: String,
    /// Newline-joined
    pub actions: String,
    pub confidence: String,
    pub risk_score: Option<f64>,
}

impl RecommendationRow {
    pub fn new(circuit_id: &str, reco: &Recommendation, risk_score: Option<f64>) -> Self {
        Self {
            circuit_id: circuit_id.to_string(),
            summary: reco.summary.clone(),
            actions: reco.actions.join("\n"),
            confidence: reco.confidence.as_str().to_string(),
            risk_score,
        }
    }
}

/// Remote store first, local CSV second. Never fails.
pub struct DataProvider {
    store: Option<RestStore>,
    tables: StoreConfig,
    fallback: FallbackConfig,
}

impl DataProvider {
    pub fn new(store: Option<RestStore>, tables: StoreConfig, fallback: FallbackConfig) -> Self {
        Self {
            store,
            tables,
            fallback,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = RestStore::from_config(&config.store)?;
        Ok(Self::new(store, config.store.clone(), config.fallback.clone()))
    }

    pub fn has_remote(&self) -> bool {
        self.store.is_some()
    }

    /// Circuit rows with every KPI column present (absent ones as 0).
    pub async fn fetch_circuits(&self) -> Dataset {
        let mut dataset = self
            .fetch(&self.tables.circuits_table, &self.fallback.circuits_csv)
            .await;
        for row in &mut dataset.rows {
            row.ensure_kpi_columns();
        }
        dataset
    }

    pub async fn fetch_kpis(&self) -> Dataset {
        self.fetch(&self.tables.kpis_table, &self.fallback.kpis_csv).await
    }

    async fn fetch(&self, table: &str, csv_path: &str) -> Dataset {
        if let Some(store) = &self.store {
            match store.fetch_table(table).await {
                Ok(rows) if !rows.is_empty() => {
                    info!("Loaded {} rows from remote table '{}'", rows.len(), table);
                    return Dataset {
                        source: DataSource::Remote,
                        rows,
                    };
                }
                Ok(_) => warn!("Remote table '{}' is empty; falling back to {}", table, csv_path),
                Err(e) => warn!("Remote table '{}' unavailable ({}); falling back to {}", table, e, csv_path),
            }
        }

        match fallback::read_csv(csv_path) {
            Ok(rows) => {
                info!("Loaded {} rows from {}", rows.len(), csv_path);
                Dataset {
                    source: DataSource::Fallback,
                    rows,
                }
            }
            Err(e) => {
                warn!("Fallback data unavailable: {}", e);
                Dataset::empty()
            }
        }
    }

    /// Persist a recommendation. `true` only on a 200/201 answer.
    pub async fn save_recommendation(&self, row: &RecommendationRow) -> bool {
        let Some(store) = &self.store else {
            return false;
        };

        match store.insert(&self.tables.recommendations_table, row).await {
            Ok(status) if status.as_u16() == 200 || status.as_u16() == 201 => true,
            Ok(status) => {
                warn!("Saving recommendation for {} returned {}", row.circuit_id, status);
                false
            }
            Err(e) => {
                warn!("Saving recommendation for {} failed: {}", row.circuit_id, e);
                false
            }
        }
    }
}
