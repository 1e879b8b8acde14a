use serde::{Deserialize, Serialize};

use crate::record::FieldAccess;
use crate::scoring::ScoredCircuit;

/// Selector value meaning "no restriction"
pub const ALL: &str = "All";

/// Dashboard filter: region and SLA tier equality plus a risk floor
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CircuitFilter {
    pub region: Option<String>,
    pub sla_tier: Option<String>,
    pub min_risk: Option<f64>,
}

impl CircuitFilter {
    fn selector(value: &Option<String>) -> Option<&str> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != ALL)
    }

    pub fn matches(&self, circuit: &ScoredCircuit, default_min_risk: f64) -> bool {
        if let Some(region) = Self::selector(&self.region) {
            if circuit.record.region().as_deref() != Some(region) {
                return false;
            }
        }
        if let Some(tier) = Self::selector(&self.sla_tier) {
            if circuit.record.sla_tier().as_deref() != Some(tier) {
                return false;
            }
        }
        circuit.risk_score >= self.min_risk.unwrap_or(default_min_risk)
    }

    pub fn apply(&self, circuits: Vec<ScoredCircuit>, default_min_risk: f64) -> Vec<ScoredCircuit> {
        circuits
            .into_iter()
            .filter(|c| self.matches(c, default_min_risk))
            .collect()
    }
}

/// Sorted distinct selector values, each list led by "All"
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub regions: Vec<String>,
    pub sla_tiers: Vec<String>,
}

impl FilterOptions {
    pub fn from_records<R: FieldAccess>(records: &[R]) -> Self {
        Self {
            regions: distinct(records, crate::record::REGION),
            sla_tiers: distinct(records, crate::record::SLA_TIER),
        }
    }
}

fn distinct<R: FieldAccess>(records: &[R], key: &str) -> Vec<String> {
    let mut values: Vec<String> = records.iter().filter_map(|r| r.text(key)).collect();
    values.sort();
    values.dedup();
    values.insert(0, ALL.to_string());
    values
}
