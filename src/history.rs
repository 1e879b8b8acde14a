use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::advisor::{Confidence, Recommendation};

/// Recommendation History - recently generated advice, newest last.
///
/// In-memory only; the remote store is the durable copy when configured.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub circuit_id: String,
    pub risk_score: Option<f64>,
    pub confidence: Confidence,
    pub summary: String,
    pub actions: Vec<String>,
    pub hint: Option<String>,
    pub saved: bool,
}

pub struct RecommendationLog {
    max_entries: usize,
    entries: RwLock<Vec<HistoryEntry>>,
    total_recorded: AtomicU64,
}

impl RecommendationLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            entries: RwLock::new(Vec::new()),
            total_recorded: AtomicU64::new(0),
        }
    }

    pub fn record(
        &self,
        circuit_id: &str,
        risk_score: Option<f64>,
        reco: &Recommendation,
        hint: Option<&str>,
        saved: bool,
    ) -> HistoryEntry {
        let entry = HistoryEntry {
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            circuit_id: circuit_id.to_string(),
            risk_score,
            confidence: reco.confidence,
            summary: reco.summary.clone(),
            actions: reco.actions.clone(),
            hint: hint.map(str::to_string),
            saved,
        };

        let mut entries = self.entries.write();
        entries.push(entry.clone());
        self.total_recorded.fetch_add(1, Ordering::Relaxed);

        // Rotation: keep within max_entries
        if entries.len() > self.max_entries {
            let drain_count = entries.len() - self.max_entries;
            entries.drain(..drain_count);
        }
        entry
    }

    /// Most recent first, optionally for one circuit
    pub fn search(&self, circuit_id: Option<&str>, limit: usize) -> Vec<HistoryEntry> {
        let entries = self.entries.read();
        entries
            .iter()
            .rev()
            .filter(|e| circuit_id.map_or(true, |id| e.circuit_id == id))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn get_stats(&self) -> serde_json::Value {
        let entries = self.entries.read();
        serde_json::json!({
            "current_entries": entries.len(),
            "max_entries": self.max_entries,
            "total_recorded": self.total_recorded.load(Ordering::Relaxed),
        })
    }
}
