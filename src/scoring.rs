use serde::Serialize;
use serde_json::Value;

use crate::record::{
    numeric_field, CircuitRecord, CoercionError, FieldAccess, BANDWIDTH_MBPS, CRC_ERR_RATE,
    JITTER_MS, LATENCY_MS, PKT_LOSS_PCT, UTILIZATION_PCT,
};

/// Risk Scorer
///
/// Maps one circuit's KPIs to a 0..100 risk score:
///
///   base  = 100 * (0.35*util + 0.25*jitter + 0.20*loss + 0.10*latency + 0.10*crc)
///   score = clamp(base + redundancy_bonus, 0, 100)
///
/// Each KPI is first normalized against its saturation threshold and clamped
/// to 0..1. The weights are hand-tuned for readability, not fitted.
pub const WEIGHT_UTILIZATION: f64 = 0.35;
pub const WEIGHT_JITTER: f64 = 0.25;
pub const WEIGHT_LOSS: f64 = 0.20;
pub const WEIGHT_LATENCY: f64 = 0.10;
pub const WEIGHT_CRC: f64 = 0.10;

/// Value at which each KPI contributes its full weight
pub const SATURATION_UTILIZATION_PCT: f64 = 100.0;
pub const SATURATION_JITTER_MS: f64 = 30.0;
pub const SATURATION_LOSS_PCT: f64 = 2.0;
pub const SATURATION_LATENCY_MS: f64 = 100.0;
pub const SATURATION_CRC_ERRORS: f64 = 1000.0;

pub const EXPLICIT_REDUNDANCY_BONUS: f64 = 10.0;
pub const INFERRED_REDUNDANCY_BONUS: f64 = 8.0;

/// Checked in this order; the first one present is the only one consulted
pub const REDUNDANCY_FIELDS: [&str; 3] = ["redundancy", "redundancy_flag", "is_redundant"];
const TRUTHY_TOKENS: [&str; 4] = ["y", "yes", "true", "1"];

const OVERPROVISIONED_MAX_UTILIZATION: f64 = 30.0;
const OVERPROVISIONED_MIN_BANDWIDTH: f64 = 500.0;

/// The five scored KPIs of one record
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KpiReadings {
    pub utilization_pct: f64,
    pub jitter_ms: f64,
    pub pkt_loss_pct: f64,
    pub latency_ms: f64,
    pub crc_err_rate: f64,
}

impl KpiReadings {
    fn try_from_record<R: FieldAccess + ?Sized>(record: &R) -> Result<Self, CoercionError> {
        Ok(Self {
            utilization_pct: numeric_field(record, UTILIZATION_PCT)?,
            jitter_ms: numeric_field(record, JITTER_MS)?,
            pkt_loss_pct: numeric_field(record, PKT_LOSS_PCT)?,
            latency_ms: numeric_field(record, LATENCY_MS)?,
            crc_err_rate: numeric_field(record, CRC_ERR_RATE)?,
        })
    }

    /// One unreadable KPI zeroes all five.
    pub fn from_record<R: FieldAccess + ?Sized>(record: &R) -> Self {
        Self::try_from_record(record).unwrap_or_default()
    }

    pub fn normalized(&self) -> KpiReadings {
        KpiReadings {
            utilization_pct: clamp_unit(self.utilization_pct / SATURATION_UTILIZATION_PCT),
            jitter_ms: clamp_unit(self.jitter_ms / SATURATION_JITTER_MS),
            pkt_loss_pct: clamp_unit(self.pkt_loss_pct / SATURATION_LOSS_PCT),
            latency_ms: clamp_unit(self.latency_ms / SATURATION_LATENCY_MS),
            crc_err_rate: clamp_unit(self.crc_err_rate / SATURATION_CRC_ERRORS),
        }
    }
}

/// NaN resolves to 0
fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Where the redundancy bonus came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "field", rename_all = "snake_case")]
pub enum BonusSource {
    /// Operator-asserted flag, by field name
    Flag(&'static str),
    /// Low utilization on a large pipe
    Overprovisioned,
    None,
}

/// Full scoring trace for one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskBreakdown {
    pub kpis: KpiReadings,
    pub normalized: KpiReadings,
    /// Weighted terms in score points (sum = base_score)
    pub contributions: KpiReadings,
    pub base_score: f64,
    pub bonus: f64,
    pub bonus_source: BonusSource,
    pub score: f64,
}

pub fn explain_risk_score<R: FieldAccess + ?Sized>(record: &R) -> RiskBreakdown {
    let kpis = KpiReadings::from_record(record);
    let normalized = kpis.normalized();
    let contributions = KpiReadings {
        utilization_pct: 100.0 * WEIGHT_UTILIZATION * normalized.utilization_pct,
        jitter_ms: 100.0 * WEIGHT_JITTER * normalized.jitter_ms,
        pkt_loss_pct: 100.0 * WEIGHT_LOSS * normalized.pkt_loss_pct,
        latency_ms: 100.0 * WEIGHT_LATENCY * normalized.latency_ms,
        crc_err_rate: 100.0 * WEIGHT_CRC * normalized.crc_err_rate,
    };

    let core = WEIGHT_UTILIZATION * normalized.utilization_pct
        + WEIGHT_JITTER * normalized.jitter_ms
        + WEIGHT_LOSS * normalized.pkt_loss_pct
        + WEIGHT_LATENCY * normalized.latency_ms
        + WEIGHT_CRC * normalized.crc_err_rate;
    let base_score = 100.0 * core;

    let (bonus, bonus_source) = redundancy_bonus(record);
    let score = (base_score + bonus).clamp(0.0, 100.0);

    RiskBreakdown {
        kpis,
        normalized,
        contributions,
        base_score,
        bonus,
        bonus_source,
        score,
    }
}

/// Risk score in 0..=100. Never fails: unreadable fields count as 0.
pub fn compute_risk_score<R: FieldAccess + ?Sized>(record: &R) -> f64 {
    explain_risk_score(record).score
}

/// Bonus for redundant or over-provisioned circuits.
///
/// An explicit flag decides when it holds a recognizable value; otherwise
/// the over-provisioning heuristic applies.
pub fn redundancy_bonus<R: FieldAccess + ?Sized>(record: &R) -> (f64, BonusSource) {
    let flag = REDUNDANCY_FIELDS
        .iter()
        .find_map(|&name| match record.field(name) {
            None | Some(Value::Null) => None,
            Some(value) => Some((name, value)),
        });

    if let Some((name, value)) = flag {
        if let Some(asserted) = explicit_flag(value) {
            let bonus = if asserted { EXPLICIT_REDUNDANCY_BONUS } else { 0.0 };
            return (bonus, BonusSource::Flag(name));
        }
    }

    let (util, bw) = match (
        numeric_field(record, UTILIZATION_PCT),
        numeric_field(record, BANDWIDTH_MBPS),
    ) {
        (Ok(util), Ok(bw)) => (util, bw),
        _ => return (0.0, BonusSource::None),
    };

    if util < OVERPROVISIONED_MAX_UTILIZATION && bw >= OVERPROVISIONED_MIN_BANDWIDTH {
        (INFERRED_REDUNDANCY_BONUS, BonusSource::Overprovisioned)
    } else {
        (0.0, BonusSource::None)
    }
}

/// `Some(asserted)` for a recognizable flag value, `None` to fall through.
/// Strings only ever assert; "n"/"no" are not recognized.
fn explicit_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(x) if x == 1.0 => Some(true),
            Some(x) if x == 0.0 => Some(false),
            _ => None,
        },
        Value::String(s) => {
            let token = s.trim().to_lowercase();
            TRUTHY_TOKENS.contains(&token.as_str()).then_some(true)
        }
        _ => None,
    }
}

/// Score each record independently, preserving order.
pub fn compute_scores<R: FieldAccess>(records: &[R]) -> Vec<f64> {
    records.iter().map(compute_risk_score).collect()
}

/// A record paired with its freshly computed score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCircuit {
    pub record: CircuitRecord,
    pub risk_score: f64,
}

pub fn score_records(records: &[CircuitRecord]) -> Vec<ScoredCircuit> {
    records
        .iter()
        .cloned()
        .zip(compute_scores(records))
        .map(|(record, risk_score)| ScoredCircuit { record, risk_score })
        .collect()
}
