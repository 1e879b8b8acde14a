//! LLM-backed advice: per-circuit recommendations and device context hints.
//!
//! Both clients fail open. A missing key short-circuits before any request.

pub mod enrich;
pub mod parse;
pub mod recommend;
pub mod types;

pub use enrich::EnrichmentClient;
pub use recommend::RecommendationClient;
pub use types::{Confidence, Recommendation};
