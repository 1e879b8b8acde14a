pub mod fallback;
pub mod provider;
pub mod remote;

pub use provider::{DataProvider, DataSource, Dataset, RecommendationRow};
