use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{non_blank, StoreConfig};
use crate::error::ClientError;
use crate::record::CircuitRecord;

/// Client for a PostgREST-style table API (`{url}/rest/v1/{table}`)
pub struct RestStore {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl RestStore {
    /// `None` unless both the URL and the key are set.
    pub fn from_config(config: &StoreConfig) -> anyhow::Result<Option<Self>> {
        let url = config.url.clone().and_then(non_blank);
        let key = config.api_key.clone().and_then(non_blank);
        let (Some(url), Some(api_key)) = (url, key) else {
            info!("Remote store not configured; using local sample data");
            return Ok(None);
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build store HTTP client: {}", e))?;

        info!("Remote store: {}", url);
        Ok(Some(Self {
            base_url: url.trim_end_matches('/').to_string(),
            api_key,
            http,
        }))
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Read all rows of `table`. The body must be an array of objects.
    pub async fn fetch_table(&self, table: &str) -> Result<Vec<CircuitRecord>, ClientError> {
        let url = self.table_url(table);
        debug!("GET {}", url);
        let response = self
            .authorized(self.http.get(&url).query(&[("select", "*")]))
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

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                CircuitRecord::from_value(row)
                    .ok_or_else(|| ClientError::Decode(format!("{} row is not an object", table)))
            })
            .collect()
    }

    /// Insert one row; returns the response status.
    pub async fn insert<T: Serialize + ?Sized>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<StatusCode, ClientError> {
        let url = self.table_url(table);
        debug!("POST {}", url);
        let response = self.authorized(self.http.post(&url)).json(row).send().await?;
        Ok(response.status())
    }
}
