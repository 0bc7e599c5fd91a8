//! HTTP client for the rollup inspection endpoint.
//!
//! GET {endpoint}/{urlEncodedJSON}
//! -> { reports: [{ payload }], status, processed_input_count }

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use url::Url;

use cartesify_types::{
    codec, CartesifyError, FetchRequest, Hex, InboundResult, OutboundEnvelope, Result,
    SuccessPayload,
};

/// A single inspect report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub payload: serde_json::Value,
}

/// Inspect endpoint response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectResponse {
    #[serde(default)]
    pub reports: Option<Vec<Report>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub processed_input_count: Option<u64>,
}

/// Inspection endpoint client. No retries: every failure surfaces to the caller.
pub struct InspectClient {
    endpoint: Url,
    client: reqwest::Client,
    timeout: Duration,
}

impl InspectClient {
    pub fn new(endpoint: Url, timeout_ms: Option<u64>) -> Self {
        let timeout_ms = timeout_ms.unwrap_or(20_000);
        Self {
            endpoint,
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// The endpoint with `query` appended as one percent-encoded path segment.
    pub fn query_url(&self, query: &serde_json::Value) -> Result<Url> {
        let encoded = serde_json::to_string(query).map_err(|e| CartesifyError::InvalidJson(e.to_string()))?;
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| CartesifyError::Config(format!("inspect endpoint {} cannot take a path", self.endpoint)))?
            .pop_if_empty()
            .push(&encoded);
        Ok(url)
    }

    /// Run an inspect query and return the first report's payload.
    ///
    /// `Ok(None)` when `reports` is absent or empty.
    pub async fn inspect_raw(&self, query: &serde_json::Value) -> Result<Option<Hex>> {
        let url = self.query_url(query)?;
        debug!(url = %url, "inspecting endpoint");

        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| CartesifyError::Connectivity(format!("inspect request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(CartesifyError::Protocol(format!(
                "inspect endpoint returned status {}",
                resp.status()
            )));
        }

        let body: InspectResponse = resp
            .json()
            .await
            .map_err(|e| CartesifyError::Protocol(format!("failed to parse inspect response: {}", e)))?;

        let Some(report) = body.reports.and_then(|reports| reports.into_iter().next()) else {
            debug!(status = ?body.status, "inspect returned no reports");
            return Ok(None);
        };

        match report.payload {
            serde_json::Value::String(payload) => Ok(Some(payload)),
            other => Err(CartesifyError::Protocol(format!(
                "report payload is not a string: {}",
                other
            ))),
        }
    }

    /// Inspect with `{ input: data }` and decode the first report as JSON.
    pub async fn inspect<T, U>(&self, data: &T) -> Result<Option<U>>
    where
        T: Serialize + ?Sized,
        U: DeserializeOwned,
    {
        let input = serde_json::to_value(data).map_err(|e| CartesifyError::InvalidJson(e.to_string()))?;
        self.inspect_raw(&json!({ "input": input }))
            .await?
            .map(|payload| decode_report(&payload))
            .transpose()
    }

    /// Read-only fetch: `{ cartesify: { fetch: { url, method } } }`.
    pub async fn fetch(&self, request: FetchRequest) -> Result<SuccessPayload> {
        let envelope = OutboundEnvelope::inspect(request);
        let query = serde_json::to_value(&envelope).map_err(|e| CartesifyError::InvalidJson(e.to_string()))?;
        let payload = self
            .inspect_raw(&query)
            .await?
            .ok_or_else(|| CartesifyError::Protocol("inspect response has no reports".into()))?;
        let result: InboundResult = decode_report(&payload)?;
        Ok(result.into_result()?)
    }
}

fn decode_report<U: DeserializeOwned>(payload: &str) -> Result<U> {
    codec::decode_json(payload)
        .map_err(|e| CartesifyError::Protocol(format!("undecodable report payload: {}", e)))
}
