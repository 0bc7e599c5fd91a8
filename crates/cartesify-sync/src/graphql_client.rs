//! GraphQL client for rollup reports.
//!
//! Only the most recent report of an input is authoritative, so the query
//! asks for `reports(last: 1)`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use cartesify_types::{CartesifyError, Hex, Result};

use crate::ReportSource;

pub const REPORT_QUERY: &str = "query Report($index: Int!) { input(index: $index) { reports(last: 1) { edges { node { payload } } } } }";

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ReportData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ReportData {
    input: Option<InputNode>,
}

#[derive(Debug, Deserialize)]
struct InputNode {
    reports: ReportConnection,
}

#[derive(Debug, Deserialize)]
struct ReportConnection {
    edges: Vec<ReportEdge>,
}

#[derive(Debug, Deserialize)]
struct ReportEdge {
    node: ReportNode,
}

#[derive(Debug, Deserialize)]
struct ReportNode {
    payload: Hex,
}

/// Rollup GraphQL endpoint client.
pub struct GraphQlClient {
    endpoint: Url,
    client: reqwest::Client,
    timeout: Duration,
}

impl GraphQlClient {
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
}

#[async_trait]
impl ReportSource for GraphQlClient {
    /// POST {graphql} `Report($index)`. `None` while the input is not indexed
    /// yet or has produced no report.
    async fn last_report(&self, input_index: u64) -> Result<Option<Hex>> {
        let body = json!({
            "operationName": "Report",
            "query": REPORT_QUERY,
            "variables": { "index": input_index },
        });

        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| CartesifyError::Connectivity(format!("graphql request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(CartesifyError::Connectivity(format!(
                "graphql endpoint returned status {}",
                resp.status()
            )));
        }

        let body: GraphQlResponse = resp
            .json()
            .await
            .map_err(|e| CartesifyError::Protocol(format!("failed to parse graphql response: {}", e)))?;

        let Some(input) = body.data.and_then(|data| data.input) else {
            let errors: Vec<&str> = body.errors.iter().map(|e| e.message.as_str()).collect();
            debug!(input_index, ?errors, "input not available in graphql yet");
            return Ok(None);
        };

        Ok(input.reports.edges.into_iter().last().map(|edge| edge.node.payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> GraphQlClient {
        GraphQlClient::new(Url::parse(&server.url("/graphql")).unwrap(), Some(2_000))
    }

    #[tokio::test]
    async fn test_last_report_returns_payload() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/graphql")
                    .body_contains("reports(last: 1)")
                    .body_contains("\"index\":5");
                then.status(200).json_body(json!({
                    "data": { "input": { "reports": { "edges": [{ "node": { "payload": "0x7b7d" } }] } } }
                }));
            })
            .await;

        assert_eq!(client(&server).last_report(5).await.unwrap().as_deref(), Some("0x7b7d"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_edges_is_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql");
                then.status(200)
                    .json_body(json!({ "data": { "input": { "reports": { "edges": [] } } } }));
            })
            .await;

        assert_eq!(client(&server).last_report(5).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unindexed_input_is_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql");
                then.status(200).json_body(json!({
                    "data": null,
                    "errors": [{ "message": "Input not found" }]
                }));
            })
            .await;

        assert_eq!(client(&server).last_report(9).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_server_error_is_connectivity() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql");
                then.status(502);
            })
            .await;

        let err = client(&server).last_report(5).await.unwrap_err();
        assert!(matches!(err, CartesifyError::Connectivity(_)), "got {:?}", err);
    }
}
