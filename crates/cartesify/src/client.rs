//! Client context object.
//!
//! One `CartesiClient` owns everything a fetch needs: the inspect client,
//! the submitter, the correlation table and the `InputAdded` listener.
//! Independent clients never share pending requests.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use cartesify_correlation::CorrelationTable;
use cartesify_sync::{GraphQlClient, InputAddedListener, InspectClient, ReportSource};
use cartesify_tx::{
    http_provider, EthInputBox, InputAddedWatcher, InputBox, InputEventSource, TransactionSubmitter, TxReceipt,
};
use cartesify_types::{CartesifyError, FetchRequest, Hex, OutboundEnvelope, Result, SuccessPayload};

use crate::config::{parse_url, CartesifyConfig};

/// Mutating side of a client. Present only when a dapp address is configured.
struct AdvanceChannel {
    submitter: TransactionSubmitter,
    listener: InputAddedListener,
}

pub struct CartesiClient {
    config: CartesifyConfig,
    inspect: InspectClient,
    advance: Option<AdvanceChannel>,
    table: CorrelationTable,
}

impl CartesiClient {
    pub fn builder() -> CartesiClientBuilder {
        CartesiClientBuilder::default()
    }

    pub fn config(&self) -> &CartesifyConfig {
        &self.config
    }

    /// Number of mutating requests still waiting for their report.
    pub fn pending_requests(&self) -> usize {
        self.table.len()
    }

    /// Inspect with `{ input: data }`. `None` when the dapp produced no report.
    pub async fn inspect<T, U>(&self, data: &T) -> Result<Option<U>>
    where
        T: Serialize + ?Sized,
        U: DeserializeOwned,
    {
        self.inspect.inspect(data).await
    }

    /// Submit `{ input: data }` as an uncorrelated rollup input.
    ///
    /// No request timeout applies here. The call returns once the input
    /// transaction has the configured confirmations.
    pub async fn advance<T: Serialize + ?Sized + Sync>(&self, data: &T) -> Result<TxReceipt> {
        self.advance_channel()?.submitter.submit_payload(data).await
    }

    /// Read-only request through the inspect endpoint.
    pub async fn inspect_fetch(&self, request: FetchRequest) -> Result<SuccessPayload> {
        self.inspect.fetch(request).await
    }

    /// Mutating request: submitted as an input, answered by a report.
    ///
    /// The configured request timeout covers the whole call: installing the
    /// `InputAdded` subscription, submission, confirmation and the wait for
    /// the report. The pending entry is gone once this returns or the future
    /// is dropped.
    pub async fn advance_fetch(&self, request: FetchRequest) -> Result<SuccessPayload> {
        let channel = self.advance_channel()?;
        let request_id = new_request_id();
        let call = self.run_advance(channel, &request_id, request);

        match self.config.request_timeout() {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| CartesifyError::RequestTimeout(request_id.clone()))?,
            None => call.await,
        }
    }

    async fn run_advance(
        &self,
        channel: &AdvanceChannel,
        request_id: &str,
        request: FetchRequest,
    ) -> Result<SuccessPayload> {
        channel.listener.ensure_subscribed().await?;

        let handle = self.table.create(request_id)?;
        let envelope = OutboundEnvelope::advance(request_id, request);
        channel.submitter.submit(&envelope).await?;
        debug!(request_id = %request_id, "input confirmed, waiting for report");
        handle.wait(None).await
    }

    fn advance_channel(&self) -> Result<&AdvanceChannel> {
        self.advance.as_ref().ok_or_else(|| {
            CartesifyError::Config("dapp address is required for mutating requests".into())
        })
    }
}

/// `{millis}:{random}`, unique enough across concurrent callers of one client.
fn new_request_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{}:{}", millis, rand::random::<f64>())
}

/// Builder for [`CartesiClient`]. Chain collaborators left unset are built
/// from the JSON-RPC and GraphQL settings of the config.
#[derive(Default)]
pub struct CartesiClientBuilder {
    config: CartesifyConfig,
    input_box: Option<Arc<dyn InputBox>>,
    event_source: Option<Arc<dyn InputEventSource>>,
    report_source: Option<Arc<dyn ReportSource>>,
}

impl CartesiClientBuilder {
    pub fn with_config(mut self, config: CartesifyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_dapp_address(mut self, dapp_address: impl Into<Hex>) -> Self {
        self.config.dapp_address = Some(dapp_address.into());
        self
    }

    pub fn with_inspect_url(mut self, url: impl Into<String>) -> Self {
        self.config.inspect_url = url.into();
        self
    }

    pub fn with_graphql_url(mut self, url: impl Into<String>) -> Self {
        self.config.graphql_url = url.into();
        self
    }

    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.config.rpc_url = url.into();
        self
    }

    pub fn with_sender(mut self, sender: impl Into<Hex>) -> Self {
        self.config.sender = Some(sender.into());
        self
    }

    pub fn with_input_box(mut self, input_box: Arc<dyn InputBox>) -> Self {
        self.input_box = Some(input_box);
        self
    }

    pub fn with_event_source(mut self, source: Arc<dyn InputEventSource>) -> Self {
        self.event_source = Some(source);
        self
    }

    pub fn with_report_source(mut self, reports: Arc<dyn ReportSource>) -> Self {
        self.report_source = Some(reports);
        self
    }

    pub fn build(self) -> Result<CartesiClient> {
        let config = self.config;
        let inspect = InspectClient::new(
            parse_url("inspect", &config.inspect_url)?,
            Some(config.http_timeout_ms),
        );
        let table = CorrelationTable::new();

        let advance = match config.dapp_address.as_deref() {
            None => {
                info!(inspect_url = %config.inspect_url, "cartesify client ready (inspect only)");
                None
            }
            Some(dapp) => {
                let mut shared_provider = None;
                let mut provider = || -> Result<_> {
                    if shared_provider.is_none() {
                        let rpc_url = parse_url("rpc", &config.rpc_url)?;
                        shared_provider = Some(http_provider(
                            rpc_url,
                            Duration::from_millis(config.poll_interval_ms),
                        ));
                    }
                    shared_provider
                        .clone()
                        .ok_or_else(|| CartesifyError::Config("rpc provider unavailable".into()))
                };

                let input_box: Arc<dyn InputBox> = match self.input_box {
                    Some(input_box) => input_box,
                    None => Arc::new(EthInputBox::new(
                        provider()?,
                        &config.input_box_address,
                        config.sender.as_deref(),
                    )?),
                };
                let event_source: Arc<dyn InputEventSource> = match self.event_source {
                    Some(source) => source,
                    None => Arc::new(InputAddedWatcher::new(provider()?, &config.input_box_address, dapp)?),
                };
                let reports: Arc<dyn ReportSource> = match self.report_source {
                    Some(reports) => reports,
                    None => Arc::new(GraphQlClient::new(
                        parse_url("graphql", &config.graphql_url)?,
                        Some(config.http_timeout_ms),
                    )),
                };

                info!(
                    dapp_address = %dapp,
                    rpc_url = %config.rpc_url,
                    graphql_url = %config.graphql_url,
                    "cartesify client ready"
                );

                Some(AdvanceChannel {
                    submitter: TransactionSubmitter::new(input_box, dapp)
                        .with_confirmations(config.confirmations),
                    listener: InputAddedListener::new(
                        event_source,
                        reports,
                        table.clone(),
                        config.listener_config(),
                    ),
                })
            }
        };

        Ok(CartesiClient {
            config,
            inspect,
            advance,
            table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cartesify_types::InputAddedEvent;
    use tokio::sync::mpsc;

    /// Node that accepts the filter request but never answers it.
    struct StalledEvents;

    #[async_trait]
    impl InputEventSource for StalledEvents {
        async fn subscribe(&self) -> Result<mpsc::Receiver<InputAddedEvent>> {
            std::future::pending().await
        }
    }

    struct NoChain;

    #[async_trait]
    impl InputBox for NoChain {
        async fn add_input(&self, _dapp: &str, _input: &[u8], _confirmations: u64) -> Result<TxReceipt> {
            Err(CartesifyError::Connectivity("unused".into()))
        }
    }

    #[async_trait]
    impl ReportSource for NoChain {
        async fn last_report(&self, _input_index: u64) -> Result<Option<Hex>> {
            Ok(None)
        }
    }

    #[test]
    fn test_request_ids_are_distinct() {
        let a = new_request_id();
        let b = new_request_id();
        assert_ne!(a, b);
        let (millis, random) = a.split_once(':').unwrap();
        assert!(millis.parse::<u128>().is_ok());
        assert!(random.parse::<f64>().is_ok());
    }

    #[test]
    fn test_inspect_only_without_dapp() {
        let client = CartesiClient::builder().build().unwrap();
        assert_eq!(client.pending_requests(), 0);
        assert!(client.advance.is_none());
    }

    #[test]
    fn test_invalid_inspect_url_is_config_error() {
        let err = CartesiClient::builder()
            .with_inspect_url("::not a url::")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, CartesifyError::Config(_)));
    }

    #[test]
    fn test_default_collaborators_need_valid_rpc_url() {
        let err = CartesiClient::builder()
            .with_dapp_address("0x70ac08179605AF2D9e75782b8DEcDD3c22aA4D0C")
            .with_rpc_url("nope")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, CartesifyError::Config(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout_covers_stalled_subscription() {
        let client = CartesiClient::builder()
            .with_config(CartesifyConfig {
                request_timeout_ms: Some(1_000),
                ..CartesifyConfig::default()
            })
            .with_dapp_address("0x70ac08179605AF2D9e75782b8DEcDD3c22aA4D0C")
            .with_input_box(Arc::new(NoChain))
            .with_event_source(Arc::new(StalledEvents))
            .with_report_source(Arc::new(NoChain))
            .build()
            .unwrap();

        let started = tokio::time::Instant::now();
        let err = client
            .advance_fetch(FetchRequest::new("http://127.0.0.1:8383/echo", "POST"))
            .await
            .unwrap_err();

        assert!(matches!(err, CartesifyError::RequestTimeout(_)), "got {:?}", err);
        assert!(started.elapsed() >= Duration::from_millis(1_000));
        assert_eq!(client.pending_requests(), 0);
    }
}
