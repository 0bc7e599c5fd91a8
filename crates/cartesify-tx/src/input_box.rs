//! InputBox contract access over an alloy HTTP provider.
//!
//! Transactions are sent from a node-managed account; the node signs
//! `eth_sendTransaction` and the SDK never holds keys.

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, Bytes};
use alloy::providers::{Provider, ProviderBuilder, ReqwestProvider};
use alloy::rpc::client::RpcClient;
use alloy::sol;
use alloy::transports::http::{Client, Http};
use alloy::transports::TransportError;
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::info;
use url::Url;

use cartesify_types::{CartesifyError, Result};

use crate::input_box::IInputBox::IInputBoxInstance;
use crate::{InputBox, TxReceipt};

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface IInputBox {
        event InputAdded(address indexed dapp, uint256 indexed inputIndex, address sender, bytes input);

        function addInput(address _dapp, bytes calldata _input) external returns (bytes32);
    }
);

/// HTTP provider polling at `poll_interval` (receipts, event filters).
pub fn http_provider(url: Url, poll_interval: Duration) -> ReqwestProvider {
    let client = RpcClient::new_http(url).with_poll_interval(poll_interval);
    ProviderBuilder::new().on_client(client)
}

pub(crate) fn parse_address(address: &str) -> Result<Address> {
    Address::from_str(address)
        .map_err(|e| CartesifyError::InvalidHex(format!("not an address {}: {}", address, e)))
}

/// Map a node error response onto the SDK taxonomy.
pub(crate) fn classify_node_error(context: &str, code: i64, message: &str) -> CartesifyError {
    let lowered = message.to_lowercase();
    let detail = format!("{} failed ({}): {}", context, code, message);
    if code == 3 || lowered.contains("revert") {
        CartesifyError::Contract(detail)
    } else if lowered.contains("account")
        || lowered.contains("signer")
        || lowered.contains("insufficient funds")
        || lowered.contains("nonce")
        || lowered.contains("unauthorized")
    {
        CartesifyError::Auth(detail)
    } else {
        CartesifyError::Connectivity(detail)
    }
}

pub(crate) fn transport_error(context: &str, err: TransportError) -> CartesifyError {
    match err.as_error_resp() {
        Some(payload) => classify_node_error(context, payload.code, &payload.message),
        None => CartesifyError::Connectivity(format!("{}: {}", context, err)),
    }
}

fn contract_error(context: &str, err: alloy::contract::Error) -> CartesifyError {
    match err {
        alloy::contract::Error::TransportError(err) => transport_error(context, err),
        other => CartesifyError::Protocol(format!("{}: {}", context, other)),
    }
}

pub struct EthInputBox {
    provider: ReqwestProvider,
    contract: IInputBoxInstance<Http<Client>, ReqwestProvider>,
    sender: Option<Address>,
    chain_id: OnceCell<u64>,
}

impl EthInputBox {
    pub fn new(provider: ReqwestProvider, input_box_address: &str, sender: Option<&str>) -> Result<Self> {
        let contract = IInputBox::new(parse_address(input_box_address)?, provider.clone());
        Ok(Self {
            provider,
            contract,
            sender: sender.map(parse_address).transpose()?,
            chain_id: OnceCell::new(),
        })
    }

    /// Chain id, fetched and logged on first use.
    pub async fn chain_id(&self) -> Result<u64> {
        self.chain_id
            .get_or_try_init(|| async {
                let chain_id = self
                    .provider
                    .get_chain_id()
                    .await
                    .map_err(|e| transport_error("eth_chainId", e))?;
                info!(chain_id, "connected to chain");
                Ok::<u64, CartesifyError>(chain_id)
            })
            .await
            .copied()
    }

    async fn sender(&self) -> Result<Address> {
        if let Some(sender) = self.sender {
            return Ok(sender);
        }
        let accounts = self
            .provider
            .get_accounts()
            .await
            .map_err(|e| transport_error("eth_accounts", e))?;
        accounts
            .into_iter()
            .next()
            .ok_or_else(|| CartesifyError::Auth("node exposes no unlocked account".into()))
    }
}

#[async_trait]
impl InputBox for EthInputBox {
    async fn add_input(&self, dapp: &str, input: &[u8], confirmations: u64) -> Result<TxReceipt> {
        self.chain_id().await?;
        let from = self.sender().await?;
        let dapp = parse_address(dapp)?;
        info!(account = %from, dapp = %dapp, bytes = input.len(), "sending input");

        let pending = self
            .contract
            .addInput(dapp, Bytes::copy_from_slice(input))
            .from(from)
            .send()
            .await
            .map_err(|e| contract_error("addInput", e))?;
        info!(tx_hash = %pending.tx_hash(), "waiting for confirmation...");

        let receipt = pending
            .with_required_confirmations(confirmations.max(1))
            .get_receipt()
            .await
            .map_err(|e| CartesifyError::Connectivity(format!("addInput receipt: {}", e)))?;

        if !receipt.status() {
            return Err(CartesifyError::Contract(format!(
                "transaction {} reverted",
                receipt.transaction_hash
            )));
        }

        Ok(TxReceipt {
            transaction_hash: receipt.transaction_hash.to_string(),
            block_number: receipt.block_number.unwrap_or_default(),
            confirmations: confirmations.max(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const INPUT_BOX: &str = "0x59b22D57D4f067708AB0c00552767405926dc768";
    const DAPP: &str = "0x70ac08179605AF2D9e75782b8DEcDD3c22aA4D0C";
    const ACCOUNT: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn input_box(server: &MockServer, sender: Option<&str>) -> EthInputBox {
        let url = Url::parse(&server.base_url()).unwrap();
        EthInputBox::new(http_provider(url, Duration::from_millis(10)), INPUT_BOX, sender).unwrap()
    }

    async fn mock_chain_id(server: &MockServer) -> httpmock::Mock<'_> {
        server
            .mock_async(|when, then| {
                when.method(POST).path("/").body_contains("eth_chainId");
                then.status(200)
                    .json_body(json!({ "jsonrpc": "2.0", "id": 0, "result": "0x7a69" }));
            })
            .await
    }

    #[tokio::test]
    async fn test_chain_id_is_fetched_once() {
        let server = MockServer::start_async().await;
        let chain_id = mock_chain_id(&server).await;

        let input_box = input_box(&server, Some(ACCOUNT));
        assert_eq!(input_box.chain_id().await.unwrap(), 31337);
        assert_eq!(input_box.chain_id().await.unwrap(), 31337);
        chain_id.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_node_without_accounts_is_auth_error() {
        let server = MockServer::start_async().await;
        mock_chain_id(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/").body_contains("eth_accounts");
                then.status(200)
                    .json_body(json!({ "jsonrpc": "2.0", "id": 1, "result": [] }));
            })
            .await;

        let err = input_box(&server, None).add_input(DAPP, b"{}", 1).await.unwrap_err();
        assert!(matches!(err, CartesifyError::Auth(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_reverted_send_is_contract_error() {
        let server = MockServer::start_async().await;
        mock_chain_id(&server).await;
        let send = server
            .mock_async(|when, then| {
                when.method(POST).path("/").body_contains("eth_sendTransaction");
                then.status(200).json_body(json!({
                    "jsonrpc": "2.0", "id": 1,
                    "error": { "code": 3, "message": "execution reverted" }
                }));
            })
            .await;

        let err = input_box(&server, Some(ACCOUNT)).add_input(DAPP, b"{}", 1).await.unwrap_err();
        assert!(matches!(err, CartesifyError::Contract(_)), "got {:?}", err);
        send.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_node_is_connectivity_error() {
        let url = Url::parse("http://127.0.0.1:1").unwrap();
        let err = EthInputBox::new(http_provider(url, Duration::from_millis(10)), INPUT_BOX, Some(ACCOUNT))
            .unwrap()
            .add_input(DAPP, b"{}", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CartesifyError::Connectivity(_)), "got {:?}", err);
    }

    #[test]
    fn test_bad_addresses_are_rejected() {
        let url = Url::parse("http://127.0.0.1:8545").unwrap();
        let provider = http_provider(url, Duration::from_millis(10));
        assert!(matches!(
            EthInputBox::new(provider.clone(), "0x1234", None),
            Err(CartesifyError::InvalidHex(_))
        ));
        assert!(matches!(
            EthInputBox::new(provider, INPUT_BOX, Some("nope")),
            Err(CartesifyError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_classify_node_error() {
        assert!(matches!(
            classify_node_error("eth_sendTransaction", -32000, "unknown account"),
            CartesifyError::Auth(_)
        ));
        assert!(matches!(
            classify_node_error("eth_sendTransaction", -32000, "insufficient funds for gas"),
            CartesifyError::Auth(_)
        ));
        assert!(matches!(
            classify_node_error("eth_sendTransaction", -32000, "execution reverted: bad input"),
            CartesifyError::Contract(_)
        ));
        assert!(matches!(
            classify_node_error("eth_call", -32601, "method not found"),
            CartesifyError::Connectivity(_)
        ));
    }
}
