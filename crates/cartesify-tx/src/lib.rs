//! Chain-facing side of the SDK.
//!
//! - `InputBox`: submit rollup inputs and wait for confirmation
//! - `InputEventSource`: stream of `InputAdded` events
//! - alloy-backed implementations of both (`input_box`, `log_watcher`)
//! - `TransactionSubmitter`: envelope -> confirmed input

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::info;

use cartesify_types::{codec, CartesifyError, Hex, InputAddedEvent, OutboundEnvelope, Result};

pub mod input_box;
pub mod log_watcher;

pub use input_box::{http_provider, EthInputBox};
pub use log_watcher::InputAddedWatcher;

/// Receipt of a confirmed input transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub transaction_hash: Hex,
    pub block_number: u64,
    pub confirmations: u64,
}

/// The rollup input contract.
#[async_trait]
pub trait InputBox: Send + Sync {
    /// Submit `input` for `dapp` and wait until the transaction has
    /// `confirmations` confirmations.
    async fn add_input(&self, dapp: &str, input: &[u8], confirmations: u64) -> Result<TxReceipt>;
}

/// Source of `InputAdded` events.
#[async_trait]
pub trait InputEventSource: Send + Sync {
    /// Install the subscription. Events produced after this call returns are delivered.
    async fn subscribe(&self) -> Result<mpsc::Receiver<InputAddedEvent>>;
}

/// Submits envelopes as rollup inputs for one dapp.
pub struct TransactionSubmitter {
    input_box: Arc<dyn InputBox>,
    dapp_address: Hex,
    confirmations: u64,
}

impl TransactionSubmitter {
    pub fn new(input_box: Arc<dyn InputBox>, dapp_address: &str) -> Self {
        Self {
            input_box,
            dapp_address: dapp_address.to_string(),
            confirmations: 1,
        }
    }

    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub fn dapp_address(&self) -> &str {
        &self.dapp_address
    }

    /// Submit a correlated fetch envelope and wait for confirmation.
    ///
    /// The HTTP-like result arrives later through the listener.
    pub async fn submit(&self, envelope: &OutboundEnvelope) -> Result<TxReceipt> {
        info!(request_id = envelope.request_id(), url = %envelope.request().url, "submitting request");
        self.submit_bytes(&codec::to_json_bytes(envelope)?).await
    }

    /// Submit `{ input: payload }` without correlation.
    pub async fn submit_payload<T: Serialize + ?Sized + Sync>(&self, payload: &T) -> Result<TxReceipt> {
        let input = serde_json::to_value(payload).map_err(|e| CartesifyError::InvalidJson(e.to_string()))?;
        self.submit_bytes(&codec::to_json_bytes(&json!({ "input": input }))?).await
    }

    async fn submit_bytes(&self, input: &[u8]) -> Result<TxReceipt> {
        let receipt = self
            .input_box
            .add_input(&self.dapp_address, input, self.confirmations)
            .await?;
        info!(
            tx_hash = %receipt.transaction_hash,
            block = receipt.block_number,
            "input confirmed"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartesify_types::FetchRequest;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingInputBox {
        inputs: Mutex<Vec<(String, Vec<u8>, u64)>>,
        fail_with_auth: bool,
    }

    #[async_trait]
    impl InputBox for RecordingInputBox {
        async fn add_input(&self, dapp: &str, input: &[u8], confirmations: u64) -> Result<TxReceipt> {
            if self.fail_with_auth {
                return Err(CartesifyError::Auth("locked account".into()));
            }
            self.inputs
                .lock()
                .unwrap()
                .push((dapp.to_string(), input.to_vec(), confirmations));
            Ok(TxReceipt {
                transaction_hash: "0xfeed".into(),
                block_number: 7,
                confirmations,
            })
        }
    }

    const DAPP: &str = "0x70ac08179605AF2D9e75782b8DEcDD3c22aA4D0C";

    #[tokio::test]
    async fn test_submit_sends_envelope_and_waits_one_confirmation() {
        let input_box = Arc::new(RecordingInputBox::default());
        let submitter = TransactionSubmitter::new(input_box.clone(), DAPP);
        let envelope = OutboundEnvelope::advance(
            "T1",
            FetchRequest::new("http://127.0.0.1:8383/echo", "POST").with_body(r#"{"any":"body"}"#),
        );

        let receipt = submitter.submit(&envelope).await.unwrap();
        assert_eq!(receipt.transaction_hash, "0xfeed");

        let inputs = input_box.inputs.lock().unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].0, DAPP);
        let sent: OutboundEnvelope = serde_json::from_slice(&inputs[0].1).unwrap();
        assert_eq!(sent, envelope);
        assert_eq!(inputs[0].2, 1);
    }

    #[tokio::test]
    async fn test_submit_payload_wraps_input() {
        let input_box = Arc::new(RecordingInputBox::default());
        let submitter = TransactionSubmitter::new(input_box.clone(), DAPP);

        submitter.submit_payload(&json!({ "beacon": "0x01" })).await.unwrap();

        let inputs = input_box.inputs.lock().unwrap();
        let sent: serde_json::Value = serde_json::from_slice(&inputs[0].1).unwrap();
        assert_eq!(sent, json!({ "input": { "beacon": "0x01" } }));
    }

    #[tokio::test]
    async fn test_configured_confirmations_are_requested() {
        let input_box = Arc::new(RecordingInputBox::default());
        let submitter = TransactionSubmitter::new(input_box.clone(), DAPP).with_confirmations(3);

        let receipt = submitter.submit_payload(&json!({})).await.unwrap();
        assert_eq!(receipt.confirmations, 3);
        assert_eq!(input_box.inputs.lock().unwrap()[0].2, 3);
    }

    #[tokio::test]
    async fn test_signer_error_propagates() {
        let input_box = Arc::new(RecordingInputBox {
            fail_with_auth: true,
            ..Default::default()
        });
        let submitter = TransactionSubmitter::new(input_box.clone(), DAPP);
        let envelope = OutboundEnvelope::advance("T1", FetchRequest::new("http://x/", "POST"));

        let err = submitter.submit(&envelope).await.unwrap_err();
        assert!(matches!(err, CartesifyError::Auth(_)));
        assert!(input_box.inputs.lock().unwrap().is_empty());
    }
}
