//! `InputAdded` event source backed by an alloy log filter.

use alloy::primitives::Address;
use alloy::providers::ReqwestProvider;
use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use cartesify_types::{bytes_to_hex, InputAddedEvent, Result};

use crate::input_box::IInputBox::{self, InputAdded};
use crate::input_box::{parse_address, transport_error};
use crate::InputEventSource;

/// Watches the InputBox for inputs addressed to one dapp.
pub struct InputAddedWatcher {
    provider: ReqwestProvider,
    input_box_address: Address,
    dapp_address: Address,
    capacity: usize,
}

impl InputAddedWatcher {
    pub fn new(provider: ReqwestProvider, input_box_address: &str, dapp_address: &str) -> Result<Self> {
        Ok(Self {
            provider,
            input_box_address: parse_address(input_box_address)?,
            dapp_address: parse_address(dapp_address)?,
            capacity: 64,
        })
    }
}

#[async_trait]
impl InputEventSource for InputAddedWatcher {
    /// Installs a log filter from the current head block.
    async fn subscribe(&self) -> Result<mpsc::Receiver<InputAddedEvent>> {
        let contract = IInputBox::new(self.input_box_address, self.provider.clone());
        let mut stream = contract
            .event_filter::<InputAdded>()
            .watch()
            .await
            .map_err(|e| transport_error("eth_newFilter", e))?
            .into_stream();

        let (sender, receiver) = mpsc::channel(self.capacity);
        let dapp = self.dapp_address;
        debug!(dapp = %dapp, "watching InputAdded logs");

        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                let event = match item {
                    Ok((event, _log)) => event,
                    Err(e) => {
                        warn!(error = %e, "skipping undecodable InputAdded log");
                        continue;
                    }
                };
                let Some(event) = to_event(dapp, event) else {
                    continue;
                };
                if sender.send(event).await.is_err() {
                    break;
                }
            }
            debug!("InputAdded receiver dropped, stopping log watcher");
        });
        Ok(receiver)
    }
}

/// Keep events for `dapp` and convert them to the SDK shape.
fn to_event(dapp: Address, event: InputAdded) -> Option<InputAddedEvent> {
    if event.dapp != dapp {
        return None;
    }
    let input_index = match u64::try_from(event.inputIndex) {
        Ok(index) => index,
        Err(_) => {
            warn!(input_index = %event.inputIndex, "input index out of range");
            return None;
        }
    };
    Some(InputAddedEvent {
        dapp: event.dapp.to_string(),
        input_index,
        sender: event.sender.to_string(),
        input: bytes_to_hex(&event.input),
    })
}
