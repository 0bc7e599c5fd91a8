//! Correlation table for in-flight mutating requests.
//!
//! Maps a request id to the one-shot channel its caller is waiting on.
//! Entries are removed on settlement, on timeout, and when the caller
//! drops its handle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use cartesify_types::{CartesifyError, InboundResult, Result, SuccessPayload};
use tokio::sync::oneshot;
use tracing::debug;

type Settlement = Result<SuccessPayload>;

struct PendingEntry {
    sender: oneshot::Sender<Settlement>,
    created_at: Instant,
}

/// Shared table of pending requests. Cloning shares the same table.
#[derive(Clone, Default)]
pub struct CorrelationTable {
    pending: Arc<Mutex<HashMap<String, PendingEntry>>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PendingEntry>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a waiter for `request_id`.
    pub fn create(&self, request_id: &str) -> Result<PendingHandle> {
        let mut pending = self.lock();
        if pending.contains_key(request_id) {
            return Err(CartesifyError::DuplicateRequest(request_id.to_string()));
        }
        let (sender, receiver) = oneshot::channel();
        pending.insert(
            request_id.to_string(),
            PendingEntry {
                sender,
                created_at: Instant::now(),
            },
        );
        Ok(PendingHandle {
            request_id: request_id.to_string(),
            receiver,
            table: self.clone(),
        })
    }

    /// Complete the waiter with a success payload. Returns `false` if the id is unknown.
    pub fn resolve(&self, request_id: &str, payload: SuccessPayload) -> bool {
        self.complete(request_id, Ok(payload))
    }

    /// Complete the waiter with an error. Returns `false` if the id is unknown.
    pub fn reject(&self, request_id: &str, error: CartesifyError) -> bool {
        self.complete(request_id, Err(error))
    }

    /// Resolve or reject depending on the decoded report.
    pub fn settle(&self, request_id: &str, result: InboundResult) -> bool {
        match result.into_result() {
            Ok(payload) => self.resolve(request_id, payload),
            Err(remote) => self.reject(request_id, remote.into()),
        }
    }

    fn complete(&self, request_id: &str, settlement: Settlement) -> bool {
        let Some(entry) = self.lock().remove(request_id) else {
            debug!(request_id, "no pending request, ignoring settlement");
            return false;
        };
        debug!(
            request_id,
            elapsed_ms = entry.created_at.elapsed().as_millis() as u64,
            ok = settlement.is_ok(),
            "settling pending request"
        );
        entry.sender.send(settlement).is_ok()
    }

    fn remove(&self, request_id: &str) -> bool {
        self.lock().remove(request_id).is_some()
    }

    pub fn contains(&self, request_id: &str) -> bool {
        self.lock().contains_key(request_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Caller side of a pending request.
pub struct PendingHandle {
    request_id: String,
    receiver: oneshot::Receiver<Settlement>,
    table: CorrelationTable,
}

impl PendingHandle {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Wait for settlement. With a timeout, the entry is dropped from the
    /// table once it elapses and `RequestTimeout` is returned.
    pub async fn wait(mut self, timeout: Option<Duration>) -> Result<SuccessPayload> {
        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut self.receiver).await {
                Ok(received) => received,
                Err(_) => {
                    self.table.remove(&self.request_id);
                    return Err(CartesifyError::RequestTimeout(self.request_id.clone()));
                }
            },
            None => (&mut self.receiver).await,
        };
        received.map_err(|_| {
            CartesifyError::Other(format!("pending request {} was dropped", self.request_id))
        })?
    }
}

impl Drop for PendingHandle {
    fn drop(&mut self) {
        self.table.remove(&self.request_id);
    }
}
