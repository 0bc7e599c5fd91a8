//! `InputAdded` listener and report poller.
//!
//! Subscribes once per client. For every event whose input carries a
//! pending request id, polls the report source for that input index and
//! settles the matching waiter in the correlation table.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, OnceCell};
use tracing::{debug, info, warn};

use cartesify_correlation::CorrelationTable;
use cartesify_tx::InputEventSource;
use cartesify_types::envelope::request_id_of;
use cartesify_types::{codec, CartesifyError, InboundResult, InputAddedEvent, Result};

use crate::ReportSource;

/// Retry policy for the report poll.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            retry_delay: Duration::from_millis(1_000),
        }
    }
}

/// What happened to one delivered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Not ours, or already handled.
    Ignored,
    /// A report was found and the waiter settled.
    Settled { attempts: u32 },
    /// The waiter went away (timeout or dropped) while polling.
    Abandoned { attempts: u32 },
    /// Retry budget spent; the waiter was rejected with `ReportTimeout`.
    Exhausted { attempts: u32 },
}

#[derive(Clone)]
pub struct InputAddedListener {
    source: Arc<dyn InputEventSource>,
    reports: Arc<dyn ReportSource>,
    table: CorrelationTable,
    config: ListenerConfig,
    subscribed: Arc<OnceCell<()>>,
}

impl InputAddedListener {
    pub fn new(
        source: Arc<dyn InputEventSource>,
        reports: Arc<dyn ReportSource>,
        table: CorrelationTable,
        config: ListenerConfig,
    ) -> Self {
        Self {
            source,
            reports,
            table,
            config,
            subscribed: Arc::new(OnceCell::new()),
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed.initialized()
    }

    /// Install the event subscription on first call; later calls are no-ops.
    pub async fn ensure_subscribed(&self) -> Result<()> {
        self.subscribed
            .get_or_try_init(|| async {
                let events = self.source.subscribe().await?;
                info!("InputAdded listener installed");
                tokio::spawn(self.clone().dispatch(events));
                Ok::<(), CartesifyError>(())
            })
            .await?;
        Ok(())
    }

    async fn dispatch(self, mut events: mpsc::Receiver<InputAddedEvent>) {
        while let Some(event) = events.recv().await {
            let listener = self.clone();
            tokio::spawn(async move {
                listener.handle_event(event).await;
            });
        }
        warn!("InputAdded event stream closed");
    }

    /// Handle one event. Safe to call repeatedly for the same input.
    pub async fn handle_event(&self, event: InputAddedEvent) -> EventOutcome {
        let request_id = match request_id_of(&event.input) {
            Ok(Some(id)) => id,
            Ok(None) => {
                debug!(input_index = event.input_index, "input carries no request id");
                return EventOutcome::Ignored;
            }
            Err(e) => {
                debug!(input_index = event.input_index, error = %e, "input is not a cartesify envelope");
                return EventOutcome::Ignored;
            }
        };

        if !self.table.contains(&request_id) {
            debug!(request_id = %request_id, input_index = event.input_index, "no pending request for input");
            return EventOutcome::Ignored;
        }

        let start = Instant::now();
        let outcome = self.poll_report(&request_id, event.input_index).await;
        info!(
            request_id = %request_id,
            input_index = event.input_index,
            elapsed_ms = start.elapsed().as_millis() as u64,
            ?outcome,
            "InputAdded handled"
        );
        outcome
    }

    async fn poll_report(&self, request_id: &str, input_index: u64) -> EventOutcome {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.config.retry_delay).await;
            }
            if !self.table.contains(request_id) {
                return EventOutcome::Abandoned { attempts: attempt - 1 };
            }

            match self.reports.last_report(input_index).await {
                Ok(Some(payload)) => {
                    match codec::decode_json::<InboundResult>(&payload) {
                        Ok(result) => self.table.settle(request_id, result),
                        Err(e) => self.table.reject(
                            request_id,
                            CartesifyError::Protocol(format!(
                                "undecodable report for input {}: {}",
                                input_index, e
                            )),
                        ),
                    };
                    return EventOutcome::Settled { attempts: attempt };
                }
                Ok(None) => debug!(request_id, input_index, attempt, "report not available yet"),
                Err(e) => warn!(request_id, input_index, attempt, error = %e, "report query failed"),
            }
        }

        self.table.reject(
            request_id,
            CartesifyError::ReportTimeout {
                input_index,
                attempts: max_attempts,
            },
        );
        EventOutcome::Exhausted {
            attempts: max_attempts,
        }
    }
}
