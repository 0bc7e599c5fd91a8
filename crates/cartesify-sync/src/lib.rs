//! Read side of the SDK: getting results back from the rollup.
//!
//! - `inspect_client`: single round-trip inspect queries
//! - `graphql_client`: report lookup by input index
//! - `listener`: `InputAdded` subscription and report polling

use async_trait::async_trait;
use cartesify_types::{Hex, Result};

pub mod graphql_client;
pub mod inspect_client;
pub mod listener;

pub use graphql_client::GraphQlClient;
pub use inspect_client::InspectClient;
pub use listener::{EventOutcome, InputAddedListener, ListenerConfig};

/// Where the listener looks up the report produced for an input.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// The most recent report payload for `input_index`, if any.
    async fn last_report(&self, input_index: u64) -> Result<Option<Hex>>;
}
