//! HTTP-like requests against a rollup dapp.
//!
//! Reads go through the node's inspect endpoint. Writes are submitted as
//! InputBox inputs; the answer is the report the dapp emits for that input,
//! picked up from the `InputAdded` event and the GraphQL endpoint.
//!
//! ```no_run
//! use cartesify::{Cartesify, CartesifyConfig};
//!
//! # async fn run() -> cartesify::Result<()> {
//! let fetch = Cartesify::create_fetch(CartesifyConfig {
//!     dapp_address: Some("0x70ac08179605AF2D9e75782b8DEcDD3c22aA4D0C".into()),
//!     ..CartesifyConfig::from_env()?
//! })?;
//! let response = fetch.post("http://127.0.0.1:8383/echo", r#"{"any":"body"}"#).await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

pub mod axios;
pub mod client;
pub mod config;
pub mod fetch;
pub mod response;

pub use axios::{AxiosLikeClient, AxiosResponse};
pub use cartesify_correlation::CorrelationTable;
pub use cartesify_sync::{GraphQlClient, InspectClient, ReportSource};
pub use cartesify_tx::{InputBox, InputEventSource, TxReceipt};
pub use cartesify_types::{CartesifyError, FetchRequest, Headers, RemoteError, Result};
pub use client::{CartesiClient, CartesiClientBuilder};
pub use config::CartesifyConfig;
pub use fetch::{FetchLikeClient, FetchOptions, Method};
pub use response::Response;

pub struct Cartesify;

impl Cartesify {
    /// Build a client from `config` with JSON-RPC and GraphQL collaborators.
    pub fn create_fetch(config: CartesifyConfig) -> Result<FetchLikeClient> {
        let client = CartesiClient::builder().with_config(config).build()?;
        Ok(FetchLikeClient::new(Arc::new(client)))
    }

    /// Same client as [`Cartesify::create_fetch`] behind the axios-style API.
    pub fn create_axios(config: CartesifyConfig) -> Result<AxiosLikeClient> {
        let client = CartesiClient::builder().with_config(config).build()?;
        Ok(AxiosLikeClient::new(Arc::new(client)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_fetch_inspect_only() {
        let fetch = Cartesify::create_fetch(CartesifyConfig::default()).unwrap();
        assert!(fetch.client().config().dapp_address.is_none());
    }

    #[test]
    fn test_create_axios_rejects_bad_graphql_url() {
        let err = Cartesify::create_axios(CartesifyConfig {
            dapp_address: Some("0x70ac08179605AF2D9e75782b8DEcDD3c22aA4D0C".into()),
            graphql_url: "::bad::".into(),
            ..CartesifyConfig::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, CartesifyError::Config(_)));
    }
}
