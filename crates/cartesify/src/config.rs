//! Client configuration.
//!
//! Defaults target a local rollup node. `from_env` reads `CARTESIFY_*` variables.

use std::str::FromStr;
use std::time::Duration;

use url::Url;

use cartesify_sync::ListenerConfig;
use cartesify_types::{CartesifyError, Hex, Result};

pub const DEFAULT_INSPECT_URL: &str = "http://localhost:8080/inspect";
pub const DEFAULT_GRAPHQL_URL: &str = "http://localhost:8080/graphql";
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";
pub const DEFAULT_INPUT_BOX_ADDRESS: &str = "0x59b22D57D4f067708AB0c00552767405926dc768";

#[derive(Debug, Clone)]
pub struct CartesifyConfig {
    pub inspect_url: String,
    pub graphql_url: String,
    pub rpc_url: String,
    /// Required for mutating calls; inspect works without it.
    pub dapp_address: Option<Hex>,
    pub input_box_address: Hex,
    /// Node-managed account used as `from`. First of `eth_accounts` when unset.
    pub sender: Option<Hex>,
    /// Whole mutating call, confirmation included. `None` waits forever.
    pub request_timeout_ms: Option<u64>,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    /// Receipt and log polling interval.
    pub poll_interval_ms: u64,
    pub http_timeout_ms: u64,
    pub confirmations: u64,
}

impl Default for CartesifyConfig {
    fn default() -> Self {
        Self {
            inspect_url: DEFAULT_INSPECT_URL.to_string(),
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            dapp_address: None,
            input_box_address: DEFAULT_INPUT_BOX_ADDRESS.to_string(),
            sender: None,
            request_timeout_ms: Some(60_000),
            max_attempts: 20,
            retry_delay_ms: 1_000,
            poll_interval_ms: 1_000,
            http_timeout_ms: 20_000,
            confirmations: 1,
        }
    }
}

impl CartesifyConfig {
    /// Defaults overridden by `CARTESIFY_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("CARTESIFY_INSPECT_URL") {
            config.inspect_url = v;
        }
        if let Some(v) = get("CARTESIFY_GRAPHQL_URL") {
            config.graphql_url = v;
        }
        if let Some(v) = get("CARTESIFY_RPC_URL") {
            config.rpc_url = v;
        }
        if let Some(v) = get("CARTESIFY_DAPP_ADDRESS") {
            config.dapp_address = Some(v);
        }
        if let Some(v) = get("CARTESIFY_INPUT_BOX_ADDRESS") {
            config.input_box_address = v;
        }
        if let Some(v) = get("CARTESIFY_SENDER") {
            config.sender = Some(v);
        }
        if let Some(v) = get("CARTESIFY_REQUEST_TIMEOUT_MS") {
            let ms: u64 = parse_number("CARTESIFY_REQUEST_TIMEOUT_MS", &v)?;
            config.request_timeout_ms = (ms > 0).then_some(ms);
        }
        if let Some(v) = get("CARTESIFY_MAX_ATTEMPTS") {
            config.max_attempts = parse_number("CARTESIFY_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = get("CARTESIFY_RETRY_DELAY_MS") {
            config.retry_delay_ms = parse_number("CARTESIFY_RETRY_DELAY_MS", &v)?;
        }
        if let Some(v) = get("CARTESIFY_POLL_INTERVAL_MS") {
            config.poll_interval_ms = parse_number("CARTESIFY_POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = get("CARTESIFY_HTTP_TIMEOUT_MS") {
            config.http_timeout_ms = parse_number("CARTESIFY_HTTP_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("CARTESIFY_CONFIRMATIONS") {
            config.confirmations = parse_number("CARTESIFY_CONFIRMATIONS", &v)?;
        }

        Ok(config)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn listener_config(&self) -> ListenerConfig {
        ListenerConfig {
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| CartesifyError::Config(format!("{}={}: {}", key, value, e)))
}

pub(crate) fn parse_url(name: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| CartesifyError::Config(format!("invalid {} url {}: {}", name, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = CartesifyConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.inspect_url, DEFAULT_INSPECT_URL);
        assert_eq!(config.graphql_url, DEFAULT_GRAPHQL_URL);
        assert_eq!(config.dapp_address, None);
        assert_eq!(config.max_attempts, 20);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.listener_config().retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_env_overrides() {
        let config = CartesifyConfig::from_lookup(lookup(&[
            ("CARTESIFY_DAPP_ADDRESS", "0x70ac08179605AF2D9e75782b8DEcDD3c22aA4D0C"),
            ("CARTESIFY_MAX_ATTEMPTS", "30"),
            ("CARTESIFY_REQUEST_TIMEOUT_MS", "0"),
            ("CARTESIFY_SENDER", "  "),
        ]))
        .unwrap();
        assert_eq!(
            config.dapp_address.as_deref(),
            Some("0x70ac08179605AF2D9e75782b8DEcDD3c22aA4D0C")
        );
        assert_eq!(config.max_attempts, 30);
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.sender, None);
    }

    #[test]
    fn test_bad_number_is_config_error() {
        let err = CartesifyConfig::from_lookup(lookup(&[("CARTESIFY_RETRY_DELAY_MS", "soon")])).unwrap_err();
        assert!(matches!(err, CartesifyError::Config(_)));
    }

    #[test]
    fn test_parse_url() {
        assert!(parse_url("inspect", DEFAULT_INSPECT_URL).is_ok());
        assert!(matches!(parse_url("inspect", "not a url"), Err(CartesifyError::Config(_))));
    }
}
