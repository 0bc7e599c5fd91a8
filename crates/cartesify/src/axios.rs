//! axios-style entry point.
//!
//! Same read/write split as [`FetchLikeClient`]: GET goes through inspect,
//! everything else is submitted as a rollup input. Request data travels as a
//! JSON body and the response body is handed back as parsed JSON.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use cartesify_types::{CartesifyError, Headers, Result};

use crate::client::CartesiClient;
use crate::fetch::{FetchLikeClient, FetchOptions, Method};

#[derive(Debug, Clone, PartialEq)]
pub struct AxiosResponse {
    /// Body parsed as JSON, or the raw text when it is not JSON.
    pub data: Value,
    pub headers: Headers,
    pub status: u16,
}

/// Cheap to clone; clones share one [`CartesiClient`].
#[derive(Clone)]
pub struct AxiosLikeClient {
    fetch: FetchLikeClient,
}

impl AxiosLikeClient {
    pub fn new(client: Arc<CartesiClient>) -> Self {
        Self {
            fetch: FetchLikeClient::new(client),
        }
    }

    pub fn client(&self) -> &CartesiClient {
        self.fetch.client()
    }

    /// Send one request. A status outside 2xx is returned as
    /// [`CartesifyError::Status`].
    pub async fn request(&self, method: Method, url: &str, data: Option<Value>) -> Result<AxiosResponse> {
        debug!(url, method = %method, "axios request");
        let mut options = FetchOptions::new().method(method);
        if let Some(data) = data.filter(|_| method.is_mutating()) {
            options = options.json(&data)?;
        }

        let response = self.fetch.fetch(url, options).await?;
        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(CartesifyError::Status {
                status,
                body: response.into_text(),
            });
        }

        let headers = response.headers().clone();
        let text = response.into_text();
        let data = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(AxiosResponse { data, headers, status })
    }

    pub async fn get(&self, url: &str) -> Result<AxiosResponse> {
        self.request(Method::Get, url, None).await
    }

    pub async fn delete(&self, url: &str) -> Result<AxiosResponse> {
        self.request(Method::Delete, url, None).await
    }

    pub async fn post<T: Serialize + ?Sized>(&self, url: &str, data: &T) -> Result<AxiosResponse> {
        self.request(Method::Post, url, Some(to_value(data)?)).await
    }

    pub async fn put<T: Serialize + ?Sized>(&self, url: &str, data: &T) -> Result<AxiosResponse> {
        self.request(Method::Put, url, Some(to_value(data)?)).await
    }

    pub async fn patch<T: Serialize + ?Sized>(&self, url: &str, data: &T) -> Result<AxiosResponse> {
        self.request(Method::Patch, url, Some(to_value(data)?)).await
    }
}

fn to_value<T: Serialize + ?Sized>(data: &T) -> Result<Value> {
    serde_json::to_value(data).map_err(|e| CartesifyError::InvalidJson(e.to_string()))
}
