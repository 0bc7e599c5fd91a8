//! `fetch`-style entry point.
//!
//! GET/HEAD go through the inspect endpoint and never touch the chain.
//! Every other method is submitted as a rollup input and resolved when the
//! dapp's report for that input shows up.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use cartesify_types::{CartesifyError, FetchRequest, Headers, Result};

use crate::client::CartesiClient;
use crate::response::Response;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Mutating methods take the advance path.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Method::Get | Method::Head)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = CartesifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(CartesifyError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Options for a single call. Headers and body only travel on the advance path.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub method: Method,
    pub headers: Headers,
    pub body: Option<String>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the body and set `Content-Type: application/json`.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_string(value).map_err(|e| CartesifyError::InvalidJson(e.to_string()))?;
        Ok(self.header("Content-Type", "application/json").body(body))
    }
}

/// Cheap to clone; clones share one [`CartesiClient`].
#[derive(Clone)]
pub struct FetchLikeClient {
    client: Arc<CartesiClient>,
}

impl FetchLikeClient {
    pub fn new(client: Arc<CartesiClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CartesiClient {
        &self.client
    }

    pub async fn fetch(&self, url: &str, options: FetchOptions) -> Result<Response> {
        let FetchOptions { method, headers, body } = options;
        debug!(url, method = %method, "fetch");

        let payload = if method.is_mutating() {
            let mut request = FetchRequest::new(url, method.as_str()).with_headers(headers);
            if let Some(body) = body {
                request = request.with_body(body);
            }
            self.client.advance_fetch(request).await?
        } else {
            self.client
                .inspect_fetch(FetchRequest::new(url, method.as_str()))
                .await?
        };

        Ok(Response::from(payload))
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        self.fetch(url, FetchOptions::new()).await
    }

    pub async fn post(&self, url: &str, body: impl Into<String>) -> Result<Response> {
        self.fetch(url, FetchOptions::new().method(Method::Post).body(body))
            .await
    }
}
