//! Wire envelopes exchanged with the dapp backend.
//!
//! Outbound: `{ requestId?, cartesify: { fetch: { url, method, headers?, body? } } }`
//! Inbound:  `{ success: { ok, status, type, headers, text } }` or
//!           `{ error: { constructorName, message } }`

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{codec, Hex, Result};

/// HTTP header set. Deserializes from either an object or a list of `[name, value]` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Map(BTreeMap<String, String>),
            Pairs(Vec<(String, String)>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Map(map) => Headers(map),
            Repr::Pairs(pairs) => Headers(pairs.into_iter().collect()),
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Headers(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// The HTTP-like call tunnelled to the dapp backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Headers::is_empty")]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CartesifyCall {
    fetch: FetchRequest,
}

/// Envelope serialized as rollup input data (advance) or inspect query (inspect).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
    cartesify: CartesifyCall,
}

impl OutboundEnvelope {
    /// Envelope for a mutating call, tagged with its correlation id.
    pub fn advance(request_id: impl Into<String>, request: FetchRequest) -> Self {
        Self {
            request_id: Some(request_id.into()),
            cartesify: CartesifyCall { fetch: request },
        }
    }

    /// Envelope for a read-only call. Carries no request id.
    pub fn inspect(request: FetchRequest) -> Self {
        Self {
            request_id: None,
            cartesify: CartesifyCall { fetch: request },
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn request(&self) -> &FetchRequest {
        &self.cartesify.fetch
    }
}

/// Extract the correlation id from raw input data, if it carries one.
///
/// Inputs submitted by other clients need not be JSON at all, so callers
/// treat an error the same as `Ok(None)`.
pub fn request_id_of(input: &str) -> Result<Option<String>> {
    #[derive(Deserialize)]
    struct Tagged {
        #[serde(rename = "requestId")]
        request_id: Option<String>,
    }

    let tagged: Tagged = codec::decode_json(input)?;
    Ok(tagged.request_id)
}

/// Successful response produced by the dapp backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessPayload {
    pub ok: bool,
    pub status: u16,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub text: String,
}

/// Error raised by the dapp backend. `constructor_name` tells apart e.g. a
/// `TypeError` from a generic `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{constructor_name}: {message}")]
pub struct RemoteError {
    #[serde(default = "default_constructor_name")]
    pub constructor_name: String,
    #[serde(default)]
    pub message: String,
}

fn default_constructor_name() -> String {
    "Error".to_string()
}

impl RemoteError {
    pub fn new(constructor_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            constructor_name: constructor_name.into(),
            message: message.into(),
        }
    }

    pub fn is_type_error(&self) -> bool {
        self.constructor_name == "TypeError"
    }
}

/// Decoded report payload. Exactly one of `success` / `error` is present on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboundResult {
    Success(SuccessPayload),
    Error(RemoteError),
}

impl InboundResult {
    pub fn into_result(self) -> std::result::Result<SuccessPayload, RemoteError> {
        match self {
            InboundResult::Success(payload) => Ok(payload),
            InboundResult::Error(err) => Err(err),
        }
    }
}

/// `InputAdded(dapp, inboxInputIndex, sender, input)` as delivered by the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputAddedEvent {
    pub dapp: Hex,
    pub input_index: u64,
    pub sender: Hex,
    pub input: Hex,
}
