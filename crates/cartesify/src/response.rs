//! Fetch-style response returned to callers.

use serde::de::DeserializeOwned;

use cartesify_types::{CartesifyError, Headers, Result, SuccessPayload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    ok: bool,
    status: u16,
    kind: Option<String>,
    headers: Headers,
    text: String,
}

impl Response {
    pub fn ok(&self) -> bool {
        self.ok
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response type as reported by the backend (e.g. "basic", "cors").
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.text).map_err(|e| CartesifyError::InvalidJson(e.to_string()))
    }
}

impl From<SuccessPayload> for Response {
    fn from(payload: SuccessPayload) -> Self {
        Self {
            ok: payload.ok,
            status: payload.status,
            kind: payload.kind,
            headers: payload.headers,
            text: payload.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_accessors() {
        let response = Response::from(SuccessPayload {
            ok: false,
            status: 404,
            kind: Some("basic".into()),
            headers: [("Content-Type", "application/json")].into_iter().collect(),
            text: r#"{"error":"not found"}"#.into(),
        });

        assert!(!response.ok());
        assert_eq!(response.status(), 404);
        assert_eq!(response.kind(), Some("basic"));
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.json::<serde_json::Value>().unwrap(), json!({ "error": "not found" }));
    }

    #[test]
    fn test_json_on_plain_text_fails() {
        let response = Response::from(SuccessPayload {
            ok: true,
            status: 200,
            kind: None,
            headers: Headers::new(),
            text: "pong".into(),
        });
        assert_eq!(response.text(), "pong");
        assert!(matches!(response.json::<serde_json::Value>(), Err(CartesifyError::InvalidJson(_))));
    }
}
