//! HTTP transport seam
//!
//! Every outbound call from the session and the Gmail client goes through
//! [`HttpTransport`]. The default implementation uses synchronous HTTP (ureq)
//! to stay executor-agnostic; tests plug in a scripted transport.

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

/// An outbound request
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: Body,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            bearer: None,
            body: Body::Empty,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(url)
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Body::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Value of a query parameter, if present
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response: status code plus body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes requests against the network (or a stand-in)
pub trait HttpTransport: Send + Sync {
    /// Perform the request. Non-2xx statuses are returned as responses;
    /// only connection-level failures are errors.
    fn execute(&self, request: &Request) -> Result<Response>;
}

/// Blocking transport backed by a ureq agent
pub struct UreqTransport {
    agent: ureq::Agent,
    body_limit: u64,
}

impl UreqTransport {
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Largest response body read: a 25 MiB attachment grows by a third
    /// when base64url encoded, plus room for the JSON around it.
    pub const DEFAULT_BODY_LIMIT: u64 = 40 * 1024 * 1024;

    pub fn new() -> Self {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: config.into(),
            body_limit: Self::DEFAULT_BODY_LIMIT,
        }
    }

    /// Override the largest response body accepted, in bytes
    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.body_limit = limit;
        self
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for UreqTransport {
    fn execute(&self, request: &Request) -> Result<Response> {
        let auth = request.bearer.as_ref().map(|t| format!("Bearer {}", t));

        let result = match request.method {
            Method::Get => {
                let mut req = self.agent.get(&request.url);
                for (key, value) in &request.query {
                    req = req.query(key, value);
                }
                if let Some(auth) = &auth {
                    req = req.header("Authorization", auth);
                }
                req.call()
            }
            Method::Post => {
                let mut req = self.agent.post(&request.url);
                for (key, value) in &request.query {
                    req = req.query(key, value);
                }
                if let Some(auth) = &auth {
                    req = req.header("Authorization", auth);
                }
                match &request.body {
                    Body::Empty => req.send_empty(),
                    Body::Json(json) => req.send_json(json),
                    Body::Form(fields) => {
                        req.send_form(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                    }
                }
            }
        };

        let mut response = result.map_err(|e| Error::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.body_limit)
            .read_to_string()
            .map_err(|e| Error::Transport(format!("Failed to read response body: {}", e)))?;

        debug!("{:?} {} -> {}", request.method, request.url, status);
        Ok(Response { status, body })
    }
}

/// Execute a request and decode a JSON success body
pub(crate) fn call_json<T: DeserializeOwned>(
    transport: &dyn HttpTransport,
    request: &Request,
) -> Result<T> {
    let response = transport.execute(request)?;
    if !response.is_success() {
        return Err(Error::Api {
            status: response.status,
            message: error_message(&response),
        });
    }
    serde_json::from_str(&response.body).map_err(|e| Error::InvalidResponse(e.to_string()))
}

/// Pull the human-readable message out of an error body
///
/// Handles both Google API errors (`{"error": {"message": ...}}`) and
/// OAuth endpoint errors (`{"error": "...", "error_description": "..."}`).
pub(crate) fn error_message(response: &Response) -> String {
    let parsed: Option<Value> = serde_json::from_str(&response.body).ok();

    let message = parsed.as_ref().and_then(|v| {
        match v.get("error") {
            Some(Value::Object(err)) => err.get("message").and_then(Value::as_str),
            Some(Value::String(code)) => v
                .get("error_description")
                .and_then(Value::as_str)
                .or(Some(code.as_str())),
            _ => None,
        }
        .map(str::to_string)
    });

    message.unwrap_or_else(|| {
        let body = response.body.trim();
        if body.is_empty() {
            format!("HTTP status {}", response.status)
        } else {
            body.to_string()
        }
    })
}
