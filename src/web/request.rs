//! Owned snapshot of an inbound HTTP request.
//!
//! The router works on this type rather than on `tiny_http::Request` so
//! handlers can be exercised without a socket.

use anyhow::{Context, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundRequest {
    /// Upper-case method name (`GET`, `POST`, ...).
    pub method: String,
    /// Path plus query string, as received.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl InboundRequest {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Capture everything the router needs, consuming the request body.
    pub fn read_from(request: &mut tiny_http::Request) -> Result<Self> {
        let headers = request
            .headers()
            .iter()
            .map(|h| (h.field.as_str().as_str().to_string(), h.value.as_str().to_string()))
            .collect();

        let mut body = Vec::new();
        request
            .as_reader()
            .read_to_end(&mut body)
            .context("failed reading request body")?;

        Ok(Self {
            method: request.method().to_string().to_ascii_uppercase(),
            url: request.url().to_string(),
            headers,
            body,
        })
    }

    /// Path without the query string.
    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }

    /// Query string without the leading `?`, or `""`.
    pub fn query(&self) -> &str {
        self.url.split_once('?').map(|(_, q)| q).unwrap_or("")
    }

    /// First header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn authorization(&self) -> Option<&str> {
        self.header("Authorization")
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
