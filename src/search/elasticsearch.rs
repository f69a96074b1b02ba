/// Elasticsearch REST client.
///
/// Talks to a single node through one shared `ureq::Agent`. Connection
/// reuse is whatever the agent's pool provides.
///
/// - **Index**: `POST /{index}/_doc` with the document as the body.
/// - **Search**: `POST /{index}/_search` with `{"query":{"match_all":{}}}`.
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Value, json};

use super::SearchEngine;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// The part of a `_search` response we read.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ElasticsearchClient {
    base_url: String,
    agent: ureq::Agent,
}

impl ElasticsearchClient {
    pub fn new(base_url: &str, agent: ureq::Agent) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, index: &str, action: &str) -> String {
        format!("{}/{}/{}", self.base_url, urlencoding::encode(index), action)
    }

    /// `GET /`: true when the node answers with a 2xx.
    pub fn ping(&self) -> bool {
        self.agent.get(&format!("{}/", self.base_url)).call().is_ok()
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        match self.agent.post(url).send_json(body) {
            Ok(resp) => resp
                .into_json::<Value>()
                .context("failed to parse Elasticsearch response"),
            Err(ureq::Error::Status(code, resp)) => {
                let text = resp.into_string().unwrap_or_default();
                anyhow::bail!("{}", describe_error(code, &text))
            }
            Err(error) => Err(error).context("Elasticsearch request failed"),
        }
    }
}

impl SearchEngine for ElasticsearchClient {
    fn index_document(&self, index: &str, document: &Value) -> Result<Value> {
        let url = self.endpoint(index, "_doc");
        tracing::debug!(url = %url, "indexing document");
        self.post_json(&url, document)
    }

    fn search_all(&self, index: &str) -> Result<Vec<Value>> {
        let url = self.endpoint(index, "_search");
        let query = json!({ "query": { "match_all": {} } });
        let raw = self.post_json(&url, &query)?;
        let parsed: SearchResponse =
            serde_json::from_value(raw).context("search response has no hits envelope")?;
        Ok(parsed.hits.hits)
    }
}

/// Render an Elasticsearch error body the way its clients do:
/// `type: reason`, falling back to the status and raw text.
fn describe_error(status: u16, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let root = parsed
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(|e| e.get("root_cause").and_then(|r| r.get(0)).or(Some(e)));

    match root {
        Some(Value::Object(obj)) => {
            let kind = obj.get("type").and_then(Value::as_str).unwrap_or("error");
            match obj.get("reason").and_then(Value::as_str) {
                Some(reason) => format!("{kind}: {reason}"),
                None => kind.to_string(),
            }
        }
        Some(Value::String(s)) => s.clone(),
        _ if body.trim().is_empty() => format!("Elasticsearch returned HTTP {status}"),
        _ => format!("Elasticsearch returned HTTP {status}: {}", body.trim()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
