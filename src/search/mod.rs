//! Search/index gateway.
//!
//! Two operations sit in front of the search engine: index one document,
//! and run a match-all query against the configured index. Both shape the
//! engine's answer (or failure) into the JSON bodies the dashboard expects;
//! the HTTP layer only adds headers.

pub mod elasticsearch;

use anyhow::Result;
use serde::Deserialize;
use serde_json::{Value, json};

pub use elasticsearch::ElasticsearchClient;

use crate::reply::JsonReply;

/// Operations the gateway needs from a search engine.
pub trait SearchEngine: Send + Sync {
    /// Index `document` into `index`, returning the engine's acknowledgement.
    fn index_document(&self, index: &str, document: &Value) -> Result<Value>;

    /// Return every hit in `index` for a match-all query.
    fn search_all(&self, index: &str) -> Result<Vec<Value>>;
}

/// Body of `POST /api/index`.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexRequest {
    pub index: String,
    pub data: Value,
}

/// Handle an index request body end to end.
///
/// `{success: true, result}` on success, `{success: false, error}` with 400
/// for an unusable body and 500 for an engine failure.
pub fn index_document(engine: &dyn SearchEngine, body: &str) -> JsonReply {
    let request: IndexRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(error) => {
            return JsonReply::new(
                400,
                json!({ "success": false, "error": format!("invalid index request: {error}") }),
            );
        }
    };

    match engine.index_document(&request.index, &request.data) {
        Ok(result) => JsonReply::ok(json!({ "success": true, "result": result })),
        Err(error) => {
            tracing::error!(index = %request.index, error = %format!("{error:#}"), "indexing failed");
            JsonReply::new(500, json!({ "success": false, "error": format!("{error:#}") }))
        }
    }
}

/// Run the fixed match-all search. Hits on success, a fixed error otherwise.
pub fn search_all(engine: &dyn SearchEngine, index: &str) -> JsonReply {
    match engine.search_all(index) {
        Ok(hits) => JsonReply::ok(Value::Array(hits)),
        Err(error) => {
            tracing::error!(index = %index, error = %format!("{error:#}"), "search failed");
            JsonReply::error(500, "Elasticsearch query failed")
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingEngine {
        fail: bool,
        indexed: Mutex<Vec<(String, Value)>>,
    }

    impl SearchEngine for RecordingEngine {
        fn index_document(&self, index: &str, document: &Value) -> Result<Value> {
            if self.fail {
                anyhow::bail!("index_not_found_exception");
            }
            self.indexed
                .lock()
                .unwrap()
                .push((index.to_string(), document.clone()));
            Ok(json!({ "_index": index, "result": "created" }))
        }

        fn search_all(&self, index: &str) -> Result<Vec<Value>> {
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(vec![json!({ "_index": index, "_id": "1" })])
        }
    }

    #[test]
    fn index_success_wraps_result() {
        let engine = RecordingEngine::default();
        let reply = index_document(&engine, r#"{"index":"user_prompts","data":{"prompt":"x"}}"#);
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body["success"], true);
        assert_eq!(reply.body["result"]["result"], "created");

        let indexed = engine.indexed.lock().unwrap();
        assert_eq!(indexed[0].0, "user_prompts");
        assert_eq!(indexed[0].1, json!({ "prompt": "x" }));
    }

    #[test]
    fn index_failure_reports_message() {
        let engine = RecordingEngine {
            fail: true,
            ..Default::default()
        };
        let reply = index_document(&engine, r#"{"index":"user_prompts","data":{"prompt":"x"}}"#);
        assert_eq!(reply.status, 500);
        assert_eq!(reply.body["success"], false);
        assert_eq!(reply.body["error"], "index_not_found_exception");
    }

    struct UnreachableEngine;

    impl SearchEngine for UnreachableEngine {
        fn index_document(&self, _index: &str, _document: &Value) -> Result<Value> {
            Err(anyhow::anyhow!("Connection refused (os error 111)")
                .context("Elasticsearch request failed"))
        }

        fn search_all(&self, _index: &str) -> Result<Vec<Value>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn index_failure_keeps_underlying_cause() {
        let reply = index_document(
            &UnreachableEngine,
            r#"{"index":"user_prompts","data":{"prompt":"x"}}"#,
        );
        assert_eq!(reply.status, 500);
        assert_eq!(
            reply.body["error"],
            "Elasticsearch request failed: Connection refused (os error 111)"
        );
    }

    #[test]
    fn index_rejects_missing_fields() {
        let engine = RecordingEngine::default();
        let reply = index_document(&engine, r#"{"data":{}}"#);
        assert_eq!(reply.status, 400);
        assert_eq!(reply.body["success"], false);
        assert!(engine.indexed.lock().unwrap().is_empty());
    }

    #[test]
    fn search_returns_hit_array() {
        let reply = search_all(&RecordingEngine::default(), "your-index-name");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body[0]["_index"], "your-index-name");
    }

    #[test]
    fn search_failure_is_fixed_message() {
        let engine = RecordingEngine {
            fail: true,
            ..Default::default()
        };
        let reply = search_all(&engine, "your-index-name");
        assert_eq!(reply.status, 500);
        assert_eq!(reply.body, json!({ "error": "Elasticsearch query failed" }));
    }
}
