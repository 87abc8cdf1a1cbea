//! JSON body shared by every `/api/v1` endpoint.
//!
//! ```json
//! {
//!   "data": { "response": "...", "session_id": "..." },
//!   "meta": { "request_id": "...", "timestamp": "...", "response_time_ms": 12 },
//!   "_links": { "session": "/api/v1/sessions/...?user_name=..." }
//! }
//! ```
//!
//! Failures carry `errors` instead of `data`.

use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    pub meta: ApiMeta,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ApiErrorDetail>,

    /// Related resources a client can fetch next, keyed by relation.
    #[serde(rename = "_links", skip_serializing_if = "HashMap::is_empty")]
    pub links: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct ApiMeta {
    /// UUID v7, unique per response.
    pub request_id: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub response_time_ms: u64,
}

/// One failure, e.g. `{"code": "QUOTA_EXCEEDED", "message": "..."}`.
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiMeta {
    fn now(request_id: String, response_time_ms: u64) -> Self {
        Self {
            request_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            response_time_ms,
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, request_id: String, response_time_ms: u64) -> Self {
        Self {
            data: Some(data),
            meta: ApiMeta::now(request_id, response_time_ms),
            errors: Vec::new(),
            links: HashMap::new(),
        }
    }

    /// Point the client at a related resource (`session`, `sessions`, ...).
    pub fn with_link(mut self, rel: &str, href: &str) -> Self {
        self.links.insert(rel.to_string(), href.to_string());
        self
    }
}

impl ApiResponse<()> {
    pub fn error(code: &str, message: &str, request_id: String, response_time_ms: u64) -> Self {
        Self {
            data: None,
            meta: ApiMeta::now(request_id, response_time_ms),
            errors: vec![ApiErrorDetail {
                code: code.to_string(),
                message: message.to_string(),
            }],
            links: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_omits_empty_errors_and_links() {
        let body = ApiResponse::success(serde_json::json!({"ok": true}), "req-1".into(), 3);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["data"]["ok"], true);
        assert_eq!(json["meta"]["request_id"], "req-1");
        assert!(json.get("errors").is_none());
        assert!(json.get("_links").is_none());

        let linked = ApiResponse::success(1, "req-2".into(), 0).with_link("self", "/api/v1/x");
        let json = serde_json::to_value(&linked).unwrap();
        assert_eq!(json["_links"]["self"], "/api/v1/x");
    }

    #[test]
    fn error_envelope_has_no_data() {
        let body = ApiResponse::<()>::error("NOT_FOUND", "session 'a' not found", "req".into(), 0);
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["errors"][0]["code"], "NOT_FOUND");
        assert!(json["errors"][0].get("details").is_none());
    }
}
