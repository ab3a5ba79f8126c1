use crate::ids::RequestId;
use may_minihttp::Request;
use std::collections::HashMap;
use tracing::debug;

/// Request data visible to handlers, templates and the renderer.
///
/// Owned and detached from the connection, so it can be built directly in
/// tests with [`RequestInfo::get`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestInfo {
    pub request_id: RequestId,
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Path without query string
    pub path: String,
    /// Raw request target including the query string
    pub target: String,
    /// HTTP headers (lowercase keys)
    pub headers: HashMap<String, String>,
    /// Parsed query string parameters
    pub query_params: HashMap<String, String>,
}

impl RequestInfo {
    pub fn new(method: &str, target: &str, headers: HashMap<String, String>) -> Self {
        let request_id =
            RequestId::from_header_or_new(headers.get("x-request-id").map(String::as_str));
        Self {
            request_id,
            method: method.to_ascii_uppercase(),
            path: target.split('?').next().unwrap_or("/").to_string(),
            target: target.to_string(),
            query_params: parse_query_params(target),
            headers,
        }
    }

    /// A header-less GET for `target`.
    pub fn get(target: &str) -> Self {
        Self::new("GET", target, HashMap::new())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_read(&self) -> bool {
        self.method == "GET" || self.method == "HEAD"
    }
}

/// Parse query string parameters from a URL path
///
/// Extracts everything after the `?` character and URL-decodes parameter names and values.
/// A repeated name keeps its first value.
pub fn parse_query_params(path: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    if let Some(pos) = path.find('?') {
        for (k, v) in url::form_urlencoded::parse(path[pos + 1..].as_bytes()) {
            params.entry(k.into_owned()).or_insert_with(|| v.into_owned());
        }
    }
    params
}

/// Extract a [`RequestInfo`] from a `may_minihttp::Request`.
pub fn parse_request(req: &Request) -> RequestInfo {
    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();
    debug!(header_count = headers.len(), "Headers extracted");
    RequestInfo::new(req.method(), req.path(), headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_params() {
        let q = parse_query_params("/p?x=1&y=a%20b&x=2");
        assert_eq!(q.get("x"), Some(&"1".to_string()));
        assert_eq!(q.get("y"), Some(&"a b".to_string()));
        assert!(parse_query_params("/p").is_empty());
    }

    #[test]
    fn test_request_info() {
        let mut headers = HashMap::new();
        headers.insert("x-request-id".to_string(), "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string());
        let req = RequestInfo::new("get", "/home?_kap_basepath=/a/", headers);
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/home");
        assert_eq!(req.request_id.to_string(), "01ARZ3NDEKTSV4RRFFQ69G5FAV");
        assert_eq!(req.header("X-Request-Id"), Some("01ARZ3NDEKTSV4RRFFQ69G5FAV"));
        assert!(req.is_read());
    }
}
