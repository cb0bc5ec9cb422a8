//! HTTP remote source.
//!
//! The actual HTTP client is abstracted via a trait so hosts can plug in
//! whatever library they already use (reqwest, ureq, hyper).
//!
//! Endpoints, relative to the base URL, all carrying `auth_token`:
//!
//! | endpoint | response body |
//! |---|---|
//! | `GET v1/update` | [`UpdateMeta`] |
//! | `GET v1/manifest` | array of [`marksync_protocol::RemoteManifestEntry`] |
//! | `GET v1/records?keys=k1,k2` | array of [`BookmarkRecord`] |

use crate::error::{SyncError, SyncResult};
use crate::source::RemoteDataSource;
use marksync_protocol::{BookmarkRecord, Key, RemoteManifest, UpdateMeta};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use url::Url;

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a 200 response.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// Creates a response with an empty body.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true for statuses meaning "back off and try later".
    pub fn is_unavailable(&self) -> bool {
        matches!(self.status, 429 | 503)
    }
}

/// HTTP client abstraction.
pub trait HttpClient: Send + Sync {
    /// Sends a GET request.
    ///
    /// Returns `Err` only if the server could not be reached at all.
    fn get(&self, url: &Url) -> Result<HttpResponse, String>;
}

/// A [`RemoteDataSource`] speaking JSON over HTTP.
pub struct HttpDataSource<C: HttpClient> {
    base_url: Url,
    auth_token: String,
    client: C,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpDataSource<C> {
    /// Creates a source for the collection at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] if `base_url` does not parse.
    pub fn new(base_url: &str, auth_token: impl Into<String>, client: C) -> SyncResult<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| SyncError::InvalidConfig(format!("invalid base url {base_url}: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            auth_token: auth_token.into(),
            client,
            last_error: RwLock::new(None),
        })
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> SyncResult<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| SyncError::InvalidConfig(format!("invalid endpoint {path}: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
            pairs.append_pair("auth_token", &self.auth_token);
        }
        Ok(url)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> SyncResult<T> {
        let url = self.endpoint(path, query)?;
        let result = self.fetch(&url, path);

        match &result {
            Ok(_) => *self.last_error.write() = None,
            Err(e) => *self.last_error.write() = Some(e.to_string()),
        }
        result
    }

    fn fetch<T: DeserializeOwned>(&self, url: &Url, path: &str) -> SyncResult<T> {
        let response = self.client.get(url).map_err(SyncError::unavailable)?;

        if response.is_unavailable() {
            return Err(SyncError::unavailable(format!(
                "{path} answered {}",
                response.status
            )));
        }
        if !response.is_success() {
            return Err(SyncError::transient(format!(
                "{path} answered {}",
                response.status
            )));
        }

        serde_json::from_slice(&response.body)
            .map_err(|e| SyncError::Protocol(format!("failed to decode {path} response: {e}")))
    }
}

impl<C: HttpClient> RemoteDataSource for HttpDataSource<C> {
    fn fetch_update_meta(&self) -> SyncResult<UpdateMeta> {
        self.get_json("v1/update", &[])
    }

    fn fetch_manifest(&self) -> SyncResult<RemoteManifest> {
        self.get_json("v1/manifest", &[])
    }

    fn fetch_records(&self, keys: &[Key]) -> SyncResult<Vec<BookmarkRecord>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let joined = keys.iter().map(Key::as_str).collect::<Vec<_>>().join(",");
        self.get_json("v1/records", &[("keys", joined.as_str())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Answers by URL path and records every URL requested.
    #[derive(Default)]
    struct TestClient {
        responses: HashMap<String, Result<HttpResponse, String>>,
        requests: Mutex<Vec<Url>>,
    }

    impl TestClient {
        fn respond(mut self, path: &str, response: Result<HttpResponse, String>) -> Self {
            self.responses.insert(path.to_string(), response);
            self
        }
    }

    impl HttpClient for TestClient {
        fn get(&self, url: &Url) -> Result<HttpResponse, String> {
            self.requests.lock().push(url.clone());
            self.responses
                .get(url.path())
                .cloned()
                .unwrap_or_else(|| Ok(HttpResponse::status(404)))
        }
    }

    fn source(client: TestClient) -> HttpDataSource<TestClient> {
        HttpDataSource::new("https://bookmarks.example/api", "secret", client).unwrap()
    }

    #[test]
    fn builds_urls_under_base_path() {
        let source = source(TestClient::default().respond(
            "/api/v1/update",
            Ok(HttpResponse::ok(r#"{"last_update_ms": 42, "counters": {"unread": 3}}"#)),
        ));

        let meta = source.fetch_update_meta().unwrap();
        assert_eq!(meta.last_update_ms, 42);
        assert_eq!(meta.counters.get("unread"), Some(&3));

        let requests = source.client.requests.lock();
        assert_eq!(
            requests[0].as_str(),
            "https://bookmarks.example/api/v1/update?auth_token=secret"
        );
    }

    #[test]
    fn decodes_manifest_in_order() {
        let body = r#"[{"key":"b","content_hash":"h2"},{"key":"a","content_hash":"h1"}]"#;
        let source = source(
            TestClient::default().respond("/api/v1/manifest", Ok(HttpResponse::ok(body))),
        );

        let manifest = source.fetch_manifest().unwrap();
        let keys: Vec<_> = manifest.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn records_request_carries_keys() {
        let body = r#"[{"key":"a","url":"https://a.example","content_hash":"h1","others":"x=1"}]"#;
        let source = source(
            TestClient::default().respond("/api/v1/records", Ok(HttpResponse::ok(body))),
        );

        let records = source
            .fetch_records(&[Key::from("a"), Key::from("b")])
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].others.as_deref(), Some("x=1"));

        let requests = source.client.requests.lock();
        let query: Vec<(String, String)> = requests[0]
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            query,
            vec![
                ("keys".to_string(), "a,b".to_string()),
                ("auth_token".to_string(), "secret".to_string()),
            ]
        );
    }

    #[test]
    fn empty_key_list_makes_no_request() {
        let source = source(TestClient::default());
        assert!(source.fetch_records(&[]).unwrap().is_empty());
        assert!(source.client.requests.lock().is_empty());
    }

    #[test]
    fn status_classification() {
        let source = source(
            TestClient::default()
                .respond("/api/v1/update", Ok(HttpResponse::status(429)))
                .respond("/api/v1/manifest", Ok(HttpResponse::status(503)))
                .respond("/api/v1/records", Ok(HttpResponse::status(500))),
        );

        assert!(source.fetch_update_meta().unwrap_err().ends_pass());
        assert!(source.fetch_manifest().unwrap_err().ends_pass());

        let err = source.fetch_records(&[Key::from("a")]).unwrap_err();
        assert!(matches!(err, SyncError::TransientFetch(_)));
        assert!(source.last_error().unwrap().contains("500"));
    }

    #[test]
    fn unreachable_server_is_unavailable() {
        let source = source(
            TestClient::default().respond("/api/v1/update", Err("connection refused".into())),
        );
        let err = source.fetch_update_meta().unwrap_err();
        assert!(err.ends_pass());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn garbage_body_is_a_protocol_error() {
        let source = source(
            TestClient::default().respond("/api/v1/update", Ok(HttpResponse::ok("<html>"))),
        );
        let err = source.fetch_update_meta().unwrap_err();
        assert!(matches!(err, SyncError::Protocol(_)));
        assert!(!err.ends_pass());
    }

    #[test]
    fn rejects_bad_base_url() {
        let result = HttpDataSource::new("not a url", "t", TestClient::default());
        assert!(matches!(result, Err(SyncError::InvalidConfig(_))));
    }

    #[test]
    fn success_clears_last_error() {
        let source = source(
            TestClient::default()
                .respond("/api/v1/update", Ok(HttpResponse::status(500)))
                .respond("/api/v1/manifest", Ok(HttpResponse::ok("[]"))),
        );
        assert!(source.fetch_update_meta().is_err());
        assert!(source.last_error().is_some());

        assert!(source.fetch_manifest().unwrap().is_empty());
        assert!(source.last_error().is_none());
    }
}
