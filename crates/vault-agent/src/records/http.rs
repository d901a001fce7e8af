//! [`RecordStore`] over HTTP(S).
//!
//! # Endpoints
//!
//! ```text
//! GET {base}/owners/{ownerId}/{kind}                      -> 200 [record, ...]
//! PUT {base}/owners/{ownerId}/{kind}/{recordId}/envelope  <- {"envelope": {...}}
//!                                                         -> 2xx updated | 404 not found
//! ```
//!
//! Identifiers are placed in the path verbatim, so they must consist of
//! unreserved URL characters (`A-Z a-z 0-9 - . _ ~`). Anything else is
//! rejected before a request is sent.
//!
//! Each request, from connect to the last body byte, is bounded by the
//! client's timeout. A rotation holds the passphrase session for as long as
//! its store calls take, so a stalled store must not hold it forever.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use bytes::Bytes;
use common::{Envelope, RecordKind, StoredRecord};
use hyper::{header, Method, Request, StatusCode, Uri};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use serde::Serialize;
use tracing::debug;

use super::{RecordStore, StoreError, UpdateOutcome};

/// Upper bound on a response body read from the store.
pub const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// Per-request timeout used unless [`HttpRecordStore::with_timeout`] says otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct UpdateEnvelopeBody<'a> {
    envelope: &'a Envelope,
}

/// HTTP(S) client for the remote record store.
#[derive(Clone)]
pub struct HttpRecordStore {
    client: Client<HttpsConnector<HttpConnector>, Body>,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for HttpRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRecordStore")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpRecordStore {
    /// Build a client for the store at `base_url`, optionally sending `token`
    /// as a bearer credential.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Request`] if `base_url` is not an absolute
    /// `http`/`https` URL or the TLS stack cannot be initialised.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, StoreError> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        let uri: Uri = base_url
            .parse()
            .map_err(|_| StoreError::Request(format!("invalid record store URL: {base_url}")))?;
        if !matches!(uri.scheme_str(), Some("http") | Some("https")) || uri.host().is_none() {
            return Err(StoreError::Request(format!(
                "record store URL must be absolute http(s): {base_url}"
            )));
        }

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
            .map_err(|e| StoreError::Request(format!("TLS initialisation failed: {e}")))?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            base_url,
            token,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Bound every request to `timeout` instead of [`DEFAULT_TIMEOUT`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn list_uri(&self, kind: RecordKind, owner_id: &str) -> Result<Uri, StoreError> {
        let owner_id = path_segment(owner_id)?;
        build_uri(format!("{}/owners/{owner_id}/{kind}", self.base_url))
    }

    fn update_uri(
        &self,
        kind: RecordKind,
        record_id: &str,
        owner_id: &str,
    ) -> Result<Uri, StoreError> {
        let owner_id = path_segment(owner_id)?;
        let record_id = path_segment(record_id)?;
        build_uri(format!(
            "{}/owners/{owner_id}/{kind}/{record_id}/envelope",
            self.base_url
        ))
    }

    async fn send(
        &self,
        method: Method,
        uri: Uri,
        body: Option<Vec<u8>>,
    ) -> Result<(StatusCode, Bytes), StoreError> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = &self.token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(bytes) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(bytes)),
            None => builder.body(Body::empty()),
        }
        .map_err(|e| StoreError::Request(e.to_string()))?;

        let exchange = async {
            let resp = self
                .client
                .request(req)
                .await
                .map_err(|e| StoreError::Transport(e.to_string()))?;
            let status = resp.status();
            let bytes = axum::body::to_bytes(Body::new(resp.into_body()), MAX_RESPONSE_BYTES)
                .await
                .map_err(|e| StoreError::Transport(e.to_string()))?;
            Ok((status, bytes))
        };
        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                StoreError::Transport(format!("no response within {:?}", self.timeout))
            })?
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn list(
        &self,
        kind: RecordKind,
        owner_id: &str,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let uri = self.list_uri(kind, owner_id)?;
        let (status, body) = self.send(Method::GET, uri, None).await?;
        debug!(%kind, status = status.as_u16(), "record store list");
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }
        serde_json::from_slice(&body).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn update_envelope(
        &self,
        kind: RecordKind,
        record_id: &str,
        owner_id: &str,
        envelope: &Envelope,
    ) -> Result<UpdateOutcome, StoreError> {
        let uri = self.update_uri(kind, record_id, owner_id)?;
        let body = serde_json::to_vec(&UpdateEnvelopeBody { envelope })
            .map_err(|e| StoreError::Request(e.to_string()))?;
        let (status, _) = self.send(Method::PUT, uri, Some(body)).await?;
        debug!(%kind, record_id, status = status.as_u16(), "record store update");
        match status {
            s if s.is_success() => Ok(UpdateOutcome::Updated),
            s if s == StatusCode::NOT_FOUND => Ok(UpdateOutcome::NotFound),
            s => Err(StoreError::Status(s.as_u16())),
        }
    }
}

/// Accept `id` as a path segment only if it needs no escaping.
fn path_segment(id: &str) -> Result<&str, StoreError> {
    let unreserved = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~');
    if id.is_empty() || id == "." || id == ".." || !id.chars().all(unreserved) {
        return Err(StoreError::Request(format!("identifier is not URL-safe: {id:?}")));
    }
    Ok(id)
}

fn build_uri(s: String) -> Result<Uri, StoreError> {
    s.parse()
        .map_err(|_| StoreError::Request(format!("invalid record store URL: {s}")))
}
