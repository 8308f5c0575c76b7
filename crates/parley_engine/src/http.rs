//! HTTP JSON transport.
//!
//! The actual HTTP stack is abstracted behind [`HttpClient`] so
//! embedders can swap implementations; [`ReqwestClient`] is the
//! batteries-included choice.

use crate::error::{EngineError, EngineResult};
use crate::transport::SyncApi;
use parking_lot::RwLock;
use parley_model::{AuthRequest, AuthResponse, ErrorBody, PullResponse, PushRequest, PushResponse};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// A raw HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
}

/// Minimal HTTP client abstraction.
///
/// Implementations send one request and report transport failures as
/// strings; status-code interpretation happens in [`HttpApi`].
pub trait HttpClient: Send + Sync {
    /// Sends a request. `body`, when present, is a JSON document.
    fn request(
        &self,
        method: &str,
        url: &str,
        bearer: Option<&str>,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse, String>;
}

/// JSON-over-HTTP implementation of [`SyncApi`].
///
/// Holds the bearer token acquired by [`SyncApi::authenticate`] and
/// attaches it to every sync request.
pub struct HttpApi<C: HttpClient> {
    base_url: String,
    client: C,
    token: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpApi<C> {
    /// Creates an API client against the given base URL.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            token: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Installs a previously saved bearer token.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Returns the current bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn send<Res: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: Option<serde_json::Value>,
        authed: bool,
    ) -> EngineResult<Res> {
        let bearer = if authed {
            Some(
                self.token()
                    .ok_or_else(|| EngineError::Auth("no access token".into()))?,
            )
        } else {
            None
        };

        let body_bytes = match body {
            Some(value) => Some(
                serde_json::to_vec(&value)
                    .map_err(|e| EngineError::Protocol(format!("unencodable request: {e}")))?,
            ),
            None => None,
        };

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .request(method, &url, bearer.as_deref(), body_bytes)
            .map_err(EngineError::transport_retryable)?;

        match response.status {
            200 => serde_json::from_slice(&response.body)
                .map_err(|e| EngineError::Protocol(format!("undecodable response: {e}"))),
            401 => Err(EngineError::Auth(error_message(&response.body))),
            400 => Err(EngineError::Rejected(error_message(&response.body))),
            status if status >= 500 => Err(EngineError::Server(error_message(&response.body))),
            status => Err(EngineError::Protocol(format!("unexpected status {status}"))),
        }
    }
}

fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned())
}

impl<C: HttpClient> SyncApi for HttpApi<C> {
    fn authenticate(&self, request: &AuthRequest) -> EngineResult<AuthResponse> {
        let value = serde_json::to_value(request)
            .map_err(|e| EngineError::Protocol(e.to_string()))?;
        let response: AuthResponse = self.send("POST", "/auth/google", Some(value), false)?;
        self.set_token(response.access_token.clone());
        Ok(response)
    }

    fn push(&self, request: &PushRequest) -> EngineResult<PushResponse> {
        let value = serde_json::to_value(request)
            .map_err(|e| EngineError::Protocol(e.to_string()))?;
        self.send("POST", "/sync/push", Some(value), true)
    }

    fn pull(&self, since: i64) -> EngineResult<PullResponse> {
        self.send("GET", &format!("/sync/pull?since={since}"), None, true)
    }
}

/// [`HttpClient`] backed by a blocking reqwest client.
pub struct ReqwestClient {
    inner: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Builds a client with the given request timeout.
    pub fn new(timeout: Duration) -> EngineResult<Self> {
        let inner = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::transport_fatal(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl HttpClient for ReqwestClient {
    fn request(
        &self,
        method: &str,
        url: &str,
        bearer: Option<&str>,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse, String> {
        let mut builder = match method {
            "GET" => self.inner.get(url),
            _ => self.inner.post(url),
        };
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(bytes) = body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(bytes);
        }

        let response = builder.send().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| e.to_string())?.to_vec();
        Ok(HttpResponse { status, body })
    }
}
