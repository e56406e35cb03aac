//! REST client for the Discord HTTP API.
//!
//! Every request carries the bot authorization header and the library
//! user agent. A non-2xx status comes back as [`KanteleError::Http`]; a
//! successful response is returned untouched and reading its body is up to
//! the caller.
//!
//! ```ignore
//! use kantele::RestClient;
//!
//! let rest = RestClient::new("token");
//! let res = rest
//!     .post("/channels/123/messages", &serde_json::json!({ "content": "pong!" }))
//!     .await?;
//! ```

use std::fmt;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, Response};
use serde::Serialize;

use crate::codec::JsonCodec;
use crate::error::{KanteleError, Result};

pub const API_VERSION: &str = "v10";
pub const DOMAIN: &str = "https://discord.com";

const LIBRARY_URL: &str = "github.com/nicolito128/kantele";

/// Versioned REST root, e.g. `https://discord.com/api/v10`.
pub fn default_api_base() -> String {
    format!("{}/api/{}", DOMAIN, API_VERSION)
}

/// HTTP client bound to one bot token.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct RestClient {
    token: String,
    base_url: String,
    http: reqwest::Client,
}

impl RestClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, default_api_base())
    }

    /// Client against another API root (a proxy or a test server).
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            token: token.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for `endpoint`; a missing leading `/` is added.
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    /// Send a request with an optional JSON body.
    pub async fn request<B>(&self, method: Method, endpoint: &str, body: Option<&B>) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url_for(endpoint);

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header(USER_AGENT, format!("DiscordBot ({})", LIBRARY_URL))
            .header(AUTHORIZATION, format!("Bot {}", self.token))
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            req = req.body(JsonCodec::encode(body)?);
        }

        tracing::debug!("{} {}", method, url);
        let res = req.send().await?;

        let status = res.status();
        if !status.is_success() {
            tracing::warn!("{} {} returned {}", method, url, status);
            return Err(KanteleError::Http {
                status: status.as_u16(),
                method,
                path: res.url().path().to_string(),
                url,
            });
        }

        Ok(res)
    }

    pub async fn get(&self, endpoint: &str) -> Result<Response> {
        self.request::<()>(Method::GET, endpoint, None).await
    }

    pub async fn post<B>(&self, endpoint: &str, body: &B) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, endpoint, Some(body)).await
    }

    pub async fn patch<B>(&self, endpoint: &str, body: &B) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.request(Method::PATCH, endpoint, Some(body)).await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<Response> {
        self.request::<()>(Method::DELETE, endpoint, None).await
    }
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
