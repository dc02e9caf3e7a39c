//! HTTP implementation of [`RemoteClient`] for the Miniflux v1 API.
//!
//! Every call is one HTTP/1.1 exchange bounded by the configured timeout.
//! Responses are classified into [`RemoteError`] variants:
//!
//! | Outcome                         | Error                   |
//! |---------------------------------|-------------------------|
//! | connect failure, reset, timeout | `Transport`             |
//! | 401, 403                        | `Auth`                  |
//! | 400, 422                        | `Validation`            |
//! | any other non-2xx               | `Server { status }`     |
//! | body not matching the API       | `Protocol`              |

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use bytes::Bytes;
use fluxa_core::config::{Credentials, ServerConfig};
use fluxa_core::{
    Category, CategoryId, CreateFeed, Feed, FeedCounters, FeedId, FeedPatch, RemoteClient,
    RemoteError, RemoteResult,
};
use http_body_util::{BodyExt, Full};
use hyper::header::{self, HeaderName, HeaderValue};
use hyper::{Method, Request, StatusCode, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::{Connect, HttpConnector};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use crate::wire::{CategoryRequest, FeedCreated, WireCategory, WireCounters, WireError, WireFeed};

const USER_AGENT: &str = concat!("fluxa/", env!("CARGO_PKG_VERSION"));

/// Errors raised while building a [`MinifluxClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid server URL {0:?}")]
    InvalidUrl(String),
    #[error("unsupported scheme {0:?}; expected http or https")]
    UnsupportedScheme(String),
    #[error("credentials contain characters not allowed in an HTTP header")]
    InvalidCredentials,
}

/// Miniflux API client over any hyper-util connector.
///
/// [`MinifluxClient::new`] speaks both `http` and `https` through rustls
/// with the bundled webpki roots. [`MinifluxClient::with_connector`] takes
/// any other connector, e.g. a custom trust store.
pub struct MinifluxClient<C = HttpsConnector<HttpConnector>> {
    http: Client<C, Full<Bytes>>,
    base: String,
    auth: Option<(HeaderName, HeaderValue)>,
    timeout: Duration,
}

impl MinifluxClient<HttpsConnector<HttpConnector>> {
    pub fn new(
        base_url: &str,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base = parse_base(base_url)?;
        match base.scheme_str() {
            Some("http") | Some("https") => {}
            other => return Err(ClientError::UnsupportedScheme(other.unwrap_or("").to_string())),
        }
        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();
        Self::with_connector(connector, base_url, credentials, timeout)
    }

    pub fn from_config(server: &ServerConfig) -> Result<Self, ClientError> {
        Self::new(&server.url, server.credentials(), server.timeout())
    }
}

impl<C> MinifluxClient<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    pub fn with_connector(
        connector: C,
        base_url: &str,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        parse_base(base_url)?;
        Ok(Self {
            http: Client::builder(TokioExecutor::new()).build(connector),
            base: base_url.trim().trim_end_matches('/').to_string(),
            auth: credentials.map(auth_header).transpose()?,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    async fn send(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> RemoteResult<Bytes> {
        let uri: Uri = format!("{}{}", self.base, path)
            .parse()
            .map_err(|err| RemoteError::Protocol(format!("invalid request URI {path}: {err}")))?;

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(uri)
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, USER_AGENT);
        if let Some((name, value)) = &self.auth {
            builder = builder.header(name.clone(), value.clone());
        }
        let body = match body {
            Some(bytes) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Full::new(Bytes::from(bytes))
            }
            None => Full::new(Bytes::new()),
        };
        let request = builder
            .body(body)
            .map_err(|err| RemoteError::Protocol(err.to_string()))?;

        let (status, bytes) = tokio::time::timeout(self.timeout, self.exchange(request))
            .await
            .map_err(|_| {
                RemoteError::Transport(format!(
                    "{method} {path} timed out after {}s",
                    self.timeout.as_secs_f32()
                ))
            })??;

        debug!(%method, path, status = status.as_u16(), bytes = bytes.len(), "miniflux response");
        classify(status, &bytes)?;
        Ok(bytes)
    }

    async fn exchange(&self, request: Request<Full<Bytes>>) -> RemoteResult<(StatusCode, Bytes)> {
        let response = self
            .http
            .request(request)
            .await
            .map_err(|err| RemoteError::Transport(err.to_string()))?;
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|err| RemoteError::Transport(err.to_string()))?
            .to_bytes();
        Ok((status, bytes))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> RemoteResult<T> {
        let bytes = self.send(Method::GET, path, None).await?;
        decode(path, &bytes)
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> RemoteResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let bytes = self.send(method, path, Some(encode(body)?)).await?;
        decode(path, &bytes)
    }

    async fn send_no_content(&self, method: Method, path: &str) -> RemoteResult<()> {
        self.send(method, path, None).await.map(|_| ())
    }
}

#[async_trait]
impl<C> RemoteClient for MinifluxClient<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    async fn list_categories(&self) -> RemoteResult<Vec<Category>> {
        let categories: Vec<WireCategory> = self.get_json("/v1/categories").await?;
        Ok(categories.into_iter().map(Category::from).collect())
    }

    async fn list_feeds(&self) -> RemoteResult<Vec<Feed>> {
        let feeds: Vec<WireFeed> = self.get_json("/v1/feeds").await?;
        Ok(feeds.into_iter().map(Feed::from).collect())
    }

    async fn feed_counters(&self) -> RemoteResult<FeedCounters> {
        let counters: WireCounters = self.get_json("/v1/feeds/counters").await?;
        Ok(counters.into())
    }

    async fn create_feed(&self, request: &CreateFeed) -> RemoteResult<FeedId> {
        let created: FeedCreated = self.send_json(Method::POST, "/v1/feeds", request).await?;
        Ok(FeedId(created.feed_id))
    }

    async fn update_feed(&self, id: FeedId, patch: &FeedPatch) -> RemoteResult<Feed> {
        let feed: WireFeed = self
            .send_json(Method::PUT, &format!("/v1/feeds/{id}"), patch)
            .await?;
        Ok(feed.into())
    }

    async fn delete_feed(&self, id: FeedId) -> RemoteResult<()> {
        self.send_no_content(Method::DELETE, &format!("/v1/feeds/{id}"))
            .await
    }

    async fn mark_feed_read(&self, id: FeedId) -> RemoteResult<()> {
        self.send_no_content(Method::PUT, &format!("/v1/feeds/{id}/mark-all-as-read"))
            .await
    }

    async fn create_category(&self, title: &str) -> RemoteResult<Category> {
        let category: WireCategory = self
            .send_json(Method::POST, "/v1/categories", &CategoryRequest { title })
            .await?;
        Ok(category.into())
    }

    async fn update_category(&self, id: CategoryId, title: &str) -> RemoteResult<Category> {
        let category: WireCategory = self
            .send_json(
                Method::PUT,
                &format!("/v1/categories/{id}"),
                &CategoryRequest { title },
            )
            .await?;
        Ok(category.into())
    }

    async fn delete_category(&self, id: CategoryId) -> RemoteResult<()> {
        self.send_no_content(Method::DELETE, &format!("/v1/categories/{id}"))
            .await
    }

    async fn mark_category_read(&self, id: CategoryId) -> RemoteResult<()> {
        self.send_no_content(
            Method::PUT,
            &format!("/v1/categories/{id}/mark-all-as-read"),
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_base(base_url: &str) -> Result<Uri, ClientError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let uri: Uri = trimmed
        .parse()
        .map_err(|_| ClientError::InvalidUrl(base_url.to_string()))?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(ClientError::InvalidUrl(base_url.to_string()));
    }
    Ok(uri)
}

fn auth_header(credentials: Credentials) -> Result<(HeaderName, HeaderValue), ClientError> {
    let (name, raw) = match credentials {
        Credentials::Token(token) => (HeaderName::from_static("x-auth-token"), token),
        Credentials::Basic { username, password } => {
            let encoded = base64::engine::general_purpose::STANDARD
                .encode(format!("{username}:{password}"));
            (header::AUTHORIZATION, format!("Basic {encoded}"))
        }
    };
    let mut value = HeaderValue::from_str(&raw).map_err(|_| ClientError::InvalidCredentials)?;
    value.set_sensitive(true);
    Ok((name, value))
}

fn encode<B: Serialize>(body: &B) -> RemoteResult<Vec<u8>> {
    serde_json::to_vec(body).map_err(|err| RemoteError::Protocol(err.to_string()))
}

fn decode<T: DeserializeOwned>(path: &str, bytes: &[u8]) -> RemoteResult<T> {
    serde_json::from_slice(bytes).map_err(|err| {
        trace!(path, body = %String::from_utf8_lossy(bytes), "undecodable response");
        RemoteError::Protocol(format!("{path}: {err}"))
    })
}

/// Map a non-success status to its [`RemoteError`] class.
fn classify(status: StatusCode, body: &[u8]) -> RemoteResult<()> {
    if status.is_success() {
        return Ok(());
    }

    let message = serde_json::from_slice::<WireError>(body)
        .map(|e| e.error_message)
        .unwrap_or_else(|_| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            if text.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                text
            }
        });

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Auth(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => RemoteError::Validation {
            field: field_hint(&message).to_string(),
            message,
        },
        other => RemoteError::Server {
            status: other.as_u16(),
        },
    })
}

/// Best-effort guess of the form field a server validation message refers to.
pub fn field_hint(message: &str) -> &'static str {
    let lower = message.to_ascii_lowercase();
    if lower.contains("category") {
        "category_id"
    } else if lower.contains("feed") || lower.contains("url") {
        "feed_url"
    } else if lower.contains("title") {
        "title"
    } else {
        "request"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
