//! Yeti request executor.
//!
//! Low-level HTTP client that handles authentication and raw requests.
//! Resource operations live in the protocol adapters under [`crate::api`].

use std::fmt;
use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::config::{ApiGeneration, ClientConfig};
use crate::error::{Result, YetiError};

const USER_AGENT: &str = concat!("yetiapi/", env!("CARGO_PKG_VERSION"));

/// A decoded HTTP 200 response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The response declared a JSON content type and was parsed.
    Json(Value),
    /// Any other content type, returned untouched.
    Binary(Vec<u8>),
}

impl Payload {
    /// Deserialize a JSON payload into `T`.
    ///
    /// # Errors
    ///
    /// Fails with [`YetiError::UnexpectedPayload`] for binary payloads and
    /// with [`YetiError::Parse`] if the JSON does not match `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Self::Json(value) => Ok(serde_json::from_value(value)?),
            Self::Binary(_) => Err(YetiError::UnexpectedPayload("JSON")),
        }
    }

    /// The raw JSON value; fails like [`Payload::into_json`] on binary payloads.
    pub fn into_value(self) -> Result<Value> {
        self.into_json()
    }

    /// Whether the server declared a JSON content type.
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json(_))
    }
}

/// A file to send as the `files` field of a multipart upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

/// Low-level Yeti API client.
///
/// Produces exactly one HTTP request per call: joins the path onto the base
/// URL, attaches `Accept: application/json`, the API key header and basic
/// auth as configured, and maps any non-200 status to
/// [`YetiError::Upstream`].
///
/// This struct is cheaply cloneable; clones share the connection pool and
/// the immutable [`ClientConfig`].
///
/// # Example
///
/// ```no_run
/// use yetiapi::{ClientConfig, RequestExecutor};
///
/// # async fn example() -> yetiapi::Result<()> {
/// let executor = RequestExecutor::new(
///     ClientConfig::new("http://localhost:5000/api")?.with_api_key("key"),
/// )?;
/// let observable = executor.get("observable/5d1b2c").await?.into_value()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RequestExecutor {
    http: Client,
    config: Arc<ClientConfig>,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("base_url", &self.config.base_url().as_str())
            .field("generation", &self.config.generation())
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Create an executor from a finished configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.verify_tls())
            .build()
            .map_err(YetiError::Http)?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// Create an executor from `YETI_*` environment variables.
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        self.config.base_url()
    }

    pub fn generation(&self) -> ApiGeneration {
        self.config.generation()
    }

    /// Resolve an endpoint path against the base URL.
    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.config.base_url().join(path)?)
    }

    /// Make a GET request.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, path: &str) -> Result<Payload> {
        let url = self.url(path)?;
        let response = self.send(self.request(Method::GET, url.clone()), &url).await?;
        Self::decode(response).await
    }

    /// Make a GET request with query parameters.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_with_query<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<Payload> {
        let url = self.url(path)?;
        let builder = self.request(Method::GET, url.clone()).query(query);
        let response = self.send(builder, &url).await?;
        Self::decode(response).await
    }

    /// Make a POST request with JSON body.
    #[tracing::instrument(skip(self, body))]
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Payload> {
        let url = self.url(path)?;
        let builder = self.request(Method::POST, url.clone()).json(body);
        let response = self.send(builder, &url).await?;
        Self::decode(response).await
    }

    /// Make a multipart POST carrying one file in the `files` field.
    #[tracing::instrument(skip(self, upload), fields(file_name = %upload.file_name, size = upload.content.len()))]
    pub async fn post_multipart(&self, path: &str, upload: FileUpload) -> Result<Payload> {
        let url = self.url(path)?;
        let part = Part::bytes(upload.content).file_name(upload.file_name);
        let form = Form::new().part("files", part);
        let builder = self.request(Method::POST, url.clone()).multipart(form);
        let response = self.send(builder, &url).await?;
        Self::decode(response).await
    }

    /// Make a PATCH request with JSON body.
    #[tracing::instrument(skip(self, body))]
    pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Payload> {
        let url = self.url(path)?;
        let builder = self.request(Method::PATCH, url.clone()).json(body);
        let response = self.send(builder, &url).await?;
        Self::decode(response).await
    }

    /// Make a DELETE request.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, path: &str) -> Result<Payload> {
        let url = self.url(path)?;
        let response = self.send(self.request(Method::DELETE, url.clone()), &url).await?;
        Self::decode(response).await
    }

    /// Make a DELETE request with JSON body.
    #[tracing::instrument(skip(self, body))]
    pub async fn delete_with_body<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Payload> {
        let url = self.url(path)?;
        let builder = self.request(Method::DELETE, url.clone()).json(body);
        let response = self.send(builder, &url).await?;
        Self::decode(response).await
    }

    /// GET a resource and return its body bytes whatever the content type.
    ///
    /// Used for file contents, where a stored JSON document must come back
    /// byte-for-byte rather than re-encoded.
    #[tracing::instrument(skip(self))]
    pub async fn download(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.url(path)?;
        let response = self.send(self.request(Method::GET, url.clone()), &url).await?;
        let body = response.bytes().await.map_err(YetiError::Http)?;
        Ok(body.to_vec())
    }

    /// Start a request with the configured headers and credentials.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json");

        if let Some(key) = self.config.api_key() {
            builder = builder.header(
                self.config.generation().api_key_header(),
                key.expose_secret(),
            );
        }

        if let Some(auth) = self.config.basic_auth() {
            builder = builder.basic_auth(&auth.username, Some(auth.password.expose_secret()));
        }

        builder
    }

    async fn send(&self, builder: RequestBuilder, url: &Url) -> Result<Response> {
        let response = builder.send().await.map_err(YetiError::Http)?;
        Self::check_response(response, url).await
    }

    /// Check response status and convert errors.
    async fn check_response(response: Response, url: &Url) -> Result<Response> {
        let status = response.status();

        if status == StatusCode::OK {
            tracing::debug!(status = status.as_u16(), %url, "success");
            return Ok(response);
        }

        let message = Self::extract_error_message(response, status).await;
        tracing::error!(status = status.as_u16(), %url, %message, "an error occurred");
        Err(YetiError::Upstream {
            status: status.as_u16(),
            url: url.to_string(),
            message,
        })
    }

    /// Extract error message from a failed response.
    async fn extract_error_message(response: Response, status: StatusCode) -> String {
        let body = match response.text().await {
            Ok(b) if !b.is_empty() => b,
            _ => return format!("HTTP {status}"),
        };

        if let Ok(json) = serde_json::from_str::<Value>(&body) {
            for key in ["message", "error", "detail"] {
                if let Some(msg) = json.get(key).and_then(|m| m.as_str()) {
                    return msg.to_string();
                }
            }
        }

        body
    }

    async fn decode(response: Response) -> Result<Payload> {
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("json"));

        let body = response.bytes().await.map_err(YetiError::Http)?;

        if is_json {
            Ok(Payload::Json(serde_json::from_slice(&body)?))
        } else {
            Ok(Payload::Binary(body.to_vec()))
        }
    }
}

/// Percent-encode one path segment (ids, hashes, type names).
pub(crate) fn segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}
