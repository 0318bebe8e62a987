//! Heketi REST client that prefixes paths and signs each request.

use serde::Serialize;

use super::token::TokenSigner;
use super::transport::{HttpRequest, HttpResponse, HttpTransport, Method};
use super::HeketiError;
use crate::report::{self, SharedReporter};

/// Default Heketi service URL.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8080";

/// Client that joins request paths onto a base URL and attaches a fresh
/// bearer token to every request when a signing key is configured.
///
/// The client never interprets response statuses in [`SignedClient::request`];
/// use [`SignedClient::checked`] when 4xx/5xx should become errors.
#[derive(Debug)]
pub struct SignedClient<T> {
    base_url: String,
    transport: T,
    signer: Option<TokenSigner>,
    reporter: SharedReporter,
}

impl<T: HttpTransport> SignedClient<T> {
    /// Creates an unsigned client. Trailing slashes on `base_url` are
    /// removed once here.
    #[must_use]
    pub fn new(base_url: &str, transport: T) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            transport,
            signer: None,
            reporter: report::silent(),
        }
    }

    /// Signs every subsequent request with `signer`.
    #[must_use]
    pub fn with_signer(mut self, signer: TokenSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Replaces the progress reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: SharedReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Returns the base URL without trailing slashes.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins `path` onto the base URL with exactly one separating slash.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, normalize_path(path))
    }

    /// Converts a `Location` header value into a request path.
    ///
    /// Absolute locations under the base URL are made relative; anything else
    /// is treated as a path.
    #[must_use]
    pub fn path_from_location<'a>(&self, location: &'a str) -> &'a str {
        location
            .strip_prefix(self.base_url.as_str())
            .unwrap_or(location)
    }

    /// Sends `method` to `path` with an optional JSON body.
    ///
    /// The response is returned whatever its status.
    ///
    /// # Errors
    ///
    /// Returns [`HeketiError::Token`] when signing fails and
    /// [`HeketiError::Transport`] when the exchange cannot be completed.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<HttpResponse, HeketiError> {
        let url = self.url_for(path);
        let mut headers = Vec::new();
        if let Some(ref signer) = self.signer {
            let token = signer.sign(method, path)?;
            headers.push((String::from("Authorization"), format!("bearer {token}")));
        }

        self.reporter
            .report(&format!("Heketi request {method} to {url}"));
        let request = HttpRequest {
            method,
            url: url.clone(),
            headers,
            body,
        };
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|err| HeketiError::Transport {
                method,
                url,
                message: err.message,
            })?;
        self.reporter
            .report(&format!("Heketi response: HTTP {}", response.status));
        Ok(response)
    }

    /// Like [`SignedClient::request`] but turns 4xx/5xx into
    /// [`HeketiError::Http`].
    ///
    /// # Errors
    ///
    /// Propagates [`SignedClient::request`] failures and returns
    /// [`HeketiError::Http`] for error statuses.
    pub async fn checked(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<HttpResponse, HeketiError> {
        let response = self.request(method, path, body).await?;
        self.error_for_status(method, path, &response)?;
        Ok(response)
    }

    /// Sends `GET path`.
    ///
    /// # Errors
    ///
    /// See [`SignedClient::request`].
    pub async fn get(&self, path: &str) -> Result<HttpResponse, HeketiError> {
        self.request(Method::Get, path, None).await
    }

    /// Sends `POST path` with `body` serialised as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`HeketiError::Encode`] when `body` cannot be serialised, or
    /// any [`SignedClient::request`] failure.
    pub async fn post<B: Serialize>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpResponse, HeketiError> {
        let value = body.map(encode_body).transpose()?;
        self.request(Method::Post, path, value).await
    }

    /// Sends `DELETE path`.
    ///
    /// # Errors
    ///
    /// See [`SignedClient::request`].
    pub async fn delete(&self, path: &str) -> Result<HttpResponse, HeketiError> {
        self.request(Method::Delete, path, None).await
    }

    /// Returns [`HeketiError::Http`] when `response` carries a 4xx/5xx
    /// status.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn error_for_status(
        &self,
        method: Method,
        path: &str,
        response: &HttpResponse,
    ) -> Result<(), HeketiError> {
        if response.is_error_status() {
            return Err(HeketiError::Http {
                method,
                url: self.url_for(path),
                status: response.status,
                body: response.body.trim().to_owned(),
            });
        }
        Ok(())
    }
}

/// Strips every leading slash from `path`.
///
/// The operation is idempotent.
#[must_use]
pub fn normalize_path(path: &str) -> &str {
    path.trim_start_matches('/')
}

pub(crate) fn encode_body<B: Serialize>(body: &B) -> Result<serde_json::Value, HeketiError> {
    serde_json::to_value(body).map_err(|err| HeketiError::Encode {
        message: err.to_string(),
    })
}
