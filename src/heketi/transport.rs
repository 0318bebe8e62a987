//! Low-level HTTP transport abstraction.
//!
//! [`HttpTransport`] is the capability "can perform one HTTP exchange". The
//! signed client builds complete requests and hands them to a transport; the
//! production transport is backed by `reqwest` and tests script responses.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;

use super::HeketiError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP verbs used against the Heketi API.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Returns the upper-case verb as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(value: Method) -> Self {
        match value {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Delete => Self::DELETE,
        }
    }
}

/// Fully resolved request handed to a transport.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRequest {
    /// HTTP verb.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Extra headers, for example `Authorization`.
    pub headers: Vec<(String, String)>,
    /// Optional JSON body.
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    /// Returns the value of the first header named `name`, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Response returned by a transport.
///
/// Header names are stored lower-cased so lookups are case-insensitive.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response headers keyed by lower-case name.
    pub headers: BTreeMap<String, String>,
    /// Response body as text.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response with no headers or body.
    #[must_use]
    pub const fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: String::new(),
        }
    }

    /// Adds a header, lower-casing its name.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Sets the body text.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Looks up a header value by name, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns `true` when the status is a client (4xx) or server (5xx) error.
    #[must_use]
    pub const fn is_error_status(&self) -> bool {
        self.status >= 400 && self.status < 600
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`HeketiError::Decode`] when the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self, context: &str) -> Result<T, HeketiError> {
        serde_json::from_str(&self.body).map_err(|err| HeketiError::Decode {
            context: context.to_owned(),
            message: err.to_string(),
        })
    }
}

/// Failure to complete an HTTP exchange at all (DNS, connect, I/O).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransportError {
    /// Description reported by the HTTP stack.
    pub message: String,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a>>;

/// Performs a single HTTP exchange.
pub trait HttpTransport {
    /// Sends `request` and returns the raw response without interpreting its
    /// status.
    fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Transport backed by `reqwest`.
///
/// Redirects are not followed so `303 See Other` responses from the job
/// queue reach the poller.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport with a request timeout and redirects disabled.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .redirect(Policy::none())
            .build()
            .map_err(|err| TransportError {
                message: err.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(request.method.into(), request.url.as_str());
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(ref body) = request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(|err| TransportError {
                message: err.to_string(),
            })?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|text| (name.as_str().to_ascii_lowercase(), text.to_owned()))
                })
                .collect();
            let body = response.text().await.map_err(|err| TransportError {
                message: err.to_string(),
            })?;

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        })
    }
}
