//! Transport-facing capabilities.
//!
//! The signing core never opens connections. It reads from and mutates an
//! [`HttpRequest`], and the provider reads an [`HttpResponse`] handed back by
//! whatever [`HttpTransport`] the caller plugs in.

use std::io::{self, Read};

use http::StatusCode;

use crate::encoding::{form_encode, FORM_ENCODED};

pub const CONTENT_TYPE: &str = "Content-Type";

/// An outgoing request as seen by the signer.
pub trait HttpRequest {
    fn method(&self) -> &str;

    fn set_method(&mut self, method: &str);

    /// The full request URL, query string included.
    fn request_url(&self) -> &str;

    fn set_request_url(&mut self, url: &str);

    /// Looks a header up by name, ignoring ASCII case.
    fn header(&self, name: &str) -> Option<&str>;

    /// Sets a header, replacing any previous value.
    fn set_header(&mut self, name: &str, value: &str);

    fn all_headers(&self) -> Vec<(String, String)>;

    fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE)
    }

    /// The request body, if there is one and it is available in memory.
    fn message_payload(&self) -> Option<&[u8]>;
}

/// A reply from the service provider.
pub trait HttpResponse {
    fn status_code(&self) -> u16;

    fn reason_phrase(&self) -> &str;

    fn content(&mut self) -> io::Result<Box<dyn Read + '_>>;
}

/// Creates and executes requests on behalf of the provider.
///
/// Implementations own connection handling, timeouts and retries.
pub trait HttpTransport {
    type Request: HttpRequest;
    type Response: HttpResponse;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Builds a `GET` request for `endpoint_url`.
    fn create_request(&self, endpoint_url: &str) -> Result<Self::Request, Self::Error>;

    fn send_request(&self, request: Self::Request) -> Result<Self::Response, Self::Error>;
}

/// An in-memory request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicRequest {
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl BasicRequest {
    pub fn new<M, U>(method: M, url: U) -> Self
    where
        M: Into<String>,
        U: Into<String>,
    {
        BasicRequest {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get<U: Into<String>>(url: U) -> Self {
        Self::new("GET", url)
    }

    pub fn post<U: Into<String>>(url: U) -> Self {
        Self::new("POST", url)
    }

    pub fn with_header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.set_header(name.as_ref(), value.as_ref());
        self
    }

    pub fn with_body<T: Into<Vec<u8>>>(mut self, content_type: &str, body: T) -> Self {
        self.set_header(CONTENT_TYPE, content_type);
        self.body = Some(body.into());
        self
    }

    /// Sends a form body, encoded in the given order.
    pub fn with_form<K, V>(self, pairs: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let body = form_encode(pairs.iter().map(|(k, v)| (k, v)));
        self.with_body(FORM_ENCODED, body)
    }
}

impl HttpRequest for BasicRequest {
    fn method(&self) -> &str {
        &self.method
    }

    fn set_method(&mut self, method: &str) {
        self.method = method.to_string();
    }

    fn request_url(&self) -> &str {
        &self.url
    }

    fn set_request_url(&mut self, url: &str) {
        self.url = url.to_string();
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    fn all_headers(&self) -> Vec<(String, String)> {
        self.headers.clone()
    }

    fn message_payload(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

/// An in-memory reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicResponse {
    status: u16,
    reason: String,
    body: Vec<u8>,
}

impl BasicResponse {
    pub fn new<R, B>(status: u16, reason: R, body: B) -> Self
    where
        R: Into<String>,
        B: Into<Vec<u8>>,
    {
        BasicResponse {
            status,
            reason: reason.into(),
            body: body.into(),
        }
    }

    /// A reply carrying the canonical reason phrase of `status`.
    pub fn with_status<B: Into<Vec<u8>>>(status: StatusCode, body: B) -> Self {
        Self::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
            body,
        )
    }

    pub fn ok<B: Into<Vec<u8>>>(body: B) -> Self {
        Self::with_status(StatusCode::OK, body)
    }
}

impl HttpResponse for BasicResponse {
    fn status_code(&self) -> u16 {
        self.status
    }

    fn reason_phrase(&self) -> &str {
        &self.reason
    }

    fn content(&mut self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(self.body.as_slice()))
    }
}
