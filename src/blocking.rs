//! [`reqwest::blocking`] adapter.
//!
//! `Request`, `Response` and `Client` implement the capability traits, so an
//! [`OAuthProvider`](crate::OAuthProvider) can run on a plain
//! `reqwest::blocking::Client`.

use std::io::{self, Read};

use http::header::{HeaderName, HeaderValue};
use http::Method;
use reqwest::blocking::{Client, Request, RequestBuilder, Response};
use url::Url;

use crate::consumer::OAuthConsumer;
use crate::error::{Error, Result};
use crate::http::{HttpRequest, HttpResponse, HttpTransport};

impl HttpRequest for Request {
    fn method(&self) -> &str {
        Request::method(self).as_str()
    }

    fn set_method(&mut self, method: &str) {
        match Method::from_bytes(method.as_bytes()) {
            Ok(method) => *self.method_mut() = method,
            Err(err) => tracing::warn!(method, %err, "ignoring invalid request method"),
        }
    }

    fn request_url(&self) -> &str {
        self.url().as_str()
    }

    fn set_request_url(&mut self, url: &str) {
        match Url::parse(url) {
            Ok(url) => *self.url_mut() = url,
            Err(err) => tracing::warn!(url, %err, "ignoring invalid request url"),
        }
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    fn set_header(&mut self, name: &str, value: &str) {
        let name = match HeaderName::from_bytes(name.as_bytes()) {
            Ok(name) => name,
            Err(err) => {
                tracing::warn!(name, %err, "ignoring invalid header name");
                return;
            }
        };
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers_mut().insert(name, value);
            }
            Err(err) => tracing::warn!(%name, %err, "ignoring invalid header value"),
        }
    }

    fn all_headers(&self) -> Vec<(String, String)> {
        self.headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect()
    }

    /// Streaming bodies are not visible to the signer.
    fn message_payload(&self) -> Option<&[u8]> {
        self.body().and_then(|body| body.as_bytes())
    }
}

impl HttpResponse for Response {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }

    fn reason_phrase(&self) -> &str {
        self.status().canonical_reason().unwrap_or_default()
    }

    fn content(&mut self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(self))
    }
}

impl HttpTransport for Client {
    type Request = Request;
    type Response = Response;
    type Error = reqwest::Error;

    fn create_request(&self, endpoint_url: &str) -> reqwest::Result<Request> {
        self.get(endpoint_url).build()
    }

    fn send_request(&self, request: Request) -> reqwest::Result<Response> {
        self.execute(request)
    }
}

/// Builds and signs a request in one step.
///
/// ```no_run
/// use oauth1_consumer::{OAuthConsumer, OAuthRequestBuilderExt};
///
/// let mut consumer = OAuthConsumer::new("[CONSUMER_KEY]", "[CONSUMER_SECRET]");
/// consumer.set_token_with_secret("[ACCESS_TOKEN]", "[TOKEN_SECRET]");
///
/// let client = reqwest::blocking::Client::new();
/// let request = client
///     .post("https://api.twitter.com/1.1/statuses/update.json")
///     .form(&[("status", "Hello, Twitter!")])
///     .sign_oauth1(&consumer)?;
/// let response = client.execute(request)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub trait OAuthRequestBuilderExt: private::Sealed {
    fn sign_oauth1(self, consumer: &OAuthConsumer) -> Result<Request>;
}

impl OAuthRequestBuilderExt for RequestBuilder {
    fn sign_oauth1(self, consumer: &OAuthConsumer) -> Result<Request> {
        let mut request = self.build().map_err(Error::communication)?;
        consumer.sign(&mut request)?;
        Ok(request)
    }
}

mod private {
    use reqwest::blocking::RequestBuilder;

    pub trait Sealed {}
    impl Sealed for RequestBuilder {}
}

#[cfg(test)]
mod test {
    use http::header::AUTHORIZATION;

    use super::*;
    use crate::encoding::FORM_ENCODED;
    use crate::parameters::HttpParameters;
    use crate::strategy::SigningStrategy;
    use crate::{OAUTH_NONCE_KEY, OAUTH_SIGNATURE_KEY, OAUTH_TIMESTAMP_KEY};

    fn twitter_consumer() -> OAuthConsumer {
        let mut consumer = OAuthConsumer::new(
            "xvz1evFS4wEEPTGEFPHBog",
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
        );
        consumer.set_token_with_secret(
            "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        );
        let mut pinned = HttpParameters::new();
        pinned.put_encoded(OAUTH_NONCE_KEY, "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg");
        pinned.put_encoded(OAUTH_TIMESTAMP_KEY, "1318622958");
        consumer.set_additional_parameters(pinned);
        consumer
    }

    #[test]
    fn sign_form_request() {
        let client = Client::new();
        let request = client
            .post("https://api.twitter.com/1.1/statuses/update.json?include_entities=true")
            .header(reqwest::header::CONTENT_TYPE, FORM_ENCODED)
            .body("status=Hello+Ladies+%2B+Gentlemen%2C+a+signed+OAuth+request%21")
            .sign_oauth1(&twitter_consumer())
            .unwrap();

        let header = request.headers()[AUTHORIZATION].to_str().unwrap();
        let params = HttpParameters::from_authorization_header(header).unwrap();
        assert_eq!(
            params.get_first_decoded(OAUTH_SIGNATURE_KEY).as_deref(),
            Some("hCtSmYh+iHYCEqBWrE7C7hYmtUk=")
        );
    }

    #[test]
    fn sign_query_string() {
        let client = Client::new();
        let consumer = twitter_consumer().with_signing_strategy(SigningStrategy::QueryString);
        let request = client
            .get("https://api.twitter.com/1.1/statuses/home_timeline.json?count=5")
            .sign_oauth1(&consumer)
            .unwrap();

        assert!(request.headers().get(AUTHORIZATION).is_none());
        let url = request.url();
        assert_eq!(url.path(), "/1.1/statuses/home_timeline.json");
        let keys: Vec<_> = url.query_pairs().map(|(key, _)| key.into_owned()).collect();
        assert_eq!(keys[0], "count");
        assert_eq!(keys[1], "oauth_signature");
        assert!(keys.iter().any(|key| key == "oauth_nonce"));
    }

    #[test]
    fn request_capabilities() {
        let mut request = Client::new()
            .get("http://example.com/a?b=c")
            .build()
            .unwrap();
        assert_eq!(HttpRequest::method(&request), "GET");
        assert_eq!(request.request_url(), "http://example.com/a?b=c");

        request.set_header("X-Custom", "1");
        assert_eq!(HttpRequest::header(&request, "x-custom"), Some("1"));
        request.set_header("bad header", "1");
        let headers = request.all_headers();
        assert!(headers.iter().any(|(name, value)| name == "x-custom" && value == "1"));
        assert!(headers.iter().all(|(name, _)| name != "bad header"));

        request.set_method("POST");
        assert_eq!(HttpRequest::method(&request), "POST");
        request.set_method("BAD METHOD");
        assert_eq!(HttpRequest::method(&request), "POST");

        request.set_request_url("not a url");
        assert_eq!(request.request_url(), "http://example.com/a?b=c");
        assert_eq!(request.message_payload(), None);
    }

    #[test]
    fn create_request_is_get() {
        let request = Client::new()
            .create_request("https://sp.example.com/request_token?oauth_callback=oob")
            .unwrap();
        assert_eq!(*request.method(), reqwest::Method::GET);
        assert_eq!(request.url().query(), Some("oauth_callback=oob"));
    }
}
