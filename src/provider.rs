//! The three-legged token exchange.
//!
//! ```text
//! Unauthenticated --retrieve_request_token--> RequestTokenObtained
//! RequestTokenObtained --retrieve_access_token--> AccessTokenObtained
//! ```
//!
//! A failed step leaves both the consumer and the provider as they were.

use std::collections::BTreeSet;
use std::io::Read;

use http::StatusCode;

use crate::consumer::OAuthConsumer;
use crate::encoding::{add_query_parameters, decode_form, percent_decode};
use crate::error::{Error, ExpectationError, Result};
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::parameters::HttpParameters;
use crate::{
    OAUTH_CALLBACK_CONFIRMED_KEY, OAUTH_CALLBACK_KEY, OAUTH_TOKEN_KEY, OAUTH_TOKEN_SECRET_KEY,
    OAUTH_VERIFIER_KEY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExchangeState {
    #[default]
    Unauthenticated,
    RequestTokenObtained,
    AccessTokenObtained,
}

/// Hooks into each token request. All methods default to no-ops.
pub trait ProviderListener {
    /// Called before the request is signed.
    fn prepare_request(&self, _request: &mut dyn HttpRequest) {}

    /// Called after signing, right before the request is sent.
    fn prepare_submission(&self, _request: &mut dyn HttpRequest) {}

    fn on_response_received(&self, _status: u16, _body: &str) {}
}

/// Talks to the request-token, authorization and access-token endpoints of
/// one service provider.
pub struct OAuthProvider<T> {
    transport: T,
    request_token_endpoint_url: String,
    access_token_endpoint_url: String,
    authorization_website_url: String,
    oauth10a: bool,
    state: ExchangeState,
    response_parameters: HttpParameters,
    request_headers: Vec<(String, String)>,
    listener: Option<Box<dyn ProviderListener>>,
}

struct TokenReply {
    token: String,
    token_secret: String,
    remaining: HttpParameters,
}

impl<T> OAuthProvider<T>
where
    T: HttpTransport,
{
    pub fn new<R, A, W>(
        transport: T,
        request_token_endpoint_url: R,
        access_token_endpoint_url: A,
        authorization_website_url: W,
    ) -> Self
    where
        R: Into<String>,
        A: Into<String>,
        W: Into<String>,
    {
        OAuthProvider {
            transport,
            request_token_endpoint_url: request_token_endpoint_url.into(),
            access_token_endpoint_url: access_token_endpoint_url.into(),
            authorization_website_url: authorization_website_url.into(),
            oauth10a: false,
            state: ExchangeState::Unauthenticated,
            response_parameters: HttpParameters::new(),
            request_headers: Vec::new(),
            listener: None,
        }
    }

    /// Obtains an unauthorized request token and returns the URL the user
    /// must visit to authorize it.
    ///
    /// Pass [`OUT_OF_BAND`](crate::OUT_OF_BAND) as `callback_url` when the
    /// application cannot receive callbacks.
    pub fn retrieve_request_token(
        &mut self,
        consumer: &mut OAuthConsumer,
        callback_url: &str,
    ) -> Result<String> {
        let mut unauthorized = consumer.clone();
        unauthorized.clear_token();
        let endpoint = add_query_parameters(
            &self.request_token_endpoint_url,
            &[(OAUTH_CALLBACK_KEY, callback_url)],
        );

        let mut reply = self.retrieve_token(&unauthorized, &endpoint)?;
        self.oauth10a = reply
            .remaining
            .remove(OAUTH_CALLBACK_CONFIRMED_KEY)
            .map_or(false, |values| values.contains("true"));
        consumer.set_token_with_secret(reply.token.as_str(), reply.token_secret.as_str());
        self.response_parameters = reply.remaining;
        self.state = ExchangeState::RequestTokenObtained;
        tracing::debug!(oauth10a = self.oauth10a, "request token obtained");

        let mut query = vec![(OAUTH_TOKEN_KEY, reply.token.as_str())];
        if !self.oauth10a {
            query.push((OAUTH_CALLBACK_KEY, callback_url));
        }
        Ok(add_query_parameters(&self.authorization_website_url, &query))
    }

    /// Exchanges the authorized request token held by `consumer` for an
    /// access token.
    ///
    /// The verifier is only sent to 1.0a providers.
    pub fn retrieve_access_token(
        &mut self,
        consumer: &mut OAuthConsumer,
        verifier: Option<&str>,
    ) -> Result<()> {
        if consumer.token().is_none() || consumer.token_secret().is_none() {
            return Err(ExpectationError::RequestTokenMissing.into());
        }
        let endpoint = match verifier {
            Some(verifier) if self.oauth10a => add_query_parameters(
                &self.access_token_endpoint_url,
                &[(OAUTH_VERIFIER_KEY, verifier)],
            ),
            _ => self.access_token_endpoint_url.clone(),
        };

        let reply = self.retrieve_token(consumer, &endpoint)?;
        consumer.set_token_with_secret(reply.token, reply.token_secret);
        self.response_parameters = reply.remaining;
        self.state = ExchangeState::AccessTokenObtained;
        tracing::debug!("access token obtained");
        Ok(())
    }

    fn retrieve_token(&self, consumer: &OAuthConsumer, endpoint_url: &str) -> Result<TokenReply> {
        let mut request = self
            .transport
            .create_request(endpoint_url)
            .map_err(Error::communication)?;
        for (name, value) in &self.request_headers {
            request.set_header(name, value);
        }
        if let Some(listener) = &self.listener {
            listener.prepare_request(&mut request);
        }
        consumer.sign(&mut request)?;
        if let Some(listener) = &self.listener {
            listener.prepare_submission(&mut request);
        }

        tracing::debug!(endpoint = %endpoint_url, "requesting token");
        let mut response = self
            .transport
            .send_request(request)
            .map_err(Error::communication)?;
        let status = response.status_code();
        let body = read_body(&mut response)?;
        if let Some(listener) = &self.listener {
            listener.on_response_received(status, &body);
        }

        match status {
            _ if status == StatusCode::UNAUTHORIZED.as_u16() => {
                tracing::debug!(endpoint = %endpoint_url, "token request not authorized");
                Err(Error::NotAuthorized { body })
            }
            status if status >= 300 => Err(Error::Communication {
                message: format!(
                    "service provider responded in error: {} ({})",
                    status,
                    reason_phrase(&response, status)
                ),
                body: Some(body),
                source: None,
            }),
            _ => read_token_reply(body),
        }
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Whether the provider confirmed the callback, i.e. speaks 1.0a.
    pub fn is_oauth10a(&self) -> bool {
        self.oauth10a
    }

    /// Presets the protocol revision, e.g. when resuming an exchange whose
    /// request token was obtained elsewhere.
    pub fn set_oauth10a(&mut self, oauth10a: bool) {
        self.oauth10a = oauth10a;
    }

    /// Parameters from the last successful reply other than the token, its
    /// secret and `oauth_callback_confirmed`. Values are percent-encoded.
    pub fn response_parameters(&self) -> &HttpParameters {
        &self.response_parameters
    }

    /// A header sent with every token request.
    pub fn set_request_header<K, V>(&mut self, name: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.request_headers.push((name.into(), value.into()));
    }

    pub fn set_listener<L>(&mut self, listener: L)
    where
        L: ProviderListener + 'static,
    {
        self.listener = Some(Box::new(listener));
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn request_token_endpoint_url(&self) -> &str {
        &self.request_token_endpoint_url
    }

    pub fn access_token_endpoint_url(&self) -> &str {
        &self.access_token_endpoint_url
    }

    pub fn authorization_website_url(&self) -> &str {
        &self.authorization_website_url
    }
}

fn read_body<R>(response: &mut R) -> Result<String>
where
    R: HttpResponse,
{
    let mut bytes = Vec::new();
    response
        .content()
        .and_then(|mut content| content.read_to_end(&mut bytes))
        .map_err(Error::communication)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn reason_phrase<R>(response: &R, status: u16) -> &str
where
    R: HttpResponse,
{
    match response.reason_phrase() {
        "" => StatusCode::from_u16(status)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or_default(),
        reason => reason,
    }
}

fn read_token_reply(body: String) -> Result<TokenReply> {
    let mut remaining = HttpParameters::new();
    // a bare `oauth_token` without `=` carries no value
    let pairs = decode_form(&body).into_iter().filter(|(key, value)| {
        value.is_some() || (key != OAUTH_TOKEN_KEY && key != OAUTH_TOKEN_SECRET_KEY)
    });
    remaining.put_pairs(pairs, true);
    let token = remaining.remove(OAUTH_TOKEN_KEY).and_then(first_decoded);
    let token_secret = remaining.remove(OAUTH_TOKEN_SECRET_KEY).and_then(first_decoded);
    match (token, token_secret) {
        (Some(token), Some(token_secret)) => Ok(TokenReply {
            token,
            token_secret,
            remaining,
        }),
        (None, _) => Err(ExpectationError::TokenKeyNotFound(OAUTH_TOKEN_KEY, body).into()),
        (_, None) => Err(ExpectationError::TokenKeyNotFound(OAUTH_TOKEN_SECRET_KEY, body).into()),
    }
}

fn first_decoded(values: BTreeSet<String>) -> Option<String> {
    values.into_iter().next().map(|value| percent_decode(&value))
}
