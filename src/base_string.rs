//! Signature base string construction.
//!
//! ```text
//! METHOD & percent_encode(normalized url) & percent_encode(normalized parameters)
//! ```

use url::Url;

use crate::encoding::percent_encode;
use crate::error::{SignError, SignResult};
use crate::http::HttpRequest;
use crate::parameters::HttpParameters;
use crate::{OAUTH_SIGNATURE_KEY, REALM_KEY};

/// Builds the signature base string of one request.
///
/// `parameters` must already hold every parameter that takes part in the
/// signature (OAuth, query and form body), in encoded form.
#[derive(Debug)]
pub struct SignatureBaseString<'a, R: ?Sized> {
    request: &'a R,
    parameters: &'a HttpParameters,
}

impl<'a, R> SignatureBaseString<'a, R>
where
    R: HttpRequest + ?Sized,
{
    pub fn new(request: &'a R, parameters: &'a HttpParameters) -> Self {
        SignatureBaseString {
            request,
            parameters,
        }
    }

    pub fn generate(&self) -> SignResult<String> {
        let normalized_url = self.normalize_request_url()?;
        let normalized_params = self.normalize_request_parameters();
        let base_string = format!(
            "{}&{}&{}",
            percent_encode(self.request.method()),
            percent_encode(&normalized_url),
            percent_encode(&normalized_params)
        );
        tracing::debug!(
            method = self.request.method(),
            url = %normalized_url,
            %base_string,
            "generated signature base string"
        );
        Ok(base_string)
    }

    pub fn normalize_request_url(&self) -> SignResult<String> {
        normalize_url(self.request.request_url())
    }

    /// Joins every parameter as `key=value` in canonical order, leaving out
    /// `oauth_signature` and `realm`.
    pub fn normalize_request_parameters(&self) -> String {
        self.parameters
            .pairs()
            .filter(|(key, _)| *key != OAUTH_SIGNATURE_KEY && *key != REALM_KEY)
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Normalizes a request URL for signing.
///
/// Scheme and authority are lower-cased, the default port of `http` (80) and
/// `https` (443) is dropped, an empty path becomes `/`, and the query string
/// and fragment are removed.
pub fn normalize_url(url: &str) -> SignResult<String> {
    let parsed = Url::parse(url)?;
    let host = parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| SignError::MissingAuthority(url.to_string()))?;

    let mut authority = String::new();
    if !parsed.username().is_empty() {
        authority.push_str(parsed.username());
        if let Some(password) = parsed.password() {
            authority.push(':');
            authority.push_str(password);
        }
        authority.push('@');
    }
    authority.push_str(host);
    // `Url` already reports the scheme's default port as absent.
    if let Some(port) = parsed.port() {
        authority.push(':');
        authority.push_str(&port.to_string());
    }

    let path = match parsed.path() {
        "" => "/",
        path => path,
    };
    Ok(format!(
        "{}://{}{}",
        parsed.scheme().to_ascii_lowercase(),
        authority.to_ascii_lowercase(),
        path
    ))
}
