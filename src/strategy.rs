use serde::{Deserialize, Serialize};

use crate::encoding::{decode_form, percent_encode, remove_query_parameters};
use crate::http::HttpRequest;
use crate::parameters::HttpParameters;
use crate::{
    AUTHORIZATION_HEADER, OAUTH_CALLBACK_KEY, OAUTH_CONSUMER_KEY, OAUTH_NONCE_KEY,
    OAUTH_SIGNATURE_KEY, OAUTH_SIGNATURE_METHOD_KEY, OAUTH_TIMESTAMP_KEY, OAUTH_TOKEN_KEY,
    OAUTH_VERIFIER_KEY, OAUTH_VERSION_KEY, REALM_KEY,
};

/// Parameters every signed request carries, in emission order.
const MANDATORY_KEYS: [&str; 5] = [
    OAUTH_CONSUMER_KEY,
    OAUTH_VERSION_KEY,
    OAUTH_SIGNATURE_METHOD_KEY,
    OAUTH_TIMESTAMP_KEY,
    OAUTH_NONCE_KEY,
];

/// Where the signature and OAuth parameters are written on the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SigningStrategy {
    /// `Authorization: OAuth key="value", ...`
    #[default]
    AuthorizationHeader,
    /// `oauth_*` query parameters appended to the request URL.
    QueryString,
}

impl SigningStrategy {
    /// Writes `signature` (not yet encoded) and the OAuth parameters onto
    /// `request`, returning the header value or URL that was written.
    ///
    /// Parameters the request URL already carries are not repeated.
    pub fn write_signature<R>(
        &self,
        signature: &str,
        request: &mut R,
        parameters: &HttpParameters,
    ) -> String
    where
        R: HttpRequest + ?Sized,
    {
        let in_url = query_keys(request.request_url());
        match self {
            SigningStrategy::AuthorizationHeader => {
                let header = authorization_header(signature, parameters, &in_url);
                request.set_header(AUTHORIZATION_HEADER, &header);
                header
            }
            SigningStrategy::QueryString => {
                let url = if carried(&in_url, OAUTH_SIGNATURE_KEY) {
                    remove_query_parameters(request.request_url(), &[OAUTH_SIGNATURE_KEY])
                } else {
                    request.request_url().to_string()
                };
                let url = signed_url(&url, signature, parameters, &in_url);
                request.set_request_url(&url);
                url
            }
        }
    }
}

fn authorization_header(signature: &str, parameters: &HttpParameters, in_url: &[String]) -> String {
    let mut elements = Vec::new();
    if let Some(realm) = parameters.get_first(REALM_KEY) {
        elements.push(format!("{}=\"{}\"", REALM_KEY, realm));
    }
    let optional = [OAUTH_TOKEN_KEY, OAUTH_CALLBACK_KEY, OAUTH_VERIFIER_KEY];
    for key in optional.iter().filter(|key| !carried(in_url, key)) {
        elements.extend(parameters.as_header_element(key));
    }
    for key in &MANDATORY_KEYS {
        elements.extend(parameters.as_header_element(key));
    }
    elements.push(format!(
        "{}=\"{}\"",
        OAUTH_SIGNATURE_KEY,
        percent_encode(signature)
    ));
    format!("OAuth {}", elements.join(", "))
}

fn signed_url(url: &str, signature: &str, parameters: &HttpParameters, in_url: &[String]) -> String {
    let mut query = vec![format!(
        "{}={}",
        OAUTH_SIGNATURE_KEY,
        percent_encode(signature)
    )];
    let optional = [OAUTH_TOKEN_KEY, OAUTH_CALLBACK_KEY, OAUTH_VERIFIER_KEY];
    for key in optional.iter() {
        if parameters.contains_key(key) && !carried(in_url, key) {
            query.push(parameters.as_query_string(key));
        }
    }
    for key in MANDATORY_KEYS.iter().filter(|key| !carried(in_url, key)) {
        query.push(parameters.as_query_string(key));
    }

    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    let mut signed = format!("{}{}{}", base, separator, query.join("&"));
    if let Some(fragment) = fragment {
        signed.push('#');
        signed.push_str(fragment);
    }
    signed
}

fn carried(in_url: &[String], key: &str) -> bool {
    in_url.iter().any(|k| k == key)
}

/// The keys of the URL's query string, in encoded form.
fn query_keys(url: &str) -> Vec<String> {
    let query = url.split('#').next().unwrap_or_default();
    match query.split_once('?') {
        Some((_, query)) => decode_form(query)
            .into_iter()
            .map(|(key, _)| percent_encode(&key))
            .collect(),
        None => Vec::new(),
    }
}
