/*!
oauth1-consumer: OAuth 1.0 / 1.0a for Rust HTTP clients.

# Overview

This library signs HTTP requests as described by OAuth Core 1.0a (RFC 5849)
and drives the three-legged token exchange against a service provider.

Signing is transport-agnostic: anything implementing [`HttpRequest`] can be
signed, and the token exchange runs on any [`HttpTransport`]. With the
`blocking` feature (enabled by default) both are implemented for
[`reqwest::blocking`](https://docs.rs/reqwest/latest/reqwest/blocking/).

Supported signature methods are `HMAC-SHA1`, `RSA-SHA1` and `PLAINTEXT`. The
signature is written into the `Authorization` header or the query string.

# How to use

## Basic usecase 1 - sending the tweet

```no_run
use oauth1_consumer::{OAuthConsumer, OAuthRequestBuilderExt};

// prepare authorization info
let mut consumer = OAuthConsumer::new("[CONSUMER_KEY]", "[CONSUMER_SECRET]");
consumer.set_token_with_secret("[ACCESS_TOKEN]", "[TOKEN_SECRET]");

// sample: send new tweet to twitter
let endpoint = "https://api.twitter.com/1.1/statuses/update.json";

let client = reqwest::blocking::Client::new();
let request = client
    .post(endpoint)
    .form(&[("status", "Hello, Twitter!")])
    .sign_oauth1(&consumer)?;
let resp = client.execute(request)?;
# Ok::<(), Box<dyn std::error::Error>>(())
```

## Basic usecase 2 - Acquiring OAuth token & secret

```no_run
use std::io;
use oauth1_consumer::{OAuthConsumer, OAuthProvider, OUT_OF_BAND};

let mut consumer = OAuthConsumer::new("[CONSUMER_KEY]", "[CONSUMER_SECRET]");
let mut provider = OAuthProvider::new(
    reqwest::blocking::Client::new(),
    "https://api.twitter.com/oauth/request_token",
    "https://api.twitter.com/oauth/access_token",
    "https://api.twitter.com/oauth/authorize",
);

// step 1: acquire request token & token secret
let auth_url = provider.retrieve_request_token(&mut consumer, OUT_OF_BAND)?;

// step 2. acquire user pin
println!("please access to: {}", auth_url);
println!("input pin: ");
let mut user_input = String::new();
io::stdin().read_line(&mut user_input)?;
let pin = user_input.trim();

// step 3. acquire access token
provider.retrieve_access_token(&mut consumer, Some(pin))?;
println!(
    "your token and secret is: \n token: {}\n secret: {}",
    consumer.token().unwrap_or_default(),
    consumer.token_secret().unwrap_or_default()
);
println!("other attributes: {:#?}", provider.response_parameters());
# Ok::<(), Box<dyn std::error::Error>>(())
```

# Logging

Base strings, signing and token requests are reported through
[`tracing`](https://docs.rs/tracing) at `debug` level. Nothing is emitted
until a subscriber is installed. Secrets are never logged.
*/
mod base_string;
#[cfg(feature = "blocking")]
mod blocking;
mod consumer;
mod encoding;
mod error;
mod http;
mod parameters;
mod provider;
mod signer;
mod strategy;

// exposed to external program
pub use base_string::{normalize_url, SignatureBaseString};
#[cfg(feature = "blocking")]
pub use blocking::OAuthRequestBuilderExt;
pub use consumer::{ConsumerSnapshot, OAuthConsumer};
pub use encoding::{
    add_query_parameters, decode_form, form_encode, is_form_encoded, percent_decode,
    percent_encode, remove_query_parameters, FORM_ENCODED,
};
pub use error::{Error, ExpectationError, Result, SignError, SignResult};
pub use crate::http::{BasicRequest, BasicResponse, HttpRequest, HttpResponse, HttpTransport};
pub use parameters::HttpParameters;
pub use provider::{ExchangeState, OAuthProvider, ProviderListener};
pub use signer::{load_private_key, MessageSigner, SignatureMethod};
pub use strategy::SigningStrategy;

// exposed constant variables
/// Represents `oauth_callback`.
pub const OAUTH_CALLBACK_KEY: &str = "oauth_callback";
/// Represents `oauth_callback_confirmed`.
pub const OAUTH_CALLBACK_CONFIRMED_KEY: &str = "oauth_callback_confirmed";
/// Represents `oauth_consumer_key`.
pub const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
/// Represents `oauth_nonce`.
pub const OAUTH_NONCE_KEY: &str = "oauth_nonce";
/// Represents `oauth_signature`.
pub const OAUTH_SIGNATURE_KEY: &str = "oauth_signature";
/// Represents `oauth_signature_method`.
pub const OAUTH_SIGNATURE_METHOD_KEY: &str = "oauth_signature_method";
/// Represents `oauth_timestamp`.
pub const OAUTH_TIMESTAMP_KEY: &str = "oauth_timestamp";
/// Represents `oauth_token`.
pub const OAUTH_TOKEN_KEY: &str = "oauth_token";
/// Represents `oauth_token_secret`.
pub const OAUTH_TOKEN_SECRET_KEY: &str = "oauth_token_secret";
/// Represents `oauth_verifier`.
pub const OAUTH_VERIFIER_KEY: &str = "oauth_verifier";
/// Represents `oauth_version`.
pub const OAUTH_VERSION_KEY: &str = "oauth_version";
/// Represents `realm`.
pub const REALM_KEY: &str = "realm";
/// The only protocol version this crate speaks.
pub const OAUTH_VERSION: &str = "1.0";
/// Callback value for applications that cannot receive redirects.
pub const OUT_OF_BAND: &str = "oob";
/// Name of the header the default signing strategy writes.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

// crate-private constant variables
pub(crate) const OAUTH_KEY_PREFIX: &str = "oauth_";
pub(crate) const X_OAUTH_KEY_PREFIX: &str = "x_oauth_";
