use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;
pub type SignResult<T> = std::result::Result<T, SignError>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure kinds surfaced by signing and token exchange.
///
/// The four variants are mutually exclusive; nothing in this crate catches
/// or retries them.
#[derive(Error, Debug)]
pub enum Error {
    #[error("expectation failed : {0}")]
    ExpectationFailed(#[from] ExpectationError),
    #[error("authorization failed (server replied with a 401) : {body}")]
    NotAuthorized {
        /// Raw reply body, kept for diagnostics.
        body: String,
    },
    #[error("communication with the service provider failed : {message}")]
    Communication {
        message: String,
        body: Option<String>,
        #[source]
        source: Option<BoxError>,
    },
    #[error("OAuth sign failed : {0}")]
    SigningFailed(#[from] SignError),
}

impl Error {
    /// Wraps a transport-level failure.
    pub fn communication<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        let source = err.into();
        Error::Communication {
            message: source.to_string(),
            body: None,
            source: Some(source),
        }
    }

    /// Returns the reply body attached to the error, if any.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Error::NotAuthorized { body } => Some(body),
            Error::Communication { body, .. } => body.as_deref(),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpectationError {
    #[error("consumer key or secret not set")]
    ConsumerCredentialsMissing,
    #[error(
        "authorized request token or token secret not set, did you retrieve an authorized request token before?"
    )]
    RequestTokenMissing,
    #[error("{0} not set in server reply, the service provider you use is probably buggy : {1}")]
    TokenKeyNotFound(&'static str, String),
}

#[derive(Error, Debug)]
pub enum SignError {
    #[error("unknown signature method : {0}")]
    UnknownSignatureMethod(String),
    #[error("malformed request url : {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("request url has no authority : {0}")]
    MissingAuthority(String),
    #[error("consumer secret is not valid base64 : {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("consumer secret is not a usable RSA private key : {0}")]
    InvalidPrivateKey(String),
    #[error("RSA-SHA1 signing failed : {0}")]
    Rsa(#[from] rsa::signature::Error),
    #[error("HMAC-SHA1 digest failed : {0}")]
    Digest(String),
}
