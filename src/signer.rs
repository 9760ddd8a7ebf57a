use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use base64::Engine;
use hmac::{Hmac, Mac};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use sha1::Sha1;

use crate::base_string::SignatureBaseString;
use crate::encoding::percent_encode;
use crate::error::{SignError, SignResult};
use crate::http::HttpRequest;
use crate::parameters::HttpParameters;

const PEM_PREFIX: &str = "-----BEGIN";

/// The `oauth_signature_method` values this crate can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignatureMethod {
    #[serde(rename = "PLAINTEXT")]
    Plaintext,
    #[default]
    #[serde(rename = "HMAC-SHA1")]
    HmacSha1,
    #[serde(rename = "RSA-SHA1")]
    RsaSha1,
}

impl SignatureMethod {
    /// Every supported method, in lookup order.
    pub const ALL: [SignatureMethod; 3] = [
        SignatureMethod::Plaintext,
        SignatureMethod::HmacSha1,
        SignatureMethod::RsaSha1,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SignatureMethod::Plaintext => "PLAINTEXT",
            SignatureMethod::HmacSha1 => "HMAC-SHA1",
            SignatureMethod::RsaSha1 => "RSA-SHA1",
        }
    }
}

impl fmt::Display for SignatureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureMethod {
    type Err = SignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SignatureMethod::ALL
            .iter()
            .find(|method| method.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| SignError::UnknownSignatureMethod(s.to_string()))
    }
}

/// Turns a request and its collected parameters into `oauth_signature`.
#[derive(Debug, Clone, Copy)]
pub struct MessageSigner<'a> {
    method: SignatureMethod,
    consumer_secret: &'a str,
    token_secret: &'a str,
}

impl<'a> MessageSigner<'a> {
    /// An absent token secret signs as the empty string.
    pub fn new(
        method: SignatureMethod,
        consumer_secret: &'a str,
        token_secret: Option<&'a str>,
    ) -> Self {
        MessageSigner {
            method,
            consumer_secret,
            token_secret: token_secret.unwrap_or_default(),
        }
    }

    pub fn signature_method(&self) -> SignatureMethod {
        self.method
    }

    /// Signs `request`; the returned signature is not yet percent-encoded.
    pub fn sign<R>(&self, request: &R, parameters: &HttpParameters) -> SignResult<String>
    where
        R: HttpRequest + ?Sized,
    {
        match self.method {
            // PLAINTEXT never looks at the request
            SignatureMethod::Plaintext => Ok(self.signing_key()),
            SignatureMethod::HmacSha1 | SignatureMethod::RsaSha1 => {
                let base_string = SignatureBaseString::new(request, parameters).generate()?;
                self.sign_base_string(&base_string)
            }
        }
    }

    pub fn sign_base_string(&self, base_string: &str) -> SignResult<String> {
        match self.method {
            SignatureMethod::Plaintext => Ok(self.signing_key()),
            SignatureMethod::HmacSha1 => hmac_sha1(&self.signing_key(), base_string),
            SignatureMethod::RsaSha1 => {
                let private_key = load_private_key(self.consumer_secret)?;
                rsa_sha1(&private_key, base_string)
            }
        }
    }

    fn signing_key(&self) -> String {
        format!(
            "{}&{}",
            percent_encode(self.consumer_secret),
            percent_encode(self.token_secret)
        )
    }
}

fn hmac_sha1(key: &str, data: &str) -> SignResult<String> {
    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
        .map_err(|err| SignError::Digest(err.to_string()))?;
    mac.update(data.as_bytes());
    Ok(BASE64_ENGINE.encode(mac.finalize().into_bytes()))
}

fn rsa_sha1(private_key: &RsaPrivateKey, data: &str) -> SignResult<String> {
    let signing_key = SigningKey::<Sha1>::new(private_key.clone());
    let signature = signing_key.try_sign(data.as_bytes())?;
    Ok(BASE64_ENGINE.encode(signature.to_bytes()))
}

/// Reads an RSA private key from a consumer secret.
///
/// The secret is Base64 of a PKCS#8 DER document; whitespace is ignored.
/// PEM input (PKCS#8 or PKCS#1) is accepted too.
pub fn load_private_key(secret: &str) -> SignResult<RsaPrivateKey> {
    let secret = secret.trim();
    if secret.starts_with(PEM_PREFIX) {
        if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(secret) {
            return Ok(key);
        }
        return RsaPrivateKey::from_pkcs1_pem(secret)
            .map_err(|err| SignError::InvalidPrivateKey(err.to_string()));
    }

    let compact = secret
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect::<String>();
    let der = BASE64_ENGINE.decode(compact)?;
    RsaPrivateKey::from_pkcs8_der(&der).map_err(|err| SignError::InvalidPrivateKey(err.to_string()))
}
