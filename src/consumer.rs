use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::encoding::{decode_form, is_form_encoded, remove_query_parameters};
use crate::error::{ExpectationError, Result};
use crate::http::{BasicRequest, HttpRequest};
use crate::parameters::HttpParameters;
use crate::signer::{MessageSigner, SignatureMethod};
use crate::strategy::SigningStrategy;
use crate::{
    AUTHORIZATION_HEADER, OAUTH_CONSUMER_KEY, OAUTH_KEY_PREFIX, OAUTH_NONCE_KEY,
    OAUTH_SIGNATURE_KEY, OAUTH_SIGNATURE_METHOD_KEY, OAUTH_TIMESTAMP_KEY, OAUTH_TOKEN_KEY,
    OAUTH_VERSION, OAUTH_VERSION_KEY, REALM_KEY,
};

/// Query parameters a previous signing may have left on the request URL.
const GENERATED_KEYS: [&str; 7] = [
    OAUTH_SIGNATURE_KEY,
    OAUTH_NONCE_KEY,
    OAUTH_TIMESTAMP_KEY,
    OAUTH_CONSUMER_KEY,
    OAUTH_SIGNATURE_METHOD_KEY,
    OAUTH_VERSION_KEY,
    OAUTH_TOKEN_KEY,
];

/// Signs requests on behalf of one client application.
///
/// # Example
///
/// ```
/// use oauth1_consumer::{BasicRequest, HttpRequest, OAuthConsumer};
///
/// let mut consumer = OAuthConsumer::new("dpf43f3p2l4k3l03", "kd94hf93k423kf44");
/// consumer.set_token_with_secret("nnch734d00sl2jdk", "pfkkdhi9sl3r4s00");
///
/// let mut request = BasicRequest::get("http://photos.example.net/photos?size=original");
/// let header = consumer.sign(&mut request)?;
/// assert!(header.starts_with("OAuth oauth_token=\"nnch734d00sl2jdk\""));
/// assert_eq!(request.header("Authorization"), Some(header.as_str()));
/// # Ok::<(), oauth1_consumer::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct OAuthConsumer {
    consumer_key: String,
    consumer_secret: String,
    token: Option<String>,
    token_secret: Option<String>,
    signature_method: SignatureMethod,
    signing_strategy: SigningStrategy,
    additional_parameters: HttpParameters,
    send_empty_tokens: bool,
}

impl OAuthConsumer {
    /// A consumer signing with HMAC-SHA1 into the Authorization header.
    pub fn new<K, S>(consumer_key: K, consumer_secret: S) -> Self
    where
        K: Into<String>,
        S: Into<String>,
    {
        OAuthConsumer {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            token: None,
            token_secret: None,
            signature_method: SignatureMethod::default(),
            signing_strategy: SigningStrategy::default(),
            additional_parameters: HttpParameters::new(),
            send_empty_tokens: false,
        }
    }

    pub fn with_signature_method(self, signature_method: SignatureMethod) -> Self {
        OAuthConsumer {
            signature_method,
            ..self
        }
    }

    pub fn with_signing_strategy(self, signing_strategy: SigningStrategy) -> Self {
        OAuthConsumer {
            signing_strategy,
            ..self
        }
    }

    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    pub fn consumer_secret(&self) -> &str {
        &self.consumer_secret
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn token_secret(&self) -> Option<&str> {
        self.token_secret.as_deref()
    }

    pub fn signature_method(&self) -> SignatureMethod {
        self.signature_method
    }

    pub fn signing_strategy(&self) -> SigningStrategy {
        self.signing_strategy
    }

    pub fn set_token_with_secret<T, S>(&mut self, token: T, token_secret: S)
    where
        T: Into<String>,
        S: Into<String>,
    {
        self.token = Some(token.into());
        self.token_secret = Some(token_secret.into());
    }

    pub fn clear_token(&mut self) {
        self.token = None;
        self.token_secret = None;
    }

    /// Parameters merged into every signing, already percent-encoded.
    ///
    /// `oauth_*` values set here take precedence over generated ones, which
    /// makes it possible to pin `oauth_nonce` and `oauth_timestamp`.
    pub fn set_additional_parameters(&mut self, parameters: HttpParameters) {
        self.additional_parameters = parameters;
    }

    pub fn additional_parameters(&self) -> &HttpParameters {
        &self.additional_parameters
    }

    /// Emit `oauth_token=""` when no token is held.
    pub fn set_send_empty_tokens(&mut self, send_empty_tokens: bool) {
        self.send_empty_tokens = send_empty_tokens;
    }

    /// Signs `request` in place and returns the header value or URL that was
    /// written to it.
    ///
    /// Signing an already signed request replaces the previous signature;
    /// nonce and timestamp are generated anew unless pinned through
    /// [`set_additional_parameters`](Self::set_additional_parameters).
    pub fn sign<R>(&self, request: &mut R) -> Result<String>
    where
        R: HttpRequest + ?Sized,
    {
        if self.consumer_key.is_empty() || self.consumer_secret.is_empty() {
            return Err(ExpectationError::ConsumerCredentialsMissing.into());
        }

        strip_generated_parameters(&mut *request);
        let mut parameters = self.additional_parameters.clone();
        collect_header_parameters(&*request, &mut parameters);
        collect_query_parameters(&*request, &mut parameters);
        collect_body_parameters(&*request, &mut parameters);
        self.complete_oauth_parameters(&mut parameters);
        parameters.remove(OAUTH_SIGNATURE_KEY);

        let signer = MessageSigner::new(
            self.signature_method,
            &self.consumer_secret,
            self.token_secret.as_deref(),
        );
        let signature = signer.sign(&*request, &parameters)?;
        tracing::debug!(
            signature_method = %self.signature_method,
            strategy = ?self.signing_strategy,
            two_legged = !parameters.contains_key(OAUTH_TOKEN_KEY),
            "signed request"
        );

        Ok(self
            .signing_strategy
            .write_signature(&signature, request, &parameters))
    }

    /// Signs a `GET` of `url` through the query string and returns the
    /// signed URL, whatever strategy the consumer is configured with.
    pub fn sign_url(&self, url: &str) -> Result<String> {
        let consumer = self
            .clone()
            .with_signing_strategy(SigningStrategy::QueryString);
        let mut request = BasicRequest::get(url);
        consumer.sign(&mut request)
    }

    pub fn snapshot(&self) -> ConsumerSnapshot {
        ConsumerSnapshot {
            consumer_key: self.consumer_key.clone(),
            consumer_secret: self.consumer_secret.clone(),
            token: self.token.clone(),
            token_secret: self.token_secret.clone(),
            signature_method: self.signature_method,
            signing_strategy: self.signing_strategy,
        }
    }

    pub fn restore(snapshot: ConsumerSnapshot) -> Self {
        OAuthConsumer {
            token: snapshot.token,
            token_secret: snapshot.token_secret,
            ..OAuthConsumer::new(snapshot.consumer_key, snapshot.consumer_secret)
                .with_signature_method(snapshot.signature_method)
                .with_signing_strategy(snapshot.signing_strategy)
        }
    }

    fn complete_oauth_parameters(&self, out: &mut HttpParameters) {
        if !out.contains_key(OAUTH_CONSUMER_KEY) {
            out.put_encoded(OAUTH_CONSUMER_KEY, &self.consumer_key);
        }
        if !out.contains_key(OAUTH_SIGNATURE_METHOD_KEY) {
            out.put_encoded(OAUTH_SIGNATURE_METHOD_KEY, self.signature_method.name());
        }
        if !out.contains_key(OAUTH_TIMESTAMP_KEY) {
            out.put_encoded(OAUTH_TIMESTAMP_KEY, &generate_timestamp());
        }
        if !out.contains_key(OAUTH_NONCE_KEY) {
            out.put_encoded(OAUTH_NONCE_KEY, &generate_nonce());
        }
        if !out.contains_key(OAUTH_VERSION_KEY) {
            out.put_encoded(OAUTH_VERSION_KEY, OAUTH_VERSION);
        }
        if !out.contains_key(OAUTH_TOKEN_KEY) {
            match self.token.as_deref() {
                Some(token) if !token.is_empty() => out.put_encoded(OAUTH_TOKEN_KEY, token),
                _ if self.send_empty_tokens => out.put_encoded(OAUTH_TOKEN_KEY, ""),
                _ => {}
            }
        }
    }
}

/// The persistable state of an [`OAuthConsumer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerSnapshot {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: Option<String>,
    pub token_secret: Option<String>,
    pub signature_method: SignatureMethod,
    #[serde(default)]
    pub signing_strategy: SigningStrategy,
}

fn strip_generated_parameters<R>(request: &mut R)
where
    R: HttpRequest + ?Sized,
{
    let url = request.request_url();
    let query = url
        .split('#')
        .next()
        .and_then(|url| url.split_once('?'))
        .map(|(_, query)| query)
        .unwrap_or_default();
    if decode_form(query)
        .iter()
        .any(|(key, _)| GENERATED_KEYS.contains(&key.as_str()))
    {
        let stripped = remove_query_parameters(url, &GENERATED_KEYS);
        request.set_request_url(&stripped);
    }
}

/// Only `realm` and non-OAuth elements survive from an existing header.
fn collect_header_parameters<R>(request: &R, out: &mut HttpParameters)
where
    R: HttpRequest + ?Sized,
{
    let params = match request
        .header(AUTHORIZATION_HEADER)
        .and_then(HttpParameters::from_authorization_header)
    {
        Some(params) => params,
        None => return,
    };
    for (key, values) in &params {
        if key == REALM_KEY || !key.starts_with(OAUTH_KEY_PREFIX) {
            for value in values {
                out.put(key.as_str(), value.as_str());
            }
        }
    }
}

fn collect_query_parameters<R>(request: &R, out: &mut HttpParameters)
where
    R: HttpRequest + ?Sized,
{
    let url = request.request_url();
    let url = url.split('#').next().unwrap_or_default();
    if let Some((_, query)) = url.split_once('?') {
        out.put_pairs(decode_form(query), true);
    }
}

fn collect_body_parameters<R>(request: &R, out: &mut HttpParameters)
where
    R: HttpRequest + ?Sized,
{
    if !request.content_type().map_or(false, is_form_encoded) {
        return;
    }
    if let Some(payload) = request.message_payload() {
        out.put_pairs(decode_form(&String::from_utf8_lossy(payload)), true);
    }
}

fn generate_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string()
}

/// 128 random bits, hex encoded.
fn generate_nonce() -> String {
    format!("{:032x}", rand::rng().random::<u128>())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::encoding::FORM_ENCODED;
    use crate::error::Error;

    fn extract_signature(auth_header: &str) -> String {
        let params = HttpParameters::from_authorization_header(auth_header).unwrap();
        params.get_first_decoded(OAUTH_SIGNATURE_KEY).unwrap()
    }

    fn pinned(nonce: &str, timestamp: &str) -> HttpParameters {
        let mut params = HttpParameters::new();
        params.put_encoded(OAUTH_NONCE_KEY, nonce);
        params.put_encoded(OAUTH_TIMESTAMP_KEY, timestamp);
        params
    }

    #[test]
    fn sign_official_vector() {
        let mut consumer = OAuthConsumer::new("dpf43f3p2l4k3l03", "kd94hf93k423kf44");
        consumer.set_token_with_secret("nnch734d00sl2jdk", "pfkkdhi9sl3r4s00");
        consumer.set_additional_parameters(pinned("kllo9940pd9333jh", "1191242096"));

        let mut request = BasicRequest::get("http://photos.example.net/photos?file=vacation.jpg&size=original");
        let header = consumer.sign(&mut request).unwrap();
        assert_eq!(extract_signature(&header), "tR3+Ty81lMeYAr/Fid0kMTYa/WM=");
        assert_eq!(
            header,
            "OAuth oauth_token=\"nnch734d00sl2jdk\", oauth_consumer_key=\"dpf43f3p2l4k3l03\", \
             oauth_version=\"1.0\", oauth_signature_method=\"HMAC-SHA1\", \
             oauth_timestamp=\"1191242096\", oauth_nonce=\"kllo9940pd9333jh\", \
             oauth_signature=\"tR3%2BTy81lMeYAr%2FFid0kMTYa%2FWM%3D\""
        );
    }

    #[test]
    fn sign_post_body() {
        // https://developer.twitter.com/en/docs/authentication/oauth-1-0a/creating-a-signature
        let mut consumer = OAuthConsumer::new("xvz1evFS4wEEPTGEFPHBog", "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw");
        consumer.set_token_with_secret(
            "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        );
        consumer.set_additional_parameters(pinned("kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg", "1318622958"));

        let mut request = BasicRequest::post("https://api.twitter.com/1.1/statuses/update.json?include_entities=true")
            .with_body(
                FORM_ENCODED,
                "status=Hello+Ladies+%2B+Gentlemen%2C+a+signed+OAuth+request%21",
            );
        let header = consumer.sign(&mut request).unwrap();
        assert_eq!(extract_signature(&header), "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn body_ignored_unless_form_encoded() {
        let mut consumer = OAuthConsumer::new("ck", "cs");
        consumer.set_additional_parameters(pinned("n", "1"));
        let mut json = BasicRequest::post("http://x.com/")
            .with_body("application/json", "a=1");
        let mut bare = BasicRequest::post("http://x.com/");
        assert_eq!(
            extract_signature(&consumer.sign(&mut json).unwrap()),
            extract_signature(&consumer.sign(&mut bare).unwrap())
        );
    }

    #[test]
    fn double_encodes_literal_percent() {
        let mut consumer = OAuthConsumer::new("1%2", "secret");
        consumer.set_token_with_secret("3 4", "");
        let mut request = BasicRequest::get("http://example.com/");
        let header = consumer.sign(&mut request).unwrap();
        assert!(header.contains("oauth_consumer_key=\"1%252\""));
        assert!(header.contains("oauth_token=\"3%204\""));
    }

    #[test]
    fn two_legged_omits_token() {
        let consumer = OAuthConsumer::new("dpf43f3p2l4k3l03", "kd94hf93k423kf44");
        let mut request = BasicRequest::get("http://photos.example.net/photos");
        let header = consumer.sign(&mut request).unwrap();
        assert!(!header.contains("oauth_token"));
        assert!(header.contains("oauth_signature=\""));

        let mut consumer = consumer;
        consumer.set_additional_parameters(pinned("n", "1"));
        let mut first = BasicRequest::get("http://photos.example.net/photos");
        let mut second = BasicRequest::get("http://photos.example.net/photos");
        let expected = MessageSigner::new(SignatureMethod::HmacSha1, "kd94hf93k423kf44", None)
            .sign_base_string(
                "GET&http%3A%2F%2Fphotos.example.net%2Fphotos&oauth_consumer_key%3Ddpf43f3p2l4k3l03\
                 %26oauth_nonce%3Dn%26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1\
                 %26oauth_version%3D1.0",
            )
            .unwrap();
        assert_eq!(extract_signature(&consumer.sign(&mut first).unwrap()), expected);
        consumer.set_send_empty_tokens(true);
        let header = consumer.sign(&mut second).unwrap();
        assert!(header.contains("oauth_token=\"\""));
    }

    #[test]
    fn missing_consumer_credentials() {
        let consumer = OAuthConsumer::new("", "secret");
        let mut request = BasicRequest::get("http://example.com/");
        let result = consumer.sign(&mut request);
        assert!(matches!(
            result,
            Err(Error::ExpectationFailed(ExpectationError::ConsumerCredentialsMissing))
        ));
        assert_eq!(request.header(AUTHORIZATION_HEADER), None);
    }

    #[test]
    fn nonce_and_timestamp_fresh_per_request() {
        let consumer = OAuthConsumer::new("ck", "cs");
        let mut first = BasicRequest::get("http://example.com/");
        let mut second = BasicRequest::get("http://example.com/");
        let first = HttpParameters::from_authorization_header(&consumer.sign(&mut first).unwrap()).unwrap();
        let second = HttpParameters::from_authorization_header(&consumer.sign(&mut second).unwrap()).unwrap();
        assert_ne!(first.get_first(OAUTH_NONCE_KEY), second.get_first(OAUTH_NONCE_KEY));
        let timestamp = first.get_first(OAUTH_TIMESTAMP_KEY).unwrap();
        assert!(timestamp.parse::<u64>().unwrap() > 1_500_000_000);
    }

    #[test]
    fn realm_from_existing_header() {
        let mut consumer = OAuthConsumer::new("dpf43f3p2l4k3l03", "kd94hf93k423kf44");
        consumer.set_token_with_secret("nnch734d00sl2jdk", "pfkkdhi9sl3r4s00");
        consumer.set_additional_parameters(pinned("kllo9940pd9333jh", "1191242096"));
        let mut request = BasicRequest::get("http://photos.example.net/photos?file=vacation.jpg&size=original")
            .with_header(AUTHORIZATION_HEADER, "OAuth realm=\"Photos\"");
        let header = consumer.sign(&mut request).unwrap();
        assert!(header.starts_with("OAuth realm=\"Photos\", oauth_token="));
        // realm never takes part in the signature
        assert_eq!(extract_signature(&header), "tR3+Ty81lMeYAr/Fid0kMTYa/WM=");

        let mut request = BasicRequest::get("http://photos.example.net/photos?file=vacation.jpg&size=original")
            .with_header(AUTHORIZATION_HEADER, "OAuth realm=\"Photos, Inc\"");
        let header = consumer.sign(&mut request).unwrap();
        assert!(header.starts_with("OAuth realm=\"Photos, Inc\", oauth_token="));
        assert_eq!(extract_signature(&header), "tR3+Ty81lMeYAr/Fid0kMTYa/WM=");
    }

    #[test]
    fn plaintext_signature() {
        let mut consumer = OAuthConsumer::new("dpf43f3p2l4k3l03", "kd94hf93k423kf44")
            .with_signature_method(SignatureMethod::Plaintext);
        consumer.set_token_with_secret("nnch734d00sl2jdk", "pfkkdhi9sl3r4s00");
        let mut request = BasicRequest::get("https://photos.example.net/photos");
        let header = consumer.sign(&mut request).unwrap();
        assert!(header.contains("oauth_signature_method=\"PLAINTEXT\""));
        assert_eq!(extract_signature(&header), "kd94hf93k423kf44&pfkkdhi9sl3r4s00");
    }

    #[test]
    fn sign_url_with_query_string() {
        let mut consumer = OAuthConsumer::new("dpf43f3p2l4k3l03", "kd94hf93k423kf44");
        consumer.set_token_with_secret("nnch734d00sl2jdk", "pfkkdhi9sl3r4s00");
        consumer.set_additional_parameters(pinned("kllo9940pd9333jh", "1191242096"));
        let url = consumer
            .sign_url("http://photos.example.net/photos?file=vacation.jpg&size=original")
            .unwrap();
        assert_eq!(
            url,
            "http://photos.example.net/photos?file=vacation.jpg&size=original\
             &oauth_signature=tR3%2BTy81lMeYAr%2FFid0kMTYa%2FWM%3D&oauth_token=nnch734d00sl2jdk\
             &oauth_consumer_key=dpf43f3p2l4k3l03&oauth_version=1.0&oauth_signature_method=HMAC-SHA1\
             &oauth_timestamp=1191242096&oauth_nonce=kllo9940pd9333jh"
        );
        assert_eq!(consumer.signing_strategy(), SigningStrategy::AuthorizationHeader);
    }

    fn query_value(url: &str, key: &str) -> Option<String> {
        let query = url.split('#').next()?.split_once('?')?.1;
        decode_form(query)
            .into_iter()
            .find(|(name, _)| name == key)
            .and_then(|(_, value)| value)
    }

    #[test]
    fn resigning_header_uses_fresh_nonce() {
        let consumer = OAuthConsumer::new("ck", "cs");
        let mut request = BasicRequest::get("http://example.com/photos?size=original")
            .with_header(AUTHORIZATION_HEADER, "OAuth realm=\"Photos\"");
        let first = consumer.sign(&mut request).unwrap();
        let second = consumer.sign(&mut request).unwrap();

        let first = HttpParameters::from_authorization_header(&first).unwrap();
        let params = HttpParameters::from_authorization_header(&second).unwrap();
        assert_ne!(first.get_first(OAUTH_NONCE_KEY), params.get_first(OAUTH_NONCE_KEY));
        assert_eq!(params.get(OAUTH_NONCE_KEY).map(|values| values.len()), Some(1));
        assert_eq!(second.matches("oauth_signature=").count(), 1);
        assert_eq!(params.get_first(REALM_KEY), Some("Photos"));
    }

    #[test]
    fn resigning_query_string_replaces_signature() {
        let consumer = OAuthConsumer::new("ck", "cs").with_signing_strategy(SigningStrategy::QueryString);
        let mut request = BasicRequest::get("http://example.com/photos?size=original#top");
        let first = consumer.sign(&mut request).unwrap();
        let second = consumer.sign(&mut request).unwrap();

        for key in &GENERATED_KEYS {
            let needle = format!("{}=", key);
            assert!(second.matches(needle.as_str()).count() <= 1, "{} repeated", key);
        }
        assert_eq!(second.matches("oauth_signature=").count(), 1);
        assert!(second.starts_with("http://example.com/photos?size=original&oauth_signature="));
        assert!(second.ends_with("#top"));
        assert_ne!(query_value(&first, OAUTH_NONCE_KEY), query_value(&second, OAUTH_NONCE_KEY));
    }

    #[test]
    fn resigning_keeps_pinned_parameters() {
        let mut consumer = OAuthConsumer::new("dpf43f3p2l4k3l03", "kd94hf93k423kf44");
        consumer.set_token_with_secret("nnch734d00sl2jdk", "pfkkdhi9sl3r4s00");
        consumer.set_additional_parameters(pinned("kllo9940pd9333jh", "1191242096"));
        let mut request = BasicRequest::get("http://photos.example.net/photos?file=vacation.jpg&size=original");
        let first = consumer.sign(&mut request).unwrap();
        let second = consumer.sign(&mut request).unwrap();
        assert_eq!(first, second);
        assert_eq!(extract_signature(&second), "tR3+Ty81lMeYAr/Fid0kMTYa/WM=");
    }

    #[test]
    fn snapshot_round_trip() {
        let mut consumer = OAuthConsumer::new("ck", "cs")
            .with_signature_method(SignatureMethod::Plaintext)
            .with_signing_strategy(SigningStrategy::QueryString);
        consumer.set_token_with_secret("t", "ts");

        let encoded = serde_urlencoded::to_string(consumer.snapshot()).unwrap();
        assert!(encoded.contains("signature_method=PLAINTEXT"));
        let decoded: ConsumerSnapshot = serde_urlencoded::from_str(&encoded).unwrap();
        let restored = OAuthConsumer::restore(decoded);

        assert_eq!(restored.consumer_key(), "ck");
        assert_eq!(restored.consumer_secret(), "cs");
        assert_eq!(restored.token(), Some("t"));
        assert_eq!(restored.token_secret(), Some("ts"));
        assert_eq!(restored.signature_method(), SignatureMethod::Plaintext);
        assert_eq!(restored.signing_strategy(), SigningStrategy::QueryString);
        assert_eq!(restored.snapshot(), consumer.snapshot());
    }
}
