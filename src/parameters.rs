use std::collections::{btree_map, BTreeMap, BTreeSet};

use crate::encoding::{percent_decode, percent_encode};
use crate::{OAUTH_KEY_PREFIX, X_OAUTH_KEY_PREFIX};

/// A multimap of request parameters in OAuth's canonical order.
///
/// Keys and values are stored in their percent-encoded form. Iteration
/// follows the byte order of the encoded keys, and the values of a key
/// follow the byte order of their encoded form, which is exactly the
/// ordering required by the signature base string.
///
/// Lookups take the encoded key. For the reserved `oauth_*` names the
/// encoded and raw forms are identical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpParameters {
    wrapped: BTreeMap<String, BTreeSet<String>>,
}

impl HttpParameters {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a value that is already in canonical (encoded) form.
    pub fn put<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.wrapped
            .entry(key.into())
            .or_default()
            .insert(value.into());
    }

    /// Percent-encodes `key` and `value`, then adds them.
    pub fn put_encoded(&mut self, key: &str, value: &str) {
        self.put(percent_encode(key), percent_encode(value));
    }

    /// Adds decoded pairs; a `None` value is stored as the empty string.
    pub fn put_pairs<I>(&mut self, pairs: I, encode: bool)
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        for (key, value) in pairs {
            let value = value.unwrap_or_default();
            if encode {
                self.put_encoded(&key, &value);
            } else {
                self.put(key, value);
            }
        }
    }

    /// Merges every value of `other` into `self`.
    pub fn put_all(&mut self, other: &HttpParameters) {
        for (key, values) in &other.wrapped {
            self.wrapped
                .entry(key.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
    }

    pub fn get(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.wrapped.get(key)
    }

    /// Returns the lowest value stored for `key`, still encoded.
    pub fn get_first(&self, key: &str) -> Option<&str> {
        self.wrapped
            .get(key)
            .and_then(|values| values.iter().next())
            .map(String::as_str)
    }

    /// Returns the lowest value stored for `key`, percent-decoded.
    pub fn get_first_decoded(&self, key: &str) -> Option<String> {
        self.get_first(key).map(percent_decode)
    }

    /// Renders `key=v1&key=v2...` in value order, or `key=` when absent.
    pub fn as_query_string(&self, key: &str) -> String {
        match self.wrapped.get(key) {
            Some(values) if !values.is_empty() => values
                .iter()
                .map(|value| format!("{}={}", key, value))
                .collect::<Vec<_>>()
                .join("&"),
            _ => format!("{}=", key),
        }
    }

    /// Renders `key="value"` using the first value, if the key is present.
    pub fn as_header_element(&self, key: &str) -> Option<String> {
        self.get_first(key)
            .map(|value| format!("{}=\"{}\"", key, value))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.wrapped.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<BTreeSet<String>> {
        self.wrapped.remove(key)
    }

    /// Total number of values across all keys.
    pub fn len(&self) -> usize {
        self.wrapped.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.wrapped.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, BTreeSet<String>> {
        self.wrapped.iter()
    }

    /// Every `(key, value)` pair in canonical order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.wrapped
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |value| (key.as_str(), value.as_str())))
    }

    /// The subset of parameters whose keys start with `oauth_` or `x_oauth_`.
    pub fn oauth_parameters(&self) -> HttpParameters {
        let wrapped = self
            .wrapped
            .iter()
            .filter(|(key, _)| key.starts_with(OAUTH_KEY_PREFIX) || key.starts_with(X_OAUTH_KEY_PREFIX))
            .map(|(key, values)| (key.clone(), values.clone()))
            .collect();
        HttpParameters { wrapped }
    }

    /// Parses the elements of an `OAuth ...` Authorization header.
    ///
    /// Values are taken verbatim (header values are already encoded).
    /// Returns `None` when the header does not use the `OAuth` scheme.
    pub fn from_authorization_header(header: &str) -> Option<HttpParameters> {
        let header = header.trim_start();
        let (scheme, elements) = header.split_once(' ').unwrap_or((header, ""));
        if !scheme.eq_ignore_ascii_case("OAuth") {
            return None;
        }
        let mut params = HttpParameters::new();
        for element in split_unquoted(elements, ',') {
            let element = element.trim();
            if element.is_empty() {
                continue;
            }
            let (key, value) = element.split_once('=').unwrap_or((element, ""));
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            params.put(key.trim(), value);
        }
        Some(params)
    }
}

/// Splits on `separator` outside double-quoted sections.
fn split_unquoted(s: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (index, c) in s.char_indices() {
        if c == '"' {
            quoted = !quoted;
        } else if c == separator && !quoted {
            parts.push(&s[start..index]);
            start = index + c.len_utf8();
        }
    }
    parts.push(&s[start..]);
    parts
}

impl<'a> IntoIterator for &'a HttpParameters {
    type Item = (&'a String, &'a BTreeSet<String>);
    type IntoIter = btree_map::Iter<'a, String, BTreeSet<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.wrapped.iter()
    }
}
