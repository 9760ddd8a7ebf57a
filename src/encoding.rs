//! Percent-encoding and `application/x-www-form-urlencoded` helpers.
//!
//! OAuth uses RFC 3986 percent-encoding with a fixed unreserved set
//! (`A-Z a-z 0-9 - . _ ~`), uppercase hex digits and UTF-8 bytes.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// `application/x-www-form-urlencoded`
pub const FORM_ENCODED: &str = "application/x-www-form-urlencoded";

const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encodes every byte outside the OAuth unreserved set.
pub fn percent_encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

/// Decodes `%XX` escapes; `+` is read as a space, as in form bodies.
///
/// Malformed escapes are kept verbatim and invalid UTF-8 is replaced.
pub fn percent_decode(s: &str) -> String {
    if s.contains('+') {
        percent_decode_str(&s.replace('+', " "))
            .decode_utf8_lossy()
            .into_owned()
    } else {
        percent_decode_str(s).decode_utf8_lossy().into_owned()
    }
}

/// Joins percent-encoded `key=value` pairs with `&`, keeping input order.
pub fn form_encode<I, K, V>(pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k.as_ref()), percent_encode(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}

/// Splits a form body into decoded pairs in document order.
///
/// A segment without `=` yields a `None` value. Duplicates are kept and
/// empty segments (`a=1&&b=2`) are skipped.
pub fn decode_form(form: &str) -> Vec<(String, Option<String>)> {
    form.split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((name, value)) => (percent_decode(name), Some(percent_decode(value))),
            None => (percent_decode(segment), None),
        })
        .collect()
}

/// Appends percent-encoded pairs to `url`, starting with `?` or `&`.
pub fn add_query_parameters<K, V>(url: &str, pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if pairs.is_empty() {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, separator, form_encode(pairs.iter().map(|(k, v)| (k, v))))
}

/// Drops the query pairs whose decoded key is one of `keys`. Every other
/// pair and the fragment are kept verbatim.
pub fn remove_query_parameters(url: &str, keys: &[&str]) -> String {
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };
    let (path, query) = match base.split_once('?') {
        Some(split) => split,
        None => return url.to_string(),
    };
    let kept = query
        .split('&')
        .filter(|segment| {
            let key = segment.split_once('=').map_or(*segment, |(key, _)| key);
            !segment.is_empty() && !keys.contains(&percent_decode(key).as_str())
        })
        .collect::<Vec<_>>();

    let mut stripped = path.to_string();
    if !kept.is_empty() {
        stripped.push('?');
        stripped.push_str(&kept.join("&"));
    }
    if let Some(fragment) = fragment {
        stripped.push('#');
        stripped.push_str(fragment);
    }
    stripped
}

/// Whether a `Content-Type` value denotes a form-encoded body.
///
/// Media type parameters such as `; charset=UTF-8` are ignored.
pub fn is_form_encoded(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default();
    essence.trim().eq_ignore_ascii_case(FORM_ENCODED)
}
