//! Language negotiation.
//!
//! A request names its language with the raw query string (`/?fr`) or,
//! failing that, with the `lang` cookie. A choice made through the query is
//! remembered in the cookie.

use axum::http::header::{COOKIE, REFERER};
use axum::http::{HeaderMap, HeaderValue};

use crate::Languages;

/// Cookie remembering the chosen language.
pub(crate) const COOKIE_NAME: &str = "lang";

/// Path of the language-select page.
pub(crate) const CHANGE_LANGUAGE_PATH: &str = "/changelang";

/// Requested language: the raw query string, else the `lang` cookie.
pub(crate) fn requested(query: Option<&str>, headers: &HeaderMap) -> String {
    match query {
        Some(query) if !query.is_empty() => query.to_owned(),
        _ => cookie(headers).unwrap_or_default().to_owned(),
    }
}

/// Language used to filter content: empty (no filter) unless the site is
/// multilingual.
pub(crate) fn for_request(languages: &Languages, query: Option<&str>, headers: &HeaderMap) -> String {
    if languages.multilingual {
        requested(query, headers)
    } else {
        String::new()
    }
}

/// Whether `requested` names one of the available languages.
///
/// The request matches when it contains a language code, so `?fr` and
/// `?lang=fr` both select `fr`.
pub(crate) fn is_available(requested: &str, available: &[String]) -> bool {
    available
        .iter()
        .any(|code| !code.is_empty() && requested.contains(code.as_str()))
}

/// `Set-Cookie` value to send, if any.
///
/// The cookie is set when the query names a language and either no cookie
/// exists yet or the user comes from the language-select page.
pub(crate) fn cookie_to_set(query: Option<&str>, headers: &HeaderMap) -> Option<HeaderValue> {
    let query = query.filter(|query| !query.is_empty())?;
    let from_select = headers
        .get(REFERER)
        .and_then(|referer| referer.to_str().ok())
        .is_some_and(|referer| referer.ends_with(CHANGE_LANGUAGE_PATH));

    if cookie(headers).is_some() && !from_select {
        return None;
    }
    HeaderValue::from_str(&format!("{COOKIE_NAME}={query}; Path=/")).ok()
}

/// Where the language-select page sends the user back to.
pub(crate) fn redirect_target(path: &str) -> &str {
    if path == CHANGE_LANGUAGE_PATH { "/" } else { path }
}

fn cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == COOKIE_NAME)
        .map(|(_, value)| value)
}
