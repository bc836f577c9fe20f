// src/scraper/token.rs
//
// The appointments admin page embeds the export's anti-forgery value in one
// of: a hidden <input name=...>, a <meta name=... content=...>, or an inline
// script assignment such as `"csrf_token":"abc123"`.

use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{info, warn};

use crate::errors::ScrapeError;
use crate::scraper::http::{is_login_page, Session};
use crate::scraper::models::CsrfToken;

const TOKEN_NAMES: &[&str] = &["csrf_token", "_wpnonce", "bookly_csrf_token", "_token", "nonce"];

const SCRIPT_KEYS: &[&str] = &["csrf_token", "csrfToken", "csrf-token"];

/// Fetch the token page and pull the token out of it. A page without a token
/// yields `CsrfToken::absent()`.
pub fn locate_token(session: &Session, timeout: Duration) -> Result<CsrfToken, ScrapeError> {
    let url = session.token_page_url();
    info!("Looking for CSRF token on {url}");

    let resp = session
        .get(&url, timeout)
        .map_err(|e| ScrapeError::TokenNotFound(format!("{url}: {e}")))?;

    if is_login_page(&resp) {
        return Err(ScrapeError::Authentication(
            "token page redirected to the login screen".into(),
        ));
    }
    if !resp.is_success() {
        return Err(ScrapeError::TokenNotFound(format!(
            "{url} returned HTTP {}",
            resp.status
        )));
    }

    match extract_token(&resp.body) {
        Some(value) => {
            let token = CsrfToken::new(value);
            info!("Found CSRF token: {}...", token.preview());
            Ok(token)
        }
        None => {
            warn!("No CSRF token on the page, exporting without one");
            Ok(CsrfToken::absent())
        }
    }
}

pub fn extract_token(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);

    for name in TOKEN_NAMES {
        if let Some(v) = first_attr(&doc, &format!(r#"input[name="{name}"]"#), "value") {
            return Some(v);
        }
        if let Some(v) = first_attr(&doc, &format!(r#"meta[name="{name}"]"#), "content") {
            return Some(v);
        }
    }

    // Any other nonce-like hidden field.
    if let Ok(sel) = Selector::parse("input[name]") {
        let nonce = doc.select(&sel).find_map(|el| {
            let name = el.value().attr("name")?.to_ascii_lowercase();
            let value = el.value().attr("value")?.trim();
            (name.contains("nonce") && !value.is_empty()).then(|| value.to_string())
        });
        if nonce.is_some() {
            return nonce;
        }
    }

    let sel = Selector::parse("script").ok()?;
    doc.select(&sel)
        .map(|el| el.text().collect::<String>())
        .find_map(|js| script_token(&js))
}

fn first_attr(doc: &Html, selector: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Find `key: "value"` / `"key":"value"` / `key = 'value'` in script text.
fn script_token(js: &str) -> Option<String> {
    for key in SCRIPT_KEYS {
        let mut rest = js;
        while let Some(pos) = rest.find(key) {
            rest = &rest[pos + key.len()..];
            if let Some(value) = quoted_value_after(rest) {
                return Some(value);
            }
        }
    }
    None
}

fn quoted_value_after(s: &str) -> Option<String> {
    let s = s.strip_prefix(['"', '\'']).unwrap_or(s).trim_start();
    let s = s.strip_prefix([':', '='])?.trim_start();
    let quote = s.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &s[1..];
    let end = body.find(quote)?;
    let value = body[..end].trim();
    (!value.is_empty()).then(|| value.to_string())
}
