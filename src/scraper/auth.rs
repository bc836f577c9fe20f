// src/scraper/auth.rs
use scraper::{Html, Selector};
use tracing::{info, warn};

use crate::errors::ScrapeError;
use crate::scraper::http::{HttpResponse, Session, Transport};
use crate::scraper::retry::RetryPolicy;
use crate::settings::Settings;

// Markup only rendered for a logged-in user.
const ADMIN_MARKERS: &[&str] = &["wp-admin-bar", "adminmenu", "dashboard", "howdy"];

#[derive(Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    Accepted,
    Rejected(String),
    Unrecognized,
}

/// Log into the CMS and hand back the session that carries its cookies.
pub fn login(
    transport: Box<dyn Transport>,
    settings: &Settings,
    retry: &RetryPolicy,
) -> Result<Session, ScrapeError> {
    let session = Session::new(transport, &settings.base_url);
    let login_url = session.login_url();
    info!("Logging into {} as {}", session.base_url(), settings.username);

    let form = login_form(&session, settings);
    let resp = retry.run("login", |_| {
        // The GET plants the test cookie the login handler insists on.
        let page = session.get(&login_url, settings.login_timeout)?;
        transient_failure(&page)?;
        let resp = session.post_form(&login_url, &form, settings.login_timeout)?;
        transient_failure(&resp)?;
        Ok(resp)
    })?;

    match classify_login(&resp)? {
        LoginOutcome::Accepted => {
            info!("Login successful");
            Ok(session)
        }
        LoginOutcome::Rejected(reason) => {
            warn!("Login rejected: {reason}");
            Err(ScrapeError::Authentication(reason))
        }
        LoginOutcome::Unrecognized => Err(ScrapeError::Authentication(format!(
            "unrecognized login response from {}",
            resp.final_url
        ))),
    }
}

fn login_form(session: &Session, settings: &Settings) -> Vec<(String, String)> {
    [
        ("log", settings.username.clone()),
        ("pwd", settings.password.clone()),
        ("rememberme", "forever".to_string()),
        ("wp-submit", "Log In".to_string()),
        ("redirect_to", session.admin_url()),
        ("testcookie", "1".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

// A 5xx from the login endpoint is the server's problem, not the
// credentials', and is retried like any network failure.
fn transient_failure(resp: &HttpResponse) -> Result<(), ScrapeError> {
    if resp.status >= 500 {
        return Err(ScrapeError::Network(format!(
            "login endpoint returned HTTP {}",
            resp.status
        )));
    }
    Ok(())
}

/// Decide whether the page reached after posting credentials is the admin.
pub fn classify_login(resp: &HttpResponse) -> Result<LoginOutcome, ScrapeError> {
    transient_failure(resp)?;
    if !resp.is_success() {
        return Err(ScrapeError::Authentication(format!(
            "login endpoint returned HTTP {}",
            resp.status
        )));
    }

    let body = resp.body.to_lowercase();
    if body.contains("id=\"login_error\"") || body.contains("id='login_error'") {
        return Ok(LoginOutcome::Rejected(login_error_text(&resp.body)));
    }
    if resp.final_url.contains("/wp-admin") && !resp.final_url.contains("wp-login.php") {
        return Ok(LoginOutcome::Accepted);
    }
    if body.contains("name=\"pwd\"") {
        return Ok(LoginOutcome::Rejected("login form shown again".to_string()));
    }
    if ADMIN_MARKERS.iter().any(|m| body.contains(m)) {
        return Ok(LoginOutcome::Accepted);
    }
    Ok(LoginOutcome::Unrecognized)
}

fn login_error_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let text = Selector::parse("#login_error")
        .ok()
        .and_then(|sel| doc.select(&sel).next())
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();

    if text.is_empty() {
        "credentials rejected".to_string()
    } else {
        text
    }
}
