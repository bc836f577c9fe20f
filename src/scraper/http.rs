// src/scraper/http.rs
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::debug;

use crate::errors::ScrapeError;

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

/// Final response after redirects.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub final_url: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The two request shapes the CMS needs. Implementations keep cookie state
/// between calls and follow redirects.
pub trait Transport {
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, ScrapeError>;

    fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, ScrapeError>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| ScrapeError::Network(e.to_string()))?;

        Ok(Self { client })
    }

    fn finish(resp: reqwest::blocking::Response) -> Result<HttpResponse, ScrapeError> {
        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let body = resp.text()?;
        debug!("HTTP {} {} ({} bytes)", status, final_url, body.len());
        Ok(HttpResponse { status, final_url, body })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, ScrapeError> {
        let resp = self.client.get(url).timeout(timeout).send()?;
        Self::finish(resp)
    }

    fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, ScrapeError> {
        let resp = self.client.post(url).form(form).timeout(timeout).send()?;
        Self::finish(resp)
    }
}

/// Logged-in connection to one site. Cookies live in the transport; the
/// session is owned by a single run and dropped with it.
pub struct Session {
    transport: Box<dyn Transport>,
    base_url: String,
}

impl Session {
    pub(crate) fn new(transport: Box<dyn Transport>, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn login_url(&self) -> String {
        format!("{}/wp-login.php", self.base_url)
    }

    pub fn admin_url(&self) -> String {
        format!("{}/wp-admin/", self.base_url)
    }

    pub fn ajax_url(&self) -> String {
        format!("{}/wp-admin/admin-ajax.php", self.base_url)
    }

    pub fn token_page_url(&self) -> String {
        format!("{}/wp-admin/admin.php?page=bookly-appointments", self.base_url)
    }

    pub fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, ScrapeError> {
        self.transport.get(url, timeout)
    }

    pub fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, ScrapeError> {
        self.transport.post_form(url, form, timeout)
    }
}

/// True when a response landed on the login screen instead of the admin.
pub fn is_login_page(resp: &HttpResponse) -> bool {
    resp.final_url.contains("wp-login.php")
}
