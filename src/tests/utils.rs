// src/tests/utils.rs
//
// In-memory stand-in for the CMS: scripted replies per route, every request
// recorded so tests can count and inspect them.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use crate::domain::{AppointmentStatus, CustomField, FilterMode};
use crate::errors::ScrapeError;
use crate::scraper::{HttpResponse, Transport};
use crate::settings::Settings;

pub const BASE: &str = "https://festival.example";

pub const LOGIN_FORM: &str = r#"<html><body class="login"><form name="loginform" action="wp-login.php" method="post">
<input type="text" name="log"><input type="password" name="pwd"><input type="submit" name="wp-submit" value="Log In">
</form></body></html>"#;

pub const DASHBOARD: &str = r#"<html><body class="wp-admin"><div id="wpadminbar"><ul><li id="wp-admin-bar-my-account">Howdy, admin</li></ul></div>
<h1>Dashboard</h1></body></html>"#;

pub const BAD_LOGIN: &str = r#"<html><body class="login"><div id="login_error"><strong>Error:</strong> The password you entered for the username <strong>admin</strong> is incorrect.</div>
<form name="loginform"><input type="password" name="pwd"></form></body></html>"#;

pub const TOKEN_PAGE: &str = r#"<html><body><div id="bookly-appointments">
<form><input type="hidden" name="csrf_token" value="9f8e7d6c5b4a39281706f5e4d3c2b1a0"></form></div></body></html>"#;

pub const TOKENLESS_PAGE: &str = r#"<html><body><div id="bookly-appointments"><table></table></div></body></html>"#;

#[derive(Debug, Clone)]
enum Reply {
    Page { status: u16, final_url: String, body: String },
    NetworkDown(String),
}

#[derive(Debug)]
struct Route {
    method: &'static str,
    url_part: String,
    form_part: Option<String>,
    replies: VecDeque<Reply>,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub form: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.form.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct FakeState {
    routes: Vec<Route>,
    requests: Vec<RecordedRequest>,
}

/// Clones share state, so a test keeps one handle after boxing another
/// into the session.
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Rc<RefCell<FakeState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: &'static str, url_part: &str, form_part: Option<&str>, reply: Reply) {
        let mut state = self.state.borrow_mut();
        let existing = state.routes.iter_mut().find(|r| {
            r.method == method && r.url_part == url_part && r.form_part.as_deref() == form_part
        });
        match existing {
            Some(route) => route.replies.push_back(reply),
            None => state.routes.push(Route {
                method,
                url_part: url_part.to_string(),
                form_part: form_part.map(str::to_string),
                replies: VecDeque::from([reply]),
            }),
        }
    }

    /// Queue a GET reply. The last queued reply for a route repeats forever.
    pub fn on_get(&self, url_part: &str, status: u16, final_url: &str, body: &str) -> &Self {
        self.push("GET", url_part, None, page(status, final_url, body));
        self
    }

    pub fn on_post(&self, url_part: &str, status: u16, final_url: &str, body: &str) -> &Self {
        self.push("POST", url_part, None, page(status, final_url, body));
        self
    }

    /// POST reply only for requests whose form has a value containing `form_part`.
    pub fn on_post_with(
        &self,
        url_part: &str,
        form_part: &str,
        status: u16,
        body: &str,
    ) -> &Self {
        let final_url = format!("{BASE}/{url_part}");
        self.push("POST", url_part, Some(form_part), page(status, &final_url, body));
        self
    }

    pub fn on_get_down(&self, url_part: &str, message: &str) -> &Self {
        self.push("GET", url_part, None, Reply::NetworkDown(message.to_string()));
        self
    }

    pub fn on_post_down(&self, url_part: &str, message: &str) -> &Self {
        self.push("POST", url_part, None, Reply::NetworkDown(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.borrow().requests.clone()
    }

    pub fn count(&self, method: &str, url_part: &str) -> usize {
        self.state
            .borrow()
            .requests
            .iter()
            .filter(|r| r.method == method && r.url.contains(url_part))
            .count()
    }

    fn respond(
        &self,
        method: &'static str,
        url: &str,
        form: &[(String, String)],
    ) -> Result<HttpResponse, ScrapeError> {
        let mut state = self.state.borrow_mut();
        state.requests.push(RecordedRequest {
            method,
            url: url.to_string(),
            form: form.to_vec(),
        });

        let route = state.routes.iter_mut().find(|r| {
            r.method == method
                && url.contains(&r.url_part)
                && r
                    .form_part
                    .as_ref()
                    .map_or(true, |part| form.iter().any(|(_, v)| v.contains(part.as_str())))
        });
        let reply = match route {
            Some(route) if route.replies.len() > 1 => route.replies.pop_front(),
            Some(route) => route.replies.front().cloned(),
            None => None,
        };

        match reply {
            Some(Reply::Page { status, final_url, body }) => Ok(HttpResponse { status, final_url, body }),
            Some(Reply::NetworkDown(message)) => Err(ScrapeError::Network(message)),
            None => Ok(HttpResponse {
                status: 404,
                final_url: url.to_string(),
                body: "Not Found".to_string(),
            }),
        }
    }
}

fn page(status: u16, final_url: &str, body: &str) -> Reply {
    Reply::Page {
        status,
        final_url: final_url.to_string(),
        body: body.to_string(),
    }
}

impl Transport for FakeTransport {
    fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse, ScrapeError> {
        self.respond("GET", url, &[])
    }

    fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        _timeout: Duration,
    ) -> Result<HttpResponse, ScrapeError> {
        self.respond("POST", url, form)
    }
}

/// A site whose login works and whose token page embeds a token. Export
/// replies are left to the test.
pub fn logged_in_site() -> FakeTransport {
    let fake = FakeTransport::new();
    fake.on_get("wp-login.php", 200, &format!("{BASE}/wp-login.php"), LOGIN_FORM)
        .on_post("wp-login.php", 200, &format!("{BASE}/wp-admin/"), DASHBOARD)
        .on_get(
            "page=bookly-appointments",
            200,
            &format!("{BASE}/wp-admin/admin.php?page=bookly-appointments"),
            TOKEN_PAGE,
        );
    fake
}

pub fn test_settings(base_url: &str) -> Settings {
    Settings {
        base_url: base_url.trim_end_matches('/').to_string(),
        username: "admin".to_string(),
        password: "correct horse".to_string(),
        date_range: None,
        statuses: AppointmentStatus::ALL.to_vec(),
        filter_mode: FilterMode::Server,
        output_path: PathBuf::from("Appointments.csv"),
        debug_dir: PathBuf::from("."),
        login_timeout: Duration::from_secs(30),
        request_timeout: Duration::from_secs(60),
        max_attempts: 3,
        custom_fields: CustomField::defaults(),
    }
}

/// Settings whose output and debug files land in `dir`.
pub fn settings_in(dir: &Path) -> Settings {
    let mut settings = test_settings(BASE);
    settings.output_path = dir.join("Appointments.csv");
    settings.debug_dir = dir.join("debug");
    settings
}
