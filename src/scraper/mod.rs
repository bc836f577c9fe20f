mod auth;
mod export;
mod http;
mod models;
mod retry;
mod token;

pub use auth::login;
pub use export::{plan_windows, ExportFetcher};
pub use http::{ReqwestTransport, Transport};
pub use models::RawExportPayload;
pub use retry::RetryPolicy;
pub use token::locate_token;

#[cfg(test)]
pub use http::{HttpResponse, Session};
#[cfg(test)]
pub use models::{CsrfToken, DateFilter, ExportWindow};
