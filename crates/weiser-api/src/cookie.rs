//! Session-identifier cookie binding.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use time::OffsetDateTime;

use weiser_core::config::cookie::{CookieConfig, SameSitePolicy};

/// Issues, reads and expires the session cookie according to configuration.
#[derive(Debug, Clone)]
pub struct CookieBinder {
    config: CookieConfig,
}

impl CookieBinder {
    /// Creates a binder for the configured cookie attributes.
    pub fn new(config: CookieConfig) -> Self {
        Self { config }
    }

    /// Name of the session cookie.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Adds the session cookie carrying `id`, expiring with the session.
    pub fn set_cookie(&self, jar: CookieJar, id: &str, expires_at: DateTime<Utc>) -> CookieJar {
        let mut builder = Cookie::build((self.config.name.clone(), id.to_string()))
            .path(self.config.path.clone())
            .secure(self.config.secure)
            .http_only(self.config.http_only)
            .same_site(same_site(self.config.same_site));

        if let Some(domain) = &self.config.domain {
            builder = builder.domain(domain.clone());
        }
        if let Ok(expires) = OffsetDateTime::from_unix_timestamp(expires_at.timestamp()) {
            builder = builder.expires(expires);
        }

        jar.add(builder.build())
    }

    /// Reads the session id from the request cookies.
    ///
    /// An empty cookie value counts as no cookie.
    pub fn get_cookie(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.config.name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Tells the browser to drop the session cookie.
    ///
    /// The removal is sent even when the request carried no cookie, which
    /// covers a session started and cleared within one request.
    pub fn remove_cookie(&self, jar: CookieJar) -> CookieJar {
        let mut builder =
            Cookie::build((self.config.name.clone(), String::new())).path(self.config.path.clone());
        if let Some(domain) = &self.config.domain {
            builder = builder.domain(domain.clone());
        }
        let mut cookie = builder.build();
        cookie.make_removal();
        jar.add(cookie)
    }
}

fn same_site(policy: SameSitePolicy) -> SameSite {
    match policy {
        SameSitePolicy::Lax => SameSite::Lax,
        SameSitePolicy::Strict => SameSite::Strict,
        SameSitePolicy::None => SameSite::None,
    }
}
