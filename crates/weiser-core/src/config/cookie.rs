//! Session cookie configuration.

use serde::{Deserialize, Serialize};

/// Attributes of the session-identifier cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    /// Cookie name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Cookie path.
    #[serde(default = "default_path")]
    pub path: String,
    /// Cookie domain; host-only when unset.
    #[serde(default)]
    pub domain: Option<String>,
    /// Send only over HTTPS.
    #[serde(default = "default_true")]
    pub secure: bool,
    /// Hide from client-side scripts.
    #[serde(default = "default_true")]
    pub http_only: bool,
    /// SameSite policy.
    #[serde(default)]
    pub same_site: SameSitePolicy,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            path: default_path(),
            domain: None,
            secure: true,
            http_only: true,
            same_site: SameSitePolicy::default(),
        }
    }
}

/// SameSite attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameSitePolicy {
    /// `SameSite=Lax`.
    #[default]
    Lax,
    /// `SameSite=Strict`.
    Strict,
    /// `SameSite=None`.
    None,
}

fn default_name() -> String {
    "weiser_session".to_string()
}

fn default_path() -> String {
    "/".to_string()
}

fn default_true() -> bool {
    true
}
