//! Client settings resolved from the merged config.
//!
//! # Contract
//! - YAML stores the password's env var NAME (`notifications.password_env`),
//!   never the password itself.
//! - Callers resolve settings once at startup and pass the result into
//!   constructors; no `std::env::var` calls elsewhere.
//! - `Debug` redacts the password; errors name env vars, never values.
//!
//! ```yaml
//! notifications:
//!   url: "http://localhost:5680"
//!   username: "source-1"
//!   password_env: "NFY_PASSWORD"   # default
//!   client_name: "icinga-db"       # default "nfy"
//!   max_attempts: 3                # default 3, >= 1
//!   timeout_secs: 10               # optional
//! ```

use std::fmt;
use std::time::Duration;

use anyhow::{bail, Result};
use serde_json::Value;

pub const DEFAULT_PASSWORD_ENV: &str = "NFY_PASSWORD";
pub const DEFAULT_CLIENT_NAME: &str = "nfy";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Everything a notification client needs at construction time.
///
/// **The password is redacted in `Debug` output.**
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// API base URL of the notification service.
    pub url: String,
    pub username: String,
    pub password: String,
    /// Name of this source, sent in the `User-Agent`.
    pub client_name: String,
    /// Upper bound on submissions per event in the reconcile loop,
    /// counting the first one.
    pub max_attempts: u32,
    /// Deadline per submission, if any.
    pub timeout: Option<Duration>,
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("client_name", &self.client_name)
            .field("max_attempts", &self.max_attempts)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientSettings {
    /// Resolve settings from `config_json`, reading the password from the
    /// process environment.
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        Self::from_config_json_with_env(config_json, resolve_env)
    }

    /// Resolve settings with an explicit env lookup (`None` = unset).
    pub fn from_config_json_with_env<F>(config_json: &Value, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(url) = read_str_at(config_json, "/notifications/url") else {
            bail!("SETTINGS_MISSING: notifications.url is required");
        };
        let Some(username) = read_str_at(config_json, "/notifications/username") else {
            bail!("SETTINGS_MISSING: notifications.username is required");
        };

        let password_var = read_str_at(config_json, "/notifications/password_env")
            .unwrap_or_else(|| DEFAULT_PASSWORD_ENV.to_string());
        let Some(password) = env(&password_var).filter(|v| !v.trim().is_empty()) else {
            bail!(
                "SECRETS_MISSING: required env var '{}' (notifications password) \
                 is not set or empty",
                password_var
            );
        };

        let client_name = read_str_at(config_json, "/notifications/client_name")
            .unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string());

        let max_attempts = match config_json.pointer("/notifications/max_attempts") {
            None | Some(Value::Null) => DEFAULT_MAX_ATTEMPTS,
            Some(v) => match v.as_u64().and_then(|n| u32::try_from(n).ok()) {
                Some(n) if n >= 1 => n,
                _ => bail!(
                    "SETTINGS_INVALID: notifications.max_attempts must be an integer >= 1, got {}",
                    v
                ),
            },
        };

        let timeout = match config_json.pointer("/notifications/timeout_secs") {
            None | Some(Value::Null) => None,
            Some(v) => match v.as_u64() {
                Some(n) if n > 0 => Some(Duration::from_secs(n)),
                _ => bail!(
                    "SETTINGS_INVALID: notifications.timeout_secs must be a positive integer, got {}",
                    v
                ),
            },
        };

        Ok(Self {
            url,
            username,
            password,
            client_name,
            max_attempts,
            timeout,
        })
    }
}

/// Read a non-empty, trimmed string at `pointer`.
fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Never returns the value in an error path; callers report the NAME only.
fn resolve_env(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok()
}
