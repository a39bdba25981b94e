//! Client settings shared by every network stage.

use std::path::PathBuf;
use std::time::Duration;

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default upper bound on how long an interactive login may wait for the user.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(600);

/// Tunables for a provisioning run.
#[derive(Clone, Debug)]
pub struct ClientSettings {
    /// Deadline applied to every HTTP request.
    pub request_timeout: Duration,
    /// Deadline for the whole interactive login, including user interaction.
    pub login_timeout: Duration,
    /// Explicit default-template location, tried before the search path.
    pub template: Option<PathBuf>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
            template: None,
        }
    }
}

impl ClientSettings {
    /// Load settings from environment variables, falling back to defaults.
    ///
    /// Optional:
    /// - `MESHKIT_REQUEST_TIMEOUT_SECS`
    /// - `MESHKIT_LOGIN_TIMEOUT_SECS`
    /// - `MESHKIT_TEMPLATE`
    ///
    /// Unparsable numbers are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(secs) = parse_secs(&lookup, "MESHKIT_REQUEST_TIMEOUT_SECS") {
            settings.request_timeout = secs;
        }
        if let Some(secs) = parse_secs(&lookup, "MESHKIT_LOGIN_TIMEOUT_SECS") {
            settings.login_timeout = secs;
        }
        settings.template = lookup("MESHKIT_TEMPLATE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        settings
    }

    /// Override the request timeout when `secs` is set.
    pub fn with_request_timeout(mut self, secs: Option<u64>) -> Self {
        if let Some(secs) = secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        self
    }

    /// Override the login timeout when `secs` is set.
    pub fn with_login_timeout(mut self, secs: Option<u64>) -> Self {
        if let Some(secs) = secs {
            self.login_timeout = Duration::from_secs(secs);
        }
        self
    }

    /// Override the template location when `path` is set.
    pub fn with_template(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.template = path;
        }
        self
    }
}

fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            tracing::warn!(key, value = %raw, "Ignoring invalid timeout");
            None
        }
    }
}
