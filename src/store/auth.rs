use super::AuthProvider;

/// Environment variable [`EnvAuth`] reads the session token from.
pub const SESSION_ENV: &str = "RICHDOC_SESSION";

/// A fixed answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticAuth(pub bool);

impl AuthProvider for StaticAuth {
    fn has_session(&self) -> bool {
        self.0
    }
}

/// Signed in when the session variable holds a non-blank value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvAuth {
    var: String,
}

impl EnvAuth {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    fn token_present(value: Option<&str>) -> bool {
        value.is_some_and(|v| !v.trim().is_empty())
    }
}

impl Default for EnvAuth {
    fn default() -> Self {
        Self::new(SESSION_ENV)
    }
}

impl AuthProvider for EnvAuth {
    fn has_session(&self) -> bool {
        Self::token_present(std::env::var(&self.var).ok().as_deref())
    }
}
