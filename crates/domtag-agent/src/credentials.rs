//! Credential placeholder substitution.
//!
//! Planner-generated text never contains real secrets. Instead the planner
//! writes the literal tokens `!USERNAME!` or `!PASSWORD!` and the action
//! layer swaps in the configured value right before filling the field.
//! Resolved values are never echoed back in result messages or logs.

use crate::error::{Error, Result};

/// Token a planner uses in place of the configured username.
pub const USERNAME_PLACEHOLDER: &str = "!USERNAME!";
/// Token a planner uses in place of the configured password.
pub const PASSWORD_PLACEHOLDER: &str = "!PASSWORD!";

/// Supplies credential values to the action layer.
///
/// Implementations decide where secrets live. Nothing in this crate stores
/// them beyond the duration of a single fill.
pub trait CredentialSource: Send + Sync {
    fn username(&self) -> Option<String>;
    fn password(&self) -> Option<String>;
}

/// Reads credentials from `DOMTAG_USERNAME` / `DOMTAG_PASSWORD` at the
/// moment of use, so values set after startup are still picked up.
#[derive(Debug, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn username(&self) -> Option<String> {
        std::env::var("DOMTAG_USERNAME").ok()
    }

    fn password(&self) -> Option<String> {
        std::env::var("DOMTAG_PASSWORD").ok()
    }
}

/// Fixed credentials, mainly for embedding and tests.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    username: Option<String>,
    password: Option<String>,
}

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// A source with nothing configured. Any placeholder fails to resolve.
    pub fn empty() -> Self {
        Self {
            username: None,
            password: None,
        }
    }
}

impl CredentialSource for StaticCredentials {
    fn username(&self) -> Option<String> {
        self.username.clone()
    }

    fn password(&self) -> Option<String> {
        self.password.clone()
    }
}

/// Resolve a planner-provided string into the text that actually gets typed.
///
/// Only an exact placeholder match substitutes; anything else passes through
/// verbatim, including strings that merely contain a placeholder. An exact
/// match with no configured value is an error rather than a silent empty
/// fill, so a missing secret surfaces at the call site instead of as a
/// mysteriously blank login field.
pub fn resolve(content: &str, source: &dyn CredentialSource) -> Result<String> {
    match content {
        USERNAME_PLACEHOLDER => source
            .username()
            .ok_or(Error::CredentialUnavailable(USERNAME_PLACEHOLDER)),
        PASSWORD_PLACEHOLDER => source
            .password()
            .ok_or(Error::CredentialUnavailable(PASSWORD_PLACEHOLDER)),
        other => Ok(other.to_string()),
    }
}
