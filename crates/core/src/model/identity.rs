use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Longest login the hosting service accepts.
const MAX_LOGIN_LEN: usize = 39;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdentityError {
    #[error("username is empty")]
    Empty,
    #[error("username is longer than {MAX_LOGIN_LEN} characters")]
    TooLong,
    #[error("username contains an invalid character: {0:?}")]
    InvalidCharacter(char),
}

/// Self-asserted account login. Only checked for shape here; existence is
/// confirmed remotely at sign-in.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Trim and validate a raw username.
    ///
    /// Logins are ASCII alphanumerics and hyphens; anything else would also
    /// leak into search query strings.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if the login is empty, too long, or has an
    /// invalid character.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let login = raw.trim();
        if login.is_empty() {
            return Err(IdentityError::Empty);
        }
        if login.len() > MAX_LOGIN_LEN {
            return Err(IdentityError::TooLong);
        }
        if let Some(bad) = login
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-'))
        {
            return Err(IdentityError::InvalidCharacter(bad));
        }
        Ok(Self(login.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Logins are case-insensitive on the hosting service.
    #[must_use]
    pub fn matches(&self, login: &str) -> bool {
        self.0.eq_ignore_ascii_case(login)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
