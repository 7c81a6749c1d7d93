//! Bot-token loading.
//!
//! The platform authentication token is read once at startup from the
//! environment. The value zeroizes on drop and is redacted in `Debug`
//! output; the store never logs it.

use std::fmt;

use zeroize::Zeroize;

use crate::ChatError;

/// Environment variable the token is read from.
pub const TOKEN_ENV: &str = "BREACHHOUND_TOKEN";

/// The platform authentication token.
pub struct BotToken {
    inner: String,
}

impl BotToken {
    /// Read the token from [`TOKEN_ENV`]. A missing or empty value is a
    /// fatal startup error.
    pub fn from_env() -> Result<Self, ChatError> {
        match std::env::var(TOKEN_ENV) {
            Ok(value) if !value.is_empty() => Ok(Self { inner: value }),
            _ => Err(ChatError::MissingToken),
        }
    }

    /// Construct a token from an explicit value (for tests).
    pub fn from_value(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Get the token value.
    ///
    /// Use sparingly; only the platform authentication call needs it.
    pub fn expose(&self) -> &str {
        &self.inner
    }
}

impl fmt::Debug for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotToken")
            .field("inner", &"[REDACTED]")
            .field("len", &self.inner.len())
            .finish()
    }
}

impl Drop for BotToken {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}
