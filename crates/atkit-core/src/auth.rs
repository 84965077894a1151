//! Authentication state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Authentication state of a facade instance
///
/// Only login, logout and resume move between states. A failed attempt never
/// leaves the state at `LoggingIn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthState {
    #[default]
    LoggedOut,
    LoggingIn,
    LoggedIn,
    LoggingOut,
}

impl AuthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoggedOut => "logged-out",
            Self::LoggingIn => "logging-in",
            Self::LoggedIn => "logged-in",
            Self::LoggingOut => "logging-out",
        }
    }

    pub fn is_logged_in(&self) -> bool {
        *self == Self::LoggedIn
    }

    /// Login or logout in flight
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::LoggingIn | Self::LoggingOut)
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
