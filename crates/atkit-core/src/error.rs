//! Error types for the atkit facade

use atkit_client::AgentError;
use thiserror::Error;

/// Result type for facade operations
pub type Result<T> = std::result::Result<T, AtkitError>;

/// Facade error types
#[derive(Error, Debug)]
pub enum AtkitError {
    /// Remote call rejected by the agent, passed through unchanged
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Argument matched none of the accepted call shapes
    #[error("AtkitBsky#{method}: arguments should be {expected}")]
    InvalidArguments {
        method: &'static str,
        expected: &'static str,
    },

    /// deleteLike on a post the viewer has not liked
    #[error("AtkitBsky#deleteLike: post has no like: {0}")]
    NoLike(String),

    /// deleteRepost on a post the viewer has not reposted
    #[error("AtkitBsky#deleteRepost: post has no repost: {0}")]
    NoRepost(String),

    /// deleteFollow on a profile the viewer does not follow
    #[error("AtkitBsky#deleteFollow: profile is not following: {0}")]
    NotFollowing(String),
}

impl AtkitError {
    pub(crate) fn invalid(method: &'static str, expected: &'static str) -> Self {
        AtkitError::InvalidArguments { method, expected }
    }

    /// Whether the error came from the remote side
    pub fn is_remote(&self) -> bool {
        matches!(self, AtkitError::Agent(_))
    }
}
