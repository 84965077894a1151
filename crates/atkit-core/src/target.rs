//! Argument unions for overloaded operations
//!
//! Like, repost, follow and their deletions accept either bare identifiers or
//! a full view. Each union converts from both shapes, and `from_value`
//! resolves an untyped JSON argument, failing with
//! [`AtkitError::InvalidArguments`] when it matches neither.

use crate::error::{AtkitError, Result};
use atkit_client::{PostView, ProfileView};
use serde_json::Value;

const POST_TARGET_SHAPES: &str = "(string, string) or (PostView)";
const RECORD_TARGET_SHAPES: &str = "(string) or (PostView)";
const ACTOR_TARGET_SHAPES: &str = "(string) or (ProfileViewDetailed)";

fn non_empty(method: &'static str, expected: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(AtkitError::invalid(method, expected));
    }
    Ok(())
}

fn as_post(value: Value) -> Option<PostView> {
    value
        .is_object()
        .then(|| serde_json::from_value::<PostView>(value).ok())
        .flatten()
}

fn as_profile(value: Value) -> Option<ProfileView> {
    value
        .is_object()
        .then(|| serde_json::from_value::<ProfileView>(value).ok())
        .flatten()
}

/// Post to like or repost: a `(uri, cid)` pair or a post view
#[derive(Debug, Clone, PartialEq)]
pub enum PostTarget {
    Ref { uri: String, cid: String },
    Post(PostView),
}

impl PostTarget {
    pub fn uri(&self) -> &str {
        match self {
            PostTarget::Ref { uri, .. } => uri,
            PostTarget::Post(post) => &post.uri,
        }
    }

    pub fn cid(&self) -> &str {
        match self {
            PostTarget::Ref { cid, .. } => cid,
            PostTarget::Post(post) => &post.cid,
        }
    }

    pub(crate) fn validate(&self, method: &'static str) -> Result<()> {
        non_empty(method, POST_TARGET_SHAPES, self.uri())?;
        non_empty(method, POST_TARGET_SHAPES, self.cid())
    }

    /// Resolve `["uri", "cid"]` or a post view object
    pub fn from_value(method: &'static str, value: Value) -> Result<Self> {
        if let Value::Array(ref items) = value {
            if let [Value::String(uri), Value::String(cid)] = items.as_slice() {
                return Ok(PostTarget::Ref {
                    uri: uri.clone(),
                    cid: cid.clone(),
                });
            }
        }

        as_post(value)
            .map(PostTarget::Post)
            .ok_or_else(|| AtkitError::invalid(method, POST_TARGET_SHAPES))
    }
}

impl<U: Into<String>, C: Into<String>> From<(U, C)> for PostTarget {
    fn from((uri, cid): (U, C)) -> Self {
        PostTarget::Ref {
            uri: uri.into(),
            cid: cid.into(),
        }
    }
}

impl From<PostView> for PostTarget {
    fn from(post: PostView) -> Self {
        PostTarget::Post(post)
    }
}

impl From<&PostView> for PostTarget {
    fn from(post: &PostView) -> Self {
        PostTarget::Post(post.clone())
    }
}

/// Like or repost to delete: the record URI or the post view carrying it
#[derive(Debug, Clone, PartialEq)]
pub enum RecordTarget {
    Record(String),
    Post(PostView),
}

impl RecordTarget {
    pub(crate) fn validate(&self, method: &'static str) -> Result<()> {
        match self {
            RecordTarget::Record(uri) => non_empty(method, RECORD_TARGET_SHAPES, uri),
            RecordTarget::Post(post) => non_empty(method, RECORD_TARGET_SHAPES, &post.uri),
        }
    }

    /// Resolve a record URI string or a post view object
    pub fn from_value(method: &'static str, value: Value) -> Result<Self> {
        if let Value::String(uri) = value {
            return Ok(RecordTarget::Record(uri));
        }

        as_post(value)
            .map(RecordTarget::Post)
            .ok_or_else(|| AtkitError::invalid(method, RECORD_TARGET_SHAPES))
    }
}

impl From<&str> for RecordTarget {
    fn from(uri: &str) -> Self {
        RecordTarget::Record(uri.to_string())
    }
}

impl From<String> for RecordTarget {
    fn from(uri: String) -> Self {
        RecordTarget::Record(uri)
    }
}

impl From<PostView> for RecordTarget {
    fn from(post: PostView) -> Self {
        RecordTarget::Post(post)
    }
}

impl From<&PostView> for RecordTarget {
    fn from(post: &PostView) -> Self {
        RecordTarget::Post(post.clone())
    }
}

/// Actor to follow, mute or unmute: a DID or a profile view
#[derive(Debug, Clone, PartialEq)]
pub enum ActorTarget {
    Did(String),
    Profile(ProfileView),
}

impl ActorTarget {
    pub fn did(&self) -> &str {
        match self {
            ActorTarget::Did(did) => did,
            ActorTarget::Profile(profile) => &profile.did,
        }
    }

    pub(crate) fn validate(&self, method: &'static str) -> Result<()> {
        non_empty(method, ACTOR_TARGET_SHAPES, self.did())
    }

    /// Resolve a DID string or a profile view object
    pub fn from_value(method: &'static str, value: Value) -> Result<Self> {
        if let Value::String(did) = value {
            return Ok(ActorTarget::Did(did));
        }

        as_profile(value)
            .map(ActorTarget::Profile)
            .ok_or_else(|| AtkitError::invalid(method, ACTOR_TARGET_SHAPES))
    }
}

impl From<&str> for ActorTarget {
    fn from(did: &str) -> Self {
        ActorTarget::Did(did.to_string())
    }
}

impl From<String> for ActorTarget {
    fn from(did: String) -> Self {
        ActorTarget::Did(did)
    }
}

impl From<ProfileView> for ActorTarget {
    fn from(profile: ProfileView) -> Self {
        ActorTarget::Profile(profile)
    }
}

impl From<&ProfileView> for ActorTarget {
    fn from(profile: &ProfileView) -> Self {
        ActorTarget::Profile(profile.clone())
    }
}

/// Follow to delete: the follow record URI or the followed profile view
#[derive(Debug, Clone, PartialEq)]
pub enum FollowTarget {
    Record(String),
    Profile(ProfileView),
}

impl FollowTarget {
    pub(crate) fn validate(&self, method: &'static str) -> Result<()> {
        match self {
            FollowTarget::Record(uri) => non_empty(method, ACTOR_TARGET_SHAPES, uri),
            FollowTarget::Profile(profile) => non_empty(method, ACTOR_TARGET_SHAPES, &profile.did),
        }
    }

    /// Resolve a follow record URI string or a profile view object
    pub fn from_value(method: &'static str, value: Value) -> Result<Self> {
        if let Value::String(uri) = value {
            return Ok(FollowTarget::Record(uri));
        }

        as_profile(value)
            .map(FollowTarget::Profile)
            .ok_or_else(|| AtkitError::invalid(method, ACTOR_TARGET_SHAPES))
    }
}

impl From<&str> for FollowTarget {
    fn from(uri: &str) -> Self {
        FollowTarget::Record(uri.to_string())
    }
}

impl From<String> for FollowTarget {
    fn from(uri: String) -> Self {
        FollowTarget::Record(uri)
    }
}

impl From<ProfileView> for FollowTarget {
    fn from(profile: ProfileView) -> Self {
        FollowTarget::Profile(profile)
    }
}

impl From<&ProfileView> for FollowTarget {
    fn from(profile: &ProfileView) -> Self {
        FollowTarget::Profile(profile.clone())
    }
}
