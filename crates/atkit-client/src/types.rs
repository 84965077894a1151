//! Types for the Bluesky XRPC API
//!
//! Views mirror the `app.bsky.*` lexicons. Fields the server may omit are
//! `Option`s, and unknown fields are kept in `extra` so that a view survives
//! a round trip through the cache unchanged.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

// ============================================================================
// Configuration
// ============================================================================

/// Agent connection options
#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// Service endpoint (PDS or entryway), e.g. "https://bsky.social"
    pub service: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Optional User-Agent header
    pub user_agent: Option<String>,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            service: "https://bsky.social".to_string(),
            timeout_secs: 30,
            user_agent: None,
        }
    }
}

impl AgentOptions {
    /// Options for the given service with default timeout
    pub fn service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Default::default()
        }
    }

    /// Create options from environment variables
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(val) = std::env::var("ATKIT_SERVICE") {
            if !val.is_empty() {
                options.service = val;
            }
        }

        if let Ok(val) = std::env::var("ATKIT_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                options.timeout_secs = secs;
            }
        }

        options
    }
}

/// Per-call options forwarded to the transport unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallOptions {
    /// Extra request headers
    pub headers: BTreeMap<String, String>,
    /// Per-request timeout, overriding the agent default
    pub timeout: Option<Duration>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// ============================================================================
// Session
// ============================================================================

/// Login parameters for com.atproto.server.createSession
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginParams {
    /// Handle, DID or email
    pub identifier: String,
    pub password: String,
}

impl LoginParams {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            password: password.into(),
        }
    }
}

/// Session data returned by login and accepted by resume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtpSessionData {
    pub did: String,
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub access_jwt: String,
    pub refresh_jwt: String,
}

// ============================================================================
// Views
// ============================================================================

/// Viewer-relative state on a profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileViewerState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<bool>,
    /// URI of the viewer's block record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking: Option<String>,
    /// URI of the viewer's follow record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following: Option<String>,
    /// URI of the subject's follow record for the viewer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followed_by: Option<String>,
}

/// Profile view (basic, standard or detailed)
///
/// All three lexicon shapes deserialize into this type; the counters are only
/// present on detailed views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub did: String,
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follows_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posts_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer: Option<ProfileViewerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<serde_json::Value>>,
    /// Fields not modelled above
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProfileView {
    pub fn new(did: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            did: did.into(),
            handle: handle.into(),
            ..Default::default()
        }
    }
}

/// Viewer-relative state on a post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostViewerState {
    /// URI of the viewer's repost record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repost: Option<String>,
    /// URI of the viewer's like record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like: Option<String>,
}

/// Hydrated post view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub uri: String,
    pub cid: String,
    pub author: ProfileView,
    /// Raw app.bsky.feed.post record
    #[serde(default)]
    pub record: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repost_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
    #[serde(default)]
    pub indexed_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer: Option<PostViewerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<serde_json::Value>>,
    /// Fields not modelled above
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PostView {
    pub fn new(uri: impl Into<String>, cid: impl Into<String>, author: ProfileView) -> Self {
        Self {
            uri: uri.into(),
            cid: cid.into(),
            author,
            ..Default::default()
        }
    }

    /// Text of the underlying post record, if any
    pub fn text(&self) -> Option<&str> {
        self.record.get("text").and_then(|t| t.as_str())
    }

    /// URI of the viewer's like record
    pub fn viewer_like(&self) -> Option<&str> {
        self.viewer.as_ref().and_then(|v| v.like.as_deref())
    }

    /// URI of the viewer's repost record
    pub fn viewer_repost(&self) -> Option<&str> {
        self.viewer.as_ref().and_then(|v| v.repost.as_deref())
    }
}

/// Root and parent of a reply in a feed item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyRef {
    pub root: ReplyNode,
    pub parent: ReplyNode,
}

/// Union member of a reply root or parent; deleted and blocked posts
/// come back as placeholders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum ReplyNode {
    #[serde(rename = "app.bsky.feed.defs#postView")]
    Post(PostView),
    #[serde(rename = "app.bsky.feed.defs#notFoundPost")]
    NotFound {
        uri: String,
        #[serde(rename = "notFound", default)]
        not_found: bool,
    },
    #[serde(rename = "app.bsky.feed.defs#blockedPost")]
    Blocked {
        uri: String,
        #[serde(default)]
        blocked: bool,
    },
}

impl ReplyNode {
    /// The post view, if this member is one
    pub fn as_post(&self) -> Option<&PostView> {
        match self {
            ReplyNode::Post(post) => Some(post),
            _ => None,
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            ReplyNode::Post(post) => &post.uri,
            ReplyNode::NotFound { uri, .. } | ReplyNode::Blocked { uri, .. } => uri,
        }
    }
}

impl From<PostView> for ReplyNode {
    fn from(post: PostView) -> Self {
        ReplyNode::Post(post)
    }
}

/// Item of a timeline or author feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedViewPost {
    pub post: PostView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<serde_json::Value>,
}

impl FeedViewPost {
    pub fn new(post: PostView) -> Self {
        Self {
            post,
            reply: None,
            reason: None,
        }
    }
}

/// Post with its surrounding thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadViewPost {
    pub post: PostView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<ThreadNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<ThreadNode>>,
}

/// Union member of a thread position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum ThreadNode {
    #[serde(rename = "app.bsky.feed.defs#threadViewPost")]
    Post(ThreadViewPost),
    #[serde(rename = "app.bsky.feed.defs#notFoundPost")]
    NotFound {
        uri: String,
        #[serde(rename = "notFound", default)]
        not_found: bool,
    },
    #[serde(rename = "app.bsky.feed.defs#blockedPost")]
    Blocked {
        uri: String,
        #[serde(default)]
        blocked: bool,
    },
}

/// Like of a post, as returned by getLikes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    #[serde(default)]
    pub indexed_at: String,
    #[serde(default)]
    pub created_at: String,
    pub actor: ProfileView,
}

/// Strong reference returned when a record is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub uri: String,
    pub cid: String,
}

// ============================================================================
// Records
// ============================================================================

/// New app.bsky.feed.post record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub text: String,
    /// RFC 3339 timestamp, filled in by the agent when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<PostReplyRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facets: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub langs: Option<Vec<String>>,
}

impl PostRecord {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Reply references inside a post record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostReplyRef {
    pub root: RecordRef,
    pub parent: RecordRef,
}

/// app.bsky.actor.profile record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Options for com.atproto.repo.uploadBlob
#[derive(Debug, Clone, PartialEq)]
pub struct UploadBlobOptions {
    /// MIME type of the payload
    pub encoding: String,
    pub call: CallOptions,
}

impl Default for UploadBlobOptions {
    fn default() -> Self {
        Self {
            encoding: "application/octet-stream".to_string(),
            call: CallOptions::default(),
        }
    }
}

impl UploadBlobOptions {
    pub fn new(encoding: impl Into<String>) -> Self {
        Self {
            encoding: encoding.into(),
            call: CallOptions::default(),
        }
    }
}

/// Output of com.atproto.repo.uploadBlob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadBlobOutput {
    /// Blob reference to embed in a record
    pub blob: serde_json::Value,
}

// ============================================================================
// Query parameters
// ============================================================================

/// Query parameters that serialize into an XRPC query string
pub trait QueryParams {
    fn query_pairs(&self) -> Vec<(&'static str, String)>;

    /// Encoded query string without the leading '?'
    fn to_query_string(&self) -> String {
        self.query_pairs()
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn push_opt<T: ToString>(
    pairs: &mut Vec<(&'static str, String)>,
    key: &'static str,
    value: &Option<T>,
) {
    if let Some(v) = value {
        pairs.push((key, v.to_string()));
    }
}

/// app.bsky.feed.getPosts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetPostsParams {
    pub uris: Vec<String>,
}

impl GetPostsParams {
    pub fn new<I, S>(uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            uris: uris.into_iter().map(Into::into).collect(),
        }
    }
}

impl QueryParams for GetPostsParams {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        self.uris.iter().map(|u| ("uris", u.clone())).collect()
    }
}

/// app.bsky.feed.getTimeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetTimelineParams {
    pub algorithm: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

impl QueryParams for GetTimelineParams {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "algorithm", &self.algorithm);
        push_opt(&mut pairs, "limit", &self.limit);
        push_opt(&mut pairs, "cursor", &self.cursor);
        pairs
    }
}

/// Parameters for actor-scoped list queries (author feed, follows, followers)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorListParams {
    /// Handle or DID
    pub actor: String,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

impl ActorListParams {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl QueryParams for ActorListParams {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("actor", self.actor.clone())];
        push_opt(&mut pairs, "limit", &self.limit);
        push_opt(&mut pairs, "cursor", &self.cursor);
        pairs
    }
}

pub type GetAuthorFeedParams = ActorListParams;
pub type GetFollowsParams = ActorListParams;
pub type GetFollowersParams = ActorListParams;

/// app.bsky.feed.getPostThread
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetPostThreadParams {
    pub uri: String,
    pub depth: Option<u32>,
    pub parent_height: Option<u32>,
}

impl GetPostThreadParams {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }
}

impl QueryParams for GetPostThreadParams {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("uri", self.uri.clone())];
        push_opt(&mut pairs, "depth", &self.depth);
        push_opt(&mut pairs, "parentHeight", &self.parent_height);
        pairs
    }
}

/// Parameters for post-scoped actor lists (likes, reposted-by)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostActorsParams {
    pub uri: String,
    pub cid: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

impl PostActorsParams {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }
}

impl QueryParams for PostActorsParams {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("uri", self.uri.clone())];
        push_opt(&mut pairs, "cid", &self.cid);
        push_opt(&mut pairs, "limit", &self.limit);
        push_opt(&mut pairs, "cursor", &self.cursor);
        pairs
    }
}

pub type GetLikesParams = PostActorsParams;
pub type GetRepostedByParams = PostActorsParams;

/// app.bsky.actor.getProfile
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetProfileParams {
    pub actor: String,
}

impl GetProfileParams {
    pub fn new(actor: impl Into<String>) -> Self {
        Self { actor: actor.into() }
    }
}

impl QueryParams for GetProfileParams {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![("actor", self.actor.clone())]
    }
}

/// app.bsky.actor.getSuggestions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetSuggestionsParams {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

impl QueryParams for GetSuggestionsParams {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_opt(&mut pairs, "limit", &self.limit);
        push_opt(&mut pairs, "cursor", &self.cursor);
        pairs
    }
}

/// app.bsky.actor.searchActors and searchActorsTypeahead
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchActorsParams {
    pub q: String,
    pub limit: Option<u32>,
    /// Ignored by the typeahead endpoint
    pub cursor: Option<String>,
}

impl SearchActorsParams {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            ..Default::default()
        }
    }
}

impl QueryParams for SearchActorsParams {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("q", self.q.clone())];
        push_opt(&mut pairs, "limit", &self.limit);
        push_opt(&mut pairs, "cursor", &self.cursor);
        pairs
    }
}

// ============================================================================
// Query outputs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPostsOutput {
    pub posts: Vec<PostView>,
}

/// Output of getTimeline and getAuthorFeed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub feed: Vec<FeedViewPost>,
}

pub type GetTimelineOutput = FeedOutput;
pub type GetAuthorFeedOutput = FeedOutput;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPostThreadOutput {
    pub thread: ThreadNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetLikesOutput {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub likes: Vec<Like>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRepostedByOutput {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub reposted_by: Vec<ProfileView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetFollowsOutput {
    pub subject: ProfileView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub follows: Vec<ProfileView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetFollowersOutput {
    pub subject: ProfileView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub followers: Vec<ProfileView>,
}

/// Output of getSuggestions, searchActors and searchActorsTypeahead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorsOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub actors: Vec<ProfileView>,
}

pub type GetSuggestionsOutput = ActorsOutput;
pub type SearchActorsOutput = ActorsOutput;
