//! atkit core - session and cache facade for Bluesky
//!
//! Wraps an [`Agent`] so that every successful response is merged into a
//! local post/profile cache before it is handed back, and exposes
//! authentication state and cache contents as subscribable feeds.
//!
//! # Architecture
//!
//! ```text
//! caller ──► AtkitBsky ──► Agent (XRPC) ──► PDS / AppView
//!               │  ▲
//!     merge     ▼  │ snapshot
//!          PostCache / ProfileCache
//!               │
//!               ▼
//!        EventController ──► subscribers
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use atkit_core::{AtkitBsky, AgentOptions, LoginParams, CallOptions, GetTimelineParams};
//!
//! # async fn example() -> atkit_core::Result<()> {
//! let atkit = AtkitBsky::new(AgentOptions::service("https://bsky.social"));
//!
//! let _sub = atkit.on_posts_changed(|posts| {
//!     println!("{} posts cached", posts.len());
//! });
//!
//! atkit.login(LoginParams::new("alice.bsky.social", "app-password")).await?;
//! let timeline = atkit
//!     .get_timeline(GetTimelineParams::default(), CallOptions::default())
//!     .await?;
//!
//! if let Some(item) = timeline.feed.first() {
//!     atkit.like(item.post.clone()).await?;
//! }
//! # Ok(())
//! # }
//! ```

// Authentication state
pub mod auth;

// Facade over the agent
pub mod bsky;

// Post and profile caches
pub mod cache;

// Error types
pub mod error;

// Broadcast channel
pub mod events;

// Argument unions for overloaded operations
pub mod target;

pub use auth::AuthState;
pub use bsky::AtkitBsky;
pub use cache::{PostCache, PostSnapshot, ProfileCache, ProfileSnapshot};
pub use error::{AtkitError, Result};
pub use events::{EventController, Unsubscribe};
pub use target::{ActorTarget, FollowTarget, PostTarget, RecordTarget};

// Re-export from the client crate
pub use atkit_client::{
    ActorListParams, Agent, AgentError, AgentOptions, AtpSessionData, CallOptions, FeedViewPost,
    GetPostThreadParams, GetPostsParams, GetProfileParams, GetSuggestionsParams,
    GetTimelineParams, LoginParams, PostActorsParams, PostRecord, PostView, ProfileRecord,
    ProfileView, RecordRef, ReplyNode, ReplyRef, SearchActorsParams, ThreadNode,
    UploadBlobOptions, UploadBlobOutput, XrpcAgent,
};
