//! The agent boundary
//!
//! Everything that touches the network goes through [`Agent`]. The atkit
//! facade only ever talks to this trait, so tests can substitute a stub and
//! applications can bring their own transport.

use crate::error::Result;
use crate::types::*;
use async_trait::async_trait;

/// Update function for [`Agent::upsert_profile`]
///
/// Receives the current profile record (`None` when the account has none yet)
/// and returns the record to write.
pub type ProfileUpdateFn = Box<dyn FnOnce(Option<ProfileRecord>) -> ProfileRecord + Send>;

/// Bluesky API client contract
///
/// Query methods take their parameters and [`CallOptions`] by value and
/// return the decoded output body. Write methods return the created record
/// reference where the server produces one.
#[async_trait]
pub trait Agent: Send + Sync {
    // ==================== Session ====================

    /// Create a session with identifier and password
    async fn login(&self, params: LoginParams) -> Result<AtpSessionData>;

    /// Resume a previously saved session
    async fn resume_session(&self, session: AtpSessionData) -> Result<()>;

    /// Delete the current session on the server and forget it locally
    async fn delete_session(&self) -> Result<()>;

    /// Whether the agent currently holds a session
    fn has_session(&self) -> bool;

    /// Current session, if any
    fn session(&self) -> Option<AtpSessionData>;

    // ==================== Feed ====================

    async fn get_posts(&self, params: GetPostsParams, opts: CallOptions) -> Result<GetPostsOutput>;

    async fn get_timeline(
        &self,
        params: GetTimelineParams,
        opts: CallOptions,
    ) -> Result<GetTimelineOutput>;

    async fn get_author_feed(
        &self,
        params: GetAuthorFeedParams,
        opts: CallOptions,
    ) -> Result<GetAuthorFeedOutput>;

    async fn get_post_thread(
        &self,
        params: GetPostThreadParams,
        opts: CallOptions,
    ) -> Result<GetPostThreadOutput>;

    async fn get_likes(&self, params: GetLikesParams, opts: CallOptions) -> Result<GetLikesOutput>;

    async fn get_reposted_by(
        &self,
        params: GetRepostedByParams,
        opts: CallOptions,
    ) -> Result<GetRepostedByOutput>;

    async fn post(&self, record: PostRecord) -> Result<RecordRef>;

    async fn delete_post(&self, post_uri: &str) -> Result<()>;

    async fn like(&self, uri: &str, cid: &str) -> Result<RecordRef>;

    async fn delete_like(&self, like_uri: &str) -> Result<()>;

    async fn repost(&self, uri: &str, cid: &str) -> Result<RecordRef>;

    async fn delete_repost(&self, repost_uri: &str) -> Result<()>;

    // ==================== Actor / Graph ====================

    async fn get_profile(&self, params: GetProfileParams, opts: CallOptions) -> Result<ProfileView>;

    async fn get_follows(&self, params: GetFollowsParams, opts: CallOptions)
        -> Result<GetFollowsOutput>;

    async fn get_followers(
        &self,
        params: GetFollowersParams,
        opts: CallOptions,
    ) -> Result<GetFollowersOutput>;

    async fn get_suggestions(
        &self,
        params: GetSuggestionsParams,
        opts: CallOptions,
    ) -> Result<GetSuggestionsOutput>;

    async fn search_actors(
        &self,
        params: SearchActorsParams,
        opts: CallOptions,
    ) -> Result<SearchActorsOutput>;

    async fn search_actors_typeahead(
        &self,
        params: SearchActorsParams,
        opts: CallOptions,
    ) -> Result<SearchActorsOutput>;

    async fn follow(&self, subject_did: &str) -> Result<RecordRef>;

    async fn delete_follow(&self, follow_uri: &str) -> Result<()>;

    async fn mute(&self, actor: &str) -> Result<()>;

    async fn unmute(&self, actor: &str) -> Result<()>;

    async fn upsert_profile(&self, update: ProfileUpdateFn) -> Result<()>;

    // ==================== Repo ====================

    async fn upload_blob(&self, data: Vec<u8>, opts: UploadBlobOptions) -> Result<UploadBlobOutput>;
}
