//! Session and cache facade
//!
//! [`AtkitBsky`] forwards every call to its [`Agent`]. On success the
//! returned entities are merged into the post/profile caches and the new
//! cache snapshot is broadcast before the original response is handed back.
//! On failure the caches are left untouched and the agent error propagates;
//! only authentication state is reconciled on failure.
//!
//! Overlapping calls that touch the same cache entry are not serialized: two
//! in-flight likes on one post each apply their own update and the last write
//! wins, so counters can drift from the server's count.

use crate::auth::AuthState;
use crate::cache::{
    revert_follow, PostCache, PostMarker, PostSnapshot, ProfileCache, ProfileSnapshot,
};
use crate::error::{AtkitError, Result};
use crate::events::{EventController, Unsubscribe};
use crate::target::{ActorTarget, FollowTarget, PostTarget, RecordTarget};
use atkit_client::{
    ActorListParams, ActorsOutput, Agent, AgentOptions, AtpSessionData, CallOptions, FeedOutput,
    GetFollowersOutput, GetFollowsOutput, GetLikesOutput, GetPostThreadOutput, GetPostThreadParams,
    GetPostsOutput, GetPostsParams, GetProfileParams, GetRepostedByOutput, GetSuggestionsParams,
    GetTimelineParams, LoginParams, PostActorsParams, PostRecord, ProfileRecord, ProfileView,
    RecordRef, SearchActorsParams, UploadBlobOptions, UploadBlobOutput, XrpcAgent,
};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

/// Bluesky facade with a local cache and change notifications
///
/// Each instance owns its agent, auth state and caches; nothing is shared
/// between instances.
///
/// # Example
///
/// ```rust,ignore
/// use atkit_core::{AtkitBsky, AgentOptions, GetPostsParams, CallOptions};
///
/// let atkit = AtkitBsky::new(AgentOptions::default());
/// atkit.get_posts(GetPostsParams::new([uri]), CallOptions::default()).await?;
///
/// // Cached copy is now available
/// let post = atkit.post(uri).unwrap();
///
/// // Like it; the cached copy gets the marker and a bumped counter
/// atkit.like(&post).await?;
/// ```
pub struct AtkitBsky<A: Agent = XrpcAgent> {
    agent: A,
    auth_state: RwLock<AuthState>,
    posts: RwLock<PostCache>,
    profiles: RwLock<ProfileCache>,
    auth_events: EventController<AuthState>,
    post_events: EventController<PostSnapshot>,
    profile_events: EventController<ProfileSnapshot>,
}

impl AtkitBsky<XrpcAgent> {
    /// Create a facade with an XRPC agent built from `options`
    pub fn new(options: AgentOptions) -> Self {
        Self::with_agent(XrpcAgent::new(options))
    }
}

impl<A: Agent> AtkitBsky<A> {
    /// Create a facade around an existing agent
    pub fn with_agent(agent: A) -> Self {
        Self {
            agent,
            auth_state: RwLock::new(AuthState::LoggedOut),
            posts: RwLock::new(PostCache::new()),
            profiles: RwLock::new(ProfileCache::new()),
            auth_events: EventController::new(),
            post_events: EventController::new(),
            profile_events: EventController::new(),
        }
    }

    /// The wrapped agent
    pub fn agent(&self) -> &A {
        &self.agent
    }

    /// Current auth state
    pub fn auth_state(&self) -> AuthState {
        *read(&self.auth_state)
    }

    /// Snapshot of the post cache
    pub fn posts(&self) -> PostSnapshot {
        read(&self.posts).snapshot()
    }

    /// Snapshot of the profile cache
    pub fn profiles(&self) -> ProfileSnapshot {
        read(&self.profiles).snapshot()
    }

    /// Cached post by URI
    pub fn post(&self, uri: &str) -> Option<atkit_client::PostView> {
        read(&self.posts).get(uri).cloned()
    }

    /// Cached profile by DID
    pub fn profile(&self, did: &str) -> Option<ProfileView> {
        read(&self.profiles).get(did).cloned()
    }

    // ==================== Authentication ====================

    /// Log in with identifier and password
    ///
    /// On failure the state settles on `LoggedIn` if the agent still holds a
    /// session, `LoggedOut` otherwise, and the agent error is returned.
    pub async fn login(&self, params: LoginParams) -> Result<AtpSessionData> {
        self.change_auth_state(AuthState::LoggingIn);

        match self.agent.login(params).await {
            Ok(session) => {
                self.change_auth_state(AuthState::LoggedIn);
                Ok(session)
            }
            Err(e) => {
                let state = if self.agent.has_session() {
                    AuthState::LoggedIn
                } else {
                    AuthState::LoggedOut
                };
                warn!("Login failed, auth state reconciled to {}: {}", state, e);
                self.change_auth_state(state);
                Err(e.into())
            }
        }
    }

    /// Log out
    ///
    /// Ends in `LoggedOut` whatever the server says. When the agent holds a
    /// session it is deleted remotely first and a remote failure is returned
    /// after the state change.
    pub async fn logout(&self) -> Result<()> {
        if !self.agent.has_session() {
            self.change_auth_state(AuthState::LoggedOut);
            return Ok(());
        }

        self.change_auth_state(AuthState::LoggingOut);
        let result = self.agent.delete_session().await;
        if let Err(ref e) = result {
            warn!("Remote session delete failed: {}", e);
        }
        self.change_auth_state(AuthState::LoggedOut);

        result.map_err(Into::into)
    }

    /// Resume a saved session
    pub async fn resume_session(&self, session: AtpSessionData) -> Result<()> {
        self.change_auth_state(AuthState::LoggingIn);

        match self.agent.resume_session(session).await {
            Ok(()) => {
                self.change_auth_state(AuthState::LoggedIn);
                Ok(())
            }
            Err(e) => {
                warn!("Session resume failed: {}", e);
                self.change_auth_state(AuthState::LoggedOut);
                Err(e.into())
            }
        }
    }

    // ==================== Feed reads ====================

    /// Get posts by URI
    pub async fn get_posts(
        &self,
        params: GetPostsParams,
        opts: CallOptions,
    ) -> Result<GetPostsOutput> {
        let data = self.agent.get_posts(params, opts).await?;

        let authors = write(&self.posts).merge_posts(&data.posts);
        self.broadcast_posts();
        self.merge_profiles(authors);

        Ok(data)
    }

    /// Get the home timeline
    pub async fn get_timeline(
        &self,
        params: GetTimelineParams,
        opts: CallOptions,
    ) -> Result<FeedOutput> {
        let data = self.agent.get_timeline(params, opts).await?;
        self.merge_feed(&data);
        Ok(data)
    }

    /// Get an actor's feed
    pub async fn get_author_feed(
        &self,
        params: ActorListParams,
        opts: CallOptions,
    ) -> Result<FeedOutput> {
        let data = self.agent.get_author_feed(params, opts).await?;
        self.merge_feed(&data);
        Ok(data)
    }

    /// Get a post thread
    pub async fn get_post_thread(
        &self,
        params: GetPostThreadParams,
        opts: CallOptions,
    ) -> Result<GetPostThreadOutput> {
        let data = self.agent.get_post_thread(params, opts).await?;

        let authors = write(&self.posts).merge_thread(&data.thread);
        self.broadcast_posts();
        self.merge_profiles(authors);

        Ok(data)
    }

    /// Get the actors who liked a post
    pub async fn get_likes(
        &self,
        params: PostActorsParams,
        opts: CallOptions,
    ) -> Result<GetLikesOutput> {
        let data = self.agent.get_likes(params, opts).await?;
        self.merge_profiles(data.likes.iter().map(|like| like.actor.clone()));
        Ok(data)
    }

    /// Get the actors who reposted a post
    pub async fn get_reposted_by(
        &self,
        params: PostActorsParams,
        opts: CallOptions,
    ) -> Result<GetRepostedByOutput> {
        let data = self.agent.get_reposted_by(params, opts).await?;
        self.merge_profiles(data.reposted_by.iter().cloned());
        Ok(data)
    }

    // ==================== Feed writes ====================

    /// Create a post. The new post is not cached.
    pub async fn create_post(&self, record: PostRecord) -> Result<RecordRef> {
        Ok(self.agent.post(record).await?)
    }

    /// Delete a post and drop it from the cache
    pub async fn delete_post(&self, post_uri: &str) -> Result<()> {
        if post_uri.is_empty() {
            return Err(AtkitError::invalid("deletePost", "(string)"));
        }

        self.agent.delete_post(post_uri).await?;

        write(&self.posts).remove(post_uri);
        self.broadcast_posts();
        Ok(())
    }

    /// Like a post given as `(uri, cid)` or as a post view
    pub async fn like(&self, target: impl Into<PostTarget>) -> Result<RecordRef> {
        self.add_marker("like", target.into(), PostMarker::Like).await
    }

    /// Delete a like given by its record URI or through the liked post view
    pub async fn delete_like(&self, target: impl Into<RecordTarget>) -> Result<()> {
        self.remove_marker("deleteLike", target.into(), PostMarker::Like)
            .await
    }

    /// Repost a post given as `(uri, cid)` or as a post view
    pub async fn repost(&self, target: impl Into<PostTarget>) -> Result<RecordRef> {
        self.add_marker("repost", target.into(), PostMarker::Repost)
            .await
    }

    /// Delete a repost given by its record URI or through the reposted post view
    pub async fn delete_repost(&self, target: impl Into<RecordTarget>) -> Result<()> {
        self.remove_marker("deleteRepost", target.into(), PostMarker::Repost)
            .await
    }

    async fn add_marker(
        &self,
        method: &'static str,
        target: PostTarget,
        marker: PostMarker,
    ) -> Result<RecordRef> {
        target.validate(method)?;

        let result = match marker {
            PostMarker::Like => self.agent.like(target.uri(), target.cid()).await?,
            PostMarker::Repost => self.agent.repost(target.uri(), target.cid()).await?,
        };

        let updated = write(&self.posts).apply_marker(target.uri(), marker, &result.uri);
        if updated {
            self.broadcast_posts();
        }

        Ok(result)
    }

    async fn remove_marker(
        &self,
        method: &'static str,
        target: RecordTarget,
        marker: PostMarker,
    ) -> Result<()> {
        target.validate(method)?;

        let updated = match target {
            RecordTarget::Record(record_uri) => {
                self.delete_marker_record(marker, &record_uri).await?;
                write(&self.posts).revert_marker_by_record(marker, &record_uri)
            }
            RecordTarget::Post(post) => {
                let record_uri = match marker {
                    PostMarker::Like => post.viewer_like(),
                    PostMarker::Repost => post.viewer_repost(),
                }
                .map(str::to_string);

                let record_uri = match record_uri {
                    Some(uri) => uri,
                    None if marker == PostMarker::Like => return Err(AtkitError::NoLike(post.uri)),
                    None => return Err(AtkitError::NoRepost(post.uri)),
                };

                self.delete_marker_record(marker, &record_uri).await?;
                write(&self.posts).revert_marker(&post.uri, marker)
            }
        };

        if updated {
            self.broadcast_posts();
        }
        Ok(())
    }

    async fn delete_marker_record(&self, marker: PostMarker, record_uri: &str) -> Result<()> {
        match marker {
            PostMarker::Like => self.agent.delete_like(record_uri).await?,
            PostMarker::Repost => self.agent.delete_repost(record_uri).await?,
        }
        Ok(())
    }

    /// Upload a blob; returns the output body only
    pub async fn upload_blob(
        &self,
        data: Vec<u8>,
        opts: UploadBlobOptions,
    ) -> Result<UploadBlobOutput> {
        Ok(self.agent.upload_blob(data, opts).await?)
    }

    // ==================== Actor / Graph reads ====================

    /// Get a detailed profile
    pub async fn get_profile(
        &self,
        params: GetProfileParams,
        opts: CallOptions,
    ) -> Result<ProfileView> {
        let data = self.agent.get_profile(params, opts).await?;
        self.merge_profiles([data.clone()]);
        Ok(data)
    }

    /// Get the accounts an actor follows
    pub async fn get_follows(
        &self,
        params: ActorListParams,
        opts: CallOptions,
    ) -> Result<GetFollowsOutput> {
        let data = self.agent.get_follows(params, opts).await?;
        self.merge_profiles(data.follows.iter().cloned());
        Ok(data)
    }

    /// Get an actor's followers; the subject profile is merged too
    pub async fn get_followers(
        &self,
        params: ActorListParams,
        opts: CallOptions,
    ) -> Result<GetFollowersOutput> {
        let data = self.agent.get_followers(params, opts).await?;
        self.merge_profiles(
            std::iter::once(data.subject.clone()).chain(data.followers.iter().cloned()),
        );
        Ok(data)
    }

    /// Get suggested actors
    pub async fn get_suggestions(
        &self,
        params: GetSuggestionsParams,
        opts: CallOptions,
    ) -> Result<ActorsOutput> {
        let data = self.agent.get_suggestions(params, opts).await?;
        self.merge_profiles(data.actors.iter().cloned());
        Ok(data)
    }

    /// Search actors
    pub async fn search_actors(
        &self,
        params: SearchActorsParams,
        opts: CallOptions,
    ) -> Result<ActorsOutput> {
        let data = self.agent.search_actors(params, opts).await?;
        self.merge_profiles(data.actors.iter().cloned());
        Ok(data)
    }

    /// Search actors by prefix
    pub async fn search_actors_typeahead(
        &self,
        params: SearchActorsParams,
        opts: CallOptions,
    ) -> Result<ActorsOutput> {
        let data = self.agent.search_actors_typeahead(params, opts).await?;
        self.merge_profiles(data.actors.iter().cloned());
        Ok(data)
    }

    // ==================== Actor / Graph writes ====================

    /// Follow an actor given by DID or profile view
    pub async fn follow(&self, target: impl Into<ActorTarget>) -> Result<RecordRef> {
        let target = target.into();
        target.validate("follow")?;

        let result = self.agent.follow(target.did()).await?;

        let updated = write(&self.profiles).apply_follow(target.did(), &result.uri);
        if updated {
            self.broadcast_profiles();
        }

        Ok(result)
    }

    /// Delete a follow given by its record URI or through the followed profile
    ///
    /// The profile form looks the profile up in the cache first, falling back
    /// to the given view, and requires a following marker on it.
    pub async fn delete_follow(&self, target: impl Into<FollowTarget>) -> Result<()> {
        let target = target.into();
        target.validate("deleteFollow")?;

        match target {
            FollowTarget::Record(follow_uri) => {
                self.agent.delete_follow(&follow_uri).await?;

                let updated = write(&self.profiles).revert_follow_by_record(&follow_uri);
                if updated {
                    self.broadcast_profiles();
                }
            }
            FollowTarget::Profile(given) => {
                let mut profile = self.profile(&given.did).unwrap_or(given);
                let following = match profile.viewer.as_ref().and_then(|v| v.following.clone()) {
                    Some(uri) => uri,
                    None => return Err(AtkitError::NotFollowing(profile.did)),
                };

                self.agent.delete_follow(&following).await?;

                revert_follow(&mut profile);
                write(&self.profiles).store(profile);
                self.broadcast_profiles();
            }
        }

        Ok(())
    }

    /// Mute an actor given by DID or profile view
    pub async fn mute(&self, target: impl Into<ActorTarget>) -> Result<()> {
        self.set_muted("mute", target.into(), true).await
    }

    /// Unmute an actor given by DID or profile view
    pub async fn unmute(&self, target: impl Into<ActorTarget>) -> Result<()> {
        self.set_muted("unmute", target.into(), false).await
    }

    async fn set_muted(
        &self,
        method: &'static str,
        target: ActorTarget,
        muted: bool,
    ) -> Result<()> {
        target.validate(method)?;

        if muted {
            self.agent.mute(target.did()).await?;
        } else {
            self.agent.unmute(target.did()).await?;
        }

        let updated = write(&self.profiles).set_muted(target.did(), muted);
        if updated {
            self.broadcast_profiles();
        }
        Ok(())
    }

    /// Create or update the viewer's profile record
    ///
    /// The profile cache is not refreshed; fetch the profile again to see the
    /// change locally.
    pub async fn upsert_profile<F>(&self, update: F) -> Result<()>
    where
        F: FnOnce(Option<ProfileRecord>) -> ProfileRecord + Send + 'static,
    {
        self.agent
            .upsert_profile(Box::new(move |existing| {
                let updated = update(existing);
                debug!("Profile record updated: {:?}", updated.display_name);
                updated
            }))
            .await?;
        Ok(())
    }

    // ==================== Subscriptions ====================

    /// Subscribe to auth state changes
    pub fn on_auth_state_changed<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&AuthState) + Send + Sync + 'static,
    {
        self.auth_events.subscribe(listener)
    }

    /// Subscribe to post cache changes
    pub fn on_posts_changed<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&PostSnapshot) + Send + Sync + 'static,
    {
        self.post_events.subscribe(listener)
    }

    /// Subscribe to profile cache changes
    pub fn on_profiles_changed<F>(&self, listener: F) -> Unsubscribe
    where
        F: Fn(&ProfileSnapshot) + Send + Sync + 'static,
    {
        self.profile_events.subscribe(listener)
    }

    // === Private Implementation ===

    fn change_auth_state(&self, state: AuthState) {
        *write(&self.auth_state) = state;
        debug!("Auth state changed to {}", state);
        self.auth_events.dispatch(&state);
    }

    fn merge_feed(&self, data: &FeedOutput) {
        let authors = write(&self.posts).merge_feed(&data.feed);
        self.broadcast_posts();
        self.merge_profiles(authors);
    }

    fn merge_profiles<I>(&self, profiles: I)
    where
        I: IntoIterator<Item = ProfileView>,
    {
        write(&self.profiles).merge_profiles(profiles);
        self.broadcast_profiles();
    }

    fn broadcast_posts(&self) {
        let snapshot = self.posts();
        debug!("Post cache changed ({} posts)", snapshot.len());
        self.post_events.dispatch(&snapshot);
    }

    fn broadcast_profiles(&self) {
        let snapshot = self.profiles();
        debug!("Profile cache changed ({} profiles)", snapshot.len());
        self.profile_events.dispatch(&snapshot);
    }
}
