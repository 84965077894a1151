//! Recording stub agent shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use atkit_client::*;
use std::any::Any;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Query parameters and call options as the agent received them
struct Received {
    method: &'static str,
    params: Box<dyn Any + Send>,
    opts: CallOptions,
}

/// Agent double that serves canned responses and records every call by name
#[derive(Default)]
pub struct StubAgent {
    calls: Mutex<Vec<String>>,
    received: Mutex<Vec<Received>>,
    failing: Mutex<HashSet<&'static str>>,
    session: Mutex<Option<AtpSessionData>>,
    /// Whether a session is reported after a failed login
    session_after_failure: AtomicBool,
    posts: Mutex<Vec<PostView>>,
    feed: Mutex<Vec<FeedViewPost>>,
    thread: Mutex<Option<ThreadNode>>,
    actors: Mutex<Vec<ProfileView>>,
    profile: Mutex<Option<ProfileView>>,
    record_uri: Mutex<Option<String>>,
    existing_profile: Mutex<Option<ProfileRecord>>,
    written_profile: Mutex<Option<ProfileRecord>>,
}

impl StubAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posts(self, posts: Vec<PostView>) -> Self {
        *self.posts.lock().unwrap() = posts;
        self
    }

    pub fn with_feed(self, feed: Vec<FeedViewPost>) -> Self {
        *self.feed.lock().unwrap() = feed;
        self
    }

    pub fn with_thread(self, thread: ThreadNode) -> Self {
        *self.thread.lock().unwrap() = Some(thread);
        self
    }

    pub fn with_actors(self, actors: Vec<ProfileView>) -> Self {
        *self.actors.lock().unwrap() = actors;
        self
    }

    pub fn with_profile(self, profile: ProfileView) -> Self {
        *self.profile.lock().unwrap() = Some(profile);
        self
    }

    pub fn with_record_uri(self, uri: &str) -> Self {
        *self.record_uri.lock().unwrap() = Some(uri.to_string());
        self
    }

    pub fn with_existing_profile(self, record: ProfileRecord) -> Self {
        *self.existing_profile.lock().unwrap() = Some(record);
        self
    }

    pub fn failing(self, method: &'static str) -> Self {
        self.failing.lock().unwrap().insert(method);
        self
    }

    pub fn session_after_failure(self, has_session: bool) -> Self {
        self.session_after_failure.store(has_session, Ordering::SeqCst);
        self
    }

    pub fn set_feed(&self, feed: Vec<FeedViewPost>) {
        *self.feed.lock().unwrap() = feed;
    }

    pub fn set_posts(&self, posts: Vec<PostView>) {
        *self.posts.lock().unwrap() = posts;
    }

    pub fn set_record_uri(&self, uri: &str) {
        *self.record_uri.lock().unwrap() = Some(uri.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| c == method)
    }

    pub fn written_profile(&self) -> Option<ProfileRecord> {
        self.written_profile.lock().unwrap().clone()
    }

    /// Parameters and options of the latest `method` query
    pub fn received<P: Any + Clone>(&self, method: &str) -> Option<(P, CallOptions)> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| r.method == method)
            .and_then(|r| {
                r.params
                    .downcast_ref::<P>()
                    .map(|p| (p.clone(), r.opts.clone()))
            })
    }

    fn receive<P: Any + Clone + Send>(&self, method: &'static str, params: &P, opts: &CallOptions) {
        self.received.lock().unwrap().push(Received {
            method,
            params: Box::new(params.clone()),
            opts: opts.clone(),
        });
    }

    fn record(&self, method: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(method.to_string());
        if self.failing.lock().unwrap().contains(method) {
            return Err(AgentError::Xrpc {
                status: 400,
                error: "StubFailure".into(),
                message: format!("{} failed", method),
            });
        }
        Ok(())
    }

    fn record_ref(&self, fallback: &str) -> RecordRef {
        RecordRef {
            uri: self
                .record_uri
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| fallback.to_string()),
            cid: "bafy-record".into(),
        }
    }

    fn feed_output(&self) -> FeedOutput {
        FeedOutput {
            cursor: None,
            feed: self.feed.lock().unwrap().clone(),
        }
    }

    fn actors_output(&self) -> ActorsOutput {
        ActorsOutput {
            cursor: None,
            actors: self.actors.lock().unwrap().clone(),
        }
    }
}

pub fn session(did: &str) -> AtpSessionData {
    AtpSessionData {
        did: did.into(),
        handle: format!("{}.test", did),
        email: None,
        access_jwt: "access".into(),
        refresh_jwt: "refresh".into(),
    }
}

pub fn author(did: &str) -> ProfileView {
    ProfileView::new(did, format!("{}.test", did))
}

pub fn post(uri: &str, did: &str) -> PostView {
    PostView::new(uri, format!("cid-{}", uri), author(did))
}

#[async_trait]
impl Agent for StubAgent {
    async fn login(&self, params: LoginParams) -> Result<AtpSessionData> {
        if let Err(e) = self.record("login") {
            if self.session_after_failure.load(Ordering::SeqCst) {
                *self.session.lock().unwrap() = Some(session(&params.identifier));
            }
            return Err(e);
        }
        let session = session(&params.identifier);
        *self.session.lock().unwrap() = Some(session.clone());
        Ok(session)
    }

    async fn resume_session(&self, session: AtpSessionData) -> Result<()> {
        self.record("resume_session")?;
        *self.session.lock().unwrap() = Some(session);
        Ok(())
    }

    async fn delete_session(&self) -> Result<()> {
        let result = self.record("delete_session");
        *self.session.lock().unwrap() = None;
        result
    }

    fn has_session(&self) -> bool {
        self.session.lock().unwrap().is_some()
    }

    fn session(&self) -> Option<AtpSessionData> {
        self.session.lock().unwrap().clone()
    }

    async fn get_posts(&self, params: GetPostsParams, opts: CallOptions) -> Result<GetPostsOutput> {
        self.receive("get_posts", &params, &opts);
        self.record("get_posts")?;
        Ok(GetPostsOutput {
            posts: self.posts.lock().unwrap().clone(),
        })
    }

    async fn get_timeline(
        &self,
        params: GetTimelineParams,
        opts: CallOptions,
    ) -> Result<FeedOutput> {
        self.receive("get_timeline", &params, &opts);
        self.record("get_timeline")?;
        Ok(self.feed_output())
    }

    async fn get_author_feed(
        &self,
        params: ActorListParams,
        opts: CallOptions,
    ) -> Result<FeedOutput> {
        self.receive("get_author_feed", &params, &opts);
        self.record("get_author_feed")?;
        Ok(self.feed_output())
    }

    async fn get_post_thread(
        &self,
        params: GetPostThreadParams,
        opts: CallOptions,
    ) -> Result<GetPostThreadOutput> {
        self.receive("get_post_thread", &params, &opts);
        self.record("get_post_thread")?;
        let thread = self.thread.lock().unwrap().clone().unwrap_or(ThreadNode::NotFound {
            uri: params.uri,
            not_found: true,
        });
        Ok(GetPostThreadOutput { thread })
    }

    async fn get_likes(
        &self,
        params: PostActorsParams,
        opts: CallOptions,
    ) -> Result<GetLikesOutput> {
        self.receive("get_likes", &params, &opts);
        self.record("get_likes")?;
        let likes = self
            .actors
            .lock()
            .unwrap()
            .iter()
            .map(|actor| Like {
                indexed_at: String::new(),
                created_at: String::new(),
                actor: actor.clone(),
            })
            .collect();
        Ok(GetLikesOutput {
            uri: params.uri,
            cid: params.cid,
            cursor: None,
            likes,
        })
    }

    async fn get_reposted_by(
        &self,
        params: PostActorsParams,
        opts: CallOptions,
    ) -> Result<GetRepostedByOutput> {
        self.receive("get_reposted_by", &params, &opts);
        self.record("get_reposted_by")?;
        Ok(GetRepostedByOutput {
            uri: params.uri,
            cid: params.cid,
            cursor: None,
            reposted_by: self.actors.lock().unwrap().clone(),
        })
    }

    async fn post(&self, _record: PostRecord) -> Result<RecordRef> {
        self.record("post")?;
        Ok(self.record_ref("at://did:stub/app.bsky.feed.post/new"))
    }

    async fn delete_post(&self, _post_uri: &str) -> Result<()> {
        self.record("delete_post")
    }

    async fn like(&self, _uri: &str, _cid: &str) -> Result<RecordRef> {
        self.record("like")?;
        Ok(self.record_ref("at://did:stub/app.bsky.feed.like/1"))
    }

    async fn delete_like(&self, _like_uri: &str) -> Result<()> {
        self.record("delete_like")
    }

    async fn repost(&self, _uri: &str, _cid: &str) -> Result<RecordRef> {
        self.record("repost")?;
        Ok(self.record_ref("at://did:stub/app.bsky.feed.repost/1"))
    }

    async fn delete_repost(&self, _repost_uri: &str) -> Result<()> {
        self.record("delete_repost")
    }

    async fn get_profile(
        &self,
        params: GetProfileParams,
        opts: CallOptions,
    ) -> Result<ProfileView> {
        self.receive("get_profile", &params, &opts);
        self.record("get_profile")?;
        Ok(self
            .profile
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| author(&params.actor)))
    }

    async fn get_follows(
        &self,
        params: ActorListParams,
        opts: CallOptions,
    ) -> Result<GetFollowsOutput> {
        self.receive("get_follows", &params, &opts);
        self.record("get_follows")?;
        Ok(GetFollowsOutput {
            subject: author(&params.actor),
            cursor: None,
            follows: self.actors.lock().unwrap().clone(),
        })
    }

    async fn get_followers(
        &self,
        params: ActorListParams,
        opts: CallOptions,
    ) -> Result<GetFollowersOutput> {
        self.receive("get_followers", &params, &opts);
        self.record("get_followers")?;
        Ok(GetFollowersOutput {
            subject: self
                .profile
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| author(&params.actor)),
            cursor: None,
            followers: self.actors.lock().unwrap().clone(),
        })
    }

    async fn get_suggestions(
        &self,
        params: GetSuggestionsParams,
        opts: CallOptions,
    ) -> Result<ActorsOutput> {
        self.receive("get_suggestions", &params, &opts);
        self.record("get_suggestions")?;
        Ok(self.actors_output())
    }

    async fn search_actors(
        &self,
        params: SearchActorsParams,
        opts: CallOptions,
    ) -> Result<ActorsOutput> {
        self.receive("search_actors", &params, &opts);
        self.record("search_actors")?;
        Ok(self.actors_output())
    }

    async fn search_actors_typeahead(
        &self,
        params: SearchActorsParams,
        opts: CallOptions,
    ) -> Result<ActorsOutput> {
        self.receive("search_actors_typeahead", &params, &opts);
        self.record("search_actors_typeahead")?;
        Ok(self.actors_output())
    }

    async fn follow(&self, _subject_did: &str) -> Result<RecordRef> {
        self.record("follow")?;
        Ok(self.record_ref("at://did:stub/app.bsky.graph.follow/1"))
    }

    async fn delete_follow(&self, _follow_uri: &str) -> Result<()> {
        self.record("delete_follow")
    }

    async fn mute(&self, _actor: &str) -> Result<()> {
        self.record("mute")
    }

    async fn unmute(&self, _actor: &str) -> Result<()> {
        self.record("unmute")
    }

    async fn upsert_profile(&self, update: ProfileUpdateFn) -> Result<()> {
        self.record("upsert_profile")?;
        let existing = self.existing_profile.lock().unwrap().clone();
        let updated = update(existing);
        *self.written_profile.lock().unwrap() = Some(updated);
        Ok(())
    }

    async fn upload_blob(
        &self,
        data: Vec<u8>,
        opts: UploadBlobOptions,
    ) -> Result<UploadBlobOutput> {
        self.record("upload_blob")?;
        Ok(UploadBlobOutput {
            blob: serde_json::json!({
                "$type": "blob",
                "mimeType": opts.encoding,
                "size": data.len(),
            }),
        })
    }
}
