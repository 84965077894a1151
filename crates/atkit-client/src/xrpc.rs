//! HTTP implementation of [`Agent`] over XRPC

use crate::agent::{Agent, ProfileUpdateFn};
use crate::error::{AgentError, Result};
use crate::types::*;
use crate::uri::AtUri;
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;

const COLLECTION_POST: &str = "app.bsky.feed.post";
const COLLECTION_LIKE: &str = "app.bsky.feed.like";
const COLLECTION_REPOST: &str = "app.bsky.feed.repost";
const COLLECTION_FOLLOW: &str = "app.bsky.graph.follow";
const COLLECTION_PROFILE: &str = "app.bsky.actor.profile";

/// Which token authorizes a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    None,
    Access,
    Refresh,
}

/// XRPC error body
#[derive(Debug, Deserialize)]
struct XrpcErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetSessionOutput {
    did: String,
    handle: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetRecordOutput<T> {
    #[serde(default)]
    cid: Option<String>,
    value: T,
}

/// XRPC agent backed by reqwest
///
/// # Example
///
/// ```rust,no_run
/// use atkit_client::{Agent, AgentOptions, LoginParams, XrpcAgent};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let agent = XrpcAgent::new(AgentOptions::service("https://bsky.social"));
/// let session = agent.login(LoginParams::new("alice.bsky.social", "app-password")).await?;
/// assert!(agent.has_session());
/// println!("logged in as {}", session.handle);
/// # Ok(())
/// # }
/// ```
pub struct XrpcAgent {
    options: AgentOptions,
    client: Client,
    session: RwLock<Option<AtpSessionData>>,
}

impl XrpcAgent {
    /// Create a new agent
    pub fn new(options: AgentOptions) -> Self {
        let mut builder = Client::builder().timeout(Duration::from_secs(options.timeout_secs));
        if let Some(ref user_agent) = options.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            Client::new()
        });

        Self {
            options,
            client,
            session: RwLock::new(None),
        }
    }

    /// Service endpoint this agent talks to
    pub fn service(&self) -> &str {
        &self.options.service
    }

    fn set_session(&self, session: Option<AtpSessionData>) {
        let mut guard = self.session.write().unwrap_or_else(|e| e.into_inner());
        *guard = session;
    }

    fn session_did(&self) -> Result<String> {
        self.session()
            .map(|s| s.did)
            .ok_or(AgentError::NotAuthenticated)
    }

    fn url(&self, nsid: &str) -> String {
        format!("{}/xrpc/{}", self.options.service.trim_end_matches('/'), nsid)
    }

    fn authorize(&self, request: RequestBuilder, auth: Auth) -> Result<RequestBuilder> {
        let token = match auth {
            Auth::None => return Ok(request),
            Auth::Access => self.session().map(|s| s.access_jwt),
            Auth::Refresh => self.session().map(|s| s.refresh_jwt),
        };

        // Queries work unauthenticated against the AppView, procedures do not
        match token {
            Some(token) => Ok(request.bearer_auth(token)),
            None if auth == Auth::Refresh => Err(AgentError::NotAuthenticated),
            None => Ok(request),
        }
    }

    fn apply_call_options(mut request: RequestBuilder, opts: &CallOptions) -> RequestBuilder {
        for (name, value) in &opts.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = opts.timeout {
            request = request.timeout(timeout);
        }
        request
    }

    async fn query<P, T>(&self, nsid: &str, params: &P, opts: &CallOptions) -> Result<T>
    where
        P: QueryParams + ?Sized,
        T: DeserializeOwned,
    {
        let mut url = self.url(nsid);
        let query = params.to_query_string();
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }

        tracing::trace!("XRPC query {}", url);

        let request = self.authorize(self.client.get(&url), Auth::Access)?;
        let response = Self::apply_call_options(request, opts).send().await?;
        Self::handle_response(response).await
    }

    async fn procedure<B, T>(&self, nsid: &str, body: &B, auth: Auth) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send_procedure(nsid, body, auth).await?;
        Self::handle_response(response).await
    }

    async fn procedure_no_output<B>(&self, nsid: &str, body: Option<&B>, auth: Auth) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let response = match body {
            Some(body) => self.send_procedure(nsid, body, auth).await?,
            None => {
                tracing::trace!("XRPC procedure {}", nsid);
                let request = self.authorize(self.client.post(self.url(nsid)), auth)?;
                request.send().await?
            }
        };

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(())
    }

    async fn send_procedure<B>(&self, nsid: &str, body: &B, auth: Auth) -> Result<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        tracing::trace!("XRPC procedure {}", nsid);

        let request = self
            .client
            .post(self.url(nsid))
            .header(header::CONTENT_TYPE, "application/json")
            .json(body);

        Ok(self.authorize(request, auth)?.send().await?)
    }

    // ==================== Records ====================

    async fn create_record(
        &self,
        collection: &str,
        record: serde_json::Value,
    ) -> Result<RecordRef> {
        let body = serde_json::json!({
            "repo": self.session_did()?,
            "collection": collection,
            "record": record,
        });

        self.procedure("com.atproto.repo.createRecord", &body, Auth::Access)
            .await
    }

    async fn delete_record(&self, uri: &str, expected_collection: &str) -> Result<()> {
        let uri = AtUri::parse(uri)?;
        let collection = uri.collection.as_deref().unwrap_or(expected_collection);
        if collection != expected_collection {
            return Err(AgentError::InvalidUri(uri.to_string()));
        }

        let body = serde_json::json!({
            "repo": uri.authority,
            "collection": collection,
            "rkey": uri.require_rkey()?,
        });

        self.procedure_no_output("com.atproto.repo.deleteRecord", Some(&body), Auth::Access)
            .await
    }

    async fn subject_record(&self, collection: &str, uri: &str, cid: &str) -> Result<RecordRef> {
        let record = serde_json::json!({
            "$type": collection,
            "subject": { "uri": uri, "cid": cid },
            "createdAt": now(),
        });

        self.create_record(collection, record).await
    }

    // ==================== Helper Methods ====================

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let body = response.json().await?;
        Ok(body)
    }

    async fn error_from_response(response: reqwest::Response) -> AgentError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body: Option<XrpcErrorBody> = serde_json::from_str(&text).ok();

        let (error, message) = match body {
            Some(b) => (
                b.error.unwrap_or_else(|| default_error_name(status)),
                b.message.unwrap_or_default(),
            ),
            None => (default_error_name(status), text),
        };

        tracing::debug!("XRPC error {} {}: {}", status.as_u16(), error, message);

        AgentError::Xrpc {
            status: status.as_u16(),
            error,
            message,
        }
    }
}

fn default_error_name(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("Unknown")
        .replace(' ', "")
}

/// Whether a getRecord failure means "no record yet"
///
/// Current PDSes answer `RecordNotFound`, older ones `InvalidRequest`, so any
/// client error counts except auth failures. Transport and server errors do not.
fn is_missing_record(err: &AgentError) -> bool {
    matches!(
        err,
        AgentError::Xrpc { status, .. } if *status < 500 && *status != 401 && *status != 403
    )
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[async_trait]
impl Agent for XrpcAgent {
    async fn login(&self, params: LoginParams) -> Result<AtpSessionData> {
        let session: AtpSessionData = self
            .procedure("com.atproto.server.createSession", &params, Auth::None)
            .await?;

        tracing::debug!("Session created for {}", session.handle);
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn resume_session(&self, session: AtpSessionData) -> Result<()> {
        self.set_session(Some(session.clone()));

        let request = self
            .client
            .get(self.url("com.atproto.server.getSession"))
            .bearer_auth(&session.access_jwt);

        let result: Result<GetSessionOutput> = match request.send().await {
            Ok(response) => Self::handle_response(response).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(info) => {
                self.set_session(Some(AtpSessionData {
                    did: info.did,
                    handle: info.handle,
                    email: info.email.or(session.email),
                    ..session
                }));
                Ok(())
            }
            Err(e) => {
                self.set_session(None);
                Err(e)
            }
        }
    }

    async fn delete_session(&self) -> Result<()> {
        let result = self
            .procedure_no_output::<()>("com.atproto.server.deleteSession", None, Auth::Refresh)
            .await;
        self.set_session(None);
        result
    }

    fn has_session(&self) -> bool {
        self.session
            .read()
            .map(|s| s.is_some())
            .unwrap_or_else(|e| e.into_inner().is_some())
    }

    fn session(&self) -> Option<AtpSessionData> {
        self.session
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    async fn get_posts(&self, params: GetPostsParams, opts: CallOptions) -> Result<GetPostsOutput> {
        self.query("app.bsky.feed.getPosts", &params, &opts).await
    }

    async fn get_timeline(
        &self,
        params: GetTimelineParams,
        opts: CallOptions,
    ) -> Result<GetTimelineOutput> {
        self.query("app.bsky.feed.getTimeline", &params, &opts).await
    }

    async fn get_author_feed(
        &self,
        params: GetAuthorFeedParams,
        opts: CallOptions,
    ) -> Result<GetAuthorFeedOutput> {
        self.query("app.bsky.feed.getAuthorFeed", &params, &opts).await
    }

    async fn get_post_thread(
        &self,
        params: GetPostThreadParams,
        opts: CallOptions,
    ) -> Result<GetPostThreadOutput> {
        self.query("app.bsky.feed.getPostThread", &params, &opts).await
    }

    async fn get_likes(&self, params: GetLikesParams, opts: CallOptions) -> Result<GetLikesOutput> {
        self.query("app.bsky.feed.getLikes", &params, &opts).await
    }

    async fn get_reposted_by(
        &self,
        params: GetRepostedByParams,
        opts: CallOptions,
    ) -> Result<GetRepostedByOutput> {
        self.query("app.bsky.feed.getRepostedBy", &params, &opts).await
    }

    async fn post(&self, mut record: PostRecord) -> Result<RecordRef> {
        if record.created_at.is_none() {
            record.created_at = Some(now());
        }

        let mut value = serde_json::to_value(&record)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("$type".into(), COLLECTION_POST.into());
        }

        self.create_record(COLLECTION_POST, value).await
    }

    async fn delete_post(&self, post_uri: &str) -> Result<()> {
        self.delete_record(post_uri, COLLECTION_POST).await
    }

    async fn like(&self, uri: &str, cid: &str) -> Result<RecordRef> {
        self.subject_record(COLLECTION_LIKE, uri, cid).await
    }

    async fn delete_like(&self, like_uri: &str) -> Result<()> {
        self.delete_record(like_uri, COLLECTION_LIKE).await
    }

    async fn repost(&self, uri: &str, cid: &str) -> Result<RecordRef> {
        self.subject_record(COLLECTION_REPOST, uri, cid).await
    }

    async fn delete_repost(&self, repost_uri: &str) -> Result<()> {
        self.delete_record(repost_uri, COLLECTION_REPOST).await
    }

    async fn get_profile(
        &self,
        params: GetProfileParams,
        opts: CallOptions,
    ) -> Result<ProfileView> {
        self.query("app.bsky.actor.getProfile", &params, &opts).await
    }

    async fn get_follows(
        &self,
        params: GetFollowsParams,
        opts: CallOptions,
    ) -> Result<GetFollowsOutput> {
        self.query("app.bsky.graph.getFollows", &params, &opts).await
    }

    async fn get_followers(
        &self,
        params: GetFollowersParams,
        opts: CallOptions,
    ) -> Result<GetFollowersOutput> {
        self.query("app.bsky.graph.getFollowers", &params, &opts).await
    }

    async fn get_suggestions(
        &self,
        params: GetSuggestionsParams,
        opts: CallOptions,
    ) -> Result<GetSuggestionsOutput> {
        self.query("app.bsky.actor.getSuggestions", &params, &opts).await
    }

    async fn search_actors(
        &self,
        params: SearchActorsParams,
        opts: CallOptions,
    ) -> Result<SearchActorsOutput> {
        self.query("app.bsky.actor.searchActors", &params, &opts).await
    }

    async fn search_actors_typeahead(
        &self,
        params: SearchActorsParams,
        opts: CallOptions,
    ) -> Result<SearchActorsOutput> {
        let params = SearchActorsParams {
            cursor: None,
            ..params
        };
        self.query("app.bsky.actor.searchActorsTypeahead", &params, &opts)
            .await
    }

    async fn follow(&self, subject_did: &str) -> Result<RecordRef> {
        let record = serde_json::json!({
            "$type": COLLECTION_FOLLOW,
            "subject": subject_did,
            "createdAt": now(),
        });

        self.create_record(COLLECTION_FOLLOW, record).await
    }

    async fn delete_follow(&self, follow_uri: &str) -> Result<()> {
        self.delete_record(follow_uri, COLLECTION_FOLLOW).await
    }

    async fn mute(&self, actor: &str) -> Result<()> {
        let body = serde_json::json!({ "actor": actor });
        self.procedure_no_output("app.bsky.graph.muteActor", Some(&body), Auth::Access)
            .await
    }

    async fn unmute(&self, actor: &str) -> Result<()> {
        let body = serde_json::json!({ "actor": actor });
        self.procedure_no_output("app.bsky.graph.unmuteActor", Some(&body), Auth::Access)
            .await
    }

    async fn upsert_profile(&self, update: ProfileUpdateFn) -> Result<()> {
        let repo = self.session_did()?;

        let lookup = RecordLookup {
            repo: repo.clone(),
            collection: COLLECTION_PROFILE,
            rkey: "self",
        };

        let existing: Option<GetRecordOutput<ProfileRecord>> = match self
            .query("com.atproto.repo.getRecord", &lookup, &CallOptions::default())
            .await
        {
            Ok(record) => Some(record),
            Err(ref e) if is_missing_record(e) => {
                tracing::debug!("No existing profile record for {}: {}", repo, e);
                None
            }
            Err(e) => return Err(e),
        };

        let (swap, existing) = match existing {
            Some(r) => (r.cid, Some(r.value)),
            None => (None, None),
        };

        let updated = update(existing);

        let mut record = serde_json::to_value(&updated)?;
        if let Some(obj) = record.as_object_mut() {
            obj.insert("$type".into(), COLLECTION_PROFILE.into());
        }

        let mut body = serde_json::json!({
            "repo": repo,
            "collection": COLLECTION_PROFILE,
            "rkey": "self",
            "record": record,
        });
        if let (Some(obj), Some(cid)) = (body.as_object_mut(), swap) {
            obj.insert("swapRecord".into(), cid.into());
        }

        self.procedure_no_output("com.atproto.repo.putRecord", Some(&body), Auth::Access)
            .await
    }

    async fn upload_blob(
        &self,
        data: Vec<u8>,
        opts: UploadBlobOptions,
    ) -> Result<UploadBlobOutput> {
        tracing::trace!("XRPC upload {} bytes as {}", data.len(), opts.encoding);

        let request = self
            .client
            .post(self.url("com.atproto.repo.uploadBlob"))
            .header(header::CONTENT_TYPE, opts.encoding.as_str())
            .body(data);
        let request = Self::apply_call_options(self.authorize(request, Auth::Access)?, &opts.call);

        let response = request.send().await?;
        Self::handle_response(response).await
    }
}

/// com.atproto.repo.getRecord parameters
struct RecordLookup {
    repo: String,
    collection: &'static str,
    rkey: &'static str,
}

impl QueryParams for RecordLookup {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("repo", self.repo.clone()),
            ("collection", self.collection.to_string()),
            ("rkey", self.rkey.to_string()),
        ]
    }
}
