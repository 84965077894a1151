//! Post cache

use atkit_client::{FeedViewPost, PostView, PostViewerState, ProfileView, ThreadNode};
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable view of the post cache, keyed by post URI
pub type PostSnapshot = Arc<HashMap<String, PostView>>;

/// Viewer marker on a post together with the counter it drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostMarker {
    Like,
    Repost,
}

impl PostMarker {
    fn marker(self, viewer: &PostViewerState) -> Option<&str> {
        match self {
            PostMarker::Like => viewer.like.as_deref(),
            PostMarker::Repost => viewer.repost.as_deref(),
        }
    }

    fn marker_mut(self, viewer: &mut PostViewerState) -> &mut Option<String> {
        match self {
            PostMarker::Like => &mut viewer.like,
            PostMarker::Repost => &mut viewer.repost,
        }
    }

    fn counter_mut(self, post: &mut PostView) -> &mut Option<u64> {
        match self {
            PostMarker::Like => &mut post.like_count,
            PostMarker::Repost => &mut post.repost_count,
        }
    }

    /// Set the marker to `record_uri` and bump the counter (missing counts as zero)
    fn apply(self, post: &mut PostView, record_uri: &str) {
        let viewer = post.viewer.get_or_insert_with(PostViewerState::default);
        *self.marker_mut(viewer) = Some(record_uri.to_string());

        let counter = self.counter_mut(post);
        *counter = Some(counter.unwrap_or(0) + 1);
    }

    /// Clear the marker and drop the counter by one, never below zero
    fn revert(self, post: &mut PostView) {
        if let Some(viewer) = post.viewer.as_mut() {
            *self.marker_mut(viewer) = None;
        }

        let counter = self.counter_mut(post);
        *counter = Some(counter.unwrap_or(0).saturating_sub(1));
    }
}

/// Cache of post views keyed by URI
#[derive(Debug, Clone, Default)]
pub struct PostCache {
    posts: PostSnapshot,
}

impl PostCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cheap snapshot of the current contents
    pub fn snapshot(&self) -> PostSnapshot {
        Arc::clone(&self.posts)
    }

    pub fn get(&self, uri: &str) -> Option<&PostView> {
        self.posts.get(uri)
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.posts.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    fn map_mut(&mut self) -> &mut HashMap<String, PostView> {
        Arc::make_mut(&mut self.posts)
    }

    fn insert(&mut self, post: &PostView, authors: &mut Vec<ProfileView>) {
        authors.push(post.author.clone());
        self.map_mut().insert(post.uri.clone(), post.clone());
    }

    /// Merge a flat post list; returns the authors to merge into the profile cache
    pub fn merge_posts(&mut self, posts: &[PostView]) -> Vec<ProfileView> {
        let mut authors = Vec::with_capacity(posts.len());
        for post in posts {
            self.insert(post, &mut authors);
        }
        authors
    }

    /// Merge feed items, including the root and parent of replies.
    /// Not-found and blocked reply members are skipped.
    pub fn merge_feed(&mut self, feed: &[FeedViewPost]) -> Vec<ProfileView> {
        let mut authors = Vec::with_capacity(feed.len());
        for item in feed {
            self.insert(&item.post, &mut authors);

            if let Some(ref reply) = item.reply {
                for member in [&reply.root, &reply.parent] {
                    if let Some(post) = member.as_post() {
                        self.insert(post, &mut authors);
                    }
                }
            }
        }
        authors
    }

    /// Merge every post reachable in a thread: the anchor, its parent chain
    /// and all nested replies. Not-found and blocked nodes are skipped.
    pub fn merge_thread(&mut self, thread: &ThreadNode) -> Vec<ProfileView> {
        let mut authors = Vec::new();
        let mut stack = vec![thread];

        while let Some(node) = stack.pop() {
            let ThreadNode::Post(view) = node else {
                continue;
            };

            self.insert(&view.post, &mut authors);

            if let Some(ref parent) = view.parent {
                stack.push(parent.as_ref());
            }
            if let Some(ref replies) = view.replies {
                stack.extend(replies.iter().rev());
            }
        }

        authors
    }

    /// Drop a post; absent URIs are fine
    pub fn remove(&mut self, uri: &str) -> Option<PostView> {
        if !self.posts.contains_key(uri) {
            return None;
        }
        self.map_mut().remove(uri)
    }

    /// Record a new like/repost on a cached post. Returns false on cache miss.
    pub fn apply_marker(&mut self, uri: &str, marker: PostMarker, record_uri: &str) -> bool {
        if !self.posts.contains_key(uri) {
            return false;
        }
        match self.map_mut().get_mut(uri) {
            Some(post) => {
                marker.apply(post, record_uri);
                true
            }
            None => false,
        }
    }

    /// Undo a like/repost on the cached post with the given URI
    pub fn revert_marker(&mut self, uri: &str, marker: PostMarker) -> bool {
        if !self.posts.contains_key(uri) {
            return false;
        }
        match self.map_mut().get_mut(uri) {
            Some(post) => {
                marker.revert(post);
                true
            }
            None => false,
        }
    }

    /// Undo a like/repost on whichever cached post carries `record_uri` as
    /// its marker. Only the first match is updated.
    pub fn revert_marker_by_record(&mut self, marker: PostMarker, record_uri: &str) -> bool {
        let uri = self.posts.iter().find_map(|(uri, post)| {
            post.viewer
                .as_ref()
                .and_then(|v| marker.marker(v))
                .filter(|m| *m == record_uri)
                .map(|_| uri.clone())
        });

        match uri {
            Some(uri) => self.revert_marker(&uri, marker),
            None => false,
        }
    }
}
