//! Profile cache

use atkit_client::{ProfileView, ProfileViewerState};
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable view of the profile cache, keyed by DID
pub type ProfileSnapshot = Arc<HashMap<String, ProfileView>>;

/// Shallow field-level merge of `incoming` over `stored`
///
/// Identity fields always take the incoming value. Optional fields are only
/// overwritten when present in `incoming`; `viewer` is replaced as a whole.
fn merge_into(stored: &mut ProfileView, incoming: ProfileView) {
    let ProfileView {
        did,
        handle,
        display_name,
        description,
        avatar,
        banner,
        followers_count,
        follows_count,
        posts_count,
        indexed_at,
        viewer,
        labels,
        extra,
    } = incoming;

    stored.did = did;
    stored.handle = handle;

    macro_rules! overwrite {
        ($($field:ident),*) => {
            $(
                if $field.is_some() {
                    stored.$field = $field;
                }
            )*
        };
    }

    overwrite!(
        display_name,
        description,
        avatar,
        banner,
        followers_count,
        follows_count,
        posts_count,
        indexed_at,
        viewer,
        labels
    );

    stored.extra.extend(extra);
}

/// Cache of profile views keyed by DID
#[derive(Debug, Clone, Default)]
pub struct ProfileCache {
    profiles: ProfileSnapshot,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cheap snapshot of the current contents
    pub fn snapshot(&self) -> ProfileSnapshot {
        Arc::clone(&self.profiles)
    }

    pub fn get(&self, did: &str) -> Option<&ProfileView> {
        self.profiles.get(did)
    }

    pub fn contains(&self, did: &str) -> bool {
        self.profiles.contains_key(did)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    fn map_mut(&mut self) -> &mut HashMap<String, ProfileView> {
        Arc::make_mut(&mut self.profiles)
    }

    fn cached_mut(&mut self, did: &str) -> Option<&mut ProfileView> {
        if !self.profiles.contains_key(did) {
            return None;
        }
        self.map_mut().get_mut(did)
    }

    /// Merge profiles field by field, in order
    pub fn merge_profiles<I>(&mut self, profiles: I)
    where
        I: IntoIterator<Item = ProfileView>,
    {
        let map = self.map_mut();
        for profile in profiles {
            match map.get_mut(&profile.did) {
                Some(stored) => merge_into(stored, profile),
                None => {
                    map.insert(profile.did.clone(), profile);
                }
            }
        }
    }

    /// Replace the entry for `profile.did` outright
    pub fn store(&mut self, profile: ProfileView) {
        self.map_mut().insert(profile.did.clone(), profile);
    }

    /// Record a new follow on a cached profile. Returns false on cache miss.
    pub fn apply_follow(&mut self, did: &str, follow_uri: &str) -> bool {
        match self.cached_mut(did) {
            Some(profile) => {
                profile.followers_count = Some(profile.followers_count.unwrap_or(0) + 1);
                profile
                    .viewer
                    .get_or_insert_with(ProfileViewerState::default)
                    .following = Some(follow_uri.to_string());
                true
            }
            None => false,
        }
    }

    /// Undo a follow on whichever cached profile carries `follow_uri`.
    /// Only the first match is updated.
    pub fn revert_follow_by_record(&mut self, follow_uri: &str) -> bool {
        let did = self.profiles.iter().find_map(|(did, profile)| {
            profile
                .viewer
                .as_ref()
                .and_then(|v| v.following.as_deref())
                .filter(|f| *f == follow_uri)
                .map(|_| did.clone())
        });

        match did.as_deref().and_then(|d| self.cached_mut(d)) {
            Some(profile) => {
                revert_follow(profile);
                true
            }
            None => false,
        }
    }

    /// Set the muted marker on a cached profile. Returns false on cache miss.
    pub fn set_muted(&mut self, did: &str, muted: bool) -> bool {
        match self.cached_mut(did) {
            Some(profile) => {
                profile
                    .viewer
                    .get_or_insert_with(ProfileViewerState::default)
                    .muted = Some(muted);
                true
            }
            None => false,
        }
    }
}

/// Clear the following marker and drop the follower count, never below zero
pub(crate) fn revert_follow(profile: &mut ProfileView) {
    profile.followers_count = Some(profile.followers_count.unwrap_or(0).saturating_sub(1));
    if let Some(viewer) = profile.viewer.as_mut() {
        viewer.following = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_level_merge_keeps_missing_fields() {
        let mut cache = ProfileCache::new();

        let mut detailed = ProfileView::new("did:a", "a.test");
        detailed.followers_count = Some(10);
        detailed.description = Some("bio".into());
        detailed.display_name = Some("Old".into());
        detailed.extra.insert("pinnedPost".into(), serde_json::json!("at://x"));
        cache.merge_profiles([detailed]);

        let mut basic = ProfileView::new("did:a", "renamed.test");
        basic.display_name = Some("New".into());
        basic.extra.insert("associated".into(), serde_json::json!({}));
        cache.merge_profiles([basic]);

        let merged = cache.get("did:a").unwrap();
        assert_eq!(merged.handle, "renamed.test");
        assert_eq!(merged.display_name.as_deref(), Some("New"));
        assert_eq!(merged.followers_count, Some(10));
        assert_eq!(merged.description.as_deref(), Some("bio"));
        assert!(merged.extra.contains_key("pinnedPost"));
        assert!(merged.extra.contains_key("associated"));
    }

    #[test]
    fn test_viewer_replaced_as_whole() {
        let mut cache = ProfileCache::new();
        let mut first = ProfileView::new("did:a", "a.test");
        first.viewer = Some(ProfileViewerState {
            muted: Some(true),
            following: Some("follow-1".into()),
            ..Default::default()
        });
        cache.merge_profiles([first]);

        let mut second = ProfileView::new("did:a", "a.test");
        second.viewer = Some(ProfileViewerState {
            muted: Some(false),
            ..Default::default()
        });
        cache.merge_profiles([second]);

        let viewer = cache.get("did:a").unwrap().viewer.clone().unwrap();
        assert_eq!(viewer.muted, Some(false));
        assert_eq!(viewer.following, None);
    }

    #[test]
    fn test_follow_round_trip() {
        let mut cache = ProfileCache::new();
        cache.merge_profiles([ProfileView::new("did:a", "a.test")]);

        assert!(cache.apply_follow("did:a", "follow-1"));
        let profile = cache.get("did:a").unwrap();
        assert_eq!(profile.followers_count, Some(1));
        assert_eq!(
            profile.viewer.as_ref().and_then(|v| v.following.as_deref()),
            Some("follow-1")
        );

        assert!(cache.revert_follow_by_record("follow-1"));
        let profile = cache.get("did:a").unwrap();
        assert_eq!(profile.followers_count, Some(0));
        assert_eq!(profile.viewer.as_ref().and_then(|v| v.following.as_deref()), None);

        assert!(!cache.revert_follow_by_record("follow-1"));
        assert!(!cache.apply_follow("did:missing", "follow-2"));
    }

    #[test]
    fn test_set_muted_only_on_cached() {
        let mut cache = ProfileCache::new();
        cache.merge_profiles([ProfileView::new("did:a", "a.test")]);

        assert!(cache.set_muted("did:a", true));
        assert_eq!(
            cache.get("did:a").unwrap().viewer.as_ref().and_then(|v| v.muted),
            Some(true)
        );
        assert!(!cache.set_muted("did:b", true));
        assert!(!cache.contains("did:b"));
    }
}
