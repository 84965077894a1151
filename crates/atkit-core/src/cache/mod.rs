//! Post and profile caches
//!
//! Both caches keep their map behind an `Arc` and copy on write, so a
//! snapshot handed to subscribers stays valid while the cache moves on.
//!
//! - Posts are keyed by AT-URI and replaced whole on merge.
//! - Profiles are keyed by DID and merged field by field: fields present in
//!   the incoming view overwrite, absent fields keep their cached value.

mod posts;
mod profiles;

pub use posts::{PostCache, PostMarker, PostSnapshot};
pub use profiles::{ProfileCache, ProfileSnapshot};

pub(crate) use profiles::revert_follow;
