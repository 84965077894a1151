//! Rust client for the Bluesky XRPC API
//!
//! Defines the [`Agent`] boundary that the atkit facade wraps, the record and
//! view types exchanged over it, and [`XrpcAgent`], an HTTP implementation.
//!
//! # Example
//!
//! ```rust,no_run
//! use atkit_client::{Agent, AgentOptions, LoginParams, XrpcAgent, CallOptions, GetTimelineParams};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let agent = XrpcAgent::new(AgentOptions {
//!     service: "https://bsky.social".into(),
//!     ..Default::default()
//! });
//!
//! agent.login(LoginParams::new("alice.bsky.social", "app-password")).await?;
//!
//! let timeline = agent
//!     .get_timeline(GetTimelineParams::default(), CallOptions::default())
//!     .await?;
//! println!("{} posts", timeline.feed.len());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod error;
pub mod types;
pub mod uri;
pub mod xrpc;

// Re-export main types
pub use agent::{Agent, ProfileUpdateFn};
pub use error::{AgentError, Result};
pub use types::*;
pub use uri::AtUri;
pub use xrpc::XrpcAgent;
