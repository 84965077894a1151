//! Demo commands
//!
//! Each command runs one facade operation and renders the result.

use anyhow::Context;
use atkit_core::*;
use clap::Subcommand;
use serde::Serialize;
use tracing::info;

/// Demo subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the home timeline
    Timeline {
        /// Number of items to fetch
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Show an actor's posts
    AuthorFeed {
        /// Handle or DID
        actor: String,
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Show a post thread
    Thread {
        /// AT-URI of the post
        uri: String,
    },

    /// Show a profile
    Profile {
        /// Handle or DID
        actor: String,
    },

    /// List an actor's followers
    Followers {
        actor: String,
        #[arg(short, long, default_value = "50")]
        limit: u32,
    },

    /// List the accounts an actor follows
    Follows {
        actor: String,
        #[arg(short, long, default_value = "50")]
        limit: u32,
    },

    /// List the actors who liked a post
    Likes {
        /// AT-URI of the post
        uri: String,
    },

    /// Search actors
    Search {
        query: String,
        /// Prefix search
        #[arg(long)]
        typeahead: bool,
        #[arg(short, long, default_value = "25")]
        limit: u32,
    },

    /// Show suggested actors
    Suggestions {
        #[arg(short, long, default_value = "25")]
        limit: u32,
    },

    /// Create a post
    Post {
        text: String,
    },

    /// Like a post
    Like {
        uri: String,
        cid: String,
    },

    /// Remove the viewer's like from a post
    Unlike {
        /// AT-URI of the liked post
        uri: String,
    },

    /// Repost a post
    Repost {
        uri: String,
        cid: String,
    },

    /// Follow an actor
    Follow {
        did: String,
    },

    /// Unfollow an actor
    Unfollow {
        did: String,
    },

    /// Mute an actor
    Mute {
        did: String,
    },

    /// Unmute an actor
    Unmute {
        did: String,
    },

    /// Set the viewer's display name and description
    SetProfile {
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
}

impl Commands {
    /// Whether the command needs an authenticated session
    pub fn requires_login(&self) -> bool {
        !matches!(
            self,
            Commands::AuthorFeed { .. }
                | Commands::Thread { .. }
                | Commands::Profile { .. }
                | Commands::Followers { .. }
                | Commands::Follows { .. }
                | Commands::Likes { .. }
        )
    }
}

/// Execute a command against the facade and render its output
pub async fn execute_command<A: Agent>(
    atkit: &AtkitBsky<A>,
    command: Commands,
    json: bool,
) -> anyhow::Result<String> {
    match command {
        Commands::Timeline { limit } => {
            let params = GetTimelineParams {
                limit: Some(limit),
                ..Default::default()
            };
            let data = atkit.get_timeline(params, CallOptions::default()).await?;
            render(json, &data, || format_feed(&data.feed))
        }

        Commands::AuthorFeed { actor, limit } => {
            let data = atkit
                .get_author_feed(
                    ActorListParams::new(actor).with_limit(limit),
                    CallOptions::default(),
                )
                .await?;
            render(json, &data, || format_feed(&data.feed))
        }

        Commands::Thread { uri } => {
            let data = atkit
                .get_post_thread(GetPostThreadParams::new(uri), CallOptions::default())
                .await?;
            render(json, &data, || format_thread(&data.thread, 0))
        }

        Commands::Profile { actor } => {
            let data = atkit
                .get_profile(GetProfileParams::new(actor), CallOptions::default())
                .await?;
            render(json, &data, || format_profile(&data))
        }

        Commands::Followers { actor, limit } => {
            let data = atkit
                .get_followers(
                    ActorListParams::new(actor).with_limit(limit),
                    CallOptions::default(),
                )
                .await?;
            render(json, &data, || format_actors(&data.followers))
        }

        Commands::Follows { actor, limit } => {
            let data = atkit
                .get_follows(ActorListParams::new(actor).with_limit(limit), CallOptions::default())
                .await?;
            render(json, &data, || format_actors(&data.follows))
        }

        Commands::Likes { uri } => {
            let data = atkit.get_likes(PostActorsParams::new(uri), CallOptions::default()).await?;
            let actors: Vec<ProfileView> = data.likes.iter().map(|l| l.actor.clone()).collect();
            render(json, &data, || format_actors(&actors))
        }

        Commands::Search {
            query,
            typeahead,
            limit,
        } => {
            let params = SearchActorsParams {
                limit: Some(limit),
                ..SearchActorsParams::new(query)
            };
            let data = if typeahead {
                atkit.search_actors_typeahead(params, CallOptions::default()).await?
            } else {
                atkit.search_actors(params, CallOptions::default()).await?
            };
            render(json, &data, || format_actors(&data.actors))
        }

        Commands::Suggestions { limit } => {
            let params = GetSuggestionsParams {
                limit: Some(limit),
                ..Default::default()
            };
            let data = atkit.get_suggestions(params, CallOptions::default()).await?;
            render(json, &data, || format_actors(&data.actors))
        }

        Commands::Post { text } => {
            let created = atkit.create_post(PostRecord::text(text)).await?;
            render(json, &created, || format!("Posted {}", created.uri))
        }

        Commands::Like { uri, cid } => {
            let like = atkit.like((uri, cid)).await?;
            render(json, &like, || format!("Liked: {}", like.uri))
        }

        Commands::Unlike { uri } => {
            let post = fetch_post(atkit, &uri).await?;
            atkit.delete_like(post).await?;
            Ok(format!("Like removed from {}", uri))
        }

        Commands::Repost { uri, cid } => {
            let repost = atkit.repost((uri, cid)).await?;
            render(json, &repost, || format!("Reposted: {}", repost.uri))
        }

        Commands::Follow { did } => {
            let follow = atkit.follow(did).await?;
            render(json, &follow, || format!("Following: {}", follow.uri))
        }

        Commands::Unfollow { did } => {
            let profile = atkit
                .get_profile(GetProfileParams::new(did), CallOptions::default())
                .await?;
            let handle = profile.handle.clone();
            atkit.delete_follow(profile).await?;
            Ok(format!("Unfollowed @{}", handle))
        }

        Commands::Mute { did } => {
            atkit.mute(did.as_str()).await?;
            Ok(format!("Muted {}", did))
        }

        Commands::Unmute { did } => {
            atkit.unmute(did.as_str()).await?;
            Ok(format!("Unmuted {}", did))
        }

        Commands::SetProfile {
            display_name,
            description,
        } => {
            atkit
                .upsert_profile(move |existing| {
                    let mut record = existing.unwrap_or_default();
                    if display_name.is_some() {
                        record.display_name = display_name;
                    }
                    if description.is_some() {
                        record.description = description;
                    }
                    record
                })
                .await?;
            Ok("Profile updated".to_string())
        }
    }
}

/// Fetch a post so the entity form of an operation sees its viewer markers
async fn fetch_post<A: Agent>(atkit: &AtkitBsky<A>, uri: &str) -> anyhow::Result<PostView> {
    info!("Fetching {}", uri);
    atkit
        .get_posts(GetPostsParams::new([uri]), CallOptions::default())
        .await?;
    atkit
        .post(uri)
        .with_context(|| format!("post not found: {}", uri))
}

fn render<T, F>(json: bool, data: &T, text: F) -> anyhow::Result<String>
where
    T: Serialize,
    F: FnOnce() -> String,
{
    if json {
        Ok(serde_json::to_string_pretty(data)?)
    } else {
        Ok(text())
    }
}

// ==================== Formatting ====================

fn format_post(post: &PostView, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    let name = post
        .author
        .display_name
        .as_deref()
        .unwrap_or(&post.author.handle);
    format!(
        "{pad}{} (@{})\n{pad}  {}\n{pad}  likes {} · reposts {} · replies {}\n{pad}  {}",
        name,
        post.author.handle,
        post.text().unwrap_or(""),
        post.like_count.unwrap_or(0),
        post.repost_count.unwrap_or(0),
        post.reply_count.unwrap_or(0),
        post.uri,
    )
}

fn format_feed(feed: &[FeedViewPost]) -> String {
    if feed.is_empty() {
        return "No posts".to_string();
    }
    feed.iter()
        .map(|item| format_post(&item.post, 0))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_thread(node: &ThreadNode, depth: usize) -> String {
    match node {
        ThreadNode::Post(thread) => {
            let mut out = format_post(&thread.post, depth);
            for reply in thread.replies.iter().flatten() {
                out.push_str("\n\n");
                out.push_str(&format_thread(reply, depth + 1));
            }
            out
        }
        ThreadNode::NotFound { uri, .. } => format!("{}[not found] {}", "  ".repeat(depth), uri),
        ThreadNode::Blocked { uri, .. } => format!("{}[blocked] {}", "  ".repeat(depth), uri),
    }
}

fn format_profile(profile: &ProfileView) -> String {
    let mut out = format!(
        "{} (@{})\n{}",
        profile.display_name.as_deref().unwrap_or(&profile.handle),
        profile.handle,
        profile.did,
    );
    if let Some(description) = &profile.description {
        out.push_str(&format!("\n\n{}", description));
    }
    out.push_str(&format!(
        "\n\nfollowers {} · follows {} · posts {}",
        profile.followers_count.unwrap_or(0),
        profile.follows_count.unwrap_or(0),
        profile.posts_count.unwrap_or(0),
    ));
    out
}

fn format_actors(actors: &[ProfileView]) -> String {
    if actors.is_empty() {
        return "No actors".to_string();
    }
    actors
        .iter()
        .map(|a| format!("@{:<32} {}", a.handle, a.display_name.as_deref().unwrap_or("")))
        .collect::<Vec<_>>()
        .join("\n")
}
