//! atkit-demo: command-line walkthrough of the atkit Bluesky SDK
//!
//! Connects to a PDS, logs in when the command needs a session, runs one
//! facade operation and prints the result. Auth transitions and cache
//! changes are reported through the facade's subscriptions.

mod cli;
mod config;

use atkit_core::{AgentOptions, AtkitBsky};
use clap::Parser;
use tracing::{debug, error, info};

use cli::Commands;
use config::DemoConfig;

#[derive(Parser)]
#[command(name = "atkit-demo")]
#[command(about = "Command-line demo for the atkit Bluesky SDK")]
struct Cli {
    /// PDS or AppView service URL
    #[arg(short, long, env = "ATKIT_SERVICE", default_value = "https://bsky.social")]
    service: String,

    /// Handle, DID or email to log in with
    #[arg(short, long, env = "ATKIT_IDENTIFIER")]
    identifier: Option<String>,

    /// Account or app password
    #[arg(short, long, env = "ATKIT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "ATKIT_TIMEOUT_SECS", default_value = "30")]
    timeout_secs: u64,

    /// Print raw JSON responses
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn into_parts(self) -> (DemoConfig, Commands) {
        let config = DemoConfig {
            agent: AgentOptions {
                service: self.service,
                timeout_secs: self.timeout_secs,
                user_agent: Some(format!("atkit-demo/{}", env!("CARGO_PKG_VERSION"))),
            },
            identifier: self.identifier,
            password: self.password,
            json: self.json,
        };
        (config, self.command)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("atkit=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let (config, command) = Cli::parse().into_parts();

    info!("Service: {}", config.agent.service);
    debug!("Timeout: {}s", config.agent.timeout_secs);

    let atkit = AtkitBsky::new(config.agent.clone());

    let _auth = atkit.on_auth_state_changed(|state| info!("Auth state: {}", state));
    let _posts = atkit.on_posts_changed(|posts| debug!("Posts cached: {}", posts.len()));
    let _profiles =
        atkit.on_profiles_changed(|profiles| debug!("Profiles cached: {}", profiles.len()));

    if let Some(params) = config.login_params() {
        let session = atkit.login(params).await?;
        info!("Logged in as @{} ({})", session.handle, session.did);
    } else if command.requires_login() {
        anyhow::bail!(
            "this command needs --identifier and --password (or ATKIT_IDENTIFIER / ATKIT_PASSWORD)"
        );
    }

    let result = cli::execute_command(&atkit, command, config.json).await;

    if atkit.auth_state().is_logged_in() {
        if let Err(e) = atkit.logout().await {
            error!("Logout failed: {}", e);
        }
    }

    match result {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
