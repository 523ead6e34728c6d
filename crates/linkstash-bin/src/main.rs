//! Linkstash - bookmark manager backed by a hosted Postgres + auth service.

mod app;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use linkstash_core::{init_logging, Config, Paths};

/// Linkstash command-line interface.
#[derive(Parser)]
#[command(name = "linkstash")]
#[command(about = "Manage your bookmarks from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Base directory for runtime files (session, config). Defaults to ~/.linkstash
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in through the browser
    Login {
        /// OAuth provider to sign in with
        #[arg(long, default_value = "github")]
        provider: String,
    },
    /// Sign out and clear the stored session
    Logout,
    /// Show who is signed in
    Status,
    /// List your bookmarks
    List,
    /// Add a bookmark
    Add { title: String, url: String },
    /// Remove a bookmark by id
    Remove { id: String },
    /// Watch your bookmarks live, refreshing on remote changes
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;

    match cli.command {
        Commands::Login { provider } => {
            app::login(&config, &paths, &provider).await?;
        }
        Commands::Logout => {
            app::logout(&config, &paths).await?;
        }
        Commands::Status => {
            app::status(&config, &paths).await?;
        }
        Commands::List => {
            app::list(&config, &paths).await?;
        }
        Commands::Add { title, url } => {
            app::add(&config, &paths, &title, &url).await?;
        }
        Commands::Remove { id } => {
            app::remove(&config, &paths, &id).await?;
        }
        Commands::Watch => {
            app::watch(&config, &paths).await?;
        }
    }

    Ok(())
}
