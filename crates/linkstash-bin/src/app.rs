//! Command implementations wiring the session guard, store, realtime
//! channel, and dashboard controller together.

use std::error::Error;
use std::sync::Arc;

use linkstash_auth::{CallbackResult, CallbackServer, FileSessionStorage, Session, SessionManager};
use linkstash_controller::{DashboardController, DashboardState};
use linkstash_core::{Config, Paths};
use linkstash_realtime::{BookmarkChannel, ChannelState, RealtimeConfig};
use linkstash_store::{BookmarkStore, SupabaseBookmarks};
use tracing::{info, warn};

type AppResult<T> = Result<T, Box<dyn Error>>;

fn session_manager(config: &Config, paths: &Paths) -> SessionManager {
    SessionManager::new(
        &config.supabase_url,
        &config.supabase_anon_key,
        Box::new(FileSessionStorage::new(paths.session_file())),
    )
}

/// Resolve the current session or fail with a sign-in hint.
async fn require_session(config: &Config, paths: &Paths) -> AppResult<Session> {
    match session_manager(config, paths).current_session().await? {
        Some(session) => Ok(session),
        None => Err("Not signed in. Run `linkstash login` first.".into()),
    }
}

fn bookmark_store(config: &Config, session: &Session) -> SupabaseBookmarks {
    SupabaseBookmarks::new(
        &config.supabase_url,
        &config.supabase_anon_key,
        &session.user_id,
        &session.access_token,
    )
}

/// Run the browser OAuth round trip and persist the resulting session.
pub async fn login(config: &Config, paths: &Paths, provider: &str) -> AppResult<()> {
    paths.ensure_dirs()?;

    let server = CallbackServer::with_defaults();
    let sign_in_url = server.sign_in_url(&config.supabase_url, provider);

    println!("Open this URL in your browser to sign in:");
    println!();
    println!("  {}", sign_in_url);
    println!();
    println!("Waiting for the sign-in to complete...");

    match server.wait_for_callback().await? {
        CallbackResult::Tokens {
            access_token,
            refresh_token,
            user_id,
            email,
            expires_in,
        } => {
            let manager = session_manager(config, paths);
            manager.store_session(
                &access_token,
                &refresh_token,
                &user_id,
                email.as_deref(),
                expires_in,
            )?;
            println!(
                "Signed in as {}",
                email.as_deref().unwrap_or(user_id.as_str())
            );
            Ok(())
        }
        CallbackResult::Failed(reason) => {
            warn!(reason = %reason, "Sign-in failed");
            Err(format!("Sign-in failed: {}", reason).into())
        }
    }
}

/// Sign out and clear the stored session.
pub async fn logout(config: &Config, paths: &Paths) -> AppResult<()> {
    session_manager(config, paths).sign_out().await?;
    println!("Signed out.");
    Ok(())
}

/// Print the signed-in identity, if any.
pub async fn status(config: &Config, paths: &Paths) -> AppResult<()> {
    match session_manager(config, paths).current_session().await? {
        Some(session) => {
            println!(
                "Signed in as {} ({})",
                session.email.as_deref().unwrap_or("unknown"),
                session.user_id
            );
        }
        None => println!("Not signed in."),
    }
    Ok(())
}

/// Print the user's bookmarks, newest first.
pub async fn list(config: &Config, paths: &Paths) -> AppResult<()> {
    let session = require_session(config, paths).await?;
    let store = bookmark_store(config, &session);

    let bookmarks = store.list().await?;
    if bookmarks.is_empty() {
        println!("No bookmarks yet. Add one with `linkstash add <title> <url>`.");
        return Ok(());
    }
    for bookmark in &bookmarks {
        println!("{}  {}  {}", bookmark.id, bookmark.title, bookmark.url);
    }
    Ok(())
}

/// Add a bookmark.
pub async fn add(config: &Config, paths: &Paths, title: &str, url: &str) -> AppResult<()> {
    let session = require_session(config, paths).await?;
    let store = bookmark_store(config, &session);

    let bookmark = store.insert(title, url).await?;
    println!("Added {} ({})", bookmark.title, bookmark.id);
    Ok(())
}

/// Remove a bookmark by id.
pub async fn remove(config: &Config, paths: &Paths, id: &str) -> AppResult<()> {
    let session = require_session(config, paths).await?;
    let store = bookmark_store(config, &session);

    store.delete(id).await?;
    println!("Removed {}", id);
    Ok(())
}

/// Live dashboard: render the list and refresh on every remote change.
///
/// Runs until Ctrl-C. The realtime channel carries no row data; every change
/// notice triggers a full refresh through the controller.
pub async fn watch(config: &Config, paths: &Paths) -> AppResult<()> {
    let session = require_session(config, paths).await?;
    let store = Arc::new(bookmark_store(config, &session));

    let controller = DashboardController::new(store);
    let mut changed = controller.subscribe();

    let (channel, mut notices) = BookmarkChannel::new(RealtimeConfig::new(
        &config.supabase_url,
        &config.supabase_anon_key,
    ));
    channel
        .subscribe(&session.user_id, &session.access_token)
        .await?;
    info!(user_id = %session.user_id, "Watching bookmarks");

    controller.refresh().await;

    // The channel never reconnects; a dropped socket parks it in Closed,
    // which the poll below surfaces to the user.
    let mut state_poll = tokio::time::interval(tokio::time::Duration::from_secs(5));
    state_poll.tick().await;

    loop {
        tokio::select! {
            Some(_) = notices.recv() => {
                controller.refresh().await;
            }
            result = changed.recv() => {
                if result.is_ok() {
                    render(&controller.snapshot());
                }
            }
            _ = state_poll.tick() => {
                if channel.state().await == ChannelState::Closed {
                    warn!("Realtime channel closed, live updates stopped");
                    println!("Connection lost; live updates stopped.");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    channel.close().await;
    controller.close();
    println!("Stopped watching.");
    Ok(())
}

fn render(state: &DashboardState) {
    // Clear the screen and repaint the whole list.
    print!("\x1b[2J\x1b[H");
    println!("linkstash — {} bookmark(s)", state.items.len());
    println!();

    if state.loading {
        println!("  Loading...");
    }
    for bookmark in &state.items {
        let marker = if state.deleting_id.as_deref() == Some(bookmark.id.as_str()) {
            " (deleting...)"
        } else {
            ""
        };
        println!("  {}  {}  {}{}", bookmark.id, bookmark.title, bookmark.url, marker);
    }
    if state.add_success {
        println!();
        println!("  Bookmark added.");
    }
    if let Some(error) = &state.error {
        println!();
        println!("  Error: {}", error);
    }
    println!();
    println!("Ctrl-C to quit");
}
