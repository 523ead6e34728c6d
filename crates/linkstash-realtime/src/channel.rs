//! Live bookmark channel with the subscription state machine.

use crate::messages::Frame;
use crate::{RealtimeError, RealtimeResult};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Realtime channel configuration.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Backend project URL (e.g., `https://xyz.supabase.co`).
    pub api_url: String,
    /// Anon API key, passed as a socket query parameter.
    pub anon_key: String,
    /// Heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
}

impl RealtimeConfig {
    /// Create a config with the default heartbeat interval.
    pub fn new(api_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            anon_key: anon_key.into(),
            heartbeat_interval_secs: 30,
        }
    }

    /// The WebSocket endpoint, derived from the project URL.
    pub fn socket_url(&self) -> String {
        let ws_base = self
            .api_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        format!(
            "{}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            ws_base, self.anon_key
        )
    }
}

/// Channel lifecycle state.
///
/// `Closed` is terminal: a closed channel is never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Unsubscribed,
    Subscribing,
    Subscribed,
    Closed,
}

/// A payload-free change notice.
///
/// The notice deliberately carries no row data: delivery is at-least-once
/// and unordered, so the consumer answers every notice with a full refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeNotice;

/// Outcome of checking whether a subscribe call may proceed.
#[derive(Debug, PartialEq, Eq)]
enum SubscribeDecision {
    /// No channel is active; open one.
    Open,
    /// A channel for this user is already opening or open; no-op.
    AlreadyActive,
}

/// Decide how a subscribe call for `user_id` is handled in `state`.
fn subscribe_decision(
    state: ChannelState,
    active_user: Option<&str>,
    user_id: &str,
) -> RealtimeResult<SubscribeDecision> {
    match state {
        ChannelState::Closed => Err(RealtimeError::Closed),
        ChannelState::Unsubscribed => Ok(SubscribeDecision::Open),
        ChannelState::Subscribing | ChannelState::Subscribed => match active_user {
            Some(active) if active == user_id => Ok(SubscribeDecision::AlreadyActive),
            Some(active) => Err(RealtimeError::ActiveForOtherUser(active.to_string())),
            // A live channel always has an owner; treat the gap as closed.
            None => Err(RealtimeError::Closed),
        },
    }
}

/// One live, filtered subscription to the current user's bookmark rows.
///
/// At most one channel is active per instance. [`subscribe`](Self::subscribe)
/// is idempotent per user; [`close`](Self::close) unconditionally releases
/// the socket and is safe to call from any state.
pub struct BookmarkChannel {
    config: RealtimeConfig,
    state: Arc<RwLock<ChannelState>>,
    user: Arc<RwLock<Option<String>>>,
    notice_tx: mpsc::Sender<ChangeNotice>,
    writer: Arc<Mutex<Option<mpsc::Sender<Message>>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    next_ref: Arc<AtomicU64>,
}

impl BookmarkChannel {
    /// Create a channel and the receiver its change notices arrive on.
    pub fn new(config: RealtimeConfig) -> (Self, mpsc::Receiver<ChangeNotice>) {
        let (notice_tx, notice_rx) = mpsc::channel(16);
        let channel = Self {
            config,
            state: Arc::new(RwLock::new(ChannelState::Unsubscribed)),
            user: Arc::new(RwLock::new(None)),
            notice_tx,
            writer: Arc::new(Mutex::new(None)),
            tasks: Mutex::new(Vec::new()),
            next_ref: Arc::new(AtomicU64::new(1)),
        };
        (channel, notice_rx)
    }

    /// Get the current channel state.
    pub async fn state(&self) -> ChannelState {
        *self.state.read().await
    }

    /// Open the channel for `user_id`.
    ///
    /// Returns immediately after the join frame is queued; the transition to
    /// `Subscribed` happens asynchronously when the backend acknowledges the
    /// join. Calling again for the same user while the channel is opening or
    /// open is a no-op.
    pub async fn subscribe(&self, user_id: &str, access_token: &str) -> RealtimeResult<()> {
        // Check-and-set under one guard: two racing subscribes must not both
        // observe Unsubscribed and open a socket each.
        {
            let mut state = self.state.write().await;
            let mut user = self.user.write().await;
            match subscribe_decision(*state, user.as_deref(), user_id)? {
                SubscribeDecision::AlreadyActive => {
                    debug!(user_id = %user_id, "Channel already active");
                    return Ok(());
                }
                SubscribeDecision::Open => {
                    *state = ChannelState::Subscribing;
                    *user = Some(user_id.to_string());
                }
            }
        }

        let socket_url = self.config.socket_url();
        debug!(user_id = %user_id, "Opening realtime channel");

        let (ws_stream, _) = match connect_async(socket_url).await {
            Ok(ok) => ok,
            Err(e) => {
                *self.state.write().await = ChannelState::Unsubscribed;
                *self.user.write().await = None;
                return Err(e.into());
            }
        };
        let (mut write, mut read) = ws_stream.split();

        let (frame_tx, mut frame_rx) = mpsc::channel::<Message>(64);
        *self.writer.lock().await = Some(frame_tx.clone());

        let writer_task = tokio::spawn(async move {
            while let Some(msg) = frame_rx.recv().await {
                if write.send(msg).await.is_err() {
                    break;
                }
            }
        });

        let join = Frame::join(user_id, access_token, self.next_ref()).to_json()?;
        frame_tx
            .send(Message::Text(join.into()))
            .await
            .map_err(|e| RealtimeError::Send(e.to_string()))?;

        let heartbeat_tx = frame_tx.clone();
        let heartbeat_interval = self.config.heartbeat_interval_secs;
        let heartbeat_refs = self.next_ref.clone();
        let heartbeat_task = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(heartbeat_interval));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let reference = heartbeat_refs.fetch_add(1, Ordering::Relaxed);
                let Ok(frame) = Frame::heartbeat(reference).to_json() else {
                    break;
                };
                if heartbeat_tx.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
        });

        let state = self.state.clone();
        let notice_tx = self.notice_tx.clone();
        let writer = self.writer.clone();
        let pong_tx = frame_tx.clone();
        let user = user_id.to_string();
        let read_task = tokio::spawn(async move {
            while let Some(msg_result) = read.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => match Frame::from_json(&text) {
                        Ok(frame) => {
                            if frame.is_join_ack(&user) {
                                let mut state = state.write().await;
                                if *state == ChannelState::Subscribing {
                                    *state = ChannelState::Subscribed;
                                    info!(user_id = %user, "Realtime channel subscribed");
                                }
                            } else if frame.is_change() {
                                debug!(kind = ?frame.change_kind(), "Bookmark change notice");
                                let _ = notice_tx.send(ChangeNotice).await;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Unparseable realtime frame");
                        }
                    },
                    Ok(Message::Ping(data)) => {
                        let _ = pong_tx.send(Message::Pong(data)).await;
                    }
                    Ok(Message::Close(_)) => {
                        info!("Realtime socket closed by server");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "Realtime socket error");
                        break;
                    }
                }
            }

            // Any exit of the read loop ends the channel's life.
            *state.write().await = ChannelState::Closed;
            *writer.lock().await = None;
        });

        let mut tasks = self.tasks.lock().await;
        tasks.push(writer_task);
        tasks.push(heartbeat_task);
        tasks.push(read_task);

        Ok(())
    }

    /// Close the channel and release the socket.
    ///
    /// Sends a best-effort leave frame, stops all channel tasks, and leaves
    /// the state `Closed`. Safe to call repeatedly and from any state.
    pub async fn close(&self) {
        let user = self.user.write().await.take();

        if let Some(tx) = self.writer.lock().await.take() {
            if let Some(user) = &user {
                if let Ok(leave) = Frame::leave(user, self.next_ref()).to_json() {
                    let _ = tx.send(Message::Text(leave.into())).await;
                }
            }
        }

        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }

        *self.state.write().await = ChannelState::Closed;
        info!("Realtime channel closed");
    }

    fn next_ref(&self) -> u64 {
        self.next_ref.fetch_add(1, Ordering::Relaxed)
    }
}
