//! Dashboard state and its controller.

use linkstash_store::{Bookmark, BookmarkStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::time::Duration;
use tracing::debug;

/// How long `add_success` stays set after a successful add.
pub const DEFAULT_SUCCESS_WINDOW: Duration = Duration::from_millis(2500);

/// Snapshot of the dashboard view state.
///
/// The item list is a read-through cache of backend state, never the source
/// of truth; it is replaced wholesale by every applied refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardState {
    /// The user's bookmarks, newest first.
    pub items: Vec<Bookmark>,
    /// Whether the initial fetch is still in flight.
    pub loading: bool,
    /// Last operation failure, user-visible.
    pub error: Option<String>,
    /// Id of the bookmark currently being deleted, if any.
    pub deleting_id: Option<String>,
    /// Transient success flag after an add; auto-clears.
    pub add_success: bool,
}

struct Inner {
    state: DashboardState,
    /// Whether any refresh has run; only the first one flashes `loading`.
    refreshed_once: bool,
    /// Monotonic id of the most recently issued refresh.
    last_issued: u64,
}

/// Controller owning the single mutable copy of the dashboard state.
///
/// All operations convert failures into the `error` field; nothing
/// propagates to the rendering layer and nothing is retried. Cloning the
/// controller shares the same state.
pub struct DashboardController<S> {
    store: Arc<S>,
    inner: Arc<Mutex<Inner>>,
    changed_tx: broadcast::Sender<()>,
    closed: Arc<AtomicBool>,
    success_window: Duration,
}

impl<S> Clone for DashboardController<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            inner: self.inner.clone(),
            changed_tx: self.changed_tx.clone(),
            closed: self.closed.clone(),
            success_window: self.success_window,
        }
    }
}

impl<S: BookmarkStore + 'static> DashboardController<S> {
    /// Create a controller over the given store.
    pub fn new(store: Arc<S>) -> Self {
        let (changed_tx, _) = broadcast::channel(64);
        Self {
            store,
            inner: Arc::new(Mutex::new(Inner {
                state: DashboardState::default(),
                refreshed_once: false,
                last_issued: 0,
            })),
            changed_tx,
            closed: Arc::new(AtomicBool::new(false)),
            success_window: DEFAULT_SUCCESS_WINDOW,
        }
    }

    /// Override the `add_success` auto-clear window.
    pub fn with_success_window(mut self, window: Duration) -> Self {
        self.success_window = window;
        self
    }

    /// Register a listener; a `()` ping is sent on every state change.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.changed_tx.subscribe()
    }

    /// Current state snapshot.
    pub fn snapshot(&self) -> DashboardState {
        self.inner.lock().expect("lock poisoned").state.clone()
    }

    /// Detach the controller: no state is written after this call.
    ///
    /// In-flight operations complete but their results are discarded.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn notify(&self) {
        let _ = self.changed_tx.send(());
    }

    /// Re-fetch the list and replace `items`.
    ///
    /// Only the first call per controller flashes `loading`. Each call gets
    /// a fresh request id; a response is applied only if no newer request
    /// has been issued since (last-issued-wins), so a slow stale fetch never
    /// overwrites a later one.
    pub async fn refresh(&self) {
        if self.is_closed() {
            return;
        }

        let request_id = {
            let mut inner = self.inner.lock().expect("lock poisoned");
            inner.last_issued += 1;
            if !inner.refreshed_once {
                inner.refreshed_once = true;
                inner.state.loading = true;
            }
            inner.last_issued
        };
        self.notify();

        let result = self.store.list().await;

        if self.is_closed() {
            return;
        }

        {
            let mut inner = self.inner.lock().expect("lock poisoned");
            if request_id < inner.last_issued {
                debug!(request_id, "Discarding superseded refresh");
                return;
            }

            match result {
                Ok(items) => {
                    // A deleting id that vanished from the list is done.
                    if let Some(deleting) = &inner.state.deleting_id {
                        if !items.iter().any(|b| &b.id == deleting) {
                            inner.state.deleting_id = None;
                        }
                    }
                    inner.state.items = items;
                    inner.state.loading = false;
                }
                Err(e) => {
                    inner.state.loading = false;
                    inner.state.error = Some(e.to_string());
                }
            }
        }
        self.notify();
    }

    /// Validate and add a bookmark, then refresh.
    ///
    /// On success `add_success` is set for a fixed window and any previous
    /// error is cleared. On failure only `error` changes, so the rendering
    /// layer can keep the user's input for a retry.
    pub async fn add(&self, title: &str, url: &str) {
        if self.is_closed() {
            return;
        }

        match self.store.insert(title, url).await {
            Ok(bookmark) => {
                if self.is_closed() {
                    return;
                }
                debug!(id = %bookmark.id, "Bookmark added");
                {
                    let mut inner = self.inner.lock().expect("lock poisoned");
                    inner.state.error = None;
                    inner.state.add_success = true;
                }
                self.notify();
                self.spawn_success_clear();
                self.refresh().await;
            }
            Err(e) => {
                if self.is_closed() {
                    return;
                }
                {
                    let mut inner = self.inner.lock().expect("lock poisoned");
                    inner.state.error = Some(e.to_string());
                }
                self.notify();
            }
        }
    }

    /// Delete a bookmark, then refresh.
    ///
    /// `deleting_id` is set for the duration of the call and cleared on
    /// completion regardless of outcome. The row is never removed
    /// optimistically: a failed delete leaves the list visibly unchanged
    /// and sets `error`.
    pub async fn remove(&self, id: &str) {
        if self.is_closed() {
            return;
        }

        {
            let mut inner = self.inner.lock().expect("lock poisoned");
            inner.state.deleting_id = Some(id.to_string());
        }
        self.notify();

        let result = self.store.delete(id).await;

        if self.is_closed() {
            return;
        }

        let ok = {
            let mut inner = self.inner.lock().expect("lock poisoned");
            inner.state.deleting_id = None;
            match &result {
                Ok(()) => true,
                Err(e) => {
                    inner.state.error = Some(e.to_string());
                    false
                }
            }
        };
        self.notify();

        if ok {
            self.refresh().await;
        }
    }

    /// Clear `add_success` after the configured window.
    fn spawn_success_clear(&self) {
        let inner = self.inner.clone();
        let changed_tx = self.changed_tx.clone();
        let closed = self.closed.clone();
        let window = self.success_window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if closed.load(Ordering::SeqCst) {
                return;
            }
            let cleared = {
                let mut inner = inner.lock().expect("lock poisoned");
                if inner.state.add_success {
                    inner.state.add_success = false;
                    true
                } else {
                    false
                }
            };
            if cleared {
                let _ = changed_tx.send(());
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use linkstash_store::{validate_new, StoreError, StoreResult};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU64;
    use tokio::sync::oneshot;

    /// In-memory store double with optional gates for in-flight assertions.
    struct MemoryStore {
        rows: Mutex<Vec<Bookmark>>,
        next_id: AtomicU64,
        backend_inserts: AtomicU64,
        fail_insert: AtomicBool,
        fail_delete: AtomicBool,
        list_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
        delete_gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                rows: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                backend_inserts: AtomicU64::new(0),
                fail_insert: AtomicBool::new(false),
                fail_delete: AtomicBool::new(false),
                list_gates: Mutex::new(VecDeque::new()),
                delete_gate: Mutex::new(None),
            }
        }

        /// Make the next `list` call wait until the returned sender fires.
        fn gate_next_list(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.list_gates.lock().unwrap().push_back(rx);
            tx
        }

        /// Make the next `delete` call wait until the returned sender fires.
        fn gate_next_delete(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            *self.delete_gate.lock().unwrap() = Some(rx);
            tx
        }

        fn sorted_rows(&self) -> Vec<Bookmark> {
            let mut rows = self.rows.lock().unwrap().clone();
            rows.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| b.id.cmp(&a.id))
            });
            rows
        }
    }

    #[async_trait]
    impl BookmarkStore for MemoryStore {
        async fn list(&self) -> StoreResult<Vec<Bookmark>> {
            // Snapshot at call time, like a query that has already executed
            // server-side; the gate only delays delivery of the response.
            let rows = self.sorted_rows();
            let gate = self.list_gates.lock().unwrap().pop_front();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            Ok(rows)
        }

        async fn insert(&self, title: &str, url: &str) -> StoreResult<Bookmark> {
            let (title, url) = validate_new(title, url)?;

            self.backend_inserts.fetch_add(1, Ordering::SeqCst);
            if self.fail_insert.load(Ordering::SeqCst) {
                return Err(StoreError::Api("duplicate key value".to_string()));
            }

            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            let bookmark = Bookmark {
                id: format!("b{}", n),
                title,
                url,
                owner: "u1".to_string(),
                created_at: Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap()
                    + ChronoDuration::seconds(n as i64),
            };
            self.rows.lock().unwrap().push(bookmark.clone());
            Ok(bookmark)
        }

        async fn delete(&self, id: &str) -> StoreResult<()> {
            let gate = self.delete_gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(StoreError::Api("permission denied".to_string()));
            }
            self.rows.lock().unwrap().retain(|b| b.id != id);
            Ok(())
        }
    }

    fn make_controller() -> (DashboardController<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let controller = DashboardController::new(store.clone())
            .with_success_window(Duration::from_millis(20));
        (controller, store)
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn first_refresh_flashes_loading_later_ones_do_not() {
        let (controller, store) = make_controller();

        let release = store.gate_next_list();
        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.refresh().await }
        });
        settle().await;
        assert!(controller.snapshot().loading);

        release.send(()).unwrap();
        first.await.unwrap();
        assert!(!controller.snapshot().loading);

        let release = store.gate_next_list();
        let second = tokio::spawn({
            let controller = controller.clone();
            async move { controller.refresh().await }
        });
        settle().await;
        assert!(!controller.snapshot().loading);

        release.send(()).unwrap();
        second.await.unwrap();
    }

    #[tokio::test]
    async fn add_then_remove_scenario() {
        let (controller, _store) = make_controller();
        controller.refresh().await;
        assert!(controller.snapshot().items.is_empty());

        controller.add("GitHub", "https://github.com").await;

        let state = controller.snapshot();
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].title, "GitHub");
        assert_eq!(state.items[0].url, "https://github.com");
        assert_eq!(state.items[0].owner, "u1");
        assert!(state.add_success);
        assert!(state.error.is_none());

        // The success flag is transient.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!controller.snapshot().add_success);

        let id = controller.snapshot().items[0].id.clone();
        controller.remove(&id).await;

        let state = controller.snapshot();
        assert!(state.items.is_empty());
        assert!(state.deleting_id.is_none());
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn invalid_add_never_reaches_the_backend() {
        let (controller, store) = make_controller();

        controller.add("", "https://example.com").await;
        controller.add("   ", "https://example.com").await;
        controller.add("GitHub", "not a url").await;

        assert_eq!(store.backend_inserts.load(Ordering::SeqCst), 0);
        let state = controller.snapshot();
        assert!(state.error.is_some());
        assert!(state.items.is_empty());
        assert!(!state.add_success);
    }

    #[tokio::test]
    async fn backend_insert_failure_surfaces_message_and_changes_nothing() {
        let (controller, store) = make_controller();
        controller.add("GitHub", "https://github.com").await;
        assert_eq!(controller.snapshot().items.len(), 1);

        store.fail_insert.store(true, Ordering::SeqCst);
        controller.add("GitLab", "https://gitlab.com").await;

        let state = controller.snapshot();
        assert_eq!(state.items.len(), 1);
        assert!(!state.add_success);
        assert!(state.error.as_deref().unwrap().contains("duplicate key"));
    }

    #[tokio::test]
    async fn failed_delete_leaves_list_unchanged_and_sets_error() {
        let (controller, store) = make_controller();
        controller.add("GitHub", "https://github.com").await;
        let id = controller.snapshot().items[0].id.clone();

        store.fail_delete.store(true, Ordering::SeqCst);
        controller.remove(&id).await;

        let state = controller.snapshot();
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].id, id);
        assert!(state.deleting_id.is_none());
        assert!(state.error.as_deref().unwrap().contains("permission denied"));
    }

    #[tokio::test]
    async fn deleting_id_is_set_while_the_delete_is_in_flight() {
        let (controller, store) = make_controller();
        controller.add("GitHub", "https://github.com").await;
        let id = controller.snapshot().items[0].id.clone();

        let release = store.gate_next_delete();
        let removal = tokio::spawn({
            let controller = controller.clone();
            let id = id.clone();
            async move { controller.remove(&id).await }
        });
        settle().await;
        assert_eq!(controller.snapshot().deleting_id.as_deref(), Some(id.as_str()));

        release.send(()).unwrap();
        removal.await.unwrap();
        assert!(controller.snapshot().deleting_id.is_none());
    }

    #[tokio::test]
    async fn refresh_reconciles_stale_deleting_id() {
        let (controller, store) = make_controller();
        controller.add("GitHub", "https://github.com").await;
        let id = controller.snapshot().items[0].id.clone();

        let release = store.gate_next_delete();
        let removal = tokio::spawn({
            let controller = controller.clone();
            let id = id.clone();
            async move { controller.remove(&id).await }
        });
        settle().await;
        assert!(controller.snapshot().deleting_id.is_some());

        // The row vanishes via another session; a refresh arrives first.
        store.rows.lock().unwrap().clear();
        controller.refresh().await;

        let state = controller.snapshot();
        assert!(state.items.is_empty());
        assert!(state.deleting_id.is_none());

        release.send(()).unwrap();
        removal.await.unwrap();
    }

    #[tokio::test]
    async fn repeated_refresh_with_no_change_is_idempotent() {
        let (controller, _store) = make_controller();
        controller.add("One", "https://one.example").await;
        controller.add("Two", "https://two.example").await;

        controller.refresh().await;
        let first = controller.snapshot().items;
        controller.refresh().await;
        let second = controller.snapshot().items;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn list_is_sorted_newest_first() {
        let (controller, _store) = make_controller();
        controller.add("One", "https://one.example").await;
        controller.add("Two", "https://two.example").await;
        controller.add("Three", "https://three.example").await;

        let titles: Vec<_> = controller
            .snapshot()
            .items
            .iter()
            .map(|b| b.title.clone())
            .collect();
        assert_eq!(titles, vec!["Three", "Two", "One"]);

        let items = controller.snapshot().items;
        assert!(items.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn stale_refresh_response_never_overwrites_a_newer_one() {
        let (controller, store) = make_controller();
        controller.add("Old", "https://old.example").await;

        // Refresh A is issued first but resolves last.
        let release_a = store.gate_next_list();
        let refresh_a = tokio::spawn({
            let controller = controller.clone();
            async move { controller.refresh().await }
        });
        settle().await;

        // Refresh B is issued second and resolves immediately against the
        // updated backend contents.
        store.rows.lock().unwrap().clear();
        controller.refresh().await;
        assert!(controller.snapshot().items.is_empty());

        // A's stale response (captured before the clear) must be discarded.
        release_a.send(()).unwrap();
        refresh_a.await.unwrap();
        assert!(controller.snapshot().items.is_empty());
    }

    #[tokio::test]
    async fn no_state_writes_after_close() {
        let (controller, store) = make_controller();
        controller.add("GitHub", "https://github.com").await;
        let before = controller.snapshot();

        // The in-flight refresh sees an empty backend, so applying its
        // response after close would visibly change the state.
        store.rows.lock().unwrap().clear();
        let release = store.gate_next_list();
        let in_flight = tokio::spawn({
            let controller = controller.clone();
            async move { controller.refresh().await }
        });
        settle().await;

        controller.close();
        release.send(()).unwrap();
        in_flight.await.unwrap();

        assert_eq!(controller.snapshot(), before);

        // Closed controllers also ignore new operations.
        controller.add("Late", "https://late.example").await;
        controller.remove("b1").await;
        assert_eq!(controller.snapshot(), before);
    }

    #[tokio::test]
    async fn listeners_are_pinged_on_changes() {
        let (controller, _store) = make_controller();
        let mut listener = controller.subscribe();

        controller.refresh().await;
        assert!(listener.try_recv().is_ok());
    }
}
