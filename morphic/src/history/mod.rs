//! History reconciler - the sidebar's paginated chat list.
//!
//! Authenticated users page through the remote `/api/chats` API; anonymous
//! users get the capped local cache in one go. The current identity is
//! resolved on every load, so a sign-in or sign-out between loads switches
//! source without any invalidation.
//!
//! Replacing loads (initial load and refresh) bump a generation counter,
//! and a reload that resolves after a newer one started is dropped. Every
//! wholesale replacement of the list also bumps a counter kept in the
//! state. "Load more" captures it together with the offset and drops its
//! page if the list was replaced in the meantime, so a slow page never
//! lands on a refreshed list.

mod cache;
mod events;
mod identity;
mod notify;
mod source;
mod store;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::models::{ChatSummary, UserId};

pub use cache::{LocalChatCache, LOCAL_CACHE_LIMIT, STORAGE_KEY};
pub use events::{HistoryEvents, HistoryUpdated, CHAT_HISTORY_UPDATED};
pub use identity::{AuthServiceIdentity, FixedIdentity, IdentityResolver};
pub use notify::{ConsoleNotifier, LogNotifier, Notice, Notifier};
pub use source::{ChatSource, HttpChatSource};
pub use store::{FileStore, KeyValueStore, MemoryStore};

const LOAD_FAILED: &str = "Failed to load chat history";

/// Observable reconciler state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryState {
    /// Chats in display order, most recent first.
    pub chats: Vec<ChatSummary>,
    /// True while any page fetch is in flight, and before the first load.
    pub is_loading: bool,
    /// Offset of the next page. `Some(0)` before the first page, `None` once exhausted.
    pub next_offset: Option<u64>,
    /// True while a "load more" is running.
    pub is_pending: bool,
    active_loads: usize,
    replaced: u64,
}

impl Default for HistoryState {
    fn default() -> Self {
        Self {
            chats: Vec::new(),
            is_loading: true,
            next_offset: Some(0),
            is_pending: false,
            active_loads: 0,
            replaced: 0,
        }
    }
}

impl HistoryState {
    /// Empty only once loading is done and pagination has terminated.
    pub fn is_empty(&self) -> bool {
        !self.is_loading && self.chats.is_empty() && self.next_offset.is_none()
    }

    fn begin_load(&mut self) {
        self.active_loads += 1;
        self.is_loading = true;
    }

    fn end_load(&mut self) {
        self.active_loads = self.active_loads.saturating_sub(1);
        self.is_loading = self.active_loads > 0;
    }

    fn settle(&mut self) {
        self.is_loading = self.active_loads > 0;
    }

    fn replace(&mut self, chats: Vec<ChatSummary>, next_offset: Option<u64>) {
        self.chats = chats;
        self.next_offset = next_offset;
        self.replaced += 1;
    }
}

/// What a load operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The list was replaced wholesale.
    Replaced { count: usize },
    /// A page was appended.
    Appended { count: usize },
    /// Nothing to do: pagination finished or a load is already pending.
    Skipped,
    /// The list was replaced while this load was in flight; its result was dropped.
    Stale,
    /// The fetch failed; the user was notified and state is unchanged.
    Failed,
}

#[derive(Debug, Clone, Copy)]
enum Reload {
    Initial,
    Refresh,
}

impl Reload {
    const fn label(self) -> &'static str {
        match self {
            Self::Initial => "error loading initial chats",
            Self::Refresh => "error reloading chats",
        }
    }
}

/// Maintains the chat history list for one mounted sidebar.
pub struct HistoryReconciler {
    identity: Arc<dyn IdentityResolver>,
    source: Arc<dyn ChatSource>,
    cache: LocalChatCache,
    notifier: Arc<dyn Notifier>,
    state: Mutex<HistoryState>,
    generation: AtomicU64,
}

impl HistoryReconciler {
    pub fn new(
        identity: Arc<dyn IdentityResolver>,
        source: Arc<dyn ChatSource>,
        cache: LocalChatCache,
    ) -> Self {
        Self {
            identity,
            source,
            cache,
            notifier: Arc::new(LogNotifier),
            state: Mutex::new(HistoryState::default()),
            generation: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    fn state(&self) -> MutexGuard<'_, HistoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> HistoryState {
        self.state().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.state().is_empty()
    }

    /// First load after mounting.
    pub async fn load_initial(&self) -> LoadOutcome {
        self.reload(Reload::Initial).await
    }

    /// Full reload in response to [`HistoryUpdated`]. Never merges.
    pub async fn refresh(&self) -> LoadOutcome {
        self.reload(Reload::Refresh).await
    }

    async fn reload(&self, kind: Reload) -> LoadOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let user = self.identity.current_user_id().await;
        if self.is_stale(generation) {
            return LoadOutcome::Stale;
        }

        if user.is_anonymous() {
            return self.replace_from_cache();
        }

        self.state().begin_load();
        let result = self.source.fetch_page(0).await;

        let mut state = self.state();
        state.end_load();
        if self.is_stale(generation) {
            return LoadOutcome::Stale;
        }

        match result {
            Ok(page) => {
                let count = page.chats.len();
                state.replace(page.chats, page.next_offset);
                LoadOutcome::Replaced { count }
            }
            Err(e) => {
                drop(state);
                error!(error = %e, "{}", kind.label());
                self.notifier.notify(Notice::error(LOAD_FAILED));
                LoadOutcome::Failed
            }
        }
    }

    fn replace_from_cache(&self) -> LoadOutcome {
        let chats = self.cache.load();
        let count = chats.len();
        let mut state = self.state();
        state.replace(chats, None);
        state.settle();
        LoadOutcome::Replaced { count }
    }

    /// Fetch the next page and append it.
    ///
    /// Skipped when pagination has ended or another "load more" is pending.
    pub async fn load_more(&self) -> LoadOutcome {
        let (offset, replaced) = {
            let mut state = self.state();
            match state.next_offset {
                Some(offset) if !state.is_pending => {
                    state.is_pending = true;
                    (offset, state.replaced)
                }
                _ => return LoadOutcome::Skipped,
            }
        };

        let outcome = self.fetch_more(offset, replaced).await;
        self.state().is_pending = false;
        outcome
    }

    async fn fetch_more(&self, offset: u64, replaced: u64) -> LoadOutcome {
        let user = self.identity.current_user_id().await;
        if user.is_anonymous() {
            return self.replace_from_cache();
        }

        self.state().begin_load();
        let result = self.source.fetch_page(offset).await;

        let mut state = self.state();
        state.end_load();
        if state.replaced != replaced {
            debug!(offset, "dropping page fetched for a list that has since been replaced");
            return LoadOutcome::Stale;
        }

        match result {
            Ok(page) => {
                let count = page.chats.len();
                state.chats.extend(page.chats);
                state.next_offset = page.next_offset;
                LoadOutcome::Appended { count }
            }
            Err(e) => {
                drop(state);
                error!(error = %e, offset, "error fetching chats");
                self.notifier.notify(Notice::error(LOAD_FAILED));
                LoadOutcome::Failed
            }
        }
    }

    /// The scroll sentinel came into view.
    pub async fn on_sentinel_visible(&self) -> LoadOutcome {
        {
            let state = self.state();
            if state.is_loading || state.is_pending {
                return LoadOutcome::Skipped;
            }
        }
        self.load_more().await
    }

    /// Refresh on every [`HistoryUpdated`] until the handle is dropped.
    pub fn listen(self: &Arc<Self>, events: &HistoryEvents) -> ListenerHandle {
        let mut rx = events.subscribe();
        let this = Arc::clone(self);

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(HistoryUpdated) | Err(RecvError::Lagged(_)) => {
                        this.refresh().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        ListenerHandle { task }
    }

    /// Attach the event listener and run the initial load.
    pub async fn mount(self: &Arc<Self>, events: &HistoryEvents) -> (LoadOutcome, ListenerHandle) {
        let handle = self.listen(events);
        let outcome = self.load_initial().await;
        (outcome, handle)
    }

    /// Identity the next load would use. Exposed for display.
    pub async fn current_user(&self) -> UserId {
        self.identity.current_user_id().await
    }
}

/// Keeps the event listener alive. Dropping it detaches the listener.
#[derive(Debug)]
pub struct ListenerHandle {
    task: JoinHandle<()>,
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
