//! Inbox cache and sync state machine
//!
//! One lock, one writer: every cache mutation happens while holding the
//! engine's `Mutex<InboxState>`, and the lock is never held across a
//! network await. The [`SyncPhase`] makes in-flight work explicit, so a
//! poll tick that would race the initial load is skipped instead of
//! interleaved. The phase is entered through a guard that restores
//! `Idle` on drop, so a load or poll cancelled mid-fetch (scheduler
//! stop, task abort) releases the engine instead of wedging it.

use std::sync::{Arc, Mutex as StdMutex, Weak};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::calendar;
use crate::error::SpyglassResult;
use crate::model::{CalendarEvent, MailItem, MailboxSettings, UserProfile};
use crate::session::{Session, SessionObserver, SessionState};
use crate::sync::{CursorPolicy, PollOutcome, SyncPhase};
use crate::timezone;

/// Tuning knobs for the engine
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Cursor advancement policy
    pub cursor_policy: CursorPolicy,
    /// Messages fetched by the initial load
    pub initial_page_size: usize,
    /// Events fetched for the calendar peek
    pub calendar_events: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            cursor_policy: CursorPolicy::default(),
            initial_page_size: crate::DEFAULT_INBOX_PAGE_SIZE,
            calendar_events: crate::DEFAULT_CALENDAR_EVENTS,
        }
    }
}

#[derive(Debug, Default)]
struct InboxState {
    loaded: bool,
    /// Most-recent-first message cache
    items: Vec<MailItem>,
    events: Vec<CalendarEvent>,
    unread: usize,
    cursor: Option<DateTime<Utc>>,
    account_name: String,
    time_zone: String,
}

/// Cloned read view of the cache
#[derive(Debug, Clone)]
pub struct InboxSnapshot {
    /// Cached messages, most recent first
    pub items: Vec<MailItem>,
    /// Calendar peek events
    pub events: Vec<CalendarEvent>,
    /// Unread message count
    pub unread: usize,
    /// Sync cursor, if an initial load has run
    pub cursor: Option<DateTime<Utc>>,
    /// Account display name
    pub account_name: String,
    /// Mailbox time zone name
    pub time_zone: String,
    /// Engine phase at snapshot time
    pub phase: SyncPhase,
    /// Whether an initial load has completed
    pub loaded: bool,
}

struct FetchedMailbox {
    profile: UserProfile,
    settings: MailboxSettings,
    items: Vec<MailItem>,
    events: Vec<CalendarEvent>,
}

/// Releases the phase on drop, whether the work finished, failed, or
/// was cancelled at an await point
struct PhaseGuard<'a> {
    phase: &'a StdMutex<SyncPhase>,
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut phase) = self.phase.lock() {
            *phase = SyncPhase::Idle;
        }
    }
}

/// The mailbox sync engine
pub struct InboxSync {
    session: Arc<Session>,
    options: SyncOptions,
    phase: StdMutex<SyncPhase>,
    state: Mutex<InboxState>,
}

impl InboxSync {
    /// Engine with default options
    pub fn new(session: Arc<Session>) -> Self {
        Self::with_options(session, SyncOptions::default())
    }

    /// Engine with explicit options
    pub fn with_options(session: Arc<Session>, options: SyncOptions) -> Self {
        Self {
            session,
            options,
            phase: StdMutex::new(SyncPhase::Idle),
            state: Mutex::new(InboxState::default()),
        }
    }

    /// Claim the engine for `next`; `Err` carries the busy phase
    fn enter(&self, next: SyncPhase) -> Result<PhaseGuard<'_>, SyncPhase> {
        let mut phase = self.phase.lock().unwrap();
        if *phase != SyncPhase::Idle {
            return Err(*phase);
        }
        *phase = next;
        Ok(PhaseGuard { phase: &self.phase })
    }

    fn current_phase(&self) -> SyncPhase {
        *self.phase.lock().unwrap()
    }

    /// Populate the cache: newest messages, account profile, mailbox time
    /// zone, and the calendar peek for the current week window.
    ///
    /// Replaces the cache wholesale, so repeated calls are legal. A call
    /// while another load or a poll is in flight is skipped. A session
    /// without an attached mailbox handle is a no-op, not an error.
    pub async fn initial_load(&self) -> SpyglassResult<()> {
        let _phase = match self.enter(SyncPhase::Loading) {
            Ok(guard) => guard,
            Err(busy) => {
                debug!(phase = %busy, "initial load skipped, sync in flight");
                return Ok(());
            }
        };

        let fetched = self.fetch_mailbox().await;

        let mut state = self.state.lock().await;
        match fetched {
            Ok(Some(mailbox)) => {
                state.items = mailbox.items;
                state.events = mailbox.events;
                let unread = count_unread(&state.items);
                state.unread = unread;
                let cursor = self.next_cursor(&state.items);
                state.cursor = Some(cursor);
                state.account_name = mailbox.profile.display_name;
                state.time_zone = mailbox.settings.time_zone;
                state.loaded = true;
                info!(
                    messages = state.items.len(),
                    unread = state.unread,
                    events = state.events.len(),
                    "initial load complete"
                );
                Ok(())
            }
            Ok(None) => {
                debug!("initial load skipped, no mailbox handle attached");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn fetch_mailbox(&self) -> SpyglassResult<Option<FetchedMailbox>> {
        let Some(api) = self.session.client().await else {
            return Ok(None);
        };

        let profile = api.me().await?;
        let items = api.list_inbox(self.options.initial_page_size).await?;
        let settings = api.mailbox_settings().await?;

        let offset = timezone::resolve_offset(&settings.time_zone);
        let window = calendar::week_window(Utc::now(), offset);
        let events = api
            .calendar_view(window, &settings.time_zone, self.options.calendar_events)
            .await?;

        Ok(Some(FetchedMailbox {
            profile,
            settings,
            items,
            events,
        }))
    }

    /// Fetch messages newer than the cursor and prepend them to the cache.
    ///
    /// Skipped while another load or poll is in flight and before the
    /// first initial load. An empty batch leaves the cursor untouched.
    pub async fn poll(&self) -> SpyglassResult<PollOutcome> {
        let _phase = match self.enter(SyncPhase::Polling) {
            Ok(guard) => guard,
            Err(busy) => {
                debug!(phase = %busy, "poll skipped, sync in flight");
                return Ok(PollOutcome::Skipped);
            }
        };
        let cursor = {
            let state = self.state.lock().await;
            let Some(cursor) = state.cursor else {
                debug!("poll skipped, nothing loaded yet");
                return Ok(PollOutcome::Skipped);
            };
            cursor
        };

        let Some(api) = self.session.client().await else {
            debug!("poll skipped, no mailbox handle attached");
            return Ok(PollOutcome::Skipped);
        };
        debug!("checking for new mail");
        let batch = api.list_inbox_since(cursor).await?;

        let mut state = self.state.lock().await;
        if batch.is_empty() {
            return Ok(PollOutcome::NoNewMail);
        }

        let count = batch.len();
        // oldest-first input, head insertion: the newest message ends up
        // at index 0 and the cache stays most-recent-first
        for item in batch {
            state.items.insert(0, item);
        }
        let unread = count_unread(&state.items);
        state.unread = unread;
        let cursor = self.next_cursor(&state.items);
        state.cursor = Some(cursor);
        info!(new_messages = count, unread = state.unread, "new mail inserted");
        Ok(PollOutcome::NewMail(count))
    }

    /// Discard the cache and run the initial load again
    pub async fn refresh(&self) -> SpyglassResult<()> {
        {
            let _phase = match self.enter(SyncPhase::Loading) {
                Ok(guard) => guard,
                Err(busy) => {
                    debug!(phase = %busy, "refresh skipped, sync in flight");
                    return Ok(());
                }
            };
            let mut state = self.state.lock().await;
            state.items.clear();
            state.events.clear();
            state.unread = 0;
            state.cursor = None;
            state.loaded = false;
        }
        self.initial_load().await
    }

    /// Cloned view of the cache
    pub async fn snapshot(&self) -> InboxSnapshot {
        let state = self.state.lock().await;
        InboxSnapshot {
            items: state.items.clone(),
            events: state.events.clone(),
            unread: state.unread,
            cursor: state.cursor,
            account_name: state.account_name.clone(),
            time_zone: state.time_zone.clone(),
            phase: self.current_phase(),
            loaded: state.loaded,
        }
    }

    /// Unread message count
    pub async fn unread(&self) -> usize {
        self.state.lock().await.unread
    }

    /// Whether an initial load has completed
    pub async fn has_loaded(&self) -> bool {
        self.state.lock().await.loaded
    }

    /// Current engine phase
    pub async fn phase(&self) -> SyncPhase {
        self.current_phase()
    }

    /// Observer adapter: the first transition into `SignedIn` runs the
    /// initial load on the runtime. Later transitions and a dropped
    /// engine are no-ops.
    pub fn autoload_observer(self: &Arc<Self>) -> Arc<dyn SessionObserver> {
        Arc::new(AutoLoad {
            engine: Arc::downgrade(self),
        })
    }

    fn next_cursor(&self, items: &[MailItem]) -> DateTime<Utc> {
        match self.options.cursor_policy {
            CursorPolicy::WallClock => Utc::now(),
            CursorPolicy::NewestMessage => items
                .iter()
                .map(|item| item.received_at)
                .max()
                .unwrap_or_else(Utc::now),
        }
    }
}

struct AutoLoad {
    engine: Weak<InboxSync>,
}

impl SessionObserver for AutoLoad {
    fn state_changed(&self, _previous: SessionState, current: SessionState) {
        if current != SessionState::SignedIn {
            return;
        }
        let Some(engine) = self.engine.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            if engine.has_loaded().await {
                return;
            }
            if let Err(err) = engine.initial_load().await {
                error!(error = %err, "initial mailbox load failed");
            }
        });
    }
}

fn count_unread(items: &[MailItem]) -> usize {
    items.iter().filter(|item| !item.is_read).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        calendar_event, mail_item, signed_in_session, test_time, FakeMailbox, StaticTokens,
    };
    use chrono::Duration;
    use std::sync::atomic::Ordering;

    async fn wait_for_load(engine: &InboxSync) {
        for _ in 0..500 {
            if engine.has_loaded().await {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("engine never finished loading");
    }

    fn newest_first_page(count: usize) -> Vec<MailItem> {
        (0..count)
            .map(|i| {
                let ordinal = count - i;
                mail_item(
                    &format!("m{ordinal}"),
                    test_time(0) + Duration::minutes(ordinal as i64),
                    true,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_initial_load_populates_cache() {
        let api = FakeMailbox::new();
        api.script_profile("Megan Bowen");
        api.script_time_zone("Pacific Standard Time");
        api.script_inbox(vec![
            mail_item("m2", test_time(10), false),
            mail_item("m1", test_time(5), true),
        ]);
        api.script_events(vec![calendar_event("e1", "Standup", test_time(30))]);

        let session = signed_in_session(api.clone()).await;
        let engine = InboxSync::new(session);
        engine.initial_load().await.unwrap();

        let snapshot = engine.snapshot().await;
        assert!(snapshot.loaded);
        assert_eq!(snapshot.phase, SyncPhase::Idle);
        assert_eq!(snapshot.account_name, "Megan Bowen");
        assert_eq!(snapshot.time_zone, "Pacific Standard Time");
        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.items[0].id, "m2");
        assert_eq!(snapshot.unread, 1);
        assert_eq!(snapshot.events.len(), 1);
        assert!(snapshot.cursor.is_some());
        assert_eq!(api.calendar_time_zones(), vec!["Pacific Standard Time"]);
    }

    #[tokio::test]
    async fn test_initial_load_without_client_is_noop() {
        let session = Arc::new(Session::new(Arc::new(StaticTokens)));
        session.sign_in().await.unwrap();
        let engine = InboxSync::new(session);

        engine.initial_load().await.unwrap();

        assert!(!engine.has_loaded().await);
        assert_eq!(engine.phase().await, SyncPhase::Idle);
        assert!(engine.snapshot().await.items.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_initial_load_is_rejected() {
        let api = FakeMailbox::new();
        api.script_inbox(newest_first_page(3));
        let gate = api.gate_inbox();

        let session = signed_in_session(api.clone()).await;
        let engine = Arc::new(InboxSync::new(session));

        let background = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.initial_load().await })
        };

        // wait until the first load is parked inside the inbox fetch
        for _ in 0..500 {
            if api.inbox_calls.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(engine.phase().await, SyncPhase::Loading);

        engine.initial_load().await.unwrap();
        assert_eq!(api.me_calls.load(Ordering::SeqCst), 1); // second entry never ran

        gate.notify_one();
        background.await.unwrap().unwrap();
        assert!(engine.has_loaded().await);
        assert_eq!(engine.snapshot().await.items.len(), 3);
    }

    #[tokio::test]
    async fn test_poll_skipped_while_loading() {
        let api = FakeMailbox::new();
        api.script_inbox(newest_first_page(1));
        let gate = api.gate_inbox();

        let session = signed_in_session(api.clone()).await;
        let engine = Arc::new(InboxSync::new(session));

        let background = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.initial_load().await })
        };
        for _ in 0..500 {
            if api.inbox_calls.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(engine.poll().await.unwrap(), PollOutcome::Skipped);
        assert_eq!(api.since_calls.load(Ordering::SeqCst), 0);

        gate.notify_one();
        background.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_poll_before_initial_load_is_skipped() {
        let api = FakeMailbox::new();
        let session = signed_in_session(api.clone()).await;
        let engine = InboxSync::new(session);

        assert_eq!(engine.poll().await.unwrap(), PollOutcome::Skipped);
        assert_eq!(api.since_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_delta_batch_lands_at_head_newest_first() {
        let api = FakeMailbox::new();
        api.script_inbox(newest_first_page(100));
        api.script_delta(vec![
            mail_item("m101", test_time(0) + Duration::minutes(101), false),
            mail_item("m102", test_time(0) + Duration::minutes(102), false),
            mail_item("m103", test_time(0) + Duration::minutes(103), false),
        ]);

        let session = signed_in_session(api.clone()).await;
        let engine = InboxSync::new(session);
        engine.initial_load().await.unwrap();
        assert_eq!(engine.unread().await, 0);

        let outcome = engine.poll().await.unwrap();
        assert_eq!(outcome, PollOutcome::NewMail(3));

        let snapshot = engine.snapshot().await;
        assert_eq!(snapshot.items.len(), 103);
        assert_eq!(snapshot.items[0].id, "m103");
        assert_eq!(snapshot.items[1].id, "m102");
        assert_eq!(snapshot.items[2].id, "m101");
        assert_eq!(snapshot.items[3].id, "m100");
        assert_eq!(snapshot.items[102].id, "m1");
        assert_eq!(snapshot.unread, 3);
    }

    #[tokio::test]
    async fn test_empty_poll_leaves_cursor_untouched() {
        let api = FakeMailbox::new();
        api.script_inbox(newest_first_page(5));

        let session = signed_in_session(api.clone()).await;
        let engine = InboxSync::with_options(
            session,
            SyncOptions {
                cursor_policy: CursorPolicy::NewestMessage,
                ..SyncOptions::default()
            },
        );
        engine.initial_load().await.unwrap();
        let cursor_before = engine.snapshot().await.cursor;

        assert_eq!(engine.poll().await.unwrap(), PollOutcome::NoNewMail);
        assert_eq!(engine.snapshot().await.cursor, cursor_before);
    }

    #[tokio::test]
    async fn test_wall_clock_cursor_policy() {
        let api = FakeMailbox::new();
        api.script_inbox(newest_first_page(2));

        let session = signed_in_session(api.clone()).await;
        let engine = InboxSync::new(session); // WallClock default

        let before = Utc::now();
        engine.initial_load().await.unwrap();
        let after = Utc::now();

        let cursor = engine.snapshot().await.cursor.unwrap();
        assert!(cursor >= before && cursor <= after);
    }

    #[tokio::test]
    async fn test_newest_message_cursor_policy() {
        let api = FakeMailbox::new();
        api.script_inbox(newest_first_page(5));
        api.script_delta(vec![mail_item(
            "m6",
            test_time(0) + Duration::minutes(6),
            false,
        )]);

        let session = signed_in_session(api.clone()).await;
        let engine = InboxSync::with_options(
            session,
            SyncOptions {
                cursor_policy: CursorPolicy::NewestMessage,
                ..SyncOptions::default()
            },
        );

        engine.initial_load().await.unwrap();
        assert_eq!(
            engine.snapshot().await.cursor,
            Some(test_time(0) + Duration::minutes(5))
        );

        engine.poll().await.unwrap();
        assert_eq!(
            engine.snapshot().await.cursor,
            Some(test_time(0) + Duration::minutes(6))
        );

        // the next poll filters from the newest received timestamp
        engine.poll().await.unwrap();
        assert_eq!(
            api.last_since(),
            Some(test_time(0) + Duration::minutes(6))
        );
    }

    #[tokio::test]
    async fn test_poll_error_resets_phase_and_propagates() {
        let api = FakeMailbox::new();
        api.script_inbox(newest_first_page(2));
        api.script_since_error("mailbox unavailable");

        let session = signed_in_session(api.clone()).await;
        let engine = InboxSync::new(session);
        engine.initial_load().await.unwrap();

        let err = engine.poll().await.unwrap_err();
        assert!(err.is_network_error());
        assert_eq!(engine.phase().await, SyncPhase::Idle);

        // the engine accepts the next tick after a failure
        assert_eq!(engine.poll().await.unwrap(), PollOutcome::NoNewMail);
    }

    #[tokio::test]
    async fn test_aborted_poll_releases_the_phase() {
        let api = FakeMailbox::new();
        api.script_inbox(newest_first_page(2));

        let session = signed_in_session(api.clone()).await;
        let engine = Arc::new(InboxSync::new(session));
        engine.initial_load().await.unwrap();

        let gate = api.gate_since();
        let background = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.poll().await })
        };
        for _ in 0..500 {
            if api.since_calls.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(engine.phase().await, SyncPhase::Polling);

        // cancel the tick while it is parked inside the fetch
        background.abort();
        assert!(background.await.unwrap_err().is_cancelled());
        assert_eq!(engine.phase().await, SyncPhase::Idle);

        // the engine accepts new work after the cancelled tick
        gate.notify_one();
        assert_eq!(engine.poll().await.unwrap(), PollOutcome::NoNewMail);
        engine.refresh().await.unwrap();
        assert!(engine.has_loaded().await);
    }

    #[tokio::test]
    async fn test_initial_load_error_propagates_and_resets_phase() {
        let api = FakeMailbox::new();
        api.script_inbox_error("mailbox unavailable");

        let session = signed_in_session(api.clone()).await;
        let engine = InboxSync::new(session);

        let err = engine.initial_load().await.unwrap_err();
        assert!(err.is_network_error());
        assert_eq!(engine.phase().await, SyncPhase::Idle);
        assert!(!engine.has_loaded().await);

        // a retry after the failure runs and lands
        api.script_inbox(newest_first_page(1));
        engine.initial_load().await.unwrap();
        assert!(engine.has_loaded().await);
    }

    #[tokio::test]
    async fn test_refresh_replaces_cache() {
        let api = FakeMailbox::new();
        api.script_inbox(vec![
            mail_item("a2", test_time(2), false),
            mail_item("a1", test_time(1), false),
        ]);
        api.script_inbox(vec![mail_item("b1", test_time(3), true)]);

        let session = signed_in_session(api.clone()).await;
        let engine = InboxSync::new(session);

        engine.initial_load().await.unwrap();
        assert_eq!(engine.snapshot().await.items.len(), 2);
        assert_eq!(engine.unread().await, 2);

        engine.refresh().await.unwrap();
        let snapshot = engine.snapshot().await;
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].id, "b1");
        assert_eq!(snapshot.unread, 0);
        assert!(snapshot.loaded);
        assert_eq!(api.me_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_autoload_observer_loads_once() {
        let api = FakeMailbox::new();
        api.script_inbox(newest_first_page(1));

        let session = Arc::new(Session::new(Arc::new(StaticTokens)));
        session.attach_client(api.clone()).await;
        let engine = Arc::new(InboxSync::new(session.clone()));
        session.observe(engine.autoload_observer()).await;

        session.sign_in().await.unwrap();
        wait_for_load(&engine).await;
        assert_eq!(api.me_calls.load(Ordering::SeqCst), 1);

        // a second signed-in transition does not reload
        session.sign_out().await;
        session.sign_in().await.unwrap();
        for _ in 0..100 {
            tokio::task::yield_now().await;
        }
        assert_eq!(api.me_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_autoload_ignores_other_transitions() {
        let api = FakeMailbox::new();
        let session = Arc::new(Session::new(Arc::new(StaticTokens)));
        session.attach_client(api.clone()).await;
        let engine = Arc::new(InboxSync::new(session.clone()));

        let observer = engine.autoload_observer();
        observer.state_changed(SessionState::SignedOut, SessionState::Loading);
        for _ in 0..100 {
            tokio::task::yield_now().await;
        }
        assert_eq!(api.me_calls.load(Ordering::SeqCst), 0);
        assert!(!engine.has_loaded().await);
    }

    #[test]
    fn test_count_unread() {
        let items = vec![
            mail_item("a", test_time(1), true),
            mail_item("b", test_time(2), false),
            mail_item("c", test_time(3), false),
        ];
        assert_eq!(count_unread(&items), 2);
        assert_eq!(count_unread(&[]), 0);
    }
}
