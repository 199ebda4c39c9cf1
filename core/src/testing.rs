//! Shared test support: scripted fakes and fixture builders
//!
//! [`FakeMailbox`] stands in for the Graph service in engine, compose, and
//! session tests. Responses are queued per operation ahead of time and
//! every invocation is recorded, so a test scripts exactly the traffic it
//! expects and asserts on what the code under test actually sent.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::Notify;

use crate::calendar::CalendarWindow;
use crate::error::{SpyglassError, SpyglassResult};
use crate::graph::MailboxApi;
use crate::model::{
    BodyContent, CalendarEvent, EmailAddress, MailItem, MailboxSettings, OutgoingMessage, Person,
    UserProfile,
};
use crate::session::{AccessToken, Session, TokenProvider};

/// Deterministic base instant for fixtures, offset by `minutes`
pub fn test_time(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 13, 12, 0, 0).unwrap() + Duration::minutes(minutes)
}

/// Minimal inbox message fixture
pub fn mail_item(id: &str, received_at: DateTime<Utc>, is_read: bool) -> MailItem {
    MailItem {
        id: id.to_string(),
        subject: format!("Subject {id}"),
        sender: Some(EmailAddress::with_name("Megan Bowen", "megan@contoso.com")),
        preview: String::new(),
        body: BodyContent::text(format!("Body {id}")),
        is_read,
        received_at,
        web_link: None,
    }
}

/// Minimal one-hour calendar event fixture
pub fn calendar_event(id: &str, subject: &str, start: DateTime<Utc>) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        subject: subject.to_string(),
        start,
        end: start + Duration::hours(1),
        time_zone: "UTC".to_string(),
    }
}

/// Token provider that always hands out the same silent token
pub struct StaticTokens;

#[async_trait]
impl TokenProvider for StaticTokens {
    async fn acquire_token_silent(&self) -> SpyglassResult<Option<AccessToken>> {
        Ok(Some(AccessToken::new("test-token")))
    }

    async fn acquire_token_interactive(&self) -> SpyglassResult<AccessToken> {
        Ok(AccessToken::new("test-token"))
    }
}

/// Signed-in session with `api` attached, ready for engine tests
pub async fn signed_in_session(api: Arc<FakeMailbox>) -> Arc<Session> {
    let session = Arc::new(Session::new(Arc::new(StaticTokens)));
    session.attach_client(api).await;
    session.sign_in().await.expect("static sign-in never fails");
    session
}

#[derive(Default)]
struct Scripts {
    profile_name: Option<String>,
    time_zone: Option<String>,
    inbox_pages: VecDeque<Result<Vec<MailItem>, String>>,
    delta_batches: VecDeque<Result<Vec<MailItem>, String>>,
    events: Vec<CalendarEvent>,
    people: Vec<Person>,
}

#[derive(Default)]
struct Recorded {
    calendar_time_zones: Vec<String>,
    since_args: Vec<DateTime<Utc>>,
    sent: Vec<OutgoingMessage>,
    replies: Vec<(String, OutgoingMessage)>,
}

/// Scripted [`MailboxApi`] fake
#[derive(Default)]
pub struct FakeMailbox {
    scripts: Mutex<Scripts>,
    recorded: Mutex<Recorded>,
    inbox_gate: Mutex<Option<Arc<Notify>>>,
    since_gate: Mutex<Option<Arc<Notify>>>,
    /// Calls to `me`
    pub me_calls: AtomicUsize,
    /// Calls to `list_inbox`
    pub inbox_calls: AtomicUsize,
    /// Calls to `list_inbox_since`
    pub since_calls: AtomicUsize,
}

impl FakeMailbox {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script the profile display name
    pub fn script_profile(&self, display_name: &str) {
        self.scripts.lock().unwrap().profile_name = Some(display_name.to_string());
    }

    /// Script the mailbox time zone
    pub fn script_time_zone(&self, time_zone: &str) {
        self.scripts.lock().unwrap().time_zone = Some(time_zone.to_string());
    }

    /// Queue a full inbox page; each `list_inbox` call consumes one
    pub fn script_inbox(&self, page: Vec<MailItem>) {
        self.scripts.lock().unwrap().inbox_pages.push_back(Ok(page));
    }

    /// Queue a one-shot `list_inbox` failure
    pub fn script_inbox_error(&self, message: &str) {
        self.scripts
            .lock()
            .unwrap()
            .inbox_pages
            .push_back(Err(message.to_string()));
    }

    /// Queue an incremental batch; each `list_inbox_since` call consumes
    /// one, and an exhausted queue yields empty batches
    pub fn script_delta(&self, batch: Vec<MailItem>) {
        self.scripts.lock().unwrap().delta_batches.push_back(Ok(batch));
    }

    /// Queue a one-shot `list_inbox_since` failure
    pub fn script_since_error(&self, message: &str) {
        self.scripts
            .lock()
            .unwrap()
            .delta_batches
            .push_back(Err(message.to_string()));
    }

    /// Script the calendar peek
    pub fn script_events(&self, events: Vec<CalendarEvent>) {
        self.scripts.lock().unwrap().events = events;
    }

    /// Script the People API response
    pub fn script_people(&self, people: Vec<Person>) {
        self.scripts.lock().unwrap().people = people;
    }

    /// Park every `list_inbox` call until the returned gate is notified
    pub fn gate_inbox(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.inbox_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Park every `list_inbox_since` call until the returned gate is notified
    pub fn gate_since(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.since_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Time zones passed to `calendar_view`, in call order
    pub fn calendar_time_zones(&self) -> Vec<String> {
        self.recorded.lock().unwrap().calendar_time_zones.clone()
    }

    /// Cursor passed to the most recent `list_inbox_since` call
    pub fn last_since(&self) -> Option<DateTime<Utc>> {
        self.recorded.lock().unwrap().since_args.last().copied()
    }

    /// Messages handed to `send_mail`, in call order
    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.recorded.lock().unwrap().sent.clone()
    }

    /// `(message_id, message)` pairs handed to `reply`, in call order
    pub fn replies(&self) -> Vec<(String, OutgoingMessage)> {
        self.recorded.lock().unwrap().replies.clone()
    }
}

#[async_trait]
impl MailboxApi for FakeMailbox {
    async fn me(&self) -> SpyglassResult<UserProfile> {
        self.me_calls.fetch_add(1, Ordering::SeqCst);
        let name = self
            .scripts
            .lock()
            .unwrap()
            .profile_name
            .clone()
            .unwrap_or_else(|| "Test User".to_string());
        Ok(UserProfile {
            display_name: name,
            user_principal_name: None,
        })
    }

    async fn mailbox_settings(&self) -> SpyglassResult<MailboxSettings> {
        let time_zone = self
            .scripts
            .lock()
            .unwrap()
            .time_zone
            .clone()
            .unwrap_or_else(|| "UTC".to_string());
        Ok(MailboxSettings { time_zone })
    }

    async fn list_inbox(&self, _top: usize) -> SpyglassResult<Vec<MailItem>> {
        self.inbox_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.inbox_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let page = self.scripts.lock().unwrap().inbox_pages.pop_front();
        match page {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(SpyglassError::graph(503, message)),
            None => Ok(Vec::new()),
        }
    }

    async fn list_inbox_since(&self, since: DateTime<Utc>) -> SpyglassResult<Vec<MailItem>> {
        self.since_calls.fetch_add(1, Ordering::SeqCst);
        self.recorded.lock().unwrap().since_args.push(since);
        let gate = self.since_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let batch = self.scripts.lock().unwrap().delta_batches.pop_front();
        match batch {
            Some(Ok(batch)) => Ok(batch),
            Some(Err(message)) => Err(SpyglassError::graph(503, message)),
            None => Ok(Vec::new()),
        }
    }

    async fn calendar_view(
        &self,
        _window: CalendarWindow,
        time_zone: &str,
        top: usize,
    ) -> SpyglassResult<Vec<CalendarEvent>> {
        self.recorded
            .lock()
            .unwrap()
            .calendar_time_zones
            .push(time_zone.to_string());
        let events = self.scripts.lock().unwrap().events.clone();
        Ok(events.into_iter().take(top).collect())
    }

    async fn send_mail(&self, message: &OutgoingMessage) -> SpyglassResult<()> {
        self.recorded.lock().unwrap().sent.push(message.clone());
        Ok(())
    }

    async fn reply(&self, message_id: &str, message: &OutgoingMessage) -> SpyglassResult<()> {
        self.recorded
            .lock()
            .unwrap()
            .replies
            .push((message_id.to_string(), message.clone()));
        Ok(())
    }

    async fn recent_people(&self) -> SpyglassResult<Vec<Person>> {
        Ok(self.scripts.lock().unwrap().people.clone())
    }
}
