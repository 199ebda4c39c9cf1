//! Microsoft Graph access
//!
//! [`MailboxApi`] is the seam between the engine and the service: the sync
//! loop and the compose flow only ever see this trait, so tests script a
//! fake and the CLI plugs in [`GraphClient`].

pub mod client;
pub mod wire;

pub use client::{GraphClient, GRAPH_BASE_URL};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::calendar::CalendarWindow;
use crate::error::SpyglassResult;
use crate::model::{
    CalendarEvent, MailItem, MailboxSettings, OutgoingMessage, Person, UserProfile,
};

/// Mailbox operations the engine needs from the service
#[async_trait]
pub trait MailboxApi: Send + Sync {
    /// Fetch the signed-in user's profile
    async fn me(&self) -> SpyglassResult<UserProfile>;

    /// Fetch mailbox-level settings (time zone)
    async fn mailbox_settings(&self) -> SpyglassResult<MailboxSettings>;

    /// Fetch the newest `top` inbox messages, newest first
    async fn list_inbox(&self, top: usize) -> SpyglassResult<Vec<MailItem>>;

    /// Fetch inbox messages received strictly after `since`, oldest first
    async fn list_inbox_since(&self, since: DateTime<Utc>) -> SpyglassResult<Vec<MailItem>>;

    /// Fetch up to `top` events inside `window`, ordered by start.
    ///
    /// `time_zone` is the mailbox time zone the service should render
    /// wall-clock times in.
    async fn calendar_view(
        &self,
        window: CalendarWindow,
        time_zone: &str,
        top: usize,
    ) -> SpyglassResult<Vec<CalendarEvent>>;

    /// Send a new message
    async fn send_mail(&self, message: &OutgoingMessage) -> SpyglassResult<()>;

    /// Reply to an existing message
    async fn reply(&self, message_id: &str, message: &OutgoingMessage) -> SpyglassResult<()>;

    /// Fetch relevance-ranked contacts for recipient suggestions
    async fn recent_people(&self) -> SpyglassResult<Vec<Person>>;
}
