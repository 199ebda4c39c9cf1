//! Spyglass Mail Core Library
//!
//! This crate contains the mailbox engine for Spyglass Mail, including:
//! - Domain models (MailItem, CalendarEvent, ComposeDraft)
//! - Session layer (sign-in state, token provider seam, observers)
//! - Microsoft Graph client (messages, calendar view, send/reply, people)
//! - Sync engine (initial load, incremental poll, interval scheduler)
//! - Compose flow (recipient grammar, send gate, reply/forward rules)

pub mod calendar;
pub mod compose;
pub mod config;
pub mod error;
pub mod graph;
pub mod model;
pub mod session;
pub mod sync;
pub mod timezone;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use compose::{parse_recipients, ComposeDraft};
pub use config::SpyglassConfig;
pub use error::{SpyglassError, SpyglassResult};
pub use graph::{GraphClient, MailboxApi};
pub use model::{CalendarEvent, EmailAddress, MailItem, OutgoingMessage, UserProfile};
pub use session::{AccessToken, Session, SessionObserver, SessionState, TokenProvider};
pub use sync::{InboxSnapshot, InboxSync, SyncScheduler};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Spyglass Mail";

/// Default configuration directory name
pub const CONFIG_DIR_NAME: &str = "spyglass-mail";

/// Default incremental poll period in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Messages fetched by the initial inbox load
pub const DEFAULT_INBOX_PAGE_SIZE: usize = 100;

/// Events fetched for the calendar peek
pub const DEFAULT_CALENDAR_EVENTS: usize = 3;

/// Webmail URL opened by the open-web hand-off
pub const WEBMAIL_URL: &str = "https://outlook.live.com/mail/0/";

/// Environment variable carrying the Azure app registration id
pub const CLIENT_ID_ENV_VAR: &str = "SPYGLASS_CLIENT_ID";

/// OAuth scopes the token provider should request
pub const GRAPH_SCOPES: &[&str] = &[
    "User.Read",
    "Mail.ReadWrite",
    "offline_access",
    "Calendars.Read",
    "MailboxSettings.Read",
    "People.Read",
];

/// Initialize the core library
pub fn init() -> SpyglassResult<()> {
    tracing::info!("Initializing Spyglass Mail Core v{}", VERSION);
    Ok(())
}

/// Get the default configuration directory, creating it if needed
pub fn get_config_dir() -> SpyglassResult<std::path::PathBuf> {
    let config_dir = std::env::var("SPYGLASS_MAIL_CONFIG_DIR")
        .map(std::path::PathBuf::from)
        .or_else(|_| {
            directories::ProjectDirs::from("", "", CONFIG_DIR_NAME)
                .map(|dirs| dirs.config_dir().to_path_buf())
                .ok_or(std::env::VarError::NotPresent)
        })
        .map_err(|_| SpyglassError::ConfigDirNotFound)?;

    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Open the webmail view in the default browser.
///
/// A fire-and-forget hand-off; no data leaves the process beyond the URL.
pub fn open_webmail(webmail_url: &str) -> SpyglassResult<()> {
    tracing::info!(url = webmail_url, "opening webmail in the default browser");
    open::that(webmail_url)?;
    Ok(())
}
