//! Domain model for Spyglass Mail
//!
//! These are the types the engine caches and hands to the host: a flat,
//! UI-friendly projection of what Microsoft Graph returns. The raw wire
//! shapes live in [`crate::graph::wire`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Email address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name
    pub name: Option<String>,
    /// Email address
    pub address: String,
}

impl EmailAddress {
    /// Create an address without a display name
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
        }
    }

    /// Create an address with a display name
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            address: address.into(),
        }
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{} <{}>", name, self.address)
        } else {
            write!(f, "{}", self.address)
        }
    }
}

/// Body content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    /// Plain text content
    Text,
    /// HTML content
    Html,
}

impl std::fmt::Display for BodyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BodyKind::Text => write!(f, "text"),
            BodyKind::Html => write!(f, "html"),
        }
    }
}

/// Message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyContent {
    /// Content type
    pub kind: BodyKind,
    /// Body text or markup
    pub text: String,
}

impl BodyContent {
    /// Create a plain-text body
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: BodyKind::Text,
            text: text.into(),
        }
    }
}

/// A message in the inbox cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailItem {
    /// Graph message id
    pub id: String,
    /// Subject line
    pub subject: String,
    /// Sender
    pub sender: Option<EmailAddress>,
    /// Short plain-text preview
    pub preview: String,
    /// Full message body
    pub body: BodyContent,
    /// Whether the message has been read
    pub is_read: bool,
    /// Delivery time
    pub received_at: DateTime<Utc>,
    /// Link to the message in webmail
    pub web_link: Option<String>,
}

impl MailItem {
    /// Sender display string for list views
    pub fn sender_label(&self) -> String {
        match &self.sender {
            Some(addr) => addr.to_string(),
            None => String::from("(unknown sender)"),
        }
    }

    /// Check if the message is unread
    pub fn is_unread(&self) -> bool {
        !self.is_read
    }
}

/// A calendar event in the upcoming-events peek
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Graph event id
    pub id: String,
    /// Event subject
    pub subject: String,
    /// Start instant
    pub start: DateTime<Utc>,
    /// End instant
    pub end: DateTime<Utc>,
    /// Time zone label the wall-clock times were returned in
    pub time_zone: String,
}

/// The signed-in user's profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name shown in the mailbox header
    pub display_name: String,
    /// Principal name (sign-in address)
    pub user_principal_name: Option<String>,
}

/// Mailbox-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxSettings {
    /// Windows time zone display name, e.g. "Pacific Standard Time"
    pub time_zone: String,
}

/// A relevance-ranked contact from the People API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    /// Display name
    pub display_name: Option<String>,
    /// Scored addresses, most relevant first
    pub addresses: Vec<String>,
}

/// Payload for send and reply operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Subject line
    pub subject: String,
    /// Message body
    pub body: BodyContent,
    /// Recipients
    pub to: Vec<EmailAddress>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display() {
        let bare = EmailAddress::new("kim@contoso.com");
        assert_eq!(bare.to_string(), "kim@contoso.com");

        let named = EmailAddress::with_name("Kim Abercrombie", "kim@contoso.com");
        assert_eq!(named.to_string(), "Kim Abercrombie <kim@contoso.com>");
    }

    #[test]
    fn test_sender_label_fallback() {
        let item = MailItem {
            id: "AAMkAGI1".to_string(),
            subject: "Status".to_string(),
            sender: None,
            preview: String::new(),
            body: BodyContent::text(""),
            is_read: false,
            received_at: Utc::now(),
            web_link: None,
        };
        assert_eq!(item.sender_label(), "(unknown sender)");
        assert!(item.is_unread());
    }
}
