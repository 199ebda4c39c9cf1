//! Wire-format types for the Microsoft Graph REST API
//!
//! Shapes mirror the Graph JSON resources field for field; everything is
//! optional so partial or future payloads never fail deserialization.
//! Conversions into the domain model live next to the types.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{
    BodyContent, BodyKind, CalendarEvent, EmailAddress, MailItem, MailboxSettings,
    OutgoingMessage, Person, UserProfile,
};
use crate::timezone;

/// Paged list envelope (`{"value": [...], "@odata.nextLink": ...}`)
#[derive(Debug, Clone, Deserialize)]
pub struct GraphPage<T> {
    /// Page contents
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    /// Continuation link when the result set has more pages
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Graph `message` resource
#[derive(Debug, Clone, Deserialize)]
pub struct GraphMessage {
    pub id: Option<String>,
    pub subject: Option<String>,
    pub from: Option<GraphRecipient>,
    #[serde(rename = "bodyPreview")]
    pub body_preview: Option<String>,
    pub body: Option<GraphItemBody>,
    #[serde(rename = "isRead")]
    pub is_read: Option<bool>,
    #[serde(rename = "receivedDateTime")]
    pub received_date_time: Option<String>,
    #[serde(rename = "webLink")]
    pub web_link: Option<String>,
}

impl GraphMessage {
    /// Project the wire shape into a cache entry
    pub fn into_mail_item(self) -> MailItem {
        let received_at = self
            .received_date_time
            .as_deref()
            .and_then(parse_graph_instant)
            .unwrap_or_else(|| {
                debug!("message without a parseable receivedDateTime");
                DateTime::<Utc>::UNIX_EPOCH
            });
        MailItem {
            id: self.id.unwrap_or_default(),
            subject: self.subject.unwrap_or_default(),
            sender: self.from.and_then(GraphRecipient::into_address),
            preview: self.body_preview.unwrap_or_default(),
            body: self
                .body
                .map(GraphItemBody::into_body)
                .unwrap_or_else(|| BodyContent::text("")),
            is_read: self.is_read.unwrap_or(false),
            received_at,
            web_link: self.web_link,
        }
    }
}

/// Graph `recipient` resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphRecipient {
    #[serde(rename = "emailAddress")]
    pub email_address: Option<GraphEmailAddress>,
}

impl GraphRecipient {
    fn into_address(self) -> Option<EmailAddress> {
        let inner = self.email_address?;
        let address = inner.address?;
        Some(EmailAddress {
            name: inner.name,
            address,
        })
    }
}

impl From<&EmailAddress> for GraphRecipient {
    fn from(address: &EmailAddress) -> Self {
        Self {
            email_address: Some(GraphEmailAddress {
                name: address.name.clone(),
                address: Some(address.address.clone()),
            }),
        }
    }
}

/// Graph `emailAddress` resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEmailAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub address: Option<String>,
}

/// Graph `itemBody` resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphItemBody {
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
    pub content: Option<String>,
}

impl GraphItemBody {
    fn into_body(self) -> BodyContent {
        let kind = match self.content_type.as_deref() {
            Some(kind) if kind.eq_ignore_ascii_case("html") => BodyKind::Html,
            _ => BodyKind::Text,
        };
        BodyContent {
            kind,
            text: self.content.unwrap_or_default(),
        }
    }
}

impl From<&BodyContent> for GraphItemBody {
    fn from(body: &BodyContent) -> Self {
        Self {
            content_type: Some(body.kind.to_string()),
            content: Some(body.text.clone()),
        }
    }
}

/// Graph `event` resource (subject and times only)
#[derive(Debug, Clone, Deserialize)]
pub struct GraphEvent {
    pub id: Option<String>,
    pub subject: Option<String>,
    pub start: Option<GraphDateTimeTimeZone>,
    pub end: Option<GraphDateTimeTimeZone>,
}

impl GraphEvent {
    /// Convert to a model event; `None` when the start time is unusable
    pub fn into_event(self) -> Option<CalendarEvent> {
        let start_wire = self.start?;
        let time_zone = start_wire.time_zone.clone().unwrap_or_else(|| "UTC".into());
        let start = start_wire.to_instant()?;
        let end = self.end.and_then(|e| e.to_instant()).unwrap_or(start);
        Some(CalendarEvent {
            id: self.id.unwrap_or_default(),
            subject: self.subject.unwrap_or_default(),
            start,
            end,
            time_zone,
        })
    }
}

/// Graph `dateTimeTimeZone` resource: a wall-clock string plus a zone label
#[derive(Debug, Clone, Deserialize)]
pub struct GraphDateTimeTimeZone {
    #[serde(rename = "dateTime")]
    pub date_time: Option<String>,
    #[serde(rename = "timeZone")]
    pub time_zone: Option<String>,
}

impl GraphDateTimeTimeZone {
    fn to_instant(&self) -> Option<DateTime<Utc>> {
        let raw = self.date_time.as_deref()?;
        let naive = parse_graph_wall_clock(raw)?;
        let offset = timezone::resolve_offset(self.time_zone.as_deref().unwrap_or("UTC"));
        naive
            .and_local_timezone(offset)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Graph `person` resource (suggestion fields only)
#[derive(Debug, Clone, Deserialize)]
pub struct GraphPerson {
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "scoredEmailAddresses")]
    pub scored_email_addresses: Option<Vec<GraphScoredEmailAddress>>,
}

impl GraphPerson {
    pub fn into_person(self) -> Person {
        let addresses = self
            .scored_email_addresses
            .unwrap_or_default()
            .into_iter()
            .filter_map(|scored| scored.address)
            .collect();
        Person {
            display_name: self.display_name,
            addresses,
        }
    }
}

/// Graph `scoredEmailAddress` resource
#[derive(Debug, Clone, Deserialize)]
pub struct GraphScoredEmailAddress {
    pub address: Option<String>,
    #[serde(rename = "relevanceScore")]
    pub relevance_score: Option<f64>,
}

/// Graph `user` resource (profile fields only)
#[derive(Debug, Clone, Deserialize)]
pub struct GraphUser {
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "userPrincipalName")]
    pub user_principal_name: Option<String>,
}

impl GraphUser {
    pub fn into_profile(self) -> UserProfile {
        UserProfile {
            display_name: self.display_name.unwrap_or_default(),
            user_principal_name: self.user_principal_name,
        }
    }
}

/// Graph `mailboxSettings` resource (time zone only)
#[derive(Debug, Clone, Deserialize)]
pub struct GraphMailboxSettings {
    #[serde(rename = "timeZone")]
    pub time_zone: Option<String>,
}

impl GraphMailboxSettings {
    pub fn into_settings(self) -> MailboxSettings {
        MailboxSettings {
            time_zone: self.time_zone.unwrap_or_else(|| "UTC".into()),
        }
    }
}

/// `POST /me/sendMail` payload
#[derive(Debug, Serialize)]
pub struct GraphSendMailRequest {
    pub message: GraphOutgoingMessage,
    #[serde(rename = "saveToSentItems")]
    pub save_to_sent_items: bool,
}

/// `POST /me/messages/{id}/reply` payload
#[derive(Debug, Serialize)]
pub struct GraphReplyRequest {
    pub message: GraphOutgoingMessage,
}

/// Outgoing `message` resource
#[derive(Debug, Serialize)]
pub struct GraphOutgoingMessage {
    pub subject: String,
    pub body: GraphItemBody,
    #[serde(rename = "toRecipients")]
    pub to_recipients: Vec<GraphRecipient>,
}

impl From<&OutgoingMessage> for GraphOutgoingMessage {
    fn from(message: &OutgoingMessage) -> Self {
        Self {
            subject: message.subject.clone(),
            body: GraphItemBody::from(&message.body),
            to_recipients: message.to.iter().map(GraphRecipient::from).collect(),
        }
    }
}

/// Parse an absolute Graph timestamp (`2024-03-10T15:30:00Z`)
fn parse_graph_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a Graph wall-clock string, with or without fractional seconds
/// (`2024-03-10T15:30:00.0000000`)
fn parse_graph_wall_clock(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}
