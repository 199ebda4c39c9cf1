//! Compose draft and the send gate
//!
//! A draft lives for one compose view: it is built fresh (optionally from
//! a source message for reply and forward), edited, and discarded after a
//! successful send or on navigation away. The committed recipient set is
//! rebuilt from the raw line on every edit.

use tracing::debug;

use crate::compose::recipients::{is_valid_address, parse_recipients};
use crate::error::{SpyglassError, SpyglassResult};
use crate::graph::MailboxApi;
use crate::model::{BodyContent, EmailAddress, MailItem, OutgoingMessage};

/// Subject prefix for replies
pub const REPLY_PREFIX: &str = "Re: ";

/// Subject prefix for forwards
pub const FORWARD_PREFIX: &str = "Fwd: ";

/// Body header prepended to forwarded content
pub const FORWARD_BODY_HEADER: &str = "Forwarded message:\n\n";

/// An in-progress outgoing message
#[derive(Debug, Clone, Default)]
pub struct ComposeDraft {
    /// Subject line; may stay empty
    pub subject: String,
    /// Plain-text body
    pub body: String,
    recipients: Vec<String>,
    in_reply_to: Option<String>,
}

impl ComposeDraft {
    /// Empty draft for a new message
    pub fn new() -> Self {
        Self::default()
    }

    /// Draft replying to `source`.
    ///
    /// The subject gains a `Re: ` prefix unless it already carries one,
    /// the source sender is pre-filled as the sole recipient, and the
    /// send goes to the reply endpoint against the source message id.
    pub fn reply_to(source: &MailItem) -> Self {
        let subject = if source.subject.starts_with(REPLY_PREFIX) {
            source.subject.clone()
        } else {
            format!("{REPLY_PREFIX}{}", source.subject)
        };
        let recipients = source
            .sender
            .as_ref()
            .map(|sender| vec![sender.address.clone()])
            .unwrap_or_default();
        Self {
            subject,
            body: String::new(),
            recipients,
            in_reply_to: Some(source.id.clone()),
        }
    }

    /// Draft forwarding `source`.
    ///
    /// The subject gains a `Fwd: ` prefix, the body quotes the source
    /// under [`FORWARD_BODY_HEADER`], and no recipients are pre-filled.
    /// A forward is sent as a new message, not a reply.
    pub fn forward_of(source: &MailItem) -> Self {
        Self {
            subject: format!("{FORWARD_PREFIX}{}", source.subject),
            body: format!("{FORWARD_BODY_HEADER}{}", source.body.text),
            recipients: Vec::new(),
            in_reply_to: None,
        }
    }

    /// Rebuild the committed recipient set from a raw recipient line
    pub fn set_recipient_line(&mut self, raw: &str) {
        self.recipients = parse_recipients(raw);
    }

    /// Add one address, as clicked through from a suggestion.
    ///
    /// Invalid input and addresses already in the set are logged and
    /// ignored; the draft is unchanged either way.
    pub fn add_recipient(&mut self, address: &str) {
        let address = address.trim();
        if !is_valid_address(address) {
            debug!(address, "ignoring invalid suggested recipient");
            return;
        }
        if self.recipients.iter().any(|existing| existing == address) {
            debug!(address, "recipient already present, ignoring");
            return;
        }
        self.recipients.push(address.to_string());
    }

    /// Committed recipient addresses, in commit order
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Source message id when the draft was opened in reply mode
    pub fn in_reply_to(&self) -> Option<&str> {
        self.in_reply_to.as_deref()
    }

    /// The send gate: at least one recipient and a non-empty body.
    /// The subject may stay empty.
    pub fn can_send(&self) -> bool {
        !self.recipients.is_empty() && !self.body.is_empty()
    }

    /// Submit the draft through `api`: the reply endpoint when the draft
    /// was opened in reply mode, a fresh send otherwise.
    ///
    /// Fails with a validation error if the send gate is closed. Errors
    /// propagate; there is no retry.
    pub async fn send(&self, api: &dyn MailboxApi) -> SpyglassResult<()> {
        if !self.can_send() {
            return Err(SpyglassError::validation(
                "draft needs at least one recipient and a body",
            ));
        }
        let message = OutgoingMessage {
            subject: self.subject.clone(),
            body: BodyContent::text(self.body.clone()),
            to: self
                .recipients
                .iter()
                .map(|address| EmailAddress::new(address.clone()))
                .collect(),
        };
        match &self.in_reply_to {
            Some(message_id) => api.reply(message_id, &message).await,
            None => api.send_mail(&message).await,
        }
    }
}
