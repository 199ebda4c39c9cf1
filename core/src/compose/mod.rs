//! Compose and send flow
//!
//! [`recipients`] owns the address grammar and the all-or-nothing parse
//! of the recipient line, [`draft::ComposeDraft`] carries one compose
//! view's state through to send/reply/forward, and [`suggestions`] maps
//! the People API into recipient suggestions.

pub mod draft;
pub mod recipients;
pub mod suggestions;

pub use draft::{ComposeDraft, FORWARD_BODY_HEADER, FORWARD_PREFIX, REPLY_PREFIX};
pub use recipients::{is_valid_address, parse_recipients, RECIPIENT_DELIMITER};
pub use suggestions::suggested_recipients;
