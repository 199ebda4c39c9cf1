//! Recipient suggestions from the People API

use crate::error::SpyglassResult;
use crate::graph::MailboxApi;
use crate::model::EmailAddress;

/// Map the relevance-ranked People list into address suggestions.
///
/// People without a usable address are skipped; for the rest the first
/// (highest scored) address wins and the display name is carried when
/// present. The relevance order the service returned is preserved.
pub async fn suggested_recipients(api: &dyn MailboxApi) -> SpyglassResult<Vec<EmailAddress>> {
    let people = api.recent_people().await?;
    Ok(people
        .into_iter()
        .filter_map(|person| {
            let address = person
                .addresses
                .into_iter()
                .find(|address| !address.trim().is_empty())?;
            Some(match person.display_name {
                Some(name) => EmailAddress::with_name(name, address),
                None => EmailAddress::new(address),
            })
        })
        .collect())
}
