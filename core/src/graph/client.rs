//! Microsoft Graph HTTP client

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::calendar::CalendarWindow;
use crate::error::{SpyglassError, SpyglassResult};
use crate::graph::wire::{
    GraphEvent, GraphMailboxSettings, GraphMessage, GraphOutgoingMessage, GraphPage, GraphPerson,
    GraphReplyRequest, GraphSendMailRequest, GraphUser,
};
use crate::graph::MailboxApi;
use crate::model::{
    CalendarEvent, MailItem, MailboxSettings, OutgoingMessage, Person, UserProfile,
};
use crate::session::TokenProvider;

/// Default Graph service root
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Fields requested for every message fetch
const MESSAGE_SELECT: &str = "id,subject,from,bodyPreview,body,isRead,receivedDateTime,webLink";

/// Page cap for incremental fetches
const INCREMENTAL_PAGE_SIZE: usize = 100;

/// People fetched for recipient suggestions
const PEOPLE_PAGE_SIZE: usize = 10;

/// Bytes of response body kept when a request fails
const ERROR_DETAIL_CHARS: usize = 500;

/// `reqwest`-backed [`MailboxApi`] implementation.
///
/// Authentication is pulled per request from the injected token provider,
/// so the client can be constructed before sign-in completes.
pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl GraphClient {
    /// Client against the public Graph endpoint
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: GRAPH_BASE_URL.to_string(),
            tokens,
        }
    }

    /// Client against a custom service root (national clouds, test servers)
    pub fn with_base_url(
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> SpyglassResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url)?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            tokens,
        })
    }

    fn endpoint(&self, path: &str) -> SpyglassResult<Url> {
        Ok(Url::parse(&format!("{}/{}", self.base_url, path))?)
    }

    fn people_endpoint(&self) -> SpyglassResult<Url> {
        let mut url = self.endpoint("me/people")?;
        url.query_pairs_mut()
            .append_pair("$top", &PEOPLE_PAGE_SIZE.to_string());
        Ok(url)
    }

    async fn bearer(&self) -> SpyglassResult<String> {
        match self.tokens.acquire_token_silent().await? {
            Some(token) => Ok(token.secret),
            None => Err(SpyglassError::SignedOut),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> SpyglassResult<T> {
        let token = self.bearer().await?;
        debug!(url = %url, "graph GET");
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> SpyglassResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpyglassError::graph(status.as_u16(), truncate_detail(&body)));
        }
        Ok(response.json::<T>().await?)
    }

    async fn post_json<B: Serialize>(&self, url: Url, payload: &B) -> SpyglassResult<()> {
        let token = self.bearer().await?;
        debug!(url = %url, "graph POST");
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpyglassError::graph(status.as_u16(), truncate_detail(&body)));
        }
        Ok(())
    }
}

#[async_trait]
impl MailboxApi for GraphClient {
    async fn me(&self) -> SpyglassResult<UserProfile> {
        let mut url = self.endpoint("me")?;
        url.query_pairs_mut()
            .append_pair("$select", "displayName,userPrincipalName");
        let user: GraphUser = self.get_json(url).await?;
        Ok(user.into_profile())
    }

    async fn mailbox_settings(&self) -> SpyglassResult<MailboxSettings> {
        let url = self.endpoint("me/mailboxSettings")?;
        let settings: GraphMailboxSettings = self.get_json(url).await?;
        Ok(settings.into_settings())
    }

    async fn list_inbox(&self, top: usize) -> SpyglassResult<Vec<MailItem>> {
        let mut url = self.endpoint("me/mailFolders/inbox/messages")?;
        url.query_pairs_mut()
            .append_pair("$top", &top.to_string())
            .append_pair("$select", MESSAGE_SELECT)
            .append_pair("$orderby", "receivedDateTime desc");
        let page: GraphPage<GraphMessage> = self.get_json(url).await?;
        Ok(page
            .value
            .into_iter()
            .map(GraphMessage::into_mail_item)
            .collect())
    }

    async fn list_inbox_since(&self, since: DateTime<Utc>) -> SpyglassResult<Vec<MailItem>> {
        let mut url = self.endpoint("me/mailFolders/inbox/messages")?;
        url.query_pairs_mut()
            .append_pair("$filter", &newer_than_filter(since))
            .append_pair("$orderby", "receivedDateTime asc")
            .append_pair("$select", MESSAGE_SELECT)
            .append_pair("$top", &INCREMENTAL_PAGE_SIZE.to_string());
        let page: GraphPage<GraphMessage> = self.get_json(url).await?;
        Ok(page
            .value
            .into_iter()
            .map(GraphMessage::into_mail_item)
            .collect())
    }

    async fn calendar_view(
        &self,
        window: CalendarWindow,
        time_zone: &str,
        top: usize,
    ) -> SpyglassResult<Vec<CalendarEvent>> {
        let mut url = self.endpoint("me/calendarView")?;
        url.query_pairs_mut()
            .append_pair(
                "startDateTime",
                &window.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            )
            .append_pair(
                "endDateTime",
                &window.end.to_rfc3339_opts(SecondsFormat::Secs, true),
            )
            .append_pair("$orderby", "start/dateTime")
            .append_pair("$top", &top.to_string());

        let token = self.bearer().await?;
        debug!(url = %url, "graph GET");
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .header("Prefer", format!("outlook.timezone=\"{}\"", time_zone))
            .send()
            .await?;
        let page: GraphPage<GraphEvent> = Self::read_json(response).await?;
        Ok(page.value.into_iter().filter_map(GraphEvent::into_event).collect())
    }

    async fn send_mail(&self, message: &OutgoingMessage) -> SpyglassResult<()> {
        let url = self.endpoint("me/sendMail")?;
        let payload = GraphSendMailRequest {
            message: GraphOutgoingMessage::from(message),
            save_to_sent_items: true,
        };
        self.post_json(url, &payload).await
    }

    async fn reply(&self, message_id: &str, message: &OutgoingMessage) -> SpyglassResult<()> {
        let url = self.endpoint(&format!("me/messages/{message_id}/reply"))?;
        let payload = GraphReplyRequest {
            message: GraphOutgoingMessage::from(message),
        };
        self.post_json(url, &payload).await
    }

    async fn recent_people(&self) -> SpyglassResult<Vec<Person>> {
        let page: GraphPage<GraphPerson> = self.get_json(self.people_endpoint()?).await?;
        Ok(page.value.into_iter().map(GraphPerson::into_person).collect())
    }
}

/// OData filter for messages received strictly after `since`
fn newer_than_filter(since: DateTime<Utc>) -> String {
    format!(
        "receivedDateTime gt {}",
        since.format("%Y-%m-%dT%H:%M:%SZ")
    )
}

fn truncate_detail(body: &str) -> String {
    if body.chars().count() <= ERROR_DETAIL_CHARS {
        body.to_string()
    } else {
        body.chars().take(ERROR_DETAIL_CHARS).collect()
    }
}
