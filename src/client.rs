use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::AuthContext;
use crate::error::{MailFetchError, Result};
use crate::model::GraphPage;
use crate::paginate::{Page, PageFetcher};

pub struct GraphClient {
    client: Client,
    auth: AuthContext,
    base_url: Url,
}

impl GraphClient {
    pub fn new(client: Client, auth: AuthContext, base_url: &Url) -> Self {
        Self {
            client,
            auth,
            base_url: base_url.clone(),
        }
    }

    pub fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .bearer_auth(&self.auth.access_token)
            .header("Accept", "application/json")
    }

    fn url_with_segments(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// `users/{user}/messages`, optionally limited to `page_size` per page.
    pub fn messages_url(&self, user: &str, page_size: Option<u32>) -> String {
        let mut url = self.url_with_segments(&["users", user, "messages"]);
        if let Some(top) = page_size {
            url.query_pairs_mut().append_pair("$top", &top.to_string());
        }
        url.into()
    }

    pub fn attachments_url(&self, user: &str, message_id: &str) -> String {
        self.url_with_segments(&["users", user, "messages", message_id, "attachments"])
            .into()
    }

    pub async fn get_page<T: DeserializeOwned>(&self, url: &str) -> Result<Page<T>> {
        debug!(%url, "fetching page");
        let resp = self.get(url).send().await.map_err(|e| MailFetchError::PageFetch {
            url: url.to_string(),
            message: "request failed".to_string(),
            source: Some(e),
        })?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| MailFetchError::PageFetch {
            url: url.to_string(),
            message: format!("failed to read {status} response"),
            source: Some(e),
        })?;
        if !status.is_success() {
            return Err(MailFetchError::page_fetch(
                url,
                format!("Graph query failed: {status}: {body}"),
            ));
        }
        let page: GraphPage<T> = serde_json::from_str(&body)
            .map_err(|e| MailFetchError::page_fetch(url, format!("unexpected response: {e}")))?;
        debug!(%url, items = page.value.len(), more = page.next_link.is_some(), "page received");
        Ok(page.into())
    }

    /// Follows `@odata.nextLink` cursors for a collection of `T`.
    pub fn pages<T>(&self) -> GraphPages<'_, T> {
        GraphPages {
            graph: self,
            _item: PhantomData,
        }
    }
}

pub struct GraphPages<'a, T> {
    graph: &'a GraphClient,
    _item: PhantomData<fn() -> T>,
}

#[async_trait]
impl<'a, T> PageFetcher<T> for GraphPages<'a, T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch_next(&self, cursor: &str) -> Result<Page<T>> {
        self.graph.get_page(cursor).await
    }
}
