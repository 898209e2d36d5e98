//! Paginated, bearer-authenticated API client
//!
//! Walks `{base}/{resource}?limit={n}&page={p}` until the paging metadata
//! reports no next page or the configured page cap bites. The access
//! token comes from the shared `AuthSession` per page, so a refresh in
//! the middle of a long fetch is picked up by the next request.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use clio_auth::AuthSession;

use crate::error::{Error, Result};
use crate::models::{ContactRecord, MatterRecord, Page};

/// Default base URL for the Clio v4 REST API
pub const DEFAULT_BASE_URL: &str = "https://app.clio.com/api/v4";

/// Result of a full paginated fetch.
///
/// `truncated` is set when the page cap stopped a fetch that still had
/// pages remaining; the records collected so far are returned regardless.
/// Truncation is a soft signal for the caller, not an error.
#[derive(Debug, Clone)]
pub struct FetchOutcome<T> {
    pub records: Vec<T>,
    pub pages_fetched: u32,
    pub truncated: bool,
}

/// Paginated API client over an authenticated session.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    session: Arc<AuthSession>,
}

impl ApiClient {
    pub fn new(client: reqwest::Client, base_url: String, session: Arc<AuthSession>) -> Self {
        Self {
            client,
            base_url,
            session,
        }
    }

    /// All contacts in the corpus.
    pub async fn list_contacts(
        &self,
        page_size: u32,
        max_pages: u32,
    ) -> Result<FetchOutcome<ContactRecord>> {
        self.fetch_all("contacts", page_size, max_pages).await
    }

    /// All matters in the corpus.
    pub async fn list_matters(
        &self,
        page_size: u32,
        max_pages: u32,
    ) -> Result<FetchOutcome<MatterRecord>> {
        self.fetch_all("matters", page_size, max_pages).await
    }

    /// Fetch every page of a resource collection.
    ///
    /// Pages are requested sequentially starting at 1 and their `data`
    /// arrays concatenated in order. Stops cleanly when the paging
    /// metadata reports no next page; stops with `truncated = true` when
    /// `max_pages` is reached first. Transport errors are not retried
    /// here (callers own backoff).
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        resource: &str,
        page_size: u32,
        max_pages: u32,
    ) -> Result<FetchOutcome<T>> {
        let mut records = Vec::new();
        let mut page = 1u32;
        let mut pages_fetched = 0u32;

        loop {
            let envelope = self.fetch_page::<T>(resource, page_size, page).await?;
            pages_fetched += 1;
            records.extend(envelope.data);

            if !envelope.meta.paging.has_next(page) {
                debug!(resource, pages_fetched, records = records.len(), "fetch complete");
                return Ok(FetchOutcome {
                    records,
                    pages_fetched,
                    truncated: false,
                });
            }
            if pages_fetched >= max_pages {
                warn!(
                    resource,
                    pages_fetched,
                    records = records.len(),
                    "page cap reached with pages remaining, returning truncated corpus"
                );
                return Ok(FetchOutcome {
                    records,
                    pages_fetched,
                    truncated: true,
                });
            }
            page = envelope.meta.paging.next_page_number(page);
        }
    }

    /// Fetch a single page, refreshing the token once on a 401.
    ///
    /// A second 401 (after the refresh) falls through to the terminal
    /// `Api` error; a refresh failure is terminal as an `Auth` error.
    async fn fetch_page<T: DeserializeOwned>(
        &self,
        resource: &str,
        page_size: u32,
        page: u32,
    ) -> Result<Page<T>> {
        let token = self.session.access_token().await?;
        let mut response = self.get_page(resource, page_size, page, &token).await?;

        if response.status().as_u16() == 401 {
            debug!(resource, page, "unauthorized, refreshing token and retrying page");
            let fresh = self.session.refresh_after_unauthorized(&token).await?;
            response = self.get_page(resource, page_size, page, &fresh).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Page<T>>()
            .await
            .map_err(|e| Error::Decode(format!("decoding {resource} page {page}: {e}")))
    }

    async fn get_page(
        &self,
        resource: &str,
        page_size: u32,
        page: u32,
        token: &str,
    ) -> Result<reqwest::Response> {
        let url = format!("{}/{resource}", self.base_url);
        self.client
            .get(&url)
            .bearer_auth(token)
            .query(&[("limit", page_size), ("page", page)])
            .send()
            .await
            .map_err(|e| Error::Http(format!("requesting {resource} page {page}: {e}")))
    }
}
