//! Full refetch of every collection, used in poll mode and on reconnect.
//!
//! Refetches ask for `fresh` pages. A cached page may predate events the
//! dashboard already applied, and a replace would drop them.

use std::future::Future;

use serde::de::DeserializeOwned;

use crate::api::dto::ApiResponse;
use crate::domain::{Client, Payment, Station};

/// Largest page the list endpoints serve.
const PAGE_SIZE: u32 = 100;

/// Refetch failure.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport or decoding failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-success status.
    #[error("gateway returned {status} for {path}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request path.
        path: String,
    },
}

/// Every collection as served by the REST API.
#[derive(Debug, Clone, Default)]
pub struct FullSnapshot {
    /// All clients, newest first.
    pub clients: Vec<Client>,
    /// All stations, newest first.
    pub stations: Vec<Station>,
    /// All payments, newest first.
    pub payments: Vec<Payment>,
}

/// Source of full refetches.
pub trait Fetcher: Send + Sync + 'static {
    /// Loads every collection.
    fn fetch_all(&self) -> impl Future<Output = Result<FullSnapshot, FetchError>> + Send;
}

/// [`Fetcher`] over the gateway's REST list endpoints.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    /// Creates a fetcher for the gateway at `base_url` (e.g.
    /// `http://localhost:3000`).
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_list<T: DeserializeOwned>(&self, resource: &str) -> Result<Vec<T>, FetchError> {
        let path = format!("/api/v1/{resource}");
        let mut items = Vec::new();
        let mut page = 1u32;
        loop {
            let response = self
                .client
                .get(format!("{}{path}", self.base_url))
                .query(&[("page", page), ("per_page", PAGE_SIZE)])
                .query(&[("fresh", true)])
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(FetchError::Status {
                    status: response.status().as_u16(),
                    path,
                });
            }
            let body: ApiResponse<Vec<T>> = response.json().await?;
            items.extend(body.data);
            let total_pages = body.pagination.map_or(1, |p| p.total_pages);
            if page >= total_pages {
                return Ok(items);
            }
            page += 1;
        }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch_all(&self) -> Result<FullSnapshot, FetchError> {
        let (clients, stations, payments) = tokio::try_join!(
            self.fetch_list("clients"),
            self.fetch_list("stations"),
            self.fetch_list("payments"),
        )?;
        Ok(FullSnapshot {
            clients,
            stations,
            payments,
        })
    }
}
