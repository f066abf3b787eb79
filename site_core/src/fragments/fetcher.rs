//! Fragment fetchers - HTTP for live sites, in-memory for headless runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use url::Url;

use crate::error::FetchError;

/// A fetched fragment response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFragment {
    pub status: u16,
    pub body: String,
}

impl FetchedFragment {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Retrieves fragment markup by relative path.
#[async_trait]
pub trait FragmentFetcher: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<FetchedFragment, FetchError>;
}

/// Fetches fragments over HTTP, resolving paths against the site origin.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base: Url,
}

impl HttpFetcher {
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(client: reqwest::Client, base: Url) -> Self {
        Self { client, base }
    }

    fn resolve(&self, path: &str) -> Result<Url, FetchError> {
        self.base.join(path).map_err(|source| FetchError::InvalidUrl {
            path: path.to_string(),
            source,
        })
    }
}

#[async_trait]
impl FragmentFetcher for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<FetchedFragment, FetchError> {
        let url = self.resolve(path)?;
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(FetchedFragment { status, body })
    }
}

#[derive(Debug, Clone)]
enum Canned {
    Response(FetchedFragment),
    Failure(String),
}

#[derive(Debug, Clone)]
struct Route {
    canned: Canned,
    delay: Option<Duration>,
}

/// Serves fragments from memory. Unknown paths answer 404.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    routes: HashMap<String, Route>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status 200.
    pub fn with_fragment(self, path: impl Into<String>, body: impl Into<String>) -> Self {
        self.with_response(path, FetchedFragment::ok(body))
    }

    pub fn with_response(mut self, path: impl Into<String>, response: FetchedFragment) -> Self {
        self.routes.insert(
            path.into(),
            Route {
                canned: Canned::Response(response),
                delay: None,
            },
        );
        self
    }

    /// Fail the fetch as a network error would.
    pub fn with_failure(mut self, path: impl Into<String>, reason: impl Into<String>) -> Self {
        self.routes.insert(
            path.into(),
            Route {
                canned: Canned::Failure(reason.into()),
                delay: None,
            },
        );
        self
    }

    /// Delay the answer for an already registered path.
    pub fn with_delay(mut self, path: &str, delay: Duration) -> Self {
        if let Some(route) = self.routes.get_mut(path) {
            route.delay = Some(delay);
        }
        self
    }

    /// Paths requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl FragmentFetcher for MemoryFetcher {
    async fn fetch(&self, path: &str) -> Result<FetchedFragment, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());

        let Some(route) = self.routes.get(path).cloned() else {
            return Ok(FetchedFragment {
                status: 404,
                body: String::new(),
            });
        };

        if let Some(delay) = route.delay {
            tokio::time::sleep(delay).await;
        }

        match route.canned {
            Canned::Response(response) => Ok(response),
            Canned::Failure(reason) => Err(FetchError::Unavailable(reason)),
        }
    }
}
