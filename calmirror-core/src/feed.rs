//! Where the feed document comes from.

use async_trait::async_trait;
use reqwest::header::COOKIE;
use url::Url;

use crate::error::{CalMirrorError, CalMirrorResult};

/// Something that can hand over the raw feed document for one run.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> CalMirrorResult<String>;
}

/// Fetches the feed over HTTP(S).
///
/// The credential, if any, is an opaque session value obtained elsewhere and
/// sent verbatim as the `Cookie` header.
pub struct HttpFeed {
    client: reqwest::Client,
    url: Url,
    credential: Option<String>,
}

impl HttpFeed {
    pub fn new(url: Url, credential: Option<String>) -> Self {
        HttpFeed {
            client: reqwest::Client::new(),
            url: normalize_feed_url(url),
            credential,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// `webcal://` is a hint for calendar apps, not a transport.
fn normalize_feed_url(url: Url) -> Url {
    if url.scheme() != "webcal" {
        return url;
    }

    let rewritten = format!("https{}", &url.as_str()["webcal".len()..]);
    Url::parse(&rewritten).unwrap_or(url)
}

#[async_trait]
impl FeedSource for HttpFeed {
    async fn fetch(&self) -> CalMirrorResult<String> {
        tracing::debug!("Fetching feed from {}", self.url);

        let mut request = self.client.get(self.url.clone());
        if let Some(credential) = &self.credential {
            request = request.header(COOKIE, credential);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CalMirrorError::FeedFetch(format!("{}: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CalMirrorError::FeedFetch(format!(
                "{} returned HTTP {}",
                self.url, status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| CalMirrorError::FeedFetch(format!("{}: {}", self.url, e)))
    }
}

/// A feed held in memory.
pub struct StaticFeed(pub String);

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch(&self) -> CalMirrorResult<String> {
        Ok(self.0.clone())
    }
}
