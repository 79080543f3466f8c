//! Feed retrieval: HTTP transport and the instrumented feed fetcher.

mod basic;
mod client;
mod feed;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use feed::{FETCH_TIMEOUT, FeedFetcher, FeedKind};

use anyhow::Result;

/// Issues a GET for `url` and returns the response body.
///
/// Non-success statuses are turned into errors.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}
