use async_trait::async_trait;
use reqwest::{Request, Response};

/// Transport used to retrieve feed payloads.
///
/// Production code goes through [`super::BasicClient`]; tests substitute a
/// client that serves canned responses.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
