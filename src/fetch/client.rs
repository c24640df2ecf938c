use async_trait::async_trait;
use reqwest::{Request, Response};

/// Transport seam for the realtime fetch, so callers can swap the HTTP stack.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
