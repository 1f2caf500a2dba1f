use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

/// Transport seam for the pipeline. The live implementation talks HTTP;
/// tests drive the pipeline with canned documents instead.
///
/// Neither method retries; skip-and-continue policy lives in the caller.
#[async_trait]
pub trait Fetch {
    async fn get(&self, url: &str) -> Result<String>;
    async fn post_form(&self, url: &str, fields: &[(String, String)]) -> Result<String>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        // The portal issues a session cookie alongside its postback tokens;
        // it has to be round-tripped on every page request.
        let client = Client::builder()
            .user_agent("etrack-scraper/0.1")
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get(&self, url: &str) -> Result<String> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()?;
        Ok(res.text().await?)
    }

    async fn post_form(&self, url: &str, fields: &[(String, String)]) -> Result<String> {
        let res = self
            .client
            .post(url)
            .form(fields)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?
            .error_for_status()?;
        Ok(res.text().await?)
    }
}
