//! Sequential web page fetcher producing web-variant records.
//!
//! Every URL yields exactly one record: a normalised page on success, an
//! error-marked record on any failure (connect, timeout, HTTP status, body).

use std::time::Duration;

use biocorpus_common::Result;
use reqwest::Client;
use tracing::{info, instrument, warn};

use crate::models::NormalizedRecord;
use crate::normalise::web::{fetch_error_record, normalize_page, WebDefaults};

const USER_AGENT: &str = "Biocorpus/0.1 (research)";

pub struct WebFetcher {
    client: Client,
    defaults: WebDefaults,
}

impl WebFetcher {
    pub fn new(timeout: Duration, defaults: WebDefaults) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, defaults })
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        Ok(resp.text().await?)
    }

    /// Fetch and normalise one page.
    #[instrument(skip(self))]
    pub async fn fetch_page(&self, url: &str) -> NormalizedRecord {
        let outcome = match self.fetch_html(url).await {
            Ok(html) => normalize_page(url, &html, &self.defaults),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(record) => record,
            Err(e) => {
                warn!(url, error = %e, "Page fetch failed, keeping error record");
                fetch_error_record(url, &e.to_string(), &self.defaults)
            }
        }
    }

    /// Fetch every URL in order, one at a time.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<NormalizedRecord> {
        let mut records = Vec::with_capacity(urls.len());
        for url in urls {
            records.push(self.fetch_page(url).await);
        }
        let failed = records.iter().filter(|r| !r.is_indexable()).count();
        info!(pages = records.len(), not_indexable = failed, "Web fetch complete");
        records
    }
}
