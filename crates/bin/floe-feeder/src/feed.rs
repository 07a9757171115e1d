//! market price feed (Yahoo Finance chart API)

use crate::error::{FeederError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_FEED_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart/NVDA";

#[derive(Clone)]
pub struct YahooFeed {
    url: String,
    client: Client,
}

impl YahooFeed {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("floe-feeder")
            .build()
            .map_err(|e| FeederError::InvalidConfig(format!("http client: {}", e)))?;
        Ok(Self { url: url.to_string(), client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One GET, no retry.
    pub async fn fetch_reference_price(&self) -> Result<f64> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FeederError::FeedUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeederError::FeedUnavailable(format!("http status {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FeederError::FeedUnavailable(e.to_string()))?;
        parse_chart(&body)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

/// Pull `chart.result[0].meta.regularMarketPrice` out of a chart payload.
pub fn parse_chart(body: &[u8]) -> Result<f64> {
    let response: ChartResponse =
        serde_json::from_slice(body).map_err(|e| FeederError::FeedMalformed(e.to_string()))?;

    let price = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .and_then(|result| result.meta.regular_market_price)
        .ok_or_else(|| FeederError::FeedMalformed("no regularMarketPrice".into()))?;

    if !price.is_finite() || price <= 0.0 {
        return Err(FeederError::FeedMalformed(format!("unusable price {}", price)));
    }
    Ok(price)
}
