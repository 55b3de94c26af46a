//! Azure Retail Prices API client
//!
//! Fetches pricing data from the public retail catalogue.
//! https://docs.microsoft.com/en-us/rest/api/cost-management/retail-prices/azure-retail-prices

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::error::{PricingError, PricingResult};
use crate::models::{RegionalPrices, RetailPriceResponse};

/// Azure Retail Prices API endpoint
const AZURE_PRICING_API: &str = "https://prices.azure.com/api/retail/prices";

/// Source of regional VM prices. The production implementation pages
/// through the retail catalogue; tests substitute a stub.
#[async_trait]
pub trait RetailPriceSource: Send + Sync {
    async fn fetch_region(&self, region: &str) -> PricingResult<RegionalPrices>;
}

/// HTTP client for the retail catalogue
pub struct RetailPriceClient {
    client: Client,
    base_url: String,
}

impl RetailPriceClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: AZURE_PRICING_API.to_string(),
        }
    }

    /// Point the client at a non-default catalogue endpoint (test servers)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn first_page_url(&self, region: &str) -> String {
        let filter = format!(
            "armRegionName eq '{}' and serviceName eq 'Virtual Machines' and priceType eq 'Consumption'",
            region
        );
        format!("{}?$filter={}", self.base_url, urlencoding::encode(&filter))
    }

    async fn fetch_page(&self, url: &str) -> PricingResult<RetailPriceResponse> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(PricingError::Api(response.status().to_string()));
        }

        response
            .json()
            .await
            .map_err(|e| PricingError::Parse(e.to_string()))
    }
}

impl Default for RetailPriceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RetailPriceSource for RetailPriceClient {
    /// Page through every VM consumption price for the region, folding
    /// items into on-demand and spot maps
    async fn fetch_region(&self, region: &str) -> PricingResult<RegionalPrices> {
        info!(region = region, "Fetching Azure VM retail prices");

        let mut prices = RegionalPrices::default();
        let mut url = self.first_page_url(region);
        let mut pages = 0usize;

        loop {
            let page = self.fetch_page(&url).await?;
            pages += 1;

            for item in &page.items {
                prices.absorb(item);
            }

            match page.next_page_link {
                Some(next) if !next.is_empty() => url = next,
                _ => break,
            }
        }

        debug!(
            region = region,
            pages = pages,
            on_demand = prices.on_demand.len(),
            spot = prices.spot.len(),
            "Retail price fetch complete"
        );

        Ok(prices)
    }
}
