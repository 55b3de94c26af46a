//! Pricing provider: snapshot store, lookups and the periodic refresher.

use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::client::RetailPriceSource;
use crate::error::PricingResult;
use crate::fallback::{static_prices, MISSING_PRICE_SENTINEL, MISSING_PRICE_SKUS};
use crate::models::RegionalPrices;

#[derive(Debug, Clone)]
struct Snapshot {
    prices: RegionalPrices,
    on_demand_updated: Option<DateTime<Utc>>,
    spot_updated: Option<DateTime<Utc>>,
}

/// Serves on-demand and spot price lookups for one region.
///
/// Reads take a shared lock and are non-blocking in the common case; the
/// refresher swaps whole snapshots. A fetch failure keeps the previous
/// snapshot so lookups never regress to empty.
pub struct PricingProvider {
    source: Arc<dyn RetailPriceSource>,
    region: String,
    /// Sovereign clouds have no public catalogue; they run off the
    /// compiled-in table only
    public_cloud: bool,
    refresh_interval: Duration,
    snapshot: RwLock<Snapshot>,
}

impl PricingProvider {
    pub fn new(
        source: Arc<dyn RetailPriceSource>,
        region: impl Into<String>,
        public_cloud: bool,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            source,
            region: region.into(),
            public_cloud,
            refresh_interval,
            snapshot: RwLock::new(Snapshot {
                prices: static_prices(),
                on_demand_updated: None,
                spot_updated: None,
            }),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Hourly on-demand price for a SKU. Known catalogue gaps resolve to
    /// the sentinel so the arbiter ranks them last without refusing them.
    pub fn on_demand_price(&self, name: &str) -> Option<f64> {
        let snapshot = self.snapshot.read().unwrap_or_else(|e| e.into_inner());
        snapshot
            .prices
            .on_demand
            .get(name)
            .copied()
            .or_else(|| MISSING_PRICE_SKUS.contains(&name).then_some(MISSING_PRICE_SENTINEL))
    }

    /// Hourly spot price for a SKU
    pub fn spot_price(&self, name: &str) -> Option<f64> {
        let snapshot = self.snapshot.read().unwrap_or_else(|e| e.into_inner());
        snapshot
            .prices
            .spot
            .get(name)
            .copied()
            .or_else(|| MISSING_PRICE_SKUS.contains(&name).then_some(MISSING_PRICE_SENTINEL))
    }

    /// When the on-demand map last changed, if a live fetch ever landed
    pub fn last_on_demand_update(&self) -> Option<DateTime<Utc>> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .on_demand_updated
    }

    /// When the spot map last changed, if a live fetch ever landed
    pub fn last_spot_update(&self) -> Option<DateTime<Utc>> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .spot_updated
    }

    /// Fetch the region's catalogue and swap the snapshot. On failure the
    /// previous snapshot is retained and the error is returned.
    pub async fn refresh(&self) -> PricingResult<()> {
        if !self.public_cloud {
            // Nothing to fetch; the compiled-in table is authoritative
            return Ok(());
        }

        let fetched = self.source.fetch_region(&self.region).await?;
        let now = Utc::now();

        let mut snapshot = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        info!(
            region = %self.region,
            on_demand = fetched.on_demand.len(),
            spot = fetched.spot.len(),
            "Pricing snapshot refreshed"
        );
        snapshot.prices = fetched;
        snapshot.on_demand_updated = Some(now);
        snapshot.spot_updated = Some(now);
        Ok(())
    }

    /// Refresh on a fixed interval until shutdown. The first refresh runs
    /// immediately so lookups leave the static table as soon as possible.
    pub async fn run_refresher(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        if !self.public_cloud {
            info!(region = %self.region, "Static pricing only; refresher not started");
            return;
        }

        let mut ticker = tokio::time::interval(self.refresh_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh().await {
                        warn!(region = %self.region, error = %e, "Price refresh failed, serving previous snapshot");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!(region = %self.region, "Pricing refresher stopping");
                        return;
                    }
                }
            }
        }
    }

    /// Age check used by the health probe: stale when a public-cloud
    /// deployment has gone several refresh intervals without live data.
    pub fn is_stale(&self, max_intervals: u32) -> bool {
        if !self.public_cloud {
            return false;
        }
        let limit = self.refresh_interval * max_intervals;
        match self.last_on_demand_update() {
            Some(updated) => {
                let age = Utc::now().signed_duration_since(updated);
                age.to_std().map(|age| age > limit).unwrap_or(false)
            }
            // Never refreshed: stale only if the process has somehow been
            // serving static prices for the whole window. Callers track
            // process start separately; treat as fresh here.
            None => false,
        }
    }
}

impl std::fmt::Debug for PricingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingProvider")
            .field("region", &self.region)
            .field("public_cloud", &self.public_cloud)
            .field("refresh_interval", &self.refresh_interval)
            .finish()
    }
}
