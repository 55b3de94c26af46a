use serde::Deserialize;
use std::collections::HashMap;

/// One page of the Azure Retail Prices API
#[derive(Debug, Deserialize)]
pub struct RetailPriceResponse {
    #[serde(rename = "Items")]
    pub items: Vec<RetailPriceItem>,
    #[serde(rename = "NextPageLink")]
    pub next_page_link: Option<String>,
}

/// A single retail price item. Only the fields the autoscaler consumes
/// are modeled; the API carries many more.
#[derive(Debug, Clone, Deserialize)]
pub struct RetailPriceItem {
    #[serde(rename = "armSkuName")]
    pub arm_sku_name: Option<String>,
    #[serde(rename = "skuName")]
    pub sku_name: String,
    #[serde(rename = "retailPrice")]
    pub retail_price: f64,
    #[serde(rename = "armRegionName")]
    pub arm_region_name: String,
    #[serde(rename = "productName", default)]
    pub product_name: String,
    #[serde(rename = "meterName", default)]
    pub meter_name: String,
}

impl RetailPriceItem {
    /// Windows-licensed meters are not valid Linux node prices
    pub fn is_windows(&self) -> bool {
        self.product_name.ends_with(" Windows")
    }

    /// Low Priority is the legacy batch preemption tier, not spot
    pub fn is_low_priority(&self) -> bool {
        self.meter_name.ends_with(" Low Priority")
    }

    /// Spot prices are flagged through the SKU name suffix
    pub fn is_spot(&self) -> bool {
        self.sku_name.ends_with(" Spot")
    }
}

/// Per-region price maps keyed by ARM SKU name
#[derive(Debug, Clone, Default)]
pub struct RegionalPrices {
    pub on_demand: HashMap<String, f64>,
    pub spot: HashMap<String, f64>,
}

impl RegionalPrices {
    /// Fold a retail item into the maps, applying the skip rules
    pub fn absorb(&mut self, item: &RetailPriceItem) {
        if item.is_windows() || item.is_low_priority() {
            return;
        }
        let Some(name) = item.arm_sku_name.as_deref() else {
            return;
        };
        if name.is_empty() {
            return;
        }

        if item.is_spot() {
            self.spot.insert(name.to_string(), item.retail_price);
        } else {
            self.on_demand.insert(name.to_string(), item.retail_price);
        }
    }
}
