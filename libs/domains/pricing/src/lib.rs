//! Pricing Domain
//!
//! Regional on-demand and spot prices for VM SKUs, refreshed periodically
//! from the Azure Retail Prices API with a compiled-in static fallback.
//!
//! ```text
//! ┌───────────────────┐
//! │  PricingProvider  │  ← snapshot store, lookups, periodic refresher
//! └──────┬────────────┘
//!        │
//! ┌──────▼────────────┐
//! │ RetailPriceClient │  ← paged OData fetch against the public catalogue
//! └──────┬────────────┘
//!        │
//! ┌──────▼────────────┐
//! │      Models       │  ← retail API items, regional price maps
//! └───────────────────┘
//! ```

pub mod client;
pub mod error;
pub mod fallback;
pub mod models;
pub mod provider;

// Re-export commonly used types
pub use client::{RetailPriceClient, RetailPriceSource};
pub use error::{PricingError, PricingResult};
pub use fallback::MISSING_PRICE_SENTINEL;
pub use models::{RegionalPrices, RetailPriceItem, RetailPriceResponse};
pub use provider::PricingProvider;
