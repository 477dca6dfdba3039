//! Weekly housing-subscription (청약) notices: scraping, week filtering,
//! iCalendar feeds, and model-ranked recommendations.

pub mod browser;
pub mod config;
pub mod error;
pub mod feed;
pub mod notices;
pub mod scrape;
pub mod strategy;
pub mod subscriptions;
pub mod telemetry;
