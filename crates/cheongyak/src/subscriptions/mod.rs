//! Weekly notice collection and the HTTP endpoints built on it.

pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use router::{subscription_router, DEGRADED_SOURCES_HEADER};
pub use service::{
    feed_sources, standard_sources, SubscriptionService, WeeklyNotices, WeeklyStrategy,
};
