//! Notice records and the current-week filter shared by both endpoints.

pub mod domain;
pub mod week;

pub use domain::{
    Notice, UserProfile, INCOME_LIMIT_PLACEHOLDER, NATIONWIDE, UNKNOWN_REGION, UNKNOWN_TITLE,
};
pub use week::{filter_by_week, WeekClock, WeekRange};
