//! Core domain types and the refresh pipeline

pub mod config;
pub mod country;
pub mod estimator;
pub mod log;
pub mod refresh;
pub mod source;
pub mod summary;

// Re-export main types for cleaner imports
pub use country::{Country, CountryFilter, CountryRecord, RefreshStatus, SortOrder};
pub use estimator::{MultiplierSource, RandomMultiplier};
pub use refresh::{RefreshError, RefreshOutcome, Refresher};
pub use source::{CountrySource, RateSource, RateTable};
pub use summary::SummaryRenderer;
