//! Terminal front end: config setup and the one-shot refresh report.

pub mod refresh;
pub mod setup;
pub mod ui;
