pub mod aggregation;
pub mod api;
pub mod cache;
pub mod categories;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod duration;
pub mod error;
pub mod fetchers;
pub mod format;
pub mod periods;
pub mod report;
