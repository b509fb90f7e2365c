pub mod config;
pub mod host;
pub mod humanize;
pub mod observability;
pub mod worker;
