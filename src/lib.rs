//! Library entry for capwarn: CAP weather-warning ingestion, region filtering
//! and a stale-tolerant refresh scheduler.
//!
//! The pipeline depends only on three capabilities: a
//! [`sources::Fetcher`], an [`app::Clock`] and an [`app::ResultStore`].

pub mod app;
pub mod config;
pub mod error;
pub mod logic;
pub mod sources;
pub mod state;
