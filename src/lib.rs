//! netdesk - workflow orchestration core for an ISP operations console
//!
//! Drives the multi-step ticket and device-configuration wizards: resolves a
//! mode to its form schema and backend call, runs debounced customer search,
//! scans OLTs for unconfigured devices, and manages the deduplicated batch
//! queue with asynchronous customer enrichment.

pub mod api;
pub mod audit;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod notifications;
pub mod queue;
pub mod search;
pub mod strategy;
pub mod types;
pub mod wizard;
