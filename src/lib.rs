//! Soroban webhook relayer.
//!
//! Ingests transaction webhooks from a Soroban indexer, deduplicates them,
//! extracts payment details, reconciles addresses against registered
//! wallets, persists the normalized records, and emails mapped users about
//! received payments.

pub mod api;
pub mod app;
pub mod domain;
pub mod extract;
pub mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
