//! Test Helper Utilities
//!
//! Shared utilities for testing inb4

#![allow(dead_code)]

pub mod mock_api;

pub use mock_api::{ApiCall, MockApi};

use inb4::rate_limiter::RateLimiter;
use inb4_common::DateRange;
use std::sync::Arc;
use std::time::Duration;

/// Range used by most tests: all of 2014
pub fn test_range() -> DateRange {
    DateRange::from_days(
        chrono::NaiveDate::from_ymd_opt(2014, 1, 1).unwrap(),
        chrono::NaiveDate::from_ymd_opt(2014, 12, 31).unwrap(),
    )
    .unwrap()
}

/// Limiter that never makes a test wait
pub fn unthrottled() -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(Duration::ZERO))
}
