//! Configuration management for the waiting list.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Malformed values fall back to the default instead of failing startup.

use crate::reducer::{OfferPolicy, MAX_OFFER_TTL_SECS};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use waitlist_runtime::retry::RetryPolicy;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Offer lifecycle
    pub offers: OfferConfig,
    /// Retries of scheduled expiry callbacks
    pub expiry_retry: RetryConfig,
    /// Logging and metrics
    pub observability: ObservabilityConfig,
}

/// Offer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferConfig {
    /// How long an offer stays open, in seconds (default: 30 minutes)
    pub ttl_secs: u64,
}

/// Retry configuration for scheduled callbacks that fail transiently
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds
    pub initial_delay_ms: u64,
    /// Backoff cap in milliseconds
    pub max_delay_ms: u64,
}

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// `tracing` filter directives for the subscriber (`RUST_LOG`)
    pub log_level: String,
    /// Metrics server host (for Prometheus scraping)
    pub metrics_host: String,
    /// Metrics server port; the exporter is off when unset
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse = |key: &str| lookup(key).and_then(|s| s.trim().parse().ok());

        Self {
            offers: OfferConfig {
                ttl_secs: parse("OFFER_TTL_SECS")
                    .filter(|secs| *secs > 0)
                    .unwrap_or(30 * 60),
            },
            expiry_retry: RetryConfig {
                max_retries: lookup("EXPIRY_RETRY_MAX_RETRIES")
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(5),
                initial_delay_ms: parse("EXPIRY_RETRY_INITIAL_DELAY_MS").unwrap_or(100),
                max_delay_ms: parse("EXPIRY_RETRY_MAX_DELAY_MS").unwrap_or(10_000),
            },
            observability: ObservabilityConfig {
                log_level: lookup("RUST_LOG")
                    .unwrap_or_else(|| "info,ticket_waitlist=debug".to_string()),
                metrics_host: lookup("METRICS_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                metrics_port: lookup("METRICS_PORT").and_then(|s| s.trim().parse().ok()),
            },
        }
    }

    /// Offer policy injected into the reducer
    #[must_use]
    pub fn offer_policy(&self) -> OfferPolicy {
        let secs = i64::try_from(self.offers.ttl_secs)
            .unwrap_or(i64::MAX)
            .min(MAX_OFFER_TTL_SECS);
        OfferPolicy::new(
            chrono::Duration::try_seconds(secs).unwrap_or_else(|| chrono::Duration::minutes(30)),
        )
    }

    /// Retry policy for the scheduler driver
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.expiry_retry.max_retries)
            .initial_delay(Duration::from_millis(self.expiry_retry.initial_delay_ms))
            .max_delay(Duration::from_millis(self.expiry_retry.max_delay_ms))
            .build()
    }
}
