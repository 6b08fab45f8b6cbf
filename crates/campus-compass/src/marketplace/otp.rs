//! Abuse protection in front of the OTP send endpoint.
//!
//! Checks run in a fixed order: IP blacklist, per-IP window, per-phone window, per
//! (ip, phone) attempts with blacklisting, phone format, then the monthly quota. Input that
//! cannot be a phone number at all is refused before it becomes a counter key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;
use tracing::warn;

use crate::config::OtpConfig;
use crate::marketplace::error::{MarketplaceError, RepositoryError};

/// Counter storage with expiring windows. A shared cache can stand in for the in-memory one.
pub trait OtpAttemptStore: Send + Sync {
    /// Count one hit for `key` and return the total inside the current window. A window
    /// starts at the first hit and a new one opens once `window` has elapsed.
    fn hit(&self, key: &str, window: Duration, now: DateTime<Utc>) -> Result<u32, RepositoryError>;
    fn block(&self, key: &str, until: DateTime<Utc>) -> Result<(), RepositoryError>;
    fn is_blocked(&self, key: &str, now: DateTime<Utc>) -> Result<bool, RepositoryError>;
}

/// Longest input accepted as a phone number: `+` and 15 digits.
const MAX_PHONE_LEN: usize = 16;

/// Expired entries are swept at most this often.
const SWEEP_INTERVAL_SECONDS: i64 = 60;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    expires: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct OtpCounters {
    windows: HashMap<String, Window>,
    blocked: HashMap<String, DateTime<Utc>>,
    last_sweep: Option<DateTime<Utc>>,
}

impl OtpCounters {
    fn sweep(&mut self, now: DateTime<Utc>) {
        let due = self
            .last_sweep
            .map_or(true, |last| now - last >= Duration::seconds(SWEEP_INTERVAL_SECONDS));
        if !due {
            return;
        }
        self.windows.retain(|_, window| window.expires > now);
        self.blocked.retain(|_, until| *until > now);
        self.last_sweep = Some(now);
    }
}

/// Process-local counters. Expired windows and blocks are dropped as new hits arrive.
#[derive(Debug, Default, Clone)]
pub struct MemoryOtpStore {
    inner: Arc<Mutex<OtpCounters>>,
}

impl OtpAttemptStore for MemoryOtpStore {
    fn hit(&self, key: &str, window: Duration, now: DateTime<Utc>) -> Result<u32, RepositoryError> {
        let mut guard = self.inner.lock().expect("otp store mutex poisoned");
        guard.sweep(now);
        let entry = guard.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            expires: now + window,
        });
        if now >= entry.expires {
            entry.count = 0;
            entry.expires = now + window;
        }
        entry.count = entry.count.saturating_add(1);
        Ok(entry.count)
    }

    fn block(&self, key: &str, until: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut guard = self.inner.lock().expect("otp store mutex poisoned");
        guard.blocked.insert(key.to_string(), until);
        Ok(())
    }

    fn is_blocked(&self, key: &str, now: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let mut guard = self.inner.lock().expect("otp store mutex poisoned");
        match guard.blocked.get(key) {
            Some(until) if *until > now => Ok(true),
            Some(_) => {
                guard.blocked.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }
}

/// Result of a request that passed every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpClearance {
    pub monthly_count: u32,
    pub near_quota: bool,
}

/// Cheap shape check run before the number is used as a counter key.
fn plausible_phone(phone: &str) -> bool {
    phone.len() <= MAX_PHONE_LEN && phone.bytes().all(|b| b == b'+' || b.is_ascii_digit())
}

/// `+`, a non-zero digit, then 10 to 14 more digits.
pub fn is_valid_phone(phone: &str) -> bool {
    let Some(digits) = phone.strip_prefix('+') else {
        return false;
    };
    let mut chars = digits.chars();
    match chars.next() {
        Some(first) if ('1'..='9').contains(&first) => {}
        _ => return false,
    }
    let rest = chars.as_str();
    (10..=14).contains(&rest.len()) && rest.bytes().all(|b| b.is_ascii_digit())
}

pub struct OtpGuard {
    store: Arc<dyn OtpAttemptStore>,
    limits: OtpConfig,
}

impl OtpGuard {
    pub fn new(store: Arc<dyn OtpAttemptStore>, limits: OtpConfig) -> Self {
        Self { store, limits }
    }

    pub fn check(&self, ip: &str, phone: &str) -> Result<OtpClearance, MarketplaceError> {
        self.check_at(ip, phone, Utc::now())
    }

    pub fn check_at(
        &self,
        ip: &str,
        phone: &str,
        now: DateTime<Utc>,
    ) -> Result<OtpClearance, MarketplaceError> {
        let phone = phone.trim();
        let blacklist_key = format!("blacklist:{ip}");

        if self.store.is_blocked(&blacklist_key, now)? {
            warn!(ip, "otp request from blacklisted ip");
            return Err(MarketplaceError::forbidden(
                "Access denied due to suspicious activity",
            ));
        }

        if self.store.hit(&format!("ip:{ip}"), Duration::hours(24), now)? > self.limits.ip_limit {
            warn!(ip, "otp ip limit reached");
            return Err(MarketplaceError::RateLimited(
                "Too many OTP requests from this IP, please try again later".to_string(),
            ));
        }

        if !plausible_phone(phone) {
            return Err(MarketplaceError::validation("Invalid phone number format"));
        }

        if self.store.hit(&format!("phone:{phone}"), Duration::hours(1), now)?
            > self.limits.phone_limit
        {
            warn!(ip, "otp phone limit reached");
            return Err(MarketplaceError::RateLimited(
                "Too many OTP requests for this phone number, please try again later".to_string(),
            ));
        }

        let attempts = self
            .store
            .hit(&format!("attempt:{ip}:{phone}"), Duration::hours(1), now)?;
        if attempts > self.limits.attempt_limit {
            self.store.block(&blacklist_key, now + Duration::hours(24))?;
            warn!(ip, attempts, "ip blacklisted after repeated otp attempts");
            return Err(MarketplaceError::forbidden(
                "Too many failed attempts. Please try again later",
            ));
        }

        if !is_valid_phone(phone) {
            return Err(MarketplaceError::validation("Invalid phone number format"));
        }

        let month_key = format!("monthly:{}-{:02}", now.year(), now.month());
        let monthly_count = self.store.hit(&month_key, Duration::days(31), now)?;
        if monthly_count > self.limits.monthly_cap {
            warn!(monthly_count, "otp monthly quota exhausted");
            return Err(MarketplaceError::Unavailable(
                "OTP service temporarily unavailable".to_string(),
            ));
        }
        let near_quota = monthly_count > self.limits.monthly_warn;
        if near_quota {
            warn!(
                monthly_count,
                threshold = self.limits.monthly_warn,
                "otp usage above monthly alert threshold"
            );
        }

        Ok(OtpClearance {
            monthly_count,
            near_quota,
        })
    }
}
