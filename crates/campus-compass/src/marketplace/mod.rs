//! Campus marketplace: accounts, listings and their moderation, reviews, bookings, and the
//! OTP request guard, wired over repository traits.

pub mod accounts;
pub mod bookings;
pub mod dashboard;
pub mod error;
pub mod listings;
pub mod location;
pub mod media;
pub mod memory;
pub mod otp;
pub mod reviews;
pub mod router;

#[cfg(test)]
mod tests;

use std::net::IpAddr;
use std::sync::Arc;

use crate::config::{AppConfig, AuthConfig, ModerationConfig, OtpConfig};
use accounts::{
    AccountService, AdminRepository, AuthorizationGate, PasswordHasher, TokenIssuer,
    UserRepository,
};
use bookings::{BookingRepository, BookingService};
use listings::{ListingRepository, ListingService, ModerationPolicy};
use media::ImageStore;
use memory::MemoryStore;
use otp::{MemoryOtpStore, OtpAttemptStore, OtpGuard};
use reviews::{ReviewRepository, ReviewService};

pub use dashboard::{DashboardStats, RecentActivity, RecentUser};
pub use error::{ApiError, MarketplaceError, RepositoryError};
pub use router::marketplace_router;

/// Runtime knobs taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct MarketplaceSettings {
    pub auth: AuthConfig,
    pub moderation: ModerationConfig,
    pub otp: OtpConfig,
    /// Replace the message of 500 responses with a generic one.
    pub hide_internal_errors: bool,
    /// Peers allowed to report the client address through `X-Forwarded-For`.
    pub trusted_proxies: Vec<IpAddr>,
}

impl MarketplaceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            auth: config.auth.clone(),
            moderation: config.moderation,
            otp: config.otp,
            hide_internal_errors: config.environment.is_production(),
            trusted_proxies: config.server.trusted_proxies.clone(),
        }
    }
}

/// Storage seams the marketplace is built over.
#[derive(Clone)]
pub struct MarketplaceStores {
    pub users: Arc<dyn UserRepository>,
    pub admins: Arc<dyn AdminRepository>,
    pub listings: Arc<dyn ListingRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub images: Arc<dyn ImageStore>,
    pub otp: Arc<dyn OtpAttemptStore>,
}

impl MarketplaceStores {
    /// Every collection in one [`MemoryStore`], with the given image store.
    pub fn in_memory(images: Arc<dyn ImageStore>) -> Self {
        let store = MemoryStore::default();
        Self {
            users: Arc::new(store.clone()),
            admins: Arc::new(store.clone()),
            listings: Arc::new(store.clone()),
            reviews: Arc::new(store.clone()),
            bookings: Arc::new(store),
            images,
            otp: Arc::new(MemoryOtpStore::default()),
        }
    }
}

/// Every marketplace service, shared by the HTTP handlers.
pub struct Marketplace {
    pub accounts: AccountService,
    pub gate: AuthorizationGate,
    pub listings: ListingService,
    pub reviews: ReviewService,
    pub bookings: BookingService,
    pub otp: OtpGuard,
    users: Arc<dyn UserRepository>,
    hide_internal_errors: bool,
    trusted_proxies: Vec<IpAddr>,
}

impl Marketplace {
    pub fn new(settings: MarketplaceSettings, stores: MarketplaceStores) -> Self {
        let tokens = TokenIssuer::from_config(&settings.auth);
        let hasher = PasswordHasher::new(settings.auth.bcrypt_cost);

        Self {
            accounts: AccountService::new(
                stores.users.clone(),
                stores.admins.clone(),
                hasher,
                tokens.clone(),
            ),
            gate: AuthorizationGate::new(tokens, stores.admins.clone(), stores.users.clone()),
            listings: ListingService::new(
                stores.listings.clone(),
                stores.users.clone(),
                stores.images.clone(),
                ModerationPolicy::from(&settings.moderation),
            ),
            reviews: ReviewService::new(
                stores.reviews.clone(),
                stores.listings.clone(),
                stores.users.clone(),
                stores.images.clone(),
            ),
            bookings: BookingService::new(
                stores.bookings.clone(),
                stores.listings.clone(),
                stores.users.clone(),
            ),
            otp: OtpGuard::new(stores.otp.clone(), settings.otp),
            users: stores.users,
            hide_internal_errors: settings.hide_internal_errors,
            trusted_proxies: settings.trusted_proxies,
        }
    }

    pub(crate) fn trusted_proxies(&self) -> &[IpAddr] {
        &self.trusted_proxies
    }

    /// Render a failure for the HTTP boundary.
    pub fn reject(&self, error: MarketplaceError) -> ApiError {
        error.into_api_error(self.hide_internal_errors)
    }
}
