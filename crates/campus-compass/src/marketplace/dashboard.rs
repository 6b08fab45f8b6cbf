use chrono::{DateTime, Utc};
use serde::Serialize;

use super::accounts::{require_admin, Principal, User, UserId};
use super::bookings::BookingView;
use super::error::MarketplaceError;
use super::Marketplace;

const RECENT_ACTIVITY_LIMIT: usize = 5;

/// Collection totals shown on the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: usize,
    pub total_listings: usize,
    pub total_bookings: usize,
    pub total_reviews: usize,
    pub pending_listings: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for RecentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub recent_bookings: Vec<BookingView>,
    pub recent_users: Vec<RecentUser>,
}

impl Marketplace {
    pub fn dashboard_stats(&self, principal: &Principal) -> Result<DashboardStats, MarketplaceError> {
        require_admin(principal, "view dashboard stats")?;
        let (total_listings, pending_listings) = self.listings.counts()?;
        Ok(DashboardStats {
            total_users: self.users.count()?,
            total_listings,
            total_bookings: self.bookings.count()?,
            total_reviews: self.reviews.count()?,
            pending_listings,
        })
    }

    /// The five newest bookings and registrations.
    pub fn recent_activity(&self, principal: &Principal) -> Result<RecentActivity, MarketplaceError> {
        require_admin(principal, "view recent activity")?;
        Ok(RecentActivity {
            recent_bookings: self.bookings.recent(RECENT_ACTIVITY_LIMIT)?,
            recent_users: self
                .users
                .recent(RECENT_ACTIVITY_LIMIT)?
                .iter()
                .map(RecentUser::from)
                .collect(),
        })
    }
}
