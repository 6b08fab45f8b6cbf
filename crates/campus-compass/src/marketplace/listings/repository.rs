use super::domain::{Category, Listing, ListingId, StatusKind};
use crate::marketplace::accounts::UserId;
use crate::marketplace::error::RepositoryError;

/// Conjunctive filter over stored listings; `None` fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingFilter {
    pub category: Option<Category>,
    pub status: Option<StatusKind>,
    pub owner: Option<UserId>,
}

impl ListingFilter {
    pub fn approved(category: Option<Category>) -> Self {
        Self {
            category,
            status: Some(StatusKind::Approved),
            owner: None,
        }
    }

    pub fn pending() -> Self {
        Self {
            status: Some(StatusKind::Pending),
            ..Self::default()
        }
    }

    pub fn owned_by(owner: UserId) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        self.category
            .map_or(true, |category| listing.category() == category)
            && self
                .status
                .map_or(true, |status| listing.status.kind() == status)
            && self.owner.map_or(true, |owner| listing.owner == owner)
    }
}

/// Single keyed store for every listing category.
pub trait ListingRepository: Send + Sync {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError>;
    fn update(&self, listing: Listing) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError>;
    fn remove(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError>;
    /// Matching listings, newest first.
    fn query(&self, filter: &ListingFilter) -> Result<Vec<Listing>, RepositoryError>;
}
