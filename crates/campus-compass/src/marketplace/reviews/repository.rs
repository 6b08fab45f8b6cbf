use super::domain::{Review, ReviewId};
use crate::marketplace::error::RepositoryError;
use crate::marketplace::listings::ListingId;

/// Storage abstraction for reviews.
///
/// `insert` enforces one review per (user, listing) pair and reports a second one as
/// `RepositoryError::Conflict` without storing it.
pub trait ReviewRepository: Send + Sync {
    fn insert(&self, review: Review) -> Result<Review, RepositoryError>;
    fn update(&self, review: Review) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError>;
    fn remove(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError>;
    /// Reviews of one listing, newest first.
    fn for_listing(&self, listing: &ListingId) -> Result<Vec<Review>, RepositoryError>;
    /// Every review, newest first.
    fn all(&self) -> Result<Vec<Review>, RepositoryError>;
    fn count(&self) -> Result<usize, RepositoryError>;
}
