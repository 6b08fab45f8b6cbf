use super::domain::{Booking, BookingId};
use crate::marketplace::accounts::UserId;
use crate::marketplace::error::RepositoryError;

/// Storage abstraction for bookings. Listing methods return newest first.
pub trait BookingRepository: Send + Sync {
    fn insert(&self, booking: Booking) -> Result<Booking, RepositoryError>;
    fn update(&self, booking: Booking) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError>;
    fn remove(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError>;
    fn for_user(&self, user: &UserId) -> Result<Vec<Booking>, RepositoryError>;
    fn for_owner(&self, owner: &UserId) -> Result<Vec<Booking>, RepositoryError>;
    fn recent(&self, limit: usize) -> Result<Vec<Booking>, RepositoryError>;
    fn count(&self) -> Result<usize, RepositoryError>;
}
