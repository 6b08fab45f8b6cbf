use super::domain::{Admin, AdminId, User, UserId};
use crate::marketplace::error::RepositoryError;

/// Storage abstraction for student and owner accounts.
///
/// `insert` must reject an e-mail that is already registered with `RepositoryError::Conflict`
/// in the same step that stores the record.
pub trait UserRepository: Send + Sync {
    fn insert(&self, user: User) -> Result<User, RepositoryError>;
    fn fetch(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    /// Newest accounts first.
    fn recent(&self, limit: usize) -> Result<Vec<User>, RepositoryError>;
    fn count(&self) -> Result<usize, RepositoryError>;
}

/// Storage abstraction for administrator accounts.
pub trait AdminRepository: Send + Sync {
    fn insert(&self, admin: Admin) -> Result<Admin, RepositoryError>;
    fn update(&self, admin: Admin) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &AdminId) -> Result<Option<Admin>, RepositoryError>;
    fn find_by_email(&self, email: &str) -> Result<Option<Admin>, RepositoryError>;
}
