//! Student/owner accounts, the separate admin collection, and the authorization gate.

pub mod domain;
pub mod gate;
pub mod passwords;
pub mod repository;
pub mod service;
pub mod tokens;

pub use domain::{
    AccountView, Admin, AdminId, ContactSummary, Principal, Role, User, UserId, UserType,
};
pub use gate::{require_admin, AuthorizationGate};
pub use passwords::PasswordHasher;
pub use repository::{AdminRepository, UserRepository};
pub use service::{AccountService, Credentials, Registration, Session};
pub use tokens::{TokenClaims, TokenError, TokenIssuer};
