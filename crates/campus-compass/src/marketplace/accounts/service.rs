use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{AccountView, Admin, AdminId, Principal, Role, User, UserId, UserType};
use super::passwords::PasswordHasher;
use super::repository::{AdminRepository, UserRepository};
use super::tokens::TokenIssuer;
use crate::marketplace::error::{MarketplaceError, RepositoryError};

/// Registration payload accepted by `POST /api/auth/register`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub user_type: String,
}

/// Credentials for user and admin login. Admin login ignores `user_type`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub user_type: Option<String>,
}

/// Token plus the account it was issued for.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub account: AccountView,
}

/// Registration, login, and profile lookups for users and admins.
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    admins: Arc<dyn AdminRepository>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

fn invalid_credentials() -> MarketplaceError {
    MarketplaceError::Unauthenticated("Invalid credentials".to_string())
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        admins: Arc<dyn AdminRepository>,
        hasher: PasswordHasher,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            users,
            admins,
            hasher,
            tokens,
        }
    }

    pub fn register(&self, registration: Registration) -> Result<Session, MarketplaceError> {
        let name = registration.name.trim();
        let email = normalize_email(&registration.email);
        let phone = registration.phone.trim();

        if name.is_empty() || email.is_empty() || phone.is_empty() {
            return Err(MarketplaceError::validation(
                "Name, email, phone, and password are required",
            ));
        }
        if registration.password.is_empty() {
            return Err(MarketplaceError::validation(
                "Name, email, phone, and password are required",
            ));
        }
        if !email.contains('@') {
            return Err(MarketplaceError::validation("Invalid email address"));
        }
        let user_type: UserType = registration
            .user_type
            .parse()
            .map_err(|_| MarketplaceError::validation("userType must be student or owner"))?;

        let password_hash = self.hash(&registration.password)?;
        let user = User {
            id: UserId::new(),
            name: name.to_string(),
            email,
            password_hash,
            phone: phone.to_string(),
            user_type,
            created_at: Utc::now(),
        };

        let stored = self.users.insert(user).map_err(|err| match err {
            RepositoryError::Conflict => MarketplaceError::Duplicate("User already exists".into()),
            other => MarketplaceError::from(other),
        })?;
        info!(user_id = %stored.id, user_type = stored.user_type.label(), "user registered");

        self.session_for_user(&stored)
    }

    /// Log in a student or owner. The account must match the requested user type.
    pub fn login(&self, credentials: Credentials) -> Result<Session, MarketplaceError> {
        let requested: UserType = credentials
            .user_type
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(|_| invalid_credentials())?;
        let user = self
            .users
            .find_by_email(&normalize_email(&credentials.email))?
            .filter(|user| user.user_type == requested)
            .ok_or_else(invalid_credentials)?;

        if !self.hasher.verify(&credentials.password, &user.password_hash) {
            return Err(invalid_credentials());
        }

        info!(user_id = %user.id, "user logged in");
        self.session_for_user(&user)
    }

    pub fn admin_login(&self, credentials: Credentials) -> Result<Session, MarketplaceError> {
        let mut admin = self
            .admins
            .find_by_email(&normalize_email(&credentials.email))?
            .ok_or_else(invalid_credentials)?;

        if !self.hasher.verify(&credentials.password, &admin.password_hash) {
            return Err(invalid_credentials());
        }

        admin.last_login = Some(Utc::now());
        self.admins.update(admin.clone())?;
        info!(admin_id = %admin.id, "admin logged in");

        let token = self.sign(admin.id.0, Role::Admin)?;
        Ok(Session {
            token,
            account: AccountView::from(&admin),
        })
    }

    /// Create the administrator unless one with the same e-mail already exists.
    pub fn ensure_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Admin, MarketplaceError> {
        let email = normalize_email(email);
        if let Some(existing) = self.admins.find_by_email(&email)? {
            return Ok(existing);
        }

        let admin = Admin {
            id: AdminId::new(),
            name: name.trim().to_string(),
            email,
            password_hash: self.hash(password)?,
            last_login: None,
            created_at: Utc::now(),
        };
        let stored = self.admins.insert(admin)?;
        info!(admin_id = %stored.id, "admin account created");
        Ok(stored)
    }

    /// Profile of the resolved principal.
    pub fn profile(&self, principal: &Principal) -> Result<AccountView, MarketplaceError> {
        match principal {
            Principal::Admin { id } => self
                .admins
                .fetch(id)?
                .map(|admin| AccountView::from(&admin))
                .ok_or_else(|| MarketplaceError::not_found("User not found")),
            Principal::User { id, .. } => self
                .users
                .fetch(id)?
                .map(|user| AccountView::from(&user))
                .ok_or_else(|| MarketplaceError::not_found("User not found")),
        }
    }

    fn session_for_user(&self, user: &User) -> Result<Session, MarketplaceError> {
        let token = self.sign(user.id.0, Role::from(user.user_type))?;
        Ok(Session {
            token,
            account: AccountView::from(user),
        })
    }

    fn sign(&self, subject: uuid::Uuid, role: Role) -> Result<String, MarketplaceError> {
        self.tokens
            .issue(subject, role)
            .map_err(|err| MarketplaceError::Internal(err.to_string()))
    }

    fn hash(&self, password: &str) -> Result<String, MarketplaceError> {
        self.hasher
            .hash(password)
            .map_err(|err| MarketplaceError::Internal(format!("password hashing failed: {err}")))
    }
}
