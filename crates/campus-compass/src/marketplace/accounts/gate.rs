use std::sync::Arc;

use super::domain::{AdminId, Principal, UserId};
use super::repository::{AdminRepository, UserRepository};
use super::tokens::{TokenError, TokenIssuer};
use crate::marketplace::error::MarketplaceError;

/// Resolves bearer tokens into principals.
///
/// Admins are checked before users; the token's own role claim is never trusted.
pub struct AuthorizationGate {
    tokens: TokenIssuer,
    admins: Arc<dyn AdminRepository>,
    users: Arc<dyn UserRepository>,
}

impl AuthorizationGate {
    pub fn new(
        tokens: TokenIssuer,
        admins: Arc<dyn AdminRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            tokens,
            admins,
            users,
        }
    }

    /// Resolve the raw `Authorization` header value.
    pub fn authenticate_header(&self, header: Option<&str>) -> Result<Principal, MarketplaceError> {
        let token = header
            .map(str::trim)
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| MarketplaceError::Unauthenticated("No auth token found".to_string()))?;
        self.resolve(token)
    }

    pub fn resolve(&self, token: &str) -> Result<Principal, MarketplaceError> {
        let claims = self.tokens.verify(token).map_err(|err| match err {
            TokenError::Expired => MarketplaceError::Unauthenticated("Token expired".to_string()),
            _ => MarketplaceError::Unauthenticated("Authentication failed".to_string()),
        })?;

        let admin_id = AdminId(claims.sub);
        if let Some(admin) = self.admins.fetch(&admin_id)? {
            return Ok(Principal::Admin { id: admin.id });
        }

        let user_id = UserId(claims.sub);
        match self.users.fetch(&user_id)? {
            Some(user) => Ok(Principal::User {
                id: user.id,
                user_type: user.user_type,
            }),
            None => Err(MarketplaceError::Unauthenticated(
                "Authentication failed".to_string(),
            )),
        }
    }
}

/// Reject every principal except admins.
pub fn require_admin(principal: &Principal, action: &str) -> Result<(), MarketplaceError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(MarketplaceError::forbidden(format!(
            "Not authorized to {action}"
        )))
    }
}
