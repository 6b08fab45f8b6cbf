use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::marketplace::accounts::{ContactSummary, UserId};
use crate::marketplace::error::MarketplaceError;
use crate::marketplace::listings::ListingId;
use crate::marketplace::media::{ImageUpload, StoredImage};

pub const MIN_COMMENT_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewId(pub Uuid);

impl ReviewId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReviewId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ReviewId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim()).map(Self)
    }
}

/// Star rating, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err("Rating must be between 1 and 5".to_string())
        }
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

impl FromStr for Rating {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = value
            .trim()
            .parse::<u8>()
            .map_err(|_| "Rating must be between 1 and 5".to_string())?;
        Self::try_from(parsed)
    }
}

/// Trimmed comment text of at least ten characters.
pub fn validate_comment(raw: &str) -> Result<String, MarketplaceError> {
    let comment = raw.trim();
    if comment.chars().count() < MIN_COMMENT_CHARS {
        return Err(MarketplaceError::validation(format!(
            "Comment must be at least {MIN_COMMENT_CHARS} characters long"
        )));
    }
    Ok(comment.to_string())
}

/// Listing owner's reply. A new reply replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerFeedback {
    pub comment: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub user: UserId,
    pub listing: ListingId,
    pub rating: Rating,
    pub comment: String,
    pub images: Vec<StoredImage>,
    pub owner_feedback: Option<OwnerFeedback>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Review {
    pub fn view(&self, user: Option<ContactSummary>, listing_title: Option<String>) -> ReviewView {
        ReviewView {
            id: self.id,
            user,
            listing: self.listing,
            listing_title,
            rating: self.rating,
            comment: self.comment.clone(),
            images: self.images.clone(),
            owner_feedback: self.owner_feedback.clone(),
            timestamp: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub id: ReviewId,
    pub user: Option<ContactSummary>,
    pub listing: ListingId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_title: Option<String>,
    pub rating: Rating,
    pub comment: String,
    pub images: Vec<StoredImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_feedback: Option<OwnerFeedback>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Multipart review submission.
#[derive(Debug, Clone, Default)]
pub struct ReviewForm {
    pub listing_id: Option<String>,
    pub rating: Option<String>,
    pub comment: Option<String>,
    pub images: Vec<ImageUpload>,
}

/// Author edit; new images replace the stored ones.
#[derive(Debug, Clone, Default)]
pub struct ReviewUpdate {
    pub rating: Option<String>,
    pub comment: Option<String>,
    pub images: Vec<ImageUpload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_accept_only_one_through_five() {
        assert_eq!("1".parse::<Rating>().map(Rating::value), Ok(1));
        assert_eq!(" 5 ".parse::<Rating>().map(Rating::value), Ok(5));
        assert!("0".parse::<Rating>().is_err());
        assert!("6".parse::<Rating>().is_err());
        assert!("4.5".parse::<Rating>().is_err());
        assert!(serde_json::from_str::<Rating>("9").is_err());
    }

    #[test]
    fn comments_are_measured_after_trimming() {
        assert!(validate_comment("  too short ").is_err());
        assert_eq!(
            validate_comment("  ten chars!  ").expect("exactly ten"),
            "ten chars!"
        );
    }
}
