use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{
    validate_comment, OwnerFeedback, Rating, Review, ReviewForm, ReviewId, ReviewUpdate,
    ReviewView,
};
use super::repository::ReviewRepository;
use crate::marketplace::accounts::{ContactSummary, Principal, UserRepository, UserType};
use crate::marketplace::error::{MarketplaceError, RepositoryError};
use crate::marketplace::listings::{ListingId, ListingRepository};
use crate::marketplace::media::{self, ImageStore, UploadArea};

/// Student reviews and the owner feedback attached to them.
pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    listings: Arc<dyn ListingRepository>,
    users: Arc<dyn UserRepository>,
    images: Arc<dyn ImageStore>,
}

fn review_not_found() -> MarketplaceError {
    MarketplaceError::not_found("Review not found")
}

fn parse_rating(raw: &str) -> Result<Rating, MarketplaceError> {
    raw.parse::<Rating>().map_err(MarketplaceError::Validation)
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewRepository>,
        listings: Arc<dyn ListingRepository>,
        users: Arc<dyn UserRepository>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            reviews,
            listings,
            users,
            images,
        }
    }

    pub fn create(
        &self,
        principal: &Principal,
        form: ReviewForm,
    ) -> Result<ReviewView, MarketplaceError> {
        let author = match principal {
            Principal::User {
                id,
                user_type: UserType::Student,
            } => *id,
            _ => return Err(MarketplaceError::forbidden("Only students can write reviews")),
        };

        let listing_id = form
            .listing_id
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .ok_or_else(|| MarketplaceError::validation("listingId is required"))?
            .parse::<ListingId>()
            .map_err(|_| MarketplaceError::validation("Invalid listing id"))?;
        let rating = parse_rating(
            form.rating
                .as_deref()
                .ok_or_else(|| MarketplaceError::validation("Rating is required"))?,
        )?;
        let comment = validate_comment(form.comment.as_deref().unwrap_or_default())?;
        media::validate_uploads(&form.images).map_err(MarketplaceError::Validation)?;

        let listing = self
            .listings
            .fetch(&listing_id)?
            .ok_or_else(|| MarketplaceError::not_found("Listing not found"))?;

        let images = media::store_batch(self.images.as_ref(), UploadArea::Reviews, form.images)?;
        let review = Review {
            id: ReviewId::new(),
            user: author,
            listing: listing.id,
            rating,
            comment,
            images,
            owner_feedback: None,
            created_at: Utc::now(),
            updated_at: None,
        };

        let stored = match self.reviews.insert(review.clone()) {
            Ok(stored) => stored,
            Err(err) => {
                media::discard(self.images.as_ref(), &review.images);
                return Err(match err {
                    RepositoryError::Conflict => MarketplaceError::Duplicate(
                        "You have already reviewed this listing".to_string(),
                    ),
                    other => MarketplaceError::from_repository(other, "Review"),
                });
            }
        };

        info!(
            review_id = %stored.id,
            listing_id = %stored.listing,
            rating = stored.rating.value(),
            "review created"
        );
        self.view(&stored, None)
    }

    /// Owner reply; replaces any earlier reply.
    pub fn attach_feedback(
        &self,
        principal: &Principal,
        id: &ReviewId,
        comment: &str,
    ) -> Result<ReviewView, MarketplaceError> {
        let mut review = self.reviews.fetch(id)?.ok_or_else(review_not_found)?;
        let listing = self
            .listings
            .fetch(&review.listing)?
            .ok_or_else(|| MarketplaceError::not_found("Listing not found"))?;
        if principal.user_id() != Some(listing.owner) {
            return Err(MarketplaceError::forbidden(
                "Only the listing owner can respond to reviews",
            ));
        }

        let comment = comment.trim();
        if comment.is_empty() {
            return Err(MarketplaceError::validation("Feedback comment is required"));
        }
        review.owner_feedback = Some(OwnerFeedback {
            comment: comment.to_string(),
            timestamp: Utc::now(),
        });
        self.reviews
            .update(review.clone())
            .map_err(|err| MarketplaceError::from_repository(err, "Review"))?;

        info!(review_id = %review.id, listing_id = %listing.id, "owner feedback attached");
        self.view(&review, None)
    }

    /// Reviews of one listing, newest first, with reviewer contact joined in.
    pub fn list_by_listing(&self, listing: &ListingId) -> Result<Vec<ReviewView>, MarketplaceError> {
        self.reviews
            .for_listing(listing)?
            .iter()
            .map(|review| self.view(review, None))
            .collect()
    }

    /// Every review with reviewer and listing title.
    pub fn list_all(&self) -> Result<Vec<ReviewView>, MarketplaceError> {
        self.reviews
            .all()?
            .iter()
            .map(|review| {
                let title = self
                    .listings
                    .fetch(&review.listing)?
                    .map(|listing| listing.title);
                self.view(review, title)
            })
            .collect()
    }

    pub fn update(
        &self,
        principal: &Principal,
        id: &ReviewId,
        update: ReviewUpdate,
    ) -> Result<ReviewView, MarketplaceError> {
        let mut review = self.authored(principal, id, "update")?;

        if let Some(raw) = update.rating.as_deref() {
            review.rating = parse_rating(raw)?;
        }
        if let Some(raw) = update.comment.as_deref() {
            review.comment = validate_comment(raw)?;
        }
        media::validate_uploads(&update.images).map_err(MarketplaceError::Validation)?;

        let replaced = if update.images.is_empty() {
            Vec::new()
        } else {
            let fresh =
                media::store_batch(self.images.as_ref(), UploadArea::Reviews, update.images)?;
            std::mem::replace(&mut review.images, fresh)
        };
        review.updated_at = Some(Utc::now());

        if let Err(err) = self.reviews.update(review.clone()) {
            if !replaced.is_empty() {
                media::discard(self.images.as_ref(), &review.images);
            }
            return Err(MarketplaceError::from_repository(err, "Review"));
        }
        media::discard(self.images.as_ref(), &replaced);

        info!(review_id = %review.id, "review updated");
        self.view(&review, None)
    }

    pub fn delete(&self, principal: &Principal, id: &ReviewId) -> Result<(), MarketplaceError> {
        self.authored(principal, id, "delete")?;
        let removed = self.reviews.remove(id)?.ok_or_else(review_not_found)?;
        media::discard(self.images.as_ref(), &removed.images);

        info!(review_id = %removed.id, "review deleted");
        Ok(())
    }

    pub fn count(&self) -> Result<usize, MarketplaceError> {
        Ok(self.reviews.count()?)
    }

    fn authored(
        &self,
        principal: &Principal,
        id: &ReviewId,
        action: &str,
    ) -> Result<Review, MarketplaceError> {
        let review = self.reviews.fetch(id)?.ok_or_else(review_not_found)?;
        if principal.user_id() != Some(review.user) {
            return Err(MarketplaceError::forbidden(format!(
                "Not authorized to {action} this review"
            )));
        }
        Ok(review)
    }

    fn view(&self, review: &Review, title: Option<String>) -> Result<ReviewView, MarketplaceError> {
        let author = self.users.fetch(&review.user)?;
        Ok(review.view(author.as_ref().map(ContactSummary::of), title))
    }
}
