use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{ApprovedListings, Category, Listing, ListingId, ListingStatus, ListingView};
use super::draft::{ListingDraft, ListingForm, ListingPatch};
use super::moderation::{ModerationDecision, ModerationError, ModerationPolicy};
use super::repository::{ListingFilter, ListingRepository};
use crate::marketplace::accounts::{require_admin, ContactSummary, Principal, UserId, UserRepository};
use crate::marketplace::error::MarketplaceError;
use crate::marketplace::media::{self, ImageStore, UploadArea};

/// Listing lifecycle: creation, browsing, moderation, owner edits, and removal.
pub struct ListingService {
    listings: Arc<dyn ListingRepository>,
    users: Arc<dyn UserRepository>,
    images: Arc<dyn ImageStore>,
    policy: ModerationPolicy,
}

fn listing_not_found() -> MarketplaceError {
    MarketplaceError::not_found("Listing not found")
}

impl From<ModerationError> for MarketplaceError {
    fn from(value: ModerationError) -> Self {
        MarketplaceError::Validation(value.to_string())
    }
}

impl ListingService {
    pub fn new(
        listings: Arc<dyn ListingRepository>,
        users: Arc<dyn UserRepository>,
        images: Arc<dyn ImageStore>,
        policy: ModerationPolicy,
    ) -> Self {
        Self {
            listings,
            users,
            images,
            policy,
        }
    }

    /// Validate and store a new listing in `pending`.
    ///
    /// Fields and uploads are checked before any image is written. If the record cannot be
    /// persisted, the images written for it are removed again.
    pub fn create(
        &self,
        principal: &Principal,
        category: Category,
        form: ListingForm,
    ) -> Result<ListingView, MarketplaceError> {
        let owner = principal
            .user_id()
            .ok_or_else(|| MarketplaceError::forbidden("Only user accounts can create listings"))?;

        let draft = ListingDraft::from_form(category, &form)?;
        media::validate_uploads(&form.images).map_err(MarketplaceError::Validation)?;
        if form.images.len() < draft.minimum_images() {
            return Err(MarketplaceError::validation("At least one image is required"));
        }

        let images = media::store_batch(self.images.as_ref(), UploadArea::Listings, form.images)?;
        let listing = Listing {
            id: ListingId::new(),
            owner,
            title: draft.title,
            description: draft.description,
            location: draft.location,
            coordinates: draft.coordinates,
            images,
            status: ListingStatus::Pending,
            details: draft.details,
            created_at: Utc::now(),
            updated_at: None,
        };

        let stored = match self.listings.insert(listing.clone()) {
            Ok(stored) => stored,
            Err(err) => {
                media::discard(self.images.as_ref(), &listing.images);
                return Err(MarketplaceError::from_repository(err, "Listing"));
            }
        };

        info!(
            listing_id = %stored.id,
            owner_id = %stored.owner,
            category = category.label(),
            images = stored.images.len(),
            "listing created"
        );
        self.view(&stored)
    }

    /// Approved listings of one category, newest first.
    pub fn list_approved(&self, category: Category) -> Result<Vec<ListingView>, MarketplaceError> {
        let listings = self.listings.query(&ListingFilter::approved(Some(category)))?;
        self.views(&listings)
    }

    /// Every approved listing, grouped by category.
    pub fn browse(&self) -> Result<ApprovedListings, MarketplaceError> {
        let listings = self.listings.query(&ListingFilter::approved(None))?;
        let mut grouped = ApprovedListings::default();
        for view in self.views(&listings)? {
            grouped.push(view);
        }
        Ok(grouped)
    }

    /// Moderation queue across all categories, newest first.
    pub fn list_pending(&self, principal: &Principal) -> Result<Vec<ListingView>, MarketplaceError> {
        require_admin(principal, "view pending listings")?;
        let listings = self.listings.query(&ListingFilter::pending())?;
        self.views(&listings)
    }

    /// Listings created by the calling user, in every status.
    pub fn owned(&self, principal: &Principal) -> Result<Vec<ListingView>, MarketplaceError> {
        let owner = principal
            .user_id()
            .ok_or_else(|| MarketplaceError::forbidden("Only user accounts own listings"))?;
        let listings = self.listings.query(&ListingFilter::owned_by(owner))?;
        self.views(&listings)
    }

    /// Keyed lookup regardless of category or status.
    pub fn find_any(&self, id: &ListingId) -> Result<Listing, MarketplaceError> {
        self.listings.fetch(id)?.ok_or_else(listing_not_found)
    }

    /// Lookup through a category path; a listing of another category is reported as absent.
    pub fn find_in_category(
        &self,
        category: Category,
        id: &ListingId,
    ) -> Result<ListingView, MarketplaceError> {
        let listing = self.find_any(id)?;
        if listing.category() != category {
            return Err(listing_not_found());
        }
        self.view(&listing)
    }

    /// Admin transition requested by wire label (`approved` / `rejected`).
    pub fn transition_status(
        &self,
        principal: &Principal,
        id: &ListingId,
        status: &str,
        reason: Option<String>,
    ) -> Result<ListingView, MarketplaceError> {
        let decision = ModerationDecision::from_label(status, reason)?;
        self.moderate(principal, id, decision)
    }

    pub fn approve(
        &self,
        principal: &Principal,
        id: &ListingId,
    ) -> Result<ListingView, MarketplaceError> {
        self.moderate(principal, id, ModerationDecision::Approve)
    }

    /// Reject with a reason stored verbatim; an empty reason is allowed.
    pub fn reject(
        &self,
        principal: &Principal,
        id: &ListingId,
        reason: String,
    ) -> Result<ListingView, MarketplaceError> {
        self.moderate(principal, id, ModerationDecision::Reject { reason })
    }

    fn moderate(
        &self,
        principal: &Principal,
        id: &ListingId,
        decision: ModerationDecision,
    ) -> Result<ListingView, MarketplaceError> {
        require_admin(principal, "moderate listings")?;
        let mut listing = self.find_any(id)?;
        listing.status = self.policy.decide(&listing.status, decision)?;
        listing.updated_at = Some(Utc::now());
        self.save(&listing)?;

        info!(
            listing_id = %listing.id,
            admin_id = %principal.subject(),
            status = listing.status.kind().label(),
            "listing moderated"
        );
        self.view(&listing)
    }

    /// Owner returns a rejected listing to the moderation queue.
    pub fn resubmit(
        &self,
        principal: &Principal,
        id: &ListingId,
    ) -> Result<ListingView, MarketplaceError> {
        let mut listing = self.find_any(id)?;
        if principal.user_id() != Some(listing.owner) {
            return Err(MarketplaceError::forbidden(
                "Only the owner can resubmit this listing",
            ));
        }
        listing.status = self.policy.resubmit(&listing.status)?;
        listing.updated_at = Some(Utc::now());
        self.save(&listing)?;

        info!(listing_id = %listing.id, "listing resubmitted for moderation");
        self.view(&listing)
    }

    /// Owner or admin edit; the moderation status is left untouched.
    pub fn update(
        &self,
        principal: &Principal,
        id: &ListingId,
        patch: ListingPatch,
    ) -> Result<ListingView, MarketplaceError> {
        let listing = self.find_any(id)?;
        ensure_owner_or_admin(principal, &listing, "update")?;

        let mut updated = patch.apply(&listing)?;
        updated.updated_at = Some(Utc::now());
        self.save(&updated)?;

        info!(listing_id = %updated.id, "listing updated");
        self.view(&updated)
    }

    /// Owner or admin removal, including the listing's stored images.
    pub fn delete(&self, principal: &Principal, id: &ListingId) -> Result<(), MarketplaceError> {
        let listing = self.find_any(id)?;
        ensure_owner_or_admin(principal, &listing, "delete")?;

        let removed = self
            .listings
            .remove(id)?
            .ok_or_else(listing_not_found)?;
        media::discard(self.images.as_ref(), &removed.images);

        info!(listing_id = %removed.id, "listing deleted");
        Ok(())
    }

    /// Total number of listings, and how many of them await moderation.
    pub fn counts(&self) -> Result<(usize, usize), MarketplaceError> {
        let all = self.listings.query(&ListingFilter::default())?;
        let pending = all
            .iter()
            .filter(|listing| matches!(listing.status, ListingStatus::Pending))
            .count();
        Ok((all.len(), pending))
    }

    fn save(&self, listing: &Listing) -> Result<(), MarketplaceError> {
        self.listings
            .update(listing.clone())
            .map_err(|err| MarketplaceError::from_repository(err, "Listing"))
    }

    /// Join the owner's contact details. A listing whose owner is gone keeps `owner: null`.
    pub fn view(&self, listing: &Listing) -> Result<ListingView, MarketplaceError> {
        let owner = self.users.fetch(&listing.owner)?;
        Ok(listing.view(owner.as_ref().map(ContactSummary::of)))
    }

    fn views(&self, listings: &[Listing]) -> Result<Vec<ListingView>, MarketplaceError> {
        let mut owners: HashMap<UserId, Option<ContactSummary>> = HashMap::new();
        let mut views = Vec::with_capacity(listings.len());
        for listing in listings {
            let owner = match owners.get(&listing.owner) {
                Some(cached) => cached.clone(),
                None => {
                    let contact = self
                        .users
                        .fetch(&listing.owner)?
                        .as_ref()
                        .map(ContactSummary::of);
                    if contact.is_none() {
                        warn!(listing_id = %listing.id, owner_id = %listing.owner, "listing owner missing");
                    }
                    owners.insert(listing.owner, contact.clone());
                    contact
                }
            };
            views.push(listing.view(owner));
        }
        Ok(views)
    }
}

fn ensure_owner_or_admin(
    principal: &Principal,
    listing: &Listing,
    action: &str,
) -> Result<(), MarketplaceError> {
    if principal.owns_or_admin(listing.owner) {
        Ok(())
    } else {
        Err(MarketplaceError::forbidden(format!(
            "Not authorized to {action} this listing"
        )))
    }
}
