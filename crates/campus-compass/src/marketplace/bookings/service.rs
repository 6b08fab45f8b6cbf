use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{
    Booking, BookingId, BookingRequest, BookingView, ListingSummary, DEFAULT_BOOKING_STATUS,
};
use super::repository::BookingRepository;
use crate::marketplace::accounts::{ContactSummary, Principal, UserId, UserRepository, UserType};
use crate::marketplace::error::MarketplaceError;
use crate::marketplace::listings::{ListingId, ListingRepository, StatusKind};

pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    listings: Arc<dyn ListingRepository>,
    users: Arc<dyn UserRepository>,
}

fn booking_not_found() -> MarketplaceError {
    MarketplaceError::not_found("Booking not found")
}

fn caller(principal: &Principal) -> Result<UserId, MarketplaceError> {
    principal
        .user_id()
        .ok_or_else(|| MarketplaceError::forbidden("Bookings belong to user accounts"))
}

fn status_label(raw: &str) -> Result<String, MarketplaceError> {
    let status = raw.trim();
    if status.is_empty() {
        Err(MarketplaceError::validation("Booking status is required"))
    } else {
        Ok(status.to_ascii_lowercase())
    }
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        listings: Arc<dyn ListingRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            bookings,
            listings,
            users,
        }
    }

    /// Students book approved listings; the status defaults to `pending`.
    pub fn create(
        &self,
        principal: &Principal,
        listing_id: &ListingId,
        request: BookingRequest,
    ) -> Result<BookingView, MarketplaceError> {
        let user = match principal {
            Principal::User {
                id,
                user_type: UserType::Student,
            } => *id,
            _ => return Err(MarketplaceError::forbidden("Only students can make bookings")),
        };

        let listing = self
            .listings
            .fetch(listing_id)?
            .ok_or_else(|| MarketplaceError::not_found("Listing not found"))?;
        if listing.status.kind() != StatusKind::Approved {
            return Err(MarketplaceError::validation(
                "Only approved listings can be booked",
            ));
        }

        let status = match request.status.as_deref() {
            Some(raw) => status_label(raw)?,
            None => DEFAULT_BOOKING_STATUS.to_string(),
        };
        let note = request
            .note
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty());

        let booking = Booking {
            id: BookingId::new(),
            listing: listing.id,
            user,
            owner: listing.owner,
            status,
            note,
            created_at: Utc::now(),
            updated_at: None,
        };
        let stored = self
            .bookings
            .insert(booking)
            .map_err(|err| MarketplaceError::from_repository(err, "Booking"))?;

        info!(
            booking_id = %stored.id,
            listing_id = %stored.listing,
            status = %stored.status,
            "booking created"
        );
        self.view(&stored)
    }

    /// Bookings made by the caller.
    pub fn for_user(&self, principal: &Principal) -> Result<Vec<BookingView>, MarketplaceError> {
        let user = caller(principal)?;
        self.views(self.bookings.for_user(&user)?)
    }

    /// Bookings on listings the caller owns.
    pub fn for_owner(&self, principal: &Principal) -> Result<Vec<BookingView>, MarketplaceError> {
        let owner = caller(principal)?;
        self.views(self.bookings.for_owner(&owner)?)
    }

    pub fn update_status(
        &self,
        principal: &Principal,
        id: &BookingId,
        status: &str,
    ) -> Result<BookingView, MarketplaceError> {
        let mut booking = self.involved(principal, id)?;
        let previous = std::mem::replace(&mut booking.status, status_label(status)?);
        booking.updated_at = Some(Utc::now());
        self.bookings
            .update(booking.clone())
            .map_err(|err| MarketplaceError::from_repository(err, "Booking"))?;

        info!(
            booking_id = %booking.id,
            from = %previous,
            to = %booking.status,
            "booking status changed"
        );
        self.view(&booking)
    }

    /// Hard delete by either party.
    pub fn cancel(&self, principal: &Principal, id: &BookingId) -> Result<(), MarketplaceError> {
        self.involved(principal, id)?;
        let removed = self.bookings.remove(id)?.ok_or_else(booking_not_found)?;
        info!(booking_id = %removed.id, "booking cancelled");
        Ok(())
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<BookingView>, MarketplaceError> {
        self.views(self.bookings.recent(limit)?)
    }

    pub fn count(&self) -> Result<usize, MarketplaceError> {
        Ok(self.bookings.count()?)
    }

    fn involved(&self, principal: &Principal, id: &BookingId) -> Result<Booking, MarketplaceError> {
        let booking = self.bookings.fetch(id)?.ok_or_else(booking_not_found)?;
        match principal.user_id() {
            Some(user) if booking.involves(user) => Ok(booking),
            _ => Err(MarketplaceError::forbidden("Not authorized")),
        }
    }

    fn view(&self, booking: &Booking) -> Result<BookingView, MarketplaceError> {
        let listing = self.listings.fetch(&booking.listing)?;
        let user = self.users.fetch(&booking.user)?;
        let owner = self.users.fetch(&booking.owner)?;
        Ok(BookingView {
            id: booking.id,
            listing: listing.as_ref().map(ListingSummary::from),
            user: user.as_ref().map(ContactSummary::with_phone),
            owner: owner.as_ref().map(ContactSummary::with_phone),
            status: booking.status.clone(),
            note: booking.note.clone(),
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        })
    }

    fn views(&self, bookings: Vec<Booking>) -> Result<Vec<BookingView>, MarketplaceError> {
        bookings.iter().map(|booking| self.view(booking)).collect()
    }
}
