//! Listings across the four categories and their moderation lifecycle.

pub mod domain;
pub mod draft;
pub mod moderation;
pub mod repository;
pub mod service;

pub use domain::{
    AccommodationDetails, ApprovedListings, Category, Listing, ListingDetails, ListingId,
    ListingStatus, ListingView, MealTypes, MessDetails, PriceRange, RestaurantDetails, RoomType,
    ShopDetails, ShopType, StatusKind,
};
pub use draft::{ListingDraft, ListingForm, ListingPatch};
pub use moderation::{ModerationDecision, ModerationError, ModerationPolicy};
pub use repository::{ListingFilter, ListingRepository};
pub use service::ListingService;
