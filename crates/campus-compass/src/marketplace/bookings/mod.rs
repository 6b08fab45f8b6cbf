//! Student bookings against approved listings.

pub mod domain;
pub mod repository;
pub mod service;

pub use domain::{
    Booking, BookingId, BookingRequest, BookingView, ListingSummary, StatusChange,
    DEFAULT_BOOKING_STATUS,
};
pub use repository::BookingRepository;
pub use service::BookingService;
