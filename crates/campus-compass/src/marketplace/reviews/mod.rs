//! Student reviews of listings, with one optional reply from the listing owner.

pub mod domain;
pub mod repository;
pub mod service;

pub use domain::{
    validate_comment, OwnerFeedback, Rating, Review, ReviewForm, ReviewId, ReviewUpdate,
    ReviewView, MIN_COMMENT_CHARS,
};
pub use repository::ReviewRepository;
pub use service::ReviewService;
