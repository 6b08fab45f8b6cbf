//! Campus Compass: a marketplace connecting students with nearby PG accommodations,
//! restaurants, shops, and mess services, with admin moderation of every listing.

pub mod config;
pub mod error;
pub mod marketplace;
pub mod telemetry;
