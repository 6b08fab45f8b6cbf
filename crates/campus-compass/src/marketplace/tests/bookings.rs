use super::common::*;
use crate::marketplace::bookings::{BookingRequest, DEFAULT_BOOKING_STATUS};
use crate::marketplace::error::MarketplaceError;

#[test]
fn students_book_approved_listings() {
    let harness = harness();
    let owner = harness.owner("Ravi");
    let admin = harness.admin();
    let student = harness.student("Asha");
    let bookings = &harness.marketplace.bookings;

    let pending = harness.create_accommodation(&owner, "Moonlight PG");
    assert!(matches!(
        bookings.create(&student.principal, &pending.id, BookingRequest::default()),
        Err(MarketplaceError::Validation(_))
    ));

    let listing = harness.approved_accommodation(&owner, &admin, "Sunrise PG");
    assert!(matches!(
        bookings.create(&owner.principal, &listing.id, BookingRequest::default()),
        Err(MarketplaceError::Forbidden(_))
    ));

    let booking = bookings
        .create(
            &student.principal,
            &listing.id,
            BookingRequest {
                note: Some("  Visiting on Sunday ".to_string()),
                status: None,
            },
        )
        .expect("booking created");
    assert_eq!(booking.status, DEFAULT_BOOKING_STATUS);
    assert_eq!(booking.note.as_deref(), Some("Visiting on Sunday"));
    assert_eq!(
        booking.listing.as_ref().map(|summary| summary.title.as_str()),
        Some("Sunrise PG")
    );
    assert_eq!(
        booking.owner.as_ref().and_then(|owner| owner.phone.as_deref()),
        Some("+919876543210")
    );

    let mine = bookings.for_user(&student.principal).expect("user bookings");
    assert_eq!(mine.len(), 1);
    let incoming = bookings.for_owner(&owner.principal).expect("owner bookings");
    assert_eq!(incoming.len(), 1);
    assert_eq!(
        incoming[0].user.as_ref().map(|user| user.name.as_str()),
        Some("Asha")
    );
}

#[test]
fn either_party_changes_status_or_cancels() {
    let harness = harness();
    let owner = harness.owner("Ravi");
    let admin = harness.admin();
    let student = harness.student("Asha");
    let stranger = harness.student("Bina");
    let bookings = &harness.marketplace.bookings;
    let listing = harness.approved_accommodation(&owner, &admin, "Sunrise PG");

    let booking = bookings
        .create(&student.principal, &listing.id, BookingRequest::default())
        .expect("booking created");

    assert!(matches!(
        bookings.update_status(&stranger.principal, &booking.id, "confirmed"),
        Err(MarketplaceError::Forbidden(_))
    ));
    assert!(matches!(
        bookings.update_status(&owner.principal, &booking.id, "  "),
        Err(MarketplaceError::Validation(_))
    ));

    let confirmed = bookings
        .update_status(&owner.principal, &booking.id, "Confirmed")
        .expect("owner confirms");
    assert_eq!(confirmed.status, "confirmed");

    assert!(matches!(
        bookings.cancel(&stranger.principal, &booking.id),
        Err(MarketplaceError::Forbidden(_))
    ));
    bookings
        .cancel(&student.principal, &booking.id)
        .expect("student cancels");
    assert!(bookings
        .for_owner(&owner.principal)
        .expect("owner bookings")
        .is_empty());
    assert!(matches!(
        bookings.cancel(&student.principal, &booking.id),
        Err(MarketplaceError::NotFound(_))
    ));
}

#[test]
fn dashboard_counts_every_collection() {
    let harness = harness();
    let owner = harness.owner("Ravi");
    let admin = harness.admin();
    let student = harness.student("Asha");
    let listing = harness.approved_accommodation(&owner, &admin, "Sunrise PG");
    harness.create_shop(&owner, "Campus Stationers");
    harness
        .marketplace
        .bookings
        .create(&student.principal, &listing.id, BookingRequest::default())
        .expect("booking created");

    let stats = harness
        .marketplace
        .dashboard_stats(&admin.principal)
        .expect("admin stats");
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.total_listings, 2);
    assert_eq!(stats.pending_listings, 1);
    assert_eq!(stats.total_bookings, 1);
    assert_eq!(stats.total_reviews, 0);

    let activity = harness
        .marketplace
        .recent_activity(&admin.principal)
        .expect("admin activity");
    assert_eq!(activity.recent_bookings.len(), 1);
    assert_eq!(activity.recent_users.len(), 2);

    assert!(matches!(
        harness.marketplace.dashboard_stats(&student.principal),
        Err(MarketplaceError::Forbidden(_))
    ));
}
