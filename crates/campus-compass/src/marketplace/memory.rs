//! In-memory document store backing every repository trait.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::accounts::{Admin, AdminId, AdminRepository, User, UserId, UserRepository};
use super::bookings::{Booking, BookingId, BookingRepository};
use super::error::RepositoryError;
use super::listings::{Listing, ListingFilter, ListingId, ListingRepository};
use super::reviews::{Review, ReviewId, ReviewRepository};

#[derive(Debug, Default)]
struct Collections {
    users: HashMap<UserId, User>,
    admins: HashMap<AdminId, Admin>,
    listings: HashMap<ListingId, Listing>,
    reviews: HashMap<ReviewId, Review>,
    bookings: HashMap<BookingId, Booking>,
}

/// Mutex-guarded collections. Uniqueness checks happen under the same lock as the write.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Collections>>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.inner.lock().expect("document store mutex poisoned")
    }
}

fn newest_first<T, K: Ord>(mut records: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    records.sort_by(|a, b| key(b).cmp(&key(a)));
    records
}

impl UserRepository for MemoryStore {
    fn insert(&self, user: User) -> Result<User, RepositoryError> {
        let mut guard = self.lock();
        let taken = guard.users.contains_key(&user.id)
            || guard.users.values().any(|existing| existing.email == user.email);
        if taken {
            return Err(RepositoryError::Conflict);
        }
        guard.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn fetch(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock().users.get(id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<User>, RepositoryError> {
        let users = self.lock().users.values().cloned().collect();
        let mut users = newest_first(users, |user: &User| user.created_at);
        users.truncate(limit);
        Ok(users)
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock().users.len())
    }
}

impl AdminRepository for MemoryStore {
    fn insert(&self, admin: Admin) -> Result<Admin, RepositoryError> {
        let mut guard = self.lock();
        let taken = guard.admins.contains_key(&admin.id)
            || guard.admins.values().any(|existing| existing.email == admin.email);
        if taken {
            return Err(RepositoryError::Conflict);
        }
        guard.admins.insert(admin.id, admin.clone());
        Ok(admin)
    }

    fn update(&self, admin: Admin) -> Result<(), RepositoryError> {
        let mut guard = self.lock();
        match guard.admins.get_mut(&admin.id) {
            Some(slot) => {
                *slot = admin;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &AdminId) -> Result<Option<Admin>, RepositoryError> {
        Ok(self.lock().admins.get(id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Admin>, RepositoryError> {
        Ok(self
            .lock()
            .admins
            .values()
            .find(|admin| admin.email == email)
            .cloned())
    }
}

impl ListingRepository for MemoryStore {
    fn insert(&self, listing: Listing) -> Result<Listing, RepositoryError> {
        let mut guard = self.lock();
        if guard.listings.contains_key(&listing.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    fn update(&self, listing: Listing) -> Result<(), RepositoryError> {
        let mut guard = self.lock();
        match guard.listings.get_mut(&listing.id) {
            Some(slot) => {
                *slot = listing;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        Ok(self.lock().listings.get(id).cloned())
    }

    fn remove(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        Ok(self.lock().listings.remove(id))
    }

    fn query(&self, filter: &ListingFilter) -> Result<Vec<Listing>, RepositoryError> {
        let matching = self
            .lock()
            .listings
            .values()
            .filter(|listing| filter.matches(listing))
            .cloned()
            .collect();
        Ok(newest_first(matching, |listing: &Listing| listing.created_at))
    }
}

impl ReviewRepository for MemoryStore {
    fn insert(&self, review: Review) -> Result<Review, RepositoryError> {
        let mut guard = self.lock();
        let duplicate = guard.reviews.contains_key(&review.id)
            || guard
                .reviews
                .values()
                .any(|existing| existing.user == review.user && existing.listing == review.listing);
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        guard.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    fn update(&self, review: Review) -> Result<(), RepositoryError> {
        let mut guard = self.lock();
        match guard.reviews.get_mut(&review.id) {
            Some(slot) => {
                *slot = review;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        Ok(self.lock().reviews.get(id).cloned())
    }

    fn remove(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        Ok(self.lock().reviews.remove(id))
    }

    fn for_listing(&self, listing: &ListingId) -> Result<Vec<Review>, RepositoryError> {
        let matching = self
            .lock()
            .reviews
            .values()
            .filter(|review| review.listing == *listing)
            .cloned()
            .collect();
        Ok(newest_first(matching, |review: &Review| review.created_at))
    }

    fn all(&self) -> Result<Vec<Review>, RepositoryError> {
        let reviews = self.lock().reviews.values().cloned().collect();
        Ok(newest_first(reviews, |review: &Review| review.created_at))
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock().reviews.len())
    }
}

impl BookingRepository for MemoryStore {
    fn insert(&self, booking: Booking) -> Result<Booking, RepositoryError> {
        let mut guard = self.lock();
        if guard.bookings.contains_key(&booking.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    fn update(&self, booking: Booking) -> Result<(), RepositoryError> {
        let mut guard = self.lock();
        match guard.bookings.get_mut(&booking.id) {
            Some(slot) => {
                *slot = booking;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        Ok(self.lock().bookings.get(id).cloned())
    }

    fn remove(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        Ok(self.lock().bookings.remove(id))
    }

    fn for_user(&self, user: &UserId) -> Result<Vec<Booking>, RepositoryError> {
        let matching = self
            .lock()
            .bookings
            .values()
            .filter(|booking| booking.user == *user)
            .cloned()
            .collect();
        Ok(newest_first(matching, |booking: &Booking| booking.created_at))
    }

    fn for_owner(&self, owner: &UserId) -> Result<Vec<Booking>, RepositoryError> {
        let matching = self
            .lock()
            .bookings
            .values()
            .filter(|booking| booking.owner == *owner)
            .cloned()
            .collect();
        Ok(newest_first(matching, |booking: &Booking| booking.created_at))
    }

    fn recent(&self, limit: usize) -> Result<Vec<Booking>, RepositoryError> {
        let bookings = self.lock().bookings.values().cloned().collect();
        let mut bookings = newest_first(bookings, |booking: &Booking| booking.created_at);
        bookings.truncate(limit);
        Ok(bookings)
    }

    fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock().bookings.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::marketplace::accounts::UserType;
    use crate::marketplace::reviews::Rating;

    fn user(email: &str) -> User {
        User {
            id: UserId::new(),
            name: "Asha".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            phone: "+919876543210".to_string(),
            user_type: UserType::Student,
            created_at: Utc::now(),
        }
    }

    fn review(user: UserId, listing: ListingId) -> Review {
        Review {
            id: ReviewId::new(),
            user,
            listing,
            rating: Rating::try_from(4).expect("valid rating"),
            comment: "Great place to stay".to_string(),
            images: Vec::new(),
            owner_feedback: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn user_emails_are_unique() {
        let store = MemoryStore::default();
        UserRepository::insert(&store, user("asha@example.com")).expect("first insert");
        assert!(matches!(
            UserRepository::insert(&store, user("asha@example.com")),
            Err(RepositoryError::Conflict)
        ));
        assert_eq!(UserRepository::count(&store).expect("count"), 1);
    }

    #[test]
    fn one_review_per_user_and_listing() {
        let store = MemoryStore::default();
        let author = UserId::new();
        let listing = ListingId::new();

        ReviewRepository::insert(&store, review(author, listing)).expect("first review");
        assert!(matches!(
            ReviewRepository::insert(&store, review(author, listing)),
            Err(RepositoryError::Conflict)
        ));
        ReviewRepository::insert(&store, review(author, ListingId::new()))
            .expect("other listing is fine");
        ReviewRepository::insert(&store, review(UserId::new(), listing))
            .expect("other author is fine");
        assert_eq!(ReviewRepository::count(&store).expect("count"), 3);
    }

    #[test]
    fn recent_users_are_newest_first() {
        let store = MemoryStore::default();
        let mut older = user("old@example.com");
        older.created_at = Utc::now() - Duration::days(2);
        let newer = user("new@example.com");
        UserRepository::insert(&store, older).expect("older");
        UserRepository::insert(&store, newer.clone()).expect("newer");

        let recent = UserRepository::recent(&store, 1).expect("recent");
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, newer.id);
    }
}
