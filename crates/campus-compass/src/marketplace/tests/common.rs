use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::Value;

use crate::config::{AuthConfig, ModerationConfig, OtpConfig};
use crate::marketplace::accounts::{Credentials, Principal, Registration, UserId, UserType};
use crate::marketplace::error::RepositoryError;
use crate::marketplace::listings::{
    Category, Listing, ListingFilter, ListingForm, ListingId, ListingRepository, ListingView,
};
use crate::marketplace::media::{
    ImageStore, ImageUpload, MemoryImageStore, StorageError, StoredImage, UploadArea,
};
use crate::marketplace::{marketplace_router, Marketplace, MarketplaceSettings, MarketplaceStores};

pub(super) const TEST_SECRET: &str = "campus-compass-test-secret";

pub(super) fn settings() -> MarketplaceSettings {
    MarketplaceSettings {
        auth: AuthConfig {
            jwt_secret: TEST_SECRET.to_string(),
            token_ttl_hours: 1,
            bcrypt_cost: 4,
        },
        moderation: ModerationConfig::default(),
        otp: OtpConfig::default(),
        hide_internal_errors: false,
        trusted_proxies: Vec::new(),
    }
}

/// A marketplace over in-memory stores, with handles to inspect stored images.
pub(super) struct Harness {
    pub(super) marketplace: Arc<Marketplace>,
    pub(super) images: MemoryImageStore,
}

/// An account created through registration, with its bearer token.
pub(super) struct Account {
    pub(super) principal: Principal,
    pub(super) token: String,
}

impl Account {
    pub(super) fn user_id(&self) -> UserId {
        self.principal.user_id().expect("user account")
    }

    pub(super) fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

pub(super) fn harness() -> Harness {
    harness_with(settings(), |_| {})
}

pub(super) fn harness_with(
    settings: MarketplaceSettings,
    customize: impl FnOnce(&mut MarketplaceStores),
) -> Harness {
    let images = MemoryImageStore::default();
    let mut stores = MarketplaceStores::in_memory(Arc::new(images.clone()));
    customize(&mut stores);
    Harness {
        marketplace: Arc::new(Marketplace::new(settings, stores)),
        images,
    }
}

impl Harness {
    pub(super) fn router(&self) -> axum::Router {
        marketplace_router(self.marketplace.clone())
    }

    pub(super) fn register(&self, name: &str, user_type: UserType) -> Account {
        let session = self
            .marketplace
            .accounts
            .register(Registration {
                name: name.to_string(),
                email: format!("{}@campus.test", name.to_ascii_lowercase()),
                password: "secret-pass".to_string(),
                phone: "+919876543210".to_string(),
                user_type: user_type.label().to_string(),
            })
            .expect("registration succeeds");
        Account {
            principal: Principal::User {
                id: UserId(session.account.id),
                user_type,
            },
            token: session.token,
        }
    }

    pub(super) fn student(&self, name: &str) -> Account {
        self.register(name, UserType::Student)
    }

    pub(super) fn owner(&self, name: &str) -> Account {
        self.register(name, UserType::Owner)
    }

    pub(super) fn admin(&self) -> Account {
        let admin = self
            .marketplace
            .accounts
            .ensure_admin("Moderator", "admin@campus.test", "admin-pass")
            .expect("admin seeded");
        let session = self
            .marketplace
            .accounts
            .admin_login(Credentials {
                email: "admin@campus.test".to_string(),
                password: "admin-pass".to_string(),
                user_type: None,
            })
            .expect("admin login");
        Account {
            principal: Principal::Admin { id: admin.id },
            token: session.token,
        }
    }

    pub(super) fn create_accommodation(&self, owner: &Account, title: &str) -> ListingView {
        self.marketplace
            .listings
            .create(
                &owner.principal,
                Category::Accommodation,
                accommodation_form(title),
            )
            .expect("listing created")
    }

    pub(super) fn create_shop(&self, owner: &Account, title: &str) -> ListingView {
        self.marketplace
            .listings
            .create(&owner.principal, Category::Shop, shop_form(title))
            .expect("listing created")
    }

    pub(super) fn approved_accommodation(
        &self,
        owner: &Account,
        admin: &Account,
        title: &str,
    ) -> ListingView {
        let listing = self.create_accommodation(owner, title);
        self.marketplace
            .listings
            .approve(&admin.principal, &listing.id)
            .expect("listing approved")
    }
}

pub(super) fn png(name: &str) -> ImageUpload {
    ImageUpload {
        file_name: Some(name.to_string()),
        content_type: "image/png".to_string(),
        bytes: vec![0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a],
    }
}

pub(super) fn accommodation_form(title: &str) -> ListingForm {
    let mut form = ListingForm::default()
        .with_field("title", title)
        .with_field("description", "Furnished rooms two minutes from the main gate")
        .with_field("location", "12 College Road, Pune")
        .with_field("price", "6500")
        .with_field("roomType", "double")
        .with_field("availableRooms", "3");
    form.images.push(png("front.png"));
    form
}

pub(super) fn shop_form(title: &str) -> ListingForm {
    ListingForm::default()
        .with_field("title", title)
        .with_field("description", "Notebooks, pens, and lab coats")
        .with_field("location", "Market Lane")
        .with_field("shopType", "stationery")
        .with_field("openingHours", "9am - 9pm")
}

/// Listing store that accepts reads but fails every write.
pub(super) struct ReadOnlyListings;

impl ListingRepository for ReadOnlyListings {
    fn insert(&self, _listing: Listing) -> Result<Listing, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _listing: Listing) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        Ok(None)
    }

    fn remove(&self, _id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        Ok(None)
    }

    fn query(&self, _filter: &ListingFilter) -> Result<Vec<Listing>, RepositoryError> {
        Ok(Vec::new())
    }
}

/// Image store that remembers which threads touched the files.
#[derive(Clone, Default)]
pub(super) struct ThreadRecordingImages {
    pub(super) inner: MemoryImageStore,
    pub(super) threads: Arc<Mutex<Vec<ThreadId>>>,
}

impl ThreadRecordingImages {
    fn record(&self) {
        self.threads
            .lock()
            .expect("thread log mutex poisoned")
            .push(thread::current().id());
    }

    pub(super) fn recorded(&self) -> Vec<ThreadId> {
        self.threads.lock().expect("thread log mutex poisoned").clone()
    }
}

impl ImageStore for ThreadRecordingImages {
    fn store(&self, area: UploadArea, upload: ImageUpload) -> Result<StoredImage, StorageError> {
        self.record();
        self.inner.store(area, upload)
    }

    fn remove(&self, image: &StoredImage) -> Result<(), StorageError> {
        self.record();
        self.inner.remove(image)
    }
}

pub(super) fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, bearer);
    }
    builder.body(Body::empty()).expect("request builds")
}

pub(super) fn json_request(
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, bearer);
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).expect("json body")))
        .expect("request builds")
}

pub(super) const BOUNDARY: &str = "campus-compass-boundary";

/// Hand-built `multipart/form-data` body with text fields and PNG files.
pub(super) fn multipart_request(
    uri: &str,
    bearer: &str,
    fields: &[(&str, &str)],
    files: &[&str],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for file in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"{file}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&png(file).bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, bearer)
        .body(Body::from(body))
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
