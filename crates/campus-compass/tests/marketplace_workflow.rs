use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use campus_compass::config::{AuthConfig, ModerationConfig, OtpConfig};
use campus_compass::marketplace::media::MemoryImageStore;
use campus_compass::marketplace::{
    marketplace_router, Marketplace, MarketplaceSettings, MarketplaceStores,
};
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "workflow-boundary";
const PNG: &[u8] = &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

struct App {
    router: Router,
    images: MemoryImageStore,
}

fn app() -> App {
    let images = MemoryImageStore::default();
    let settings = MarketplaceSettings {
        auth: AuthConfig {
            jwt_secret: "workflow-secret".to_string(),
            token_ttl_hours: 1,
            bcrypt_cost: 4,
        },
        moderation: ModerationConfig::default(),
        otp: OtpConfig::default(),
        hide_internal_errors: true,
        trusted_proxies: Vec::new(),
    };
    let marketplace = Marketplace::new(
        settings,
        MarketplaceStores::in_memory(Arc::new(images.clone())),
    );
    marketplace
        .accounts
        .ensure_admin("Moderator", "admin@campus.test", "admin-pass")
        .expect("admin seeded");
    App {
        router: marketplace_router(Arc::new(marketplace)),
        images,
    }
}

async fn send(app: &App, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("router responds");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    let body = serde_json::from_slice(&bytes).expect("json body");
    (status, body)
}

fn json_post(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request builds")
}

fn multipart_post(uri: &str, token: &str, fields: &[(&str, &str)], files: usize) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for index in 0..files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"photo-{index}.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(PNG);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .expect("request builds")
}

async fn register(app: &App, name: &str, user_type: &str) -> String {
    let (status, body) = send(
        app,
        json_post(
            "/api/auth/register",
            None,
            json!({
                "name": name,
                "email": format!("{}@campus.test", name.to_lowercase()),
                "password": "secret-pass",
                "phone": "+919812345678",
                "userType": user_type,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {body}");
    body["token"].as_str().expect("token issued").to_string()
}

async fn admin_token(app: &App) -> String {
    let (status, body) = send(
        app,
        json_post(
            "/api/admin/login",
            None,
            json!({ "email": "admin@campus.test", "password": "admin-pass" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().expect("admin token").to_string()
}

async fn create_accommodation(app: &App, token: &str, title: &str) -> String {
    let (status, body) = send(
        app,
        multipart_post(
            "/api/listings/create/accommodations",
            token,
            &[
                ("title", title),
                ("description", "Furnished rooms near the main gate"),
                ("location", "12 College Road, Pune"),
                ("price", "6500"),
                ("roomType", "single"),
                ("availableRooms", "2"),
            ],
            1,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    assert_eq!(body["listing"]["status"], json!("pending"));
    body["listing"]["id"].as_str().expect("listing id").to_string()
}

async fn approved_accommodation_ids(app: &App) -> Vec<String> {
    let (status, body) = send(app, get("/api/listings/accommodations")).await;
    assert_eq!(status, StatusCode::OK);
    body["listings"]
        .as_array()
        .expect("listings array")
        .iter()
        .filter_map(|listing| listing["id"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn approval_publishes_and_rejection_hides_listings() {
    let app = app();
    let owner = register(&app, "Ravi", "owner").await;
    let admin = admin_token(&app).await;

    let approved = create_accommodation(&app, &owner, "Sunrise PG").await;
    let rejected = create_accommodation(&app, &owner, "Moonlight PG").await;
    assert_eq!(app.images.len(), 2);
    assert!(approved_accommodation_ids(&app).await.is_empty());

    let (status, _) = send(
        &app,
        json_post(&format!("/api/listings/{approved}/approve"), Some(&admin), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        json_post(
            &format!("/api/listings/{rejected}/reject"),
            Some(&admin),
            json!({ "rejectionReason": "poor photos" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["listing"]["status"], json!("rejected"));

    let visible = approved_accommodation_ids(&app).await;
    assert_eq!(visible, vec![approved]);

    let (status, body) = send(&app, get(&format!("/api/listings/accommodations/{rejected}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["listing"]["rejectionReason"], json!("poor photos"));
}

#[tokio::test]
async fn one_review_per_student_with_owner_feedback() {
    let app = app();
    let owner = register(&app, "Ravi", "owner").await;
    let student = register(&app, "Asha", "student").await;
    let listing = create_accommodation(&app, &owner, "Sunrise PG").await;

    let review_fields = [
        ("listingId", listing.as_str()),
        ("rating", "4"),
        ("comment", "Great place to stay"),
    ];
    let (status, body) = send(&app, multipart_post("/api/reviews", &student, &review_fields, 0)).await;
    assert_eq!(status, StatusCode::CREATED);
    let review = body["review"]["id"].as_str().expect("review id").to_string();

    let (status, body) = send(&app, multipart_post("/api/reviews", &student, &review_fields, 0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("You have already reviewed this listing"));

    let (status, _) = send(
        &app,
        json_post(
            &format!("/api/reviews/{review}/feedback"),
            Some(&owner),
            json!({ "comment": "Thanks!" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get(&format!("/api/reviews/listing/{listing}"))).await;
    assert_eq!(status, StatusCode::OK);
    let reviews = body["reviews"].as_array().expect("reviews array");
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["user"]["name"], json!("Asha"));
    assert_eq!(reviews[0]["rating"], json!(4));
    assert_eq!(reviews[0]["ownerFeedback"]["comment"], json!("Thanks!"));
}

#[tokio::test]
async fn approval_requires_an_admin_token() {
    let app = app();
    let owner = register(&app, "Ravi", "owner").await;
    let student = register(&app, "Asha", "student").await;
    let listing = create_accommodation(&app, &owner, "Sunrise PG").await;

    for token in [&owner, &student] {
        let (status, body) = send(
            &app,
            json_post(&format!("/api/listings/{listing}/approve"), Some(token), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], json!(false));
    }

    let (status, _) = send(
        &app,
        json_post(&format!("/api/listings/{listing}/approve"), None, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
