use campus_compass::config::{AuthConfig, ModerationConfig, OtpConfig};
use campus_compass::error::AppError;
use campus_compass::marketplace::accounts::{Credentials, Principal, Registration};
use campus_compass::marketplace::bookings::BookingRequest;
use campus_compass::marketplace::listings::{Category, ListingForm};
use campus_compass::marketplace::media::{ImageUpload, MemoryImageStore};
use campus_compass::marketplace::reviews::ReviewForm;
use campus_compass::marketplace::{Marketplace, MarketplaceSettings, MarketplaceStores};
use chrono::Local;
use clap::Args;
use std::sync::Arc;

const DEMO_ADMIN_EMAIL: &str = "admin@campus-compass.demo";
const DEMO_PASSWORD: &str = "demo-password";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reject the demo listing instead of approving it.
    #[arg(long)]
    pub(crate) reject: bool,
    /// Allow owners to resubmit rejected listings during the demo.
    #[arg(long)]
    pub(crate) allow_resubmission: bool,
    /// Print the dashboard payloads as JSON.
    #[arg(long)]
    pub(crate) json: bool,
}

struct DemoAccount {
    principal: Principal,
    name: String,
}

fn demo_marketplace(allow_resubmission: bool) -> (Marketplace, MemoryImageStore) {
    let images = MemoryImageStore::default();
    let settings = MarketplaceSettings {
        auth: AuthConfig {
            jwt_secret: "campus-compass-demo-secret".to_string(),
            token_ttl_hours: 1,
            bcrypt_cost: 4,
        },
        moderation: ModerationConfig { allow_resubmission },
        otp: OtpConfig::default(),
        hide_internal_errors: false,
        trusted_proxies: Vec::new(),
    };
    let marketplace = Marketplace::new(
        settings,
        MarketplaceStores::in_memory(Arc::new(images.clone())),
    );
    (marketplace, images)
}

fn register(
    marketplace: &Marketplace,
    name: &str,
    user_type: &str,
) -> Result<DemoAccount, AppError> {
    let session = marketplace.accounts.register(Registration {
        name: name.to_string(),
        email: format!("{}@campus-compass.demo", name.to_lowercase()),
        password: DEMO_PASSWORD.to_string(),
        phone: "+919812345678".to_string(),
        user_type: user_type.to_string(),
    })?;
    let principal = marketplace
        .gate
        .authenticate_header(Some(&format!("Bearer {}", session.token)))?;
    Ok(DemoAccount {
        principal,
        name: session.account.name,
    })
}

fn admin(marketplace: &Marketplace) -> Result<DemoAccount, AppError> {
    marketplace
        .accounts
        .ensure_admin("Demo Moderator", DEMO_ADMIN_EMAIL, DEMO_PASSWORD)?;
    let session = marketplace.accounts.admin_login(Credentials {
        email: DEMO_ADMIN_EMAIL.to_string(),
        password: DEMO_PASSWORD.to_string(),
        user_type: None,
    })?;
    let principal = marketplace
        .gate
        .authenticate_header(Some(&format!("Bearer {}", session.token)))?;
    Ok(DemoAccount {
        principal,
        name: session.account.name,
    })
}

fn sample_photo(name: &str) -> ImageUpload {
    ImageUpload {
        file_name: Some(name.to_string()),
        content_type: "image/png".to_string(),
        bytes: vec![0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a],
    }
}

fn accommodation_form() -> ListingForm {
    let mut form = ListingForm::default()
        .with_field("title", "Sunrise PG")
        .with_field(
            "description",
            "Furnished double rooms with meals, five minutes from the main gate",
        )
        .with_field("location", "12 College Road, Pune")
        .with_field("price", "6500")
        .with_field("roomType", "double")
        .with_field("availableRooms", "4");
    form.images.push(sample_photo("front.png"));
    form
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        reject,
        allow_resubmission,
        json,
    } = args;

    println!(
        "Campus Compass marketplace demo ({})",
        Local::now().format("%Y-%m-%d %H:%M")
    );
    let (marketplace, images) = demo_marketplace(allow_resubmission);

    let owner = register(&marketplace, "Ravi", "owner")?;
    let student = register(&marketplace, "Asha", "student")?;
    let moderator = admin(&marketplace)?;
    println!(
        "- Accounts: owner {} | student {} | admin {}",
        owner.name, student.name, moderator.name
    );

    let listing =
        marketplace
            .listings
            .create(&owner.principal, Category::Accommodation, accommodation_form())?;
    println!(
        "- {} submitted by {} -> status {:?} ({} image(s) stored)",
        listing.title,
        owner.name,
        listing.status,
        images.len()
    );

    if reject {
        let rejected = marketplace.listings.reject(
            &moderator.principal,
            &listing.id,
            "Photos are too dark".to_string(),
        )?;
        println!(
            "- Moderator rejected it: {}",
            rejected.rejection_reason.as_deref().unwrap_or("no reason given")
        );
        match marketplace.listings.resubmit(&owner.principal, &listing.id) {
            Ok(resubmitted) => println!(
                "- Owner resubmitted it -> status {:?}",
                resubmitted.status
            ),
            Err(err) => println!("- Resubmission unavailable: {err}"),
        }
        let visible = marketplace.listings.list_approved(Category::Accommodation)?;
        println!("- Approved accommodations visible to students: {}", visible.len());
        return Ok(());
    }

    let approved = marketplace
        .listings
        .approve(&moderator.principal, &listing.id)?;
    println!("- Moderator approved it -> status {:?}", approved.status);

    let browse = marketplace.listings.browse()?;
    println!("- Approved listings across categories: {}", browse.len());

    let review = marketplace.reviews.create(
        &student.principal,
        ReviewForm {
            listing_id: Some(listing.id.to_string()),
            rating: Some("4".to_string()),
            comment: Some("Great place to stay, quiet at night".to_string()),
            images: Vec::new(),
        },
    )?;
    println!(
        "- {} reviewed it: {} star(s), \"{}\"",
        student.name,
        review.rating.value(),
        review.comment
    );
    let duplicate = marketplace.reviews.create(
        &student.principal,
        ReviewForm {
            listing_id: Some(listing.id.to_string()),
            rating: Some("5".to_string()),
            comment: Some("Reviewing the same place again".to_string()),
            images: Vec::new(),
        },
    );
    if let Err(err) = duplicate {
        println!("  Second review refused: {err}");
    }
    marketplace
        .reviews
        .attach_feedback(&owner.principal, &review.id, "Thanks for staying with us!")?;
    for entry in marketplace.reviews.list_by_listing(&listing.id)? {
        if let Some(feedback) = entry.owner_feedback {
            println!("  Owner replied: \"{}\"", feedback.comment);
        }
    }

    let booking = marketplace.bookings.create(
        &student.principal,
        &listing.id,
        BookingRequest {
            note: Some("Visiting on Sunday morning".to_string()),
            status: None,
        },
    )?;
    println!("- Booking {} opened -> {}", booking.id, booking.status);
    let confirmed = marketplace
        .bookings
        .update_status(&owner.principal, &booking.id, "confirmed")?;
    println!("  Owner updated booking -> {}", confirmed.status);

    let stats = marketplace.dashboard_stats(&moderator.principal)?;
    if json {
        let activity = marketplace.recent_activity(&moderator.principal)?;
        match serde_json::to_string_pretty(&serde_json::json!({
            "stats": stats,
            "activity": activity,
        })) {
            Ok(rendered) => println!("\nDashboard payload:\n{rendered}"),
            Err(err) => println!("\nDashboard payload unavailable: {err}"),
        }
    } else {
        println!(
            "\nDashboard: {} users | {} listings ({} pending) | {} bookings | {} reviews",
            stats.total_users,
            stats.total_listings,
            stats.pending_listings,
            stats.total_bookings,
            stats.total_reviews
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_runs_the_approval_path() {
        run_demo(DemoArgs::default()).expect("demo completes");
    }

    #[test]
    fn demo_runs_the_rejection_path() {
        run_demo(DemoArgs {
            reject: true,
            allow_resubmission: true,
            json: false,
        })
        .expect("demo completes");
    }
}
