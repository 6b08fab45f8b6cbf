use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::marketplace::accounts::{ContactSummary, UserId};
use crate::marketplace::location::Coordinates;
use crate::marketplace::media::StoredImage;

/// Identifier wrapper for listings of every category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingId(pub Uuid);

impl ListingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ListingId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim()).map(Self)
    }
}

/// The four disjoint marketplace categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Accommodation,
    Restaurant,
    Shop,
    Mess,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Accommodation,
        Category::Restaurant,
        Category::Shop,
        Category::Mess,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Category::Accommodation => "accommodation",
            Category::Restaurant => "restaurant",
            Category::Shop => "shop",
            Category::Mess => "mess",
        }
    }

    /// Plural form used in URL paths and the browse payload.
    pub const fn path_segment(self) -> &'static str {
        match self {
            Category::Accommodation => "accommodations",
            Category::Restaurant => "restaurants",
            Category::Shop => "shops",
            Category::Mess => "messes",
        }
    }

    pub fn from_path_segment(segment: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.path_segment() == segment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    Single,
    Double,
    Triple,
}

impl FromStr for RoomType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(RoomType::Single),
            "double" => Ok(RoomType::Double),
            "triple" => Ok(RoomType::Triple),
            _ => Err("roomType must be one of single, double, triple".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceRange {
    Budget,
    Moderate,
    Expensive,
}

impl FromStr for PriceRange {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "budget" => Ok(PriceRange::Budget),
            "moderate" => Ok(PriceRange::Moderate),
            "expensive" => Ok(PriceRange::Expensive),
            _ => Err("priceRange must be one of budget, moderate, expensive".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShopType {
    Stationery,
    Grocery,
    Electronics,
    Other,
}

impl FromStr for ShopType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stationery" => Ok(ShopType::Stationery),
            "grocery" => Ok(ShopType::Grocery),
            "electronics" => Ok(ShopType::Electronics),
            "other" => Ok(ShopType::Other),
            _ => Err("shopType must be one of stationery, grocery, electronics, other".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealTypes {
    pub breakfast: bool,
    pub lunch: bool,
    pub dinner: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccommodationDetails {
    pub price: f64,
    pub room_type: RoomType,
    pub available_rooms: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantDetails {
    pub cuisine_type: Vec<String>,
    pub price_range: PriceRange,
    pub opening_hours: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopDetails {
    pub shop_type: ShopType,
    pub opening_hours: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessDetails {
    pub monthly_price: f64,
    pub meal_types: MealTypes,
    pub available_seats: u32,
}

/// Category-specific fields. The variant is the listing's category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ListingDetails {
    Accommodation(AccommodationDetails),
    Restaurant(RestaurantDetails),
    Shop(ShopDetails),
    Mess(MessDetails),
}

impl ListingDetails {
    pub fn category(&self) -> Category {
        match self {
            ListingDetails::Accommodation(_) => Category::Accommodation,
            ListingDetails::Restaurant(_) => Category::Restaurant,
            ListingDetails::Shop(_) => Category::Shop,
            ListingDetails::Mess(_) => Category::Mess,
        }
    }
}

/// Moderation state. A rejection always carries its reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ListingStatus {
    Pending,
    Approved,
    Rejected { reason: String },
}

impl ListingStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            ListingStatus::Pending => StatusKind::Pending,
            ListingStatus::Approved => StatusKind::Approved,
            ListingStatus::Rejected { .. } => StatusKind::Rejected,
        }
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            ListingStatus::Rejected { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Status without payload, used for filtering and wire labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Pending,
    Approved,
    Rejected,
}

impl StatusKind {
    pub const fn label(self) -> &'static str {
        match self {
            StatusKind::Pending => "pending",
            StatusKind::Approved => "approved",
            StatusKind::Rejected => "rejected",
        }
    }
}

impl FromStr for StatusKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(StatusKind::Pending),
            "approved" => Ok(StatusKind::Approved),
            "rejected" => Ok(StatusKind::Rejected),
            other => Err(format!("unknown listing status '{other}'")),
        }
    }
}

/// Stored listing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub owner: UserId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub coordinates: Option<Coordinates>,
    pub images: Vec<StoredImage>,
    pub status: ListingStatus,
    pub details: ListingDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Listing {
    pub fn category(&self) -> Category {
        self.details.category()
    }

    pub fn view(&self, owner: Option<ContactSummary>) -> ListingView {
        ListingView {
            id: self.id,
            owner,
            title: self.title.clone(),
            description: self.description.clone(),
            location: self.location.clone(),
            latitude: self.coordinates.map(|coords| coords.latitude),
            longitude: self.coordinates.map(|coords| coords.longitude),
            images: self.images.clone(),
            status: self.status.kind(),
            rejection_reason: self.status.rejection_reason().map(str::to_string),
            created_at: self.created_at,
            updated_at: self.updated_at,
            details: self.details.clone(),
        }
    }
}

/// Wire shape of a listing with its owner joined in. `type` comes from the details tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingView {
    pub id: ListingId,
    pub owner: Option<ContactSummary>,
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    pub images: Vec<StoredImage>,
    pub status: StatusKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub details: ListingDetails,
}

impl ListingView {
    pub fn category(&self) -> Category {
        self.details.category()
    }
}

/// Approved listings grouped by category for the browse endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApprovedListings {
    pub accommodations: Vec<ListingView>,
    pub restaurants: Vec<ListingView>,
    pub shops: Vec<ListingView>,
    pub messes: Vec<ListingView>,
}

impl ApprovedListings {
    pub fn push(&mut self, view: ListingView) {
        match view.category() {
            Category::Accommodation => self.accommodations.push(view),
            Category::Restaurant => self.restaurants.push(view),
            Category::Shop => self.shops.push(view),
            Category::Mess => self.messes.push(view),
        }
    }

    pub fn len(&self) -> usize {
        self.accommodations.len() + self.restaurants.len() + self.shops.len() + self.messes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
