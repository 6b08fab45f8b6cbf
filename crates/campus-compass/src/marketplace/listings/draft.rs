//! Validation of submitted listing fields into typed category details.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Deserialize;

use super::domain::{
    AccommodationDetails, Category, Listing, ListingDetails, MealTypes, MessDetails, PriceRange,
    RestaurantDetails, RoomType, ShopDetails, ShopType,
};
use crate::marketplace::error::MarketplaceError;
use crate::marketplace::location::Coordinates;
use crate::marketplace::media::ImageUpload;

/// Raw multipart submission: text fields (repeatable) plus image parts.
#[derive(Debug, Clone, Default)]
pub struct ListingForm {
    pub fields: BTreeMap<String, Vec<String>>,
    pub images: Vec<ImageUpload>,
}

impl ListingForm {
    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.push_field(name, value);
        self
    }

    pub fn push_field(&mut self, name: &str, value: impl Into<String>) {
        self.fields
            .entry(name.to_string())
            .or_default()
            .push(value.into());
    }

    /// First non-blank value for any of the given names.
    fn text(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .filter_map(|name| self.fields.get(*name))
            .flatten()
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
    }

    fn values(&self, name: &str) -> impl Iterator<Item = &str> {
        self.fields
            .get(name)
            .into_iter()
            .flatten()
            .map(|value| value.as_str())
    }
}

/// Validated listing content, ready to be persisted as `pending`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub location: String,
    pub coordinates: Option<Coordinates>,
    pub details: ListingDetails,
}

fn invalid(message: impl Into<String>) -> MarketplaceError {
    MarketplaceError::validation(message)
}

fn required<'a>(form: &'a ListingForm, name: &str) -> Result<&'a str, MarketplaceError> {
    form.text(&[name])
        .ok_or_else(|| invalid(format!("{name} is required")))
}

fn positive_amount(raw: &str, name: &str) -> Result<f64, MarketplaceError> {
    let value = raw
        .parse::<f64>()
        .map_err(|_| invalid(format!("{name} must be a number")))?;
    checked_amount(value, name)
}

/// Amounts are stored as submitted, so the positivity check covers the stored value.
fn checked_amount(value: f64, name: &str) -> Result<f64, MarketplaceError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(format!("{name} must be a positive number")));
    }
    Ok(value)
}

fn count(raw: &str, name: &str) -> Result<u32, MarketplaceError> {
    raw.parse::<u32>()
        .map_err(|_| invalid(format!("{name} must be a whole number of zero or more")))
}

fn parse_enum<T: FromStr<Err = String>>(raw: &str) -> Result<T, MarketplaceError> {
    raw.parse::<T>().map_err(MarketplaceError::Validation)
}

fn truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "on" | "yes" | "1"
    )
}

fn coordinate_value(raw: &str, name: &str) -> Result<f64, MarketplaceError> {
    raw.parse::<f64>()
        .map_err(|_| invalid(format!("{name} must be a number")))
}

fn resolve_coordinates(
    form: &ListingForm,
    location: &str,
) -> Result<Option<Coordinates>, MarketplaceError> {
    match (form.text(&["latitude"]), form.text(&["longitude"])) {
        (Some(lat), Some(lng)) => {
            let latitude = coordinate_value(lat, "latitude")?;
            let longitude = coordinate_value(lng, "longitude")?;
            Coordinates::new(latitude, longitude)
                .map(Some)
                .ok_or_else(|| invalid("latitude/longitude are out of range"))
        }
        (None, None) => Ok(Coordinates::from_map_url(location)),
        _ => Err(invalid("latitude and longitude must be provided together")),
    }
}

fn cuisines(form: &ListingForm) -> Vec<String> {
    ["cuisineType", "cuisineType[]"]
        .iter()
        .flat_map(|name| form.values(name))
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn meal_flag(form: &ListingForm, meal: &str) -> bool {
    let nested = format!("mealTypes[{meal}]");
    let dotted = format!("mealTypes.{meal}");
    form.text(&[meal, nested.as_str(), dotted.as_str()])
        .map(truthy)
        .unwrap_or(false)
}

fn meal_types(form: &ListingForm) -> Result<MealTypes, MarketplaceError> {
    if let Some(raw) = form.text(&["mealTypes"]) {
        return serde_json::from_str::<MealTypes>(raw)
            .map_err(|_| invalid("mealTypes must be a JSON object of breakfast/lunch/dinner flags"));
    }
    Ok(MealTypes {
        breakfast: meal_flag(form, "breakfast"),
        lunch: meal_flag(form, "lunch"),
        dinner: meal_flag(form, "dinner"),
    })
}

impl ListingDraft {
    /// Validate the common and category-specific fields of a submission.
    pub fn from_form(category: Category, form: &ListingForm) -> Result<Self, MarketplaceError> {
        let title = required(form, "title")?.to_string();
        let description = required(form, "description")?.to_string();
        let location = required(form, "location")?.to_string();
        let coordinates = resolve_coordinates(form, &location)?;

        let details = match category {
            Category::Accommodation => ListingDetails::Accommodation(AccommodationDetails {
                price: positive_amount(required(form, "price")?, "price")?,
                room_type: parse_enum::<RoomType>(required(form, "roomType")?)?,
                available_rooms: count(required(form, "availableRooms")?, "availableRooms")?,
            }),
            Category::Restaurant => {
                let cuisine_type = cuisines(form);
                if cuisine_type.is_empty() {
                    return Err(invalid("cuisineType is required"));
                }
                ListingDetails::Restaurant(RestaurantDetails {
                    cuisine_type,
                    price_range: parse_enum::<PriceRange>(required(form, "priceRange")?)?,
                    opening_hours: required(form, "openingHours")?.to_string(),
                })
            }
            Category::Shop => ListingDetails::Shop(ShopDetails {
                shop_type: parse_enum::<ShopType>(required(form, "shopType")?)?,
                opening_hours: required(form, "openingHours")?.to_string(),
            }),
            Category::Mess => ListingDetails::Mess(MessDetails {
                monthly_price: positive_amount(required(form, "monthlyPrice")?, "monthlyPrice")?,
                meal_types: meal_types(form)?,
                available_seats: count(required(form, "availableSeats")?, "availableSeats")?,
            }),
        };

        Ok(Self {
            title,
            description,
            location,
            coordinates,
            details,
        })
    }

    /// Accommodations must show at least one photo.
    pub fn minimum_images(&self) -> usize {
        match self.details {
            ListingDetails::Accommodation(_) => 1,
            _ => 0,
        }
    }
}

/// Partial update accepted by `PUT /api/listings/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListingPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub price: Option<f64>,
    pub room_type: Option<String>,
    pub available_rooms: Option<u32>,
    pub cuisine_type: Option<Vec<String>>,
    pub price_range: Option<String>,
    pub opening_hours: Option<String>,
    pub shop_type: Option<String>,
    pub monthly_price: Option<f64>,
    pub meal_types: Option<MealTypes>,
    pub available_seats: Option<u32>,
}

fn non_blank(value: &str, name: &str) -> Result<String, MarketplaceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(invalid(format!("{name} cannot be empty")))
    } else {
        Ok(trimmed.to_string())
    }
}

fn not_applicable(field: &str, category: Category) -> MarketplaceError {
    invalid(format!(
        "{field} does not apply to {} listings",
        category.label()
    ))
}

impl ListingPatch {
    /// Apply onto a copy of `listing`; nothing is written when validation fails.
    pub fn apply(self, listing: &Listing) -> Result<Listing, MarketplaceError> {
        let category = listing.category();
        self.reject_foreign_fields(category)?;
        let mut updated = listing.clone();

        if let Some(title) = &self.title {
            updated.title = non_blank(title, "title")?;
        }
        if let Some(description) = &self.description {
            updated.description = non_blank(description, "description")?;
        }
        if let Some(location) = &self.location {
            updated.location = non_blank(location, "location")?;
            if self.latitude.is_none() && self.longitude.is_none() {
                updated.coordinates = Coordinates::from_map_url(&updated.location);
            }
        }
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => {
                updated.coordinates = Some(
                    Coordinates::new(latitude, longitude)
                        .ok_or_else(|| invalid("latitude/longitude are out of range"))?,
                );
            }
            (None, None) => {}
            _ => return Err(invalid("latitude and longitude must be provided together")),
        }

        match &mut updated.details {
            ListingDetails::Accommodation(details) => {
                if let Some(price) = self.price {
                    details.price = checked_amount(price, "price")?;
                }
                if let Some(room_type) = &self.room_type {
                    details.room_type = parse_enum(room_type)?;
                }
                if let Some(rooms) = self.available_rooms {
                    details.available_rooms = rooms;
                }
            }
            ListingDetails::Restaurant(details) => {
                if let Some(cuisine_type) = &self.cuisine_type {
                    let cleaned: Vec<String> = cuisine_type
                        .iter()
                        .map(|value| value.trim().to_string())
                        .filter(|value| !value.is_empty())
                        .collect();
                    if cleaned.is_empty() {
                        return Err(invalid("cuisineType cannot be empty"));
                    }
                    details.cuisine_type = cleaned;
                }
                if let Some(price_range) = &self.price_range {
                    details.price_range = parse_enum(price_range)?;
                }
                if let Some(hours) = &self.opening_hours {
                    details.opening_hours = non_blank(hours, "openingHours")?;
                }
            }
            ListingDetails::Shop(details) => {
                if let Some(shop_type) = &self.shop_type {
                    details.shop_type = parse_enum(shop_type)?;
                }
                if let Some(hours) = &self.opening_hours {
                    details.opening_hours = non_blank(hours, "openingHours")?;
                }
            }
            ListingDetails::Mess(details) => {
                if let Some(price) = self.monthly_price {
                    details.monthly_price = checked_amount(price, "monthlyPrice")?;
                }
                if let Some(meals) = self.meal_types {
                    details.meal_types = meals;
                }
                if let Some(seats) = self.available_seats {
                    details.available_seats = seats;
                }
            }
        }

        Ok(updated)
    }

    fn reject_foreign_fields(&self, category: Category) -> Result<(), MarketplaceError> {
        let present: [(&str, bool, &[Category]); 10] = [
            ("price", self.price.is_some(), &[Category::Accommodation]),
            ("roomType", self.room_type.is_some(), &[Category::Accommodation]),
            (
                "availableRooms",
                self.available_rooms.is_some(),
                &[Category::Accommodation],
            ),
            ("cuisineType", self.cuisine_type.is_some(), &[Category::Restaurant]),
            ("priceRange", self.price_range.is_some(), &[Category::Restaurant]),
            (
                "openingHours",
                self.opening_hours.is_some(),
                &[Category::Restaurant, Category::Shop],
            ),
            ("shopType", self.shop_type.is_some(), &[Category::Shop]),
            ("monthlyPrice", self.monthly_price.is_some(), &[Category::Mess]),
            ("mealTypes", self.meal_types.is_some(), &[Category::Mess]),
            ("availableSeats", self.available_seats.is_some(), &[Category::Mess]),
        ];
        match present
            .iter()
            .find(|(_, set, allowed)| *set && !allowed.contains(&category))
        {
            Some((field, _, _)) => Err(not_applicable(field, category)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accommodation_form() -> ListingForm {
        ListingForm::default()
            .with_field("title", "Sunrise PG")
            .with_field("description", "Two minutes from the main gate")
            .with_field("location", "https://www.google.com/maps/@18.5204,73.8567,15z")
            .with_field("price", "6500")
            .with_field("roomType", "double")
            .with_field("availableRooms", "3")
    }

    #[test]
    fn accommodation_fields_are_typed() {
        let draft = ListingDraft::from_form(Category::Accommodation, &accommodation_form())
            .expect("valid draft");
        assert_eq!(
            draft.details,
            ListingDetails::Accommodation(AccommodationDetails {
                price: 6500.0,
                room_type: RoomType::Double,
                available_rooms: 3,
            })
        );
        let coords = draft.coordinates.expect("coordinates from map link");
        assert_eq!(coords.latitude, 18.5204);
        assert_eq!(draft.minimum_images(), 1);
    }

    #[test]
    fn rejects_unknown_room_type_and_non_positive_price() {
        let mut form = accommodation_form();
        form.fields
            .insert("roomType".to_string(), vec!["quad".to_string()]);
        match ListingDraft::from_form(Category::Accommodation, &form) {
            Err(MarketplaceError::Validation(message)) => assert!(message.contains("roomType")),
            other => panic!("expected validation error, got {other:?}"),
        }

        let mut form = accommodation_form();
        form.fields.insert("price".to_string(), vec!["0".to_string()]);
        assert!(matches!(
            ListingDraft::from_form(Category::Accommodation, &form),
            Err(MarketplaceError::Validation(_))
        ));
    }

    #[test]
    fn fractional_prices_are_kept_and_must_stay_positive() {
        let mut form = accommodation_form();
        form.fields.insert("price".to_string(), vec!["0.4".to_string()]);
        let draft = ListingDraft::from_form(Category::Accommodation, &form).expect("valid draft");
        match &draft.details {
            ListingDetails::Accommodation(details) => assert_eq!(details.price, 0.4),
            other => panic!("unexpected details {other:?}"),
        }

        let mut form = accommodation_form();
        form.fields
            .insert("price".to_string(), vec!["6499.99".to_string()]);
        let draft = ListingDraft::from_form(Category::Accommodation, &form).expect("valid draft");
        match &draft.details {
            ListingDetails::Accommodation(details) => assert_eq!(details.price, 6499.99),
            other => panic!("unexpected details {other:?}"),
        }

        for raw in ["-0.4", "0.0", "NaN", "inf"] {
            let mut form = accommodation_form();
            form.fields.insert("price".to_string(), vec![raw.to_string()]);
            assert!(
                matches!(
                    ListingDraft::from_form(Category::Accommodation, &form),
                    Err(MarketplaceError::Validation(_))
                ),
                "{raw} should be refused"
            );
        }
    }

    #[test]
    fn missing_title_is_reported() {
        let mut form = accommodation_form();
        form.fields.remove("title");
        match ListingDraft::from_form(Category::Accommodation, &form) {
            Err(MarketplaceError::Validation(message)) => assert_eq!(message, "title is required"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn restaurant_cuisines_accept_lists_and_repeats() {
        let form = ListingForm::default()
            .with_field("title", "Spice Route")
            .with_field("description", "North Indian thalis")
            .with_field("location", "Main Street")
            .with_field("cuisineType", "North Indian, Chinese")
            .with_field("cuisineType", "Continental")
            .with_field("priceRange", "budget")
            .with_field("openingHours", "10:00-23:00");
        let draft = ListingDraft::from_form(Category::Restaurant, &form).expect("valid draft");
        match &draft.details {
            ListingDetails::Restaurant(details) => {
                assert_eq!(
                    details.cuisine_type,
                    vec!["North Indian", "Chinese", "Continental"]
                );
                assert_eq!(details.price_range, PriceRange::Budget);
            }
            other => panic!("unexpected details {other:?}"),
        }
        assert_eq!(draft.minimum_images(), 0);
    }

    #[test]
    fn mess_meal_flags_accept_several_spellings() {
        let form = ListingForm::default()
            .with_field("title", "Annapurna Mess")
            .with_field("description", "Home style meals")
            .with_field("location", "Hostel Lane")
            .with_field("monthlyPrice", "3200")
            .with_field("availableSeats", "0")
            .with_field("breakfast", "true")
            .with_field("mealTypes[dinner]", "on");
        let draft = ListingDraft::from_form(Category::Mess, &form).expect("valid draft");
        assert_eq!(
            draft.details,
            ListingDetails::Mess(MessDetails {
                monthly_price: 3200.0,
                meal_types: MealTypes {
                    breakfast: true,
                    lunch: false,
                    dinner: true,
                },
                available_seats: 0,
            })
        );
    }

    #[test]
    fn explicit_coordinates_must_come_in_pairs() {
        let form = accommodation_form().with_field("latitude", "18.5");
        assert!(matches!(
            ListingDraft::from_form(Category::Accommodation, &form),
            Err(MarketplaceError::Validation(_))
        ));
    }
}
