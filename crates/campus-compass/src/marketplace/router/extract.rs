use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, FromRequestParts, Multipart};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;

use crate::marketplace::accounts::Principal;
use crate::marketplace::error::{ApiError, MarketplaceError};
use crate::marketplace::listings::ListingForm;
use crate::marketplace::media::ImageUpload;
use crate::marketplace::reviews::{ReviewForm, ReviewUpdate};
use crate::marketplace::Marketplace;

/// Principal resolved from the `Authorization: Bearer …` header.
pub(crate) struct Authenticated(pub(crate) Principal);

#[axum::async_trait]
impl FromRequestParts<Arc<Marketplace>> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        marketplace: &Arc<Marketplace>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        marketplace
            .gate
            .authenticate_header(header)
            .map(Authenticated)
            .map_err(|err| marketplace.reject(err))
    }
}

/// Caller address used for OTP rate limiting.
pub(crate) struct ClientIp(pub(crate) String);

/// The socket peer, unless it is a trusted proxy. Behind trusted proxies the
/// `X-Forwarded-For` chain is walked from the right and the first untrusted hop wins.
pub(crate) fn resolve_client_ip(
    peer: Option<IpAddr>,
    forwarded: Option<&str>,
    trusted: &[IpAddr],
) -> Option<IpAddr> {
    let peer = peer?;
    if !trusted.contains(&peer) {
        return Some(peer);
    }
    let Some(chain) = forwarded else {
        return Some(peer);
    };
    let mut closest = peer;
    for hop in chain.rsplit(',').map(str::trim) {
        match hop.parse::<IpAddr>() {
            Ok(ip) if trusted.contains(&ip) => closest = ip,
            Ok(ip) => return Some(ip),
            Err(_) => break,
        }
    }
    Some(closest)
}

#[axum::async_trait]
impl FromRequestParts<Arc<Marketplace>> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        marketplace: &Arc<Marketplace>,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok());

        let ip = resolve_client_ip(peer, forwarded, marketplace.trusted_proxies())
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(ClientIp(ip))
    }
}

pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, MarketplaceError> {
    raw.parse::<T>()
        .map_err(|_| MarketplaceError::validation(format!("Invalid {what} id")))
}

pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, MarketplaceError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| MarketplaceError::Validation(rejection.body_text()))
}

/// Text parts and image files of a multipart request.
#[derive(Debug, Default)]
pub(crate) struct MultipartForm {
    fields: BTreeMap<String, Vec<String>>,
    images: Vec<ImageUpload>,
}

fn malformed(err: axum::extract::multipart::MultipartError) -> MarketplaceError {
    MarketplaceError::validation(format!("Malformed multipart body: {}", err.body_text()))
}

impl MultipartForm {
    /// Parts carrying a file name are images; every other part is a text field.
    pub(crate) async fn read(mut multipart: Multipart) -> Result<Self, MarketplaceError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = field.name().unwrap_or_default().to_string();
            if let Some(file_name) = field.file_name().map(str::to_string) {
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        mime_guess::from_path(&file_name)
                            .first_or_octet_stream()
                            .to_string()
                    });
                let bytes = field.bytes().await.map_err(malformed)?;
                form.images.push(ImageUpload {
                    file_name: Some(file_name),
                    content_type,
                    bytes: bytes.to_vec(),
                });
            } else {
                let value = field.text().await.map_err(malformed)?;
                form.fields.entry(name).or_default().push(value);
            }
        }
        Ok(form)
    }

    fn first(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .cloned()
    }

    pub(crate) fn into_listing_form(self) -> ListingForm {
        ListingForm {
            fields: self.fields,
            images: self.images,
        }
    }

    pub(crate) fn into_review_form(self) -> ReviewForm {
        ReviewForm {
            listing_id: self.first("listingId").or_else(|| self.first("listing")),
            rating: self.first("rating"),
            comment: self.first("comment"),
            images: self.images,
        }
    }

    pub(crate) fn into_review_update(self) -> ReviewUpdate {
        ReviewUpdate {
            rating: self.first("rating"),
            comment: self.first("comment"),
            images: self.images,
        }
    }
}
