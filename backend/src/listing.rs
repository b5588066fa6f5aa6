use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use diesel::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth;
use crate::config::AppConfig;
use crate::db;
use crate::geo;
use crate::models::{Listing, RealEstateDetails};
use crate::schema::{listings, real_estate_details};

pub const LISTING_TTL_DAYS: i64 = 30;
const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Random,
    Newest,
    Oldest,
    PriceLow,
    PriceHigh,
}

impl SortMode {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("random") => SortMode::Random,
            Some("oldest") => SortMode::Oldest,
            Some("price_low") => SortMode::PriceLow,
            Some("price_high") => SortMode::PriceHigh,
            _ => SortMode::Newest,
        }
    }
}

/// In-memory comparators for the scan path. Ties are broken by id so that
/// offset pagination never drops or repeats a row.
pub fn apply_sort(items: &mut [Listing], sort: SortMode) {
    match sort {
        SortMode::Newest => {
            items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)))
        }
        SortMode::Oldest => {
            items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
        }
        SortMode::PriceLow => {
            items.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.id.cmp(&b.id)))
        }
        SortMode::PriceHigh => {
            items.sort_by(|a, b| b.price.cmp(&a.price).then_with(|| a.id.cmp(&b.id)))
        }
        SortMode::Random => {}
    }
}

pub fn page_slice<T>(items: Vec<T>, offset: usize, limit: usize) -> (Vec<T>, bool) {
    let total = items.len();
    let page: Vec<T> = items.into_iter().skip(offset).take(limit).collect();
    let has_more = offset + page.len() < total;
    (page, has_more)
}

/// Radius search takes both parameters; a non-positive distance is a caller
/// error rather than a filter to silently skip.
pub fn radius_param(
    zipcode: Option<&str>,
    distance: Option<f64>,
) -> Result<Option<(String, f64)>, &'static str> {
    match (zipcode, distance) {
        (_, Some(distance)) if distance <= 0.0 => Err("Distance must be positive"),
        (Some(zip), Some(distance)) => Ok(Some((zip.to_string(), distance))),
        _ => Ok(None),
    }
}

/// Target row state for an owner status change. Renewing pushes the expiry
/// window out from `now`; archiving leaves it alone. Reapplying the same
/// change yields the same state.
pub fn status_transition(
    listing: &Listing,
    status: &str,
    push_expiry: bool,
    now: chrono::NaiveDateTime,
) -> (String, chrono::NaiveDateTime) {
    let expires_at = if push_expiry {
        now + Duration::days(LISTING_TTL_DAYS)
    } else {
        listing.expires_at
    };
    (status.to_string(), expires_at)
}

/// Algorithm R: draws n items uniformly without holding more than n in the
/// reservoir.
pub fn reservoir_sample<T, R: Rng>(items: Vec<T>, n: usize, rng: &mut R) -> Vec<T> {
    let mut reservoir: Vec<T> = Vec::with_capacity(n.min(items.len()));
    for (i, item) in items.into_iter().enumerate() {
        if i < n {
            reservoir.push(item);
        } else {
            let j = rng.gen_range(0..=i);
            if j < n {
                reservoir[j] = item;
            }
        }
    }
    reservoir
}

#[derive(Deserialize)]
pub struct ListingQuery {
    pub category: Option<i32>,
    pub subcategory: Option<i32>,
    pub search: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
    pub sort: Option<String>,
    #[serde(rename = "type")]
    pub listing_type: Option<String>,
    pub location: Option<String>,
    pub zipcode: Option<String>,
    pub distance: Option<f64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Serialize)]
pub struct ListingsPage {
    pub listings: Vec<Listing>,
    pub total: i64,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

// Applied to both the page query and the count query, which differ in their
// select clause and therefore in type.
macro_rules! apply_listing_filters {
    ($query:expr, $params:expr, $status:expr) => {{
        let mut query = $query.filter(listings::status.eq($status.to_string()));
        if let Some(category) = $params.category {
            query = query.filter(listings::category_id.eq(category));
        }
        if let Some(subcategory) = $params.subcategory {
            query = query.filter(listings::subcategory_id.eq(subcategory));
        }
        if let Some(user_id) = $params.user_id {
            query = query.filter(listings::user_id.eq(user_id));
        }
        if let Some(ref search) = $params.search {
            let pattern = format!("%{}%", search);
            query = query.filter(
                listings::title
                    .ilike(pattern.clone())
                    .or(listings::description.ilike(pattern)),
            );
        }
        if let Some(ref listing_type) = $params.listing_type {
            query = query.filter(listings::listing_type.eq(listing_type.clone()));
        }
        if let Some(ref location) = $params.location {
            query = query.filter(listings::location.ilike(format!("%{}%", location)));
        }
        query
    }};
}

/// Listing search. Plain filters are paginated by the database; a
/// zipcode-radius search (and `random` sort, which reservoir-samples the
/// page) loads the filtered rows and works in memory.
pub async fn get_listings(
    config: web::Data<AppConfig>,
    query: web::Query<ListingQuery>,
) -> HttpResponse {
    let params = query.into_inner();
    let status = params.status.clone().unwrap_or_else(|| "active".to_string());
    let sort = SortMode::parse(params.sort.as_deref());
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE) as usize;
    let offset = params.offset.unwrap_or(0).max(0) as usize;

    let radius = match radius_param(params.zipcode.as_deref(), params.distance) {
        Ok(radius) => radius,
        Err(message) => {
            return HttpResponse::BadRequest().json(json!({"error": message}));
        }
    };

    // Geocode the query zip once, before touching the database
    let origin = match &radius {
        Some((zip, _)) => match geo::geocode_zip(&config.geocoding_api_url, zip).await {
            Ok(coordinates) => Some(coordinates),
            Err(geo::GeocodeError::NotFound(zip)) => {
                return HttpResponse::BadRequest()
                    .json(json!({"error": format!("Unknown zip code {}", zip)}));
            }
            Err(e) => {
                error!("Geocoding failed: {}", e);
                return HttpResponse::BadGateway()
                    .json(json!({"error": "Geocoding service unavailable"}));
            }
        },
        None => None,
    };

    let mut conn = match db::establish_connection() {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Database connection failed"}));
        }
    };

    if origin.is_some() || sort == SortMode::Random {
        // Scan path
        let rows = match apply_listing_filters!(listings::table.into_boxed(), params, status)
            .load::<Listing>(&mut conn)
        {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to fetch listings: {}", e);
                return HttpResponse::InternalServerError()
                    .json(json!({"error": "Failed to fetch listings"}));
            }
        };

        let mut matches: Vec<Listing> = match (origin, &radius) {
            (Some(origin), Some((_, distance))) => rows
                .into_iter()
                .filter(|l| geo::within_radius(l.latitude, l.longitude, origin, *distance))
                .collect(),
            _ => rows,
        };

        let total = matches.len() as i64;
        let (page, has_more) = if sort == SortMode::Random {
            let page = reservoir_sample(matches, limit, &mut rand::thread_rng());
            (page, false)
        } else {
            apply_sort(&mut matches, sort);
            page_slice(matches, offset, limit)
        };

        return HttpResponse::Ok().json(ListingsPage {
            listings: page,
            total,
            has_more,
        });
    }

    // Database-paginated path
    let total: i64 =
        match apply_listing_filters!(listings::table.count().into_boxed(), params, status)
            .get_result(&mut conn)
        {
            Ok(total) => total,
            Err(e) => {
                error!("Failed to count listings: {}", e);
                return HttpResponse::InternalServerError()
                    .json(json!({"error": "Failed to fetch listings"}));
            }
        };

    let mut page_query = apply_listing_filters!(listings::table.into_boxed(), params, status);
    page_query = match sort {
        SortMode::Oldest => page_query.order((listings::created_at.asc(), listings::id.asc())),
        SortMode::PriceLow => page_query.order((listings::price.asc(), listings::id.asc())),
        SortMode::PriceHigh => page_query.order((listings::price.desc(), listings::id.asc())),
        // Random is handled by the scan path above
        _ => page_query.order((listings::created_at.desc(), listings::id.asc())),
    };

    let page = match page_query
        .limit(limit as i64)
        .offset(offset as i64)
        .load::<Listing>(&mut conn)
    {
        Ok(page) => page,
        Err(e) => {
            error!("Failed to fetch listings: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to fetch listings"}));
        }
    };

    let has_more = (offset + page.len()) < total as usize;
    HttpResponse::Ok().json(ListingsPage {
        listings: page,
        total,
        has_more,
    })
}

/// Fetches one listing and bumps its view counter (best effort).
pub async fn get_listing(path: web::Path<Uuid>) -> HttpResponse {
    let listing_id = path.into_inner();

    let mut conn = match db::establish_connection() {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Database connection failed"}));
        }
    };

    let listing = match listings::table.find(listing_id).first::<Listing>(&mut conn) {
        Ok(listing) => listing,
        Err(diesel::result::Error::NotFound) => {
            return HttpResponse::NotFound().json(json!({"error": "Listing not found"}));
        }
        Err(e) => {
            error!("Failed to fetch listing {}: {}", listing_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to fetch listing"}));
        }
    };

    if let Err(e) = diesel::update(listings::table.find(listing_id))
        .set(listings::views.eq(listings::views + 1))
        .execute(&mut conn)
    {
        warn!("Failed to bump view counter for {}: {}", listing_id, e);
    }

    let real_estate = match real_estate_details::table
        .find(listing_id)
        .first::<RealEstateDetails>(&mut conn)
        .optional()
    {
        Ok(details) => details,
        Err(e) => {
            error!("Failed to fetch listing details {}: {}", listing_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to fetch listing"}));
        }
    };

    HttpResponse::Ok().json(json!({"listing": listing, "real_estate": real_estate}))
}

#[derive(Deserialize)]
pub struct RealEstatePayload {
    pub property_type: String,
    pub bedrooms: i16,
    pub bathrooms: i16,
    pub square_feet: i64,
}

#[derive(Deserialize)]
pub struct CreateListingRequest {
    pub category_id: i32,
    pub subcategory_id: Option<i32>,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub listing_type: String,
    pub location: Option<String>,
    pub zip_code: Option<String>,
    pub images: Option<Vec<String>>,
    pub real_estate: Option<RealEstatePayload>,
}

/// Resolves the listing zip to coordinates in the background. Failures are
/// logged and swallowed; the listing simply stays out of radius searches.
fn spawn_geocode(config: AppConfig, listing_id: Uuid, zip: String) {
    tokio::spawn(async move {
        let coordinates = match geo::geocode_zip(&config.geocoding_api_url, &zip).await {
            Ok(coordinates) => coordinates,
            Err(e) => {
                warn!("Geocoding failed for listing {}: {}", listing_id, e);
                return;
            }
        };
        let mut conn = match db::establish_connection() {
            Ok(conn) => conn,
            Err(_) => return,
        };
        if let Err(e) = diesel::update(listings::table.find(listing_id))
            .set((
                listings::latitude.eq(coordinates.latitude),
                listings::longitude.eq(coordinates.longitude),
            ))
            .execute(&mut conn)
        {
            warn!("Failed to store coordinates for listing {}: {}", listing_id, e);
        }
    });
}

pub async fn create_listing(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    data: web::Json<CreateListingRequest>,
) -> HttpResponse {
    let mut conn = match db::establish_connection() {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Database connection failed"}));
        }
    };

    let user = match auth::authed_user(&req, &mut conn) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    if data.title.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({"error": "Title is required"}));
    }
    if data.price <= 0 {
        return HttpResponse::BadRequest().json(json!({"error": "Price must be positive"}));
    }

    let now = Utc::now().naive_utc();
    let listing = Listing {
        id: Uuid::new_v4(),
        user_id: user.id,
        category_id: data.category_id,
        subcategory_id: data.subcategory_id,
        title: data.title.trim().to_string(),
        description: data.description.clone(),
        price: data.price,
        listing_type: data.listing_type.clone(),
        location: data.location.clone(),
        zip_code: data.zip_code.clone(),
        latitude: None,
        longitude: None,
        images: data.images.clone().unwrap_or_default(),
        status: "active".to_string(),
        views: 0,
        expires_at: now + Duration::days(LISTING_TTL_DAYS),
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = diesel::insert_into(listings::table)
        .values(&listing)
        .execute(&mut conn)
    {
        error!("Failed to create listing: {}", e);
        return HttpResponse::InternalServerError()
            .json(json!({"error": "Failed to create listing"}));
    }

    if let Some(ref details) = data.real_estate {
        let row = RealEstateDetails {
            listing_id: listing.id,
            property_type: details.property_type.clone(),
            bedrooms: details.bedrooms,
            bathrooms: details.bathrooms,
            square_feet: details.square_feet,
        };
        if let Err(e) = diesel::insert_into(real_estate_details::table)
            .values(&row)
            .execute(&mut conn)
        {
            error!("Failed to store real estate details: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to create listing"}));
        }
    }

    if let Some(zip) = listing.zip_code.clone() {
        spawn_geocode(config.get_ref().clone(), listing.id, zip);
    }

    info!("User {} created listing {}", user.id, listing.id);
    HttpResponse::Created().json(listing)
}

#[derive(Deserialize)]
pub struct UpdateListingRequest {
    pub category_id: Option<i32>,
    pub subcategory_id: Option<i32>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub listing_type: Option<String>,
    pub location: Option<String>,
    pub zip_code: Option<String>,
    pub images: Option<Vec<String>>,
    pub real_estate: Option<RealEstatePayload>,
}

#[derive(AsChangeset)]
#[diesel(table_name = listings)]
struct ListingChanges {
    category_id: Option<i32>,
    subcategory_id: Option<i32>,
    title: Option<String>,
    description: Option<String>,
    price: Option<i64>,
    listing_type: Option<String>,
    location: Option<String>,
    zip_code: Option<String>,
    images: Option<Vec<String>>,
}

/// Loads the listing and rejects callers other than the owner.
fn owned_listing(
    conn: &mut PgConnection,
    listing_id: Uuid,
    user_id: Uuid,
) -> Result<Listing, HttpResponse> {
    let listing = match listings::table.find(listing_id).first::<Listing>(conn) {
        Ok(listing) => listing,
        Err(diesel::result::Error::NotFound) => {
            return Err(HttpResponse::NotFound().json(json!({"error": "Listing not found"})));
        }
        Err(e) => {
            error!("Failed to fetch listing {}: {}", listing_id, e);
            return Err(HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to fetch listing"})));
        }
    };
    if listing.user_id != user_id {
        return Err(
            HttpResponse::Forbidden().json(json!({"error": "You do not own this listing"}))
        );
    }
    Ok(listing)
}

pub async fn update_listing(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    path: web::Path<Uuid>,
    data: web::Json<UpdateListingRequest>,
) -> HttpResponse {
    let listing_id = path.into_inner();

    let mut conn = match db::establish_connection() {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Database connection failed"}));
        }
    };

    let user = match auth::authed_user(&req, &mut conn) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    if let Err(resp) = owned_listing(&mut conn, listing_id, user.id) {
        return resp;
    }

    if let Some(price) = data.price {
        if price <= 0 {
            return HttpResponse::BadRequest().json(json!({"error": "Price must be positive"}));
        }
    }

    let changes = ListingChanges {
        category_id: data.category_id,
        subcategory_id: data.subcategory_id,
        title: data.title.clone(),
        description: data.description.clone(),
        price: data.price,
        listing_type: data.listing_type.clone(),
        location: data.location.clone(),
        zip_code: data.zip_code.clone(),
        images: data.images.clone(),
    };

    let now = Utc::now().naive_utc();
    if let Err(e) = diesel::update(listings::table.find(listing_id))
        .set((&changes, listings::updated_at.eq(now)))
        .execute(&mut conn)
    {
        error!("Failed to update listing {}: {}", listing_id, e);
        return HttpResponse::InternalServerError()
            .json(json!({"error": "Failed to update listing"}));
    }

    if let Some(ref details) = data.real_estate {
        let row = RealEstateDetails {
            listing_id,
            property_type: details.property_type.clone(),
            bedrooms: details.bedrooms,
            bathrooms: details.bathrooms,
            square_feet: details.square_feet,
        };
        if let Err(e) = diesel::insert_into(real_estate_details::table)
            .values(&row)
            .on_conflict(real_estate_details::listing_id)
            .do_update()
            .set((
                real_estate_details::property_type.eq(&row.property_type),
                real_estate_details::bedrooms.eq(row.bedrooms),
                real_estate_details::bathrooms.eq(row.bathrooms),
                real_estate_details::square_feet.eq(row.square_feet),
            ))
            .execute(&mut conn)
        {
            error!("Failed to update real estate details: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to update listing"}));
        }
    }

    if let Some(zip) = data.zip_code.clone() {
        spawn_geocode(config.get_ref().clone(), listing_id, zip);
    }

    HttpResponse::Ok().json(json!({"status": "Listing updated"}))
}

/// Re-ups a listing: back to active with a fresh expiry. Idempotent on an
/// already-active listing.
pub async fn renew_listing(req: HttpRequest, path: web::Path<Uuid>) -> HttpResponse {
    set_owned_listing_status(req, path.into_inner(), "active", true).await
}

/// Idempotent: archiving an archived listing leaves it archived.
pub async fn archive_listing(req: HttpRequest, path: web::Path<Uuid>) -> HttpResponse {
    set_owned_listing_status(req, path.into_inner(), "archived", false).await
}

async fn set_owned_listing_status(
    req: HttpRequest,
    listing_id: Uuid,
    status: &str,
    push_expiry: bool,
) -> HttpResponse {
    let mut conn = match db::establish_connection() {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Database connection failed"}));
        }
    };

    let user = match auth::authed_user(&req, &mut conn) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let listing = match owned_listing(&mut conn, listing_id, user.id) {
        Ok(listing) => listing,
        Err(resp) => return resp,
    };

    let now = Utc::now().naive_utc();
    let (new_status, expires_at) = status_transition(&listing, status, push_expiry, now);
    match diesel::update(listings::table.find(listing_id))
        .set((
            listings::status.eq(new_status),
            listings::expires_at.eq(expires_at),
            listings::updated_at.eq(now),
        ))
        .execute(&mut conn)
    {
        Ok(_) => HttpResponse::Ok().json(json!({"status": status})),
        Err(e) => {
            error!("Failed to update listing {}: {}", listing_id, e);
            HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to update listing"}))
        }
    }
}

pub async fn delete_listing(req: HttpRequest, path: web::Path<Uuid>) -> HttpResponse {
    let listing_id = path.into_inner();

    let mut conn = match db::establish_connection() {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Database connection failed"}));
        }
    };

    let user = match auth::authed_user(&req, &mut conn) {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    if let Err(resp) = owned_listing(&mut conn, listing_id, user.id) {
        return resp;
    }

    match diesel::delete(listings::table.find(listing_id)).execute(&mut conn) {
        Ok(_) => {
            info!("User {} deleted listing {}", user.id, listing_id);
            HttpResponse::Ok().json(json!({"status": "Listing deleted"}))
        }
        Err(e) => {
            error!("Failed to delete listing {}: {}", listing_id, e);
            HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to delete listing"}))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn listing(n: u32, price: i64) -> Listing {
        let created = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::minutes(n as i64);
        Listing {
            id: Uuid::from_u128(n as u128),
            user_id: Uuid::from_u128(1),
            category_id: 1,
            subcategory_id: None,
            title: format!("listing {}", n),
            description: String::new(),
            price,
            listing_type: "sale".to_string(),
            location: None,
            zip_code: None,
            latitude: None,
            longitude: None,
            images: vec![],
            status: "active".to_string(),
            views: 0,
            expires_at: created + Duration::days(LISTING_TTL_DAYS),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn sort_mode_parses_known_values_and_defaults_to_newest() {
        assert_eq!(SortMode::parse(Some("random")), SortMode::Random);
        assert_eq!(SortMode::parse(Some("oldest")), SortMode::Oldest);
        assert_eq!(SortMode::parse(Some("price_low")), SortMode::PriceLow);
        assert_eq!(SortMode::parse(Some("price_high")), SortMode::PriceHigh);
        assert_eq!(SortMode::parse(Some("newest")), SortMode::Newest);
        assert_eq!(SortMode::parse(Some("bogus")), SortMode::Newest);
        assert_eq!(SortMode::parse(None), SortMode::Newest);
    }

    #[test]
    fn newest_sorts_descending_by_creation() {
        let mut items = vec![listing(1, 50), listing(3, 10), listing(2, 30)];
        apply_sort(&mut items, SortMode::Newest);
        let order: Vec<u32> = items.iter().map(|l| l.id.as_u128() as u32).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn price_sorts_break_ties_deterministically() {
        let mut items = vec![listing(2, 10), listing(1, 10), listing(3, 5)];
        apply_sort(&mut items, SortMode::PriceLow);
        let order: Vec<u32> = items.iter().map(|l| l.id.as_u128() as u32).collect();
        assert_eq!(order, vec![3, 1, 2]);

        let mut items = vec![listing(2, 10), listing(1, 10), listing(3, 5)];
        apply_sort(&mut items, SortMode::PriceHigh);
        let order: Vec<u32> = items.iter().map(|l| l.id.as_u128() as u32).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn paging_is_exhaustive_and_disjoint() {
        let mut items: Vec<Listing> = (0..23).map(|n| listing(n, n as i64)).collect();
        apply_sort(&mut items, SortMode::Oldest);

        let limit = 5;
        let mut seen = HashSet::new();
        let mut offset = 0;
        loop {
            let (page, has_more) = page_slice(items.clone(), offset, limit);
            for l in &page {
                assert!(seen.insert(l.id), "listing repeated across pages");
            }
            offset += page.len();
            if !has_more {
                break;
            }
        }
        assert_eq!(seen.len(), 23);
    }

    #[test]
    fn page_slice_past_the_end_is_empty_without_more() {
        let items: Vec<Listing> = (0..3).map(|n| listing(n, 1)).collect();
        let (page, has_more) = page_slice(items, 10, 5);
        assert!(page.is_empty());
        assert!(!has_more);
    }

    #[test]
    fn non_positive_distance_is_rejected() {
        assert!(radius_param(Some("10001"), Some(0.0)).is_err());
        assert!(radius_param(Some("10001"), Some(-3.0)).is_err());
        assert!(radius_param(None, Some(-3.0)).is_err());
        assert_eq!(
            radius_param(Some("10001"), Some(5.0)).unwrap(),
            Some(("10001".to_string(), 5.0))
        );
        assert_eq!(radius_param(Some("10001"), None).unwrap(), None);
        assert_eq!(radius_param(None, None).unwrap(), None);
    }

    #[test]
    fn renewing_an_active_listing_is_idempotent() {
        let now = NaiveDate::from_ymd_opt(2026, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let mut item = listing(1, 100);
        item.status = "archived".to_string();

        let (status, expires_at) = status_transition(&item, "active", true, now);
        assert_eq!(status, "active");
        assert_eq!(expires_at, now + Duration::days(LISTING_TTL_DAYS));

        item.status = status;
        item.expires_at = expires_at;
        let again = status_transition(&item, "active", true, now);
        assert_eq!(again, (item.status.clone(), item.expires_at));
    }

    #[test]
    fn archiving_an_archived_listing_is_idempotent() {
        let now = NaiveDate::from_ymd_opt(2026, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let mut item = listing(1, 100);
        let original_expiry = item.expires_at;

        let (status, expires_at) = status_transition(&item, "archived", false, now);
        assert_eq!(status, "archived");
        assert_eq!(expires_at, original_expiry);

        item.status = status;
        let again = status_transition(&item, "archived", false, now);
        assert_eq!(again, ("archived".to_string(), original_expiry));
    }

    #[test]
    fn reservoir_sample_returns_min_of_n_and_len() {
        let mut rng = StdRng::seed_from_u64(7);
        let items: Vec<u32> = (0..100).collect();
        assert_eq!(reservoir_sample(items.clone(), 10, &mut rng).len(), 10);
        assert_eq!(reservoir_sample(items.clone(), 100, &mut rng).len(), 100);
        assert_eq!(reservoir_sample(items, 500, &mut rng).len(), 100);
        assert!(reservoir_sample(Vec::<u32>::new(), 10, &mut rng).is_empty());
    }

    #[test]
    fn reservoir_sample_draws_distinct_items_from_the_input() {
        let mut rng = StdRng::seed_from_u64(42);
        let items: Vec<u32> = (0..50).collect();
        let sample = reservoir_sample(items, 20, &mut rng);
        let distinct: HashSet<u32> = sample.iter().copied().collect();
        assert_eq!(distinct.len(), 20);
        assert!(sample.iter().all(|v| *v < 50));
    }

    #[test]
    fn reservoir_sample_is_roughly_uniform() {
        // 1000 draws of 1 item from 10: each item should land well away
        // from never and from always.
        let mut rng = StdRng::seed_from_u64(1);
        let mut counts = [0u32; 10];
        for _ in 0..1000 {
            let items: Vec<usize> = (0..10).collect();
            let sample = reservoir_sample(items, 1, &mut rng);
            counts[sample[0]] += 1;
        }
        for (i, count) in counts.iter().enumerate() {
            assert!(
                (30..300).contains(count),
                "item {} drawn {} times out of 1000",
                i,
                count
            );
        }
    }
}
