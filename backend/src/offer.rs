use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth;
use crate::config::AppConfig;
use crate::db;
use crate::email;
use crate::models::{Listing, NotificationPreferences, Offer, User};
use crate::schema::{listings, notification_preferences, offers, users};

pub const OFFER_WINDOW_HOURS: i64 = 48;

/// Bounds check performed before any row is written.
pub fn validate_offer_amount(amount: i64, listing_price: i64) -> Result<(), &'static str> {
    if amount <= 0 {
        return Err("Offer amount must be positive");
    }
    if amount > listing_price {
        return Err("Offer amount cannot exceed the listing price");
    }
    Ok(())
}

/// Offer emails are a side effect: failures are logged, never fatal.
async fn notify_offer(
    config: &AppConfig,
    conn: &mut PgConnection,
    user_id: Uuid,
    subject: &str,
    body: &str,
) {
    let wants_email = notification_preferences::table
        .find(user_id)
        .first::<NotificationPreferences>(conn)
        .map(|p| p.email_offers)
        .unwrap_or(true);
    if !wants_email {
        return;
    }

    let recipient = match users::table.find(user_id).first::<User>(conn) {
        Ok(user) => user,
        Err(e) => {
            warn!("Failed to load offer recipient {}: {}", user_id, e);
            return;
        }
    };

    if let Err(e) = email::send_email(config, &recipient.email, subject, body).await {
        warn!("Failed to send offer email to {}: {}", recipient.email, e);
    }
}

#[derive(Deserialize)]
pub struct CreateOfferRequest {
    pub listing_id: Uuid,
    pub amount: i64,
}

pub async fn create_offer(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    data: web::Json<CreateOfferRequest>,
) -> HttpResponse {
    let mut conn = match db::establish_connection() {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Database connection failed"}));
        }
    };

    let buyer = match auth::authed_user(&req, &mut conn) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let listing = match listings::table
        .find(data.listing_id)
        .first::<Listing>(&mut conn)
    {
        Ok(listing) => listing,
        Err(diesel::result::Error::NotFound) => {
            return HttpResponse::NotFound().json(json!({"error": "Listing not found"}));
        }
        Err(e) => {
            error!("Failed to fetch listing {}: {}", data.listing_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to create offer"}));
        }
    };

    if listing.status != "active" {
        return HttpResponse::BadRequest().json(json!({"error": "Listing is not active"}));
    }
    if listing.user_id == buyer.id {
        return HttpResponse::BadRequest()
            .json(json!({"error": "Cannot make an offer on your own listing"}));
    }
    if let Err(message) = validate_offer_amount(data.amount, listing.price) {
        return HttpResponse::BadRequest().json(json!({"error": message}));
    }

    // One active, unexpired offer per listing per buyer. Query-time check
    // only; two simultaneous submissions can still race.
    let now = Utc::now().naive_utc();
    let active: i64 = match offers::table
        .filter(offers::listing_id.eq(listing.id))
        .filter(offers::buyer_id.eq(buyer.id))
        .filter(offers::status.eq_any(vec!["pending", "countered"]))
        .filter(offers::expires_at.gt(now))
        .count()
        .get_result(&mut conn)
    {
        Ok(count) => count,
        Err(e) => {
            error!("Failed to check existing offers: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to create offer"}));
        }
    };
    if active > 0 {
        return HttpResponse::Conflict()
            .json(json!({"error": "You already have an active offer on this listing"}));
    }

    let offer = Offer {
        id: Uuid::new_v4(),
        listing_id: listing.id,
        buyer_id: buyer.id,
        seller_id: listing.user_id,
        amount: data.amount,
        counter_amount: None,
        status: "pending".to_string(),
        expires_at: now + Duration::hours(OFFER_WINDOW_HOURS),
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = diesel::insert_into(offers::table)
        .values(&offer)
        .execute(&mut conn)
    {
        error!("Failed to create offer: {}", e);
        return HttpResponse::InternalServerError()
            .json(json!({"error": "Failed to create offer"}));
    }

    info!("Buyer {} offered {} on listing {}", buyer.id, offer.amount, listing.id);
    let body = format!(
        "{} offered ${:.2} on your listing \"{}\". The offer expires in {} hours.",
        buyer.name,
        offer.amount as f64 / 100.0,
        listing.title,
        OFFER_WINDOW_HOURS
    );
    notify_offer(&config, &mut conn, listing.user_id, "New offer received", &body).await;

    HttpResponse::Created().json(offer)
}

pub async fn get_offers(req: HttpRequest) -> HttpResponse {
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

    match offers::table
        .filter(
            offers::buyer_id
                .eq(user.id)
                .or(offers::seller_id.eq(user.id)),
        )
        .order(offers::created_at.desc())
        .load::<Offer>(&mut conn)
    {
        Ok(rows) => HttpResponse::Ok().json(rows),
        Err(e) => {
            error!("Failed to fetch offers: {}", e);
            HttpResponse::InternalServerError().json(json!({"error": "Failed to fetch offers"}))
        }
    }
}

fn load_offer(conn: &mut PgConnection, offer_id: Uuid) -> Result<Offer, HttpResponse> {
    match offers::table.find(offer_id).first::<Offer>(conn) {
        Ok(offer) => Ok(offer),
        Err(diesel::result::Error::NotFound) => {
            Err(HttpResponse::NotFound().json(json!({"error": "Offer not found"})))
        }
        Err(e) => {
            error!("Failed to fetch offer {}: {}", offer_id, e);
            Err(HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to fetch offer"})))
        }
    }
}

/// A pending offer is answered by the seller; a countered offer by the
/// buyer. Anything else is no longer actionable.
fn responder_for(offer: &Offer, user_id: Uuid) -> Result<(), HttpResponse> {
    let expected = match offer.status.as_str() {
        "pending" => offer.seller_id,
        "countered" => offer.buyer_id,
        _ => {
            return Err(
                HttpResponse::Conflict().json(json!({"error": "Offer is no longer active"}))
            )
        }
    };
    if expected != user_id {
        return Err(HttpResponse::Forbidden()
            .json(json!({"error": "You cannot respond to this offer"})));
    }
    if offer.expires_at < Utc::now().naive_utc() {
        return Err(HttpResponse::Conflict().json(json!({"error": "Offer has expired"})));
    }
    Ok(())
}

async fn respond_to_offer(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    offer_id: Uuid,
    accept: bool,
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

    let offer = match load_offer(&mut conn, offer_id) {
        Ok(offer) => offer,
        Err(resp) => return resp,
    };
    if let Err(resp) = responder_for(&offer, user.id) {
        return resp;
    }

    let status = if accept { "accepted" } else { "declined" };
    let now = Utc::now().naive_utc();
    if let Err(e) = diesel::update(offers::table.find(offer_id))
        .set((offers::status.eq(status), offers::updated_at.eq(now)))
        .execute(&mut conn)
    {
        error!("Failed to update offer {}: {}", offer_id, e);
        return HttpResponse::InternalServerError()
            .json(json!({"error": "Failed to update offer"}));
    }

    // Notify the other party
    let other = if user.id == offer.seller_id {
        offer.buyer_id
    } else {
        offer.seller_id
    };
    let subject = if accept {
        "Your offer was accepted"
    } else {
        "Your offer was declined"
    };
    let amount = offer.counter_amount.unwrap_or(offer.amount);
    let body = format!("The offer of ${:.2} was {}.", amount as f64 / 100.0, status);
    notify_offer(&config, &mut conn, other, subject, &body).await;

    info!("Offer {} {}", offer_id, status);
    HttpResponse::Ok().json(json!({"status": format!("Offer {}", status)}))
}

pub async fn accept_offer(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    respond_to_offer(req, config, path.into_inner(), true).await
}

pub async fn decline_offer(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    respond_to_offer(req, config, path.into_inner(), false).await
}

#[derive(Deserialize)]
pub struct CounterOfferRequest {
    pub amount: i64,
}

/// Seller counters a pending offer; the 48-hour window restarts.
pub async fn counter_offer(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    path: web::Path<Uuid>,
    data: web::Json<CounterOfferRequest>,
) -> HttpResponse {
    let offer_id = path.into_inner();

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

    let offer = match load_offer(&mut conn, offer_id) {
        Ok(offer) => offer,
        Err(resp) => return resp,
    };
    if offer.status != "pending" {
        return HttpResponse::Conflict()
            .json(json!({"error": "Only a pending offer can be countered"}));
    }
    if offer.seller_id != user.id {
        return HttpResponse::Forbidden()
            .json(json!({"error": "Only the seller can counter an offer"}));
    }
    if offer.expires_at < Utc::now().naive_utc() {
        return HttpResponse::Conflict().json(json!({"error": "Offer has expired"}));
    }

    let listing = match listings::table
        .find(offer.listing_id)
        .first::<Listing>(&mut conn)
    {
        Ok(listing) => listing,
        Err(e) => {
            error!("Failed to fetch listing {}: {}", offer.listing_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to counter offer"}));
        }
    };
    if let Err(message) = validate_offer_amount(data.amount, listing.price) {
        return HttpResponse::BadRequest().json(json!({"error": message}));
    }

    let now = Utc::now().naive_utc();
    if let Err(e) = diesel::update(offers::table.find(offer_id))
        .set((
            offers::status.eq("countered"),
            offers::counter_amount.eq(data.amount),
            offers::expires_at.eq(now + Duration::hours(OFFER_WINDOW_HOURS)),
            offers::updated_at.eq(now),
        ))
        .execute(&mut conn)
    {
        error!("Failed to counter offer {}: {}", offer_id, e);
        return HttpResponse::InternalServerError()
            .json(json!({"error": "Failed to counter offer"}));
    }

    let body = format!(
        "The seller countered your offer on \"{}\" with ${:.2}. The counter expires in {} hours.",
        listing.title,
        data.amount as f64 / 100.0,
        OFFER_WINDOW_HOURS
    );
    notify_offer(&config, &mut conn, offer.buyer_id, "Counter offer received", &body).await;

    info!("Offer {} countered at {}", offer_id, data.amount);
    HttpResponse::Ok().json(json!({"status": "Offer countered"}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_above_listing_price_is_rejected() {
        assert!(validate_offer_amount(10_001, 10_000).is_err());
        assert!(validate_offer_amount(10_000, 10_000).is_ok());
        assert!(validate_offer_amount(1, 10_000).is_ok());
    }

    #[test]
    fn non_positive_offers_are_rejected() {
        assert!(validate_offer_amount(0, 10_000).is_err());
        assert!(validate_offer_amount(-5, 10_000).is_err());
    }

    fn offer_with(status: &str, expires_in_hours: i64) -> Offer {
        let now = Utc::now().naive_utc();
        Offer {
            id: Uuid::from_u128(1),
            listing_id: Uuid::from_u128(2),
            buyer_id: Uuid::from_u128(3),
            seller_id: Uuid::from_u128(4),
            amount: 100,
            counter_amount: None,
            status: status.to_string(),
            expires_at: now + Duration::hours(expires_in_hours),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn seller_answers_pending_and_buyer_answers_countered() {
        let pending = offer_with("pending", 1);
        assert!(responder_for(&pending, pending.seller_id).is_ok());
        assert!(responder_for(&pending, pending.buyer_id).is_err());

        let countered = offer_with("countered", 1);
        assert!(responder_for(&countered, countered.buyer_id).is_ok());
        assert!(responder_for(&countered, countered.seller_id).is_err());
    }

    #[test]
    fn settled_or_expired_offers_are_not_actionable() {
        let accepted = offer_with("accepted", 1);
        assert!(responder_for(&accepted, accepted.seller_id).is_err());

        let expired = offer_with("pending", -1);
        assert!(responder_for(&expired, expired.seller_id).is_err());
    }
}
