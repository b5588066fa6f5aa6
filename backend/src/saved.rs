use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::auth;
use crate::db;
use crate::models::{Listing, SavedListing};
use crate::schema::{listings, saved_listings};

#[derive(Serialize)]
pub struct SavedListingEntry {
    pub saved_at: chrono::NaiveDateTime,
    pub listing: Listing,
}

pub async fn get_saved_listings(req: HttpRequest) -> HttpResponse {
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

    let rows = match saved_listings::table
        .inner_join(listings::table)
        .filter(saved_listings::user_id.eq(user.id))
        .order(saved_listings::created_at.desc())
        .load::<(SavedListing, Listing)>(&mut conn)
    {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to fetch saved listings: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to fetch saved listings"}));
        }
    };

    let entries: Vec<SavedListingEntry> = rows
        .into_iter()
        .map(|(saved, listing)| SavedListingEntry {
            saved_at: saved.created_at,
            listing,
        })
        .collect();

    HttpResponse::Ok().json(entries)
}

#[derive(Deserialize)]
pub struct SaveListingRequest {
    pub listing_id: Uuid,
}

pub async fn save_listing(req: HttpRequest, data: web::Json<SaveListingRequest>) -> HttpResponse {
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

    match listings::table
        .find(data.listing_id)
        .first::<Listing>(&mut conn)
    {
        Ok(_) => {}
        Err(diesel::result::Error::NotFound) => {
            return HttpResponse::NotFound().json(json!({"error": "Listing not found"}));
        }
        Err(e) => {
            error!("Failed to fetch listing {}: {}", data.listing_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to save listing"}));
        }
    }

    let row = SavedListing {
        id: Uuid::new_v4(),
        user_id: user.id,
        listing_id: data.listing_id,
        created_at: Utc::now().naive_utc(),
    };

    // Saving twice is a no-op
    match diesel::insert_into(saved_listings::table)
        .values(&row)
        .on_conflict((saved_listings::user_id, saved_listings::listing_id))
        .do_nothing()
        .execute(&mut conn)
    {
        Ok(_) => HttpResponse::Ok().json(json!({"status": "Listing saved"})),
        Err(e) => {
            error!("Failed to save listing: {}", e);
            HttpResponse::InternalServerError().json(json!({"error": "Failed to save listing"}))
        }
    }
}

pub async fn unsave_listing(req: HttpRequest, path: web::Path<Uuid>) -> HttpResponse {
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

    match diesel::delete(
        saved_listings::table
            .filter(saved_listings::user_id.eq(user.id))
            .filter(saved_listings::listing_id.eq(listing_id)),
    )
    .execute(&mut conn)
    {
        Ok(_) => HttpResponse::Ok().json(json!({"status": "Listing unsaved"})),
        Err(e) => {
            error!("Failed to unsave listing: {}", e);
            HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to unsave listing"}))
        }
    }
}
