use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::auth;
use crate::db;
use crate::models::{NotificationPreferences, User};
use crate::schema::{notification_preferences, users};

// Public reads never expose the email address
#[derive(Serialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub created_at: NaiveDateTime,
}

pub async fn get_profile(path: web::Path<Uuid>) -> HttpResponse {
    let user_id = path.into_inner();

    let mut conn = match db::establish_connection() {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Database connection failed"}));
        }
    };

    match users::table.find(user_id).first::<User>(&mut conn) {
        Ok(user) => HttpResponse::Ok().json(PublicProfile {
            id: user.id,
            name: user.name,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
        }),
        Err(diesel::result::Error::NotFound) => {
            HttpResponse::NotFound().json(json!({"error": "User not found"}))
        }
        Err(e) => {
            error!("Failed to fetch user {}: {}", user_id, e);
            HttpResponse::InternalServerError().json(json!({"error": "Failed to fetch user"}))
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

pub async fn update_profile(
    req: HttpRequest,
    data: web::Json<UpdateProfileRequest>,
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

    if let Some(ref name) = data.name {
        if name.trim().is_empty() {
            return HttpResponse::BadRequest().json(json!({"error": "Name cannot be empty"}));
        }
    }

    let name = data
        .name
        .as_ref()
        .map(|n| n.trim().to_string())
        .unwrap_or(user.name);
    let avatar_url = data.avatar_url.clone().or(user.avatar_url);

    match diesel::update(users::table.find(user.id))
        .set((
            users::name.eq(name),
            users::avatar_url.eq(avatar_url),
            users::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
    {
        Ok(_) => HttpResponse::Ok().json(json!({"status": "Profile updated"})),
        Err(e) => {
            error!("Failed to update profile {}: {}", user.id, e);
            HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to update profile"}))
        }
    }
}

/// Absent row means everything on.
pub async fn get_notification_preferences(req: HttpRequest) -> HttpResponse {
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

    match notification_preferences::table
        .find(user.id)
        .first::<NotificationPreferences>(&mut conn)
        .optional()
    {
        Ok(Some(prefs)) => HttpResponse::Ok().json(prefs),
        Ok(None) => HttpResponse::Ok().json(NotificationPreferences {
            user_id: user.id,
            email_messages: true,
            email_offers: true,
        }),
        Err(e) => {
            error!("Failed to fetch notification preferences: {}", e);
            HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to fetch preferences"}))
        }
    }
}

#[derive(Deserialize)]
pub struct UpdatePreferencesRequest {
    pub email_messages: bool,
    pub email_offers: bool,
}

pub async fn update_notification_preferences(
    req: HttpRequest,
    data: web::Json<UpdatePreferencesRequest>,
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

    let prefs = NotificationPreferences {
        user_id: user.id,
        email_messages: data.email_messages,
        email_offers: data.email_offers,
    };

    match diesel::insert_into(notification_preferences::table)
        .values(&prefs)
        .on_conflict(notification_preferences::user_id)
        .do_update()
        .set((
            notification_preferences::email_messages.eq(prefs.email_messages),
            notification_preferences::email_offers.eq(prefs.email_offers),
        ))
        .execute(&mut conn)
    {
        Ok(_) => HttpResponse::Ok().json(prefs),
        Err(e) => {
            error!("Failed to update notification preferences: {}", e);
            HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to update preferences"}))
        }
    }
}
