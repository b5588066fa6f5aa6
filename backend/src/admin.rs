use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use diesel::prelude::*;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth;
use crate::db;
use crate::listing::LISTING_TTL_DAYS;
use crate::models::Report;
use crate::schema::{listings, messages, offers, reports, users};

macro_rules! admin_conn {
    ($req:expr) => {{
        let mut conn = match db::establish_connection() {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to connect to database: {}", e);
                return HttpResponse::InternalServerError()
                    .json(json!({"error": "Database connection failed"}));
            }
        };
        let admin = match auth::require_admin($req, &mut conn) {
            Ok(user) => user,
            Err(resp) => return resp,
        };
        (conn, admin)
    }};
}

pub async fn analytics(req: HttpRequest) -> HttpResponse {
    let (mut conn, _admin) = admin_conn!(&req);

    let now = Utc::now().naive_utc();
    let week_ago = now - Duration::days(7);

    let counts = (|| -> QueryResult<serde_json::Value> {
        let total_users: i64 = users::table.count().get_result(&mut conn)?;
        let new_users_7d: i64 = users::table
            .filter(users::created_at.gt(week_ago))
            .count()
            .get_result(&mut conn)?;
        let total_listings: i64 = listings::table.count().get_result(&mut conn)?;
        let active_listings: i64 = listings::table
            .filter(listings::status.eq("active"))
            .count()
            .get_result(&mut conn)?;
        let total_offers: i64 = offers::table.count().get_result(&mut conn)?;
        let total_messages: i64 = messages::table.count().get_result(&mut conn)?;
        let open_reports: i64 = reports::table
            .filter(reports::status.eq("open"))
            .count()
            .get_result(&mut conn)?;
        Ok(json!({
            "total_users": total_users,
            "new_users_7d": new_users_7d,
            "total_listings": total_listings,
            "active_listings": active_listings,
            "total_offers": total_offers,
            "total_messages": total_messages,
            "open_reports": open_reports,
        }))
    })();

    match counts {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(e) => {
            error!("Failed to aggregate analytics: {}", e);
            HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to aggregate analytics"}))
        }
    }
}

pub async fn list_reports(req: HttpRequest) -> HttpResponse {
    let (mut conn, _admin) = admin_conn!(&req);

    match reports::table
        .order((reports::status.asc(), reports::created_at.desc()))
        .load::<Report>(&mut conn)
    {
        Ok(rows) => HttpResponse::Ok().json(rows),
        Err(e) => {
            error!("Failed to fetch reports: {}", e);
            HttpResponse::InternalServerError().json(json!({"error": "Failed to fetch reports"}))
        }
    }
}

async fn close_report(req: HttpRequest, report_id: Uuid, status: &str) -> HttpResponse {
    let (mut conn, admin) = admin_conn!(&req);

    let updated = match diesel::update(reports::table.find(report_id))
        .set((
            reports::status.eq(status),
            reports::resolved_by.eq(admin.id),
            reports::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
    {
        Ok(n) => n,
        Err(e) => {
            error!("Failed to update report {}: {}", report_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to update report"}));
        }
    };

    if updated == 0 {
        return HttpResponse::NotFound().json(json!({"error": "Report not found"}));
    }
    info!("Admin {} marked report {} {}", admin.id, report_id, status);
    HttpResponse::Ok().json(json!({"status": format!("Report {}", status)}))
}

pub async fn resolve_report(req: HttpRequest, path: web::Path<Uuid>) -> HttpResponse {
    close_report(req, path.into_inner(), "resolved").await
}

pub async fn dismiss_report(req: HttpRequest, path: web::Path<Uuid>) -> HttpResponse {
    close_report(req, path.into_inner(), "dismissed").await
}

fn self_target_error(banned: bool) -> &'static str {
    if banned {
        "Cannot ban yourself"
    } else {
        "Cannot unban yourself"
    }
}

async fn set_user_banned(req: HttpRequest, user_id: Uuid, banned: bool) -> HttpResponse {
    let (mut conn, admin) = admin_conn!(&req);

    if admin.id == user_id {
        return HttpResponse::BadRequest().json(json!({"error": self_target_error(banned)}));
    }

    let updated = match diesel::update(users::table.find(user_id))
        .set((
            users::is_banned.eq(banned),
            users::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
    {
        Ok(n) => n,
        Err(e) => {
            error!("Failed to update user {}: {}", user_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to update user"}));
        }
    };

    if updated == 0 {
        return HttpResponse::NotFound().json(json!({"error": "User not found"}));
    }
    let action = if banned { "banned" } else { "unbanned" };
    info!("Admin {} {} user {}", admin.id, action, user_id);
    HttpResponse::Ok().json(json!({"status": format!("User {}", action)}))
}

pub async fn ban_user(req: HttpRequest, path: web::Path<Uuid>) -> HttpResponse {
    set_user_banned(req, path.into_inner(), true).await
}

pub async fn unban_user(req: HttpRequest, path: web::Path<Uuid>) -> HttpResponse {
    set_user_banned(req, path.into_inner(), false).await
}

async fn set_listing_status(req: HttpRequest, listing_id: Uuid, status: &str) -> HttpResponse {
    let (mut conn, admin) = admin_conn!(&req);

    let updated = match diesel::update(listings::table.find(listing_id))
        .set((
            listings::status.eq(status),
            listings::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
    {
        Ok(n) => n,
        Err(e) => {
            error!("Failed to update listing {}: {}", listing_id, e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to update listing"}));
        }
    };

    if updated == 0 {
        return HttpResponse::NotFound().json(json!({"error": "Listing not found"}));
    }
    info!("Admin {} set listing {} {}", admin.id, listing_id, status);
    HttpResponse::Ok().json(json!({"status": status}))
}

pub async fn enable_listing(req: HttpRequest, path: web::Path<Uuid>) -> HttpResponse {
    set_listing_status(req, path.into_inner(), "active").await
}

pub async fn disable_listing(req: HttpRequest, path: web::Path<Uuid>) -> HttpResponse {
    set_listing_status(req, path.into_inner(), "disabled").await
}

pub async fn delete_listing(req: HttpRequest, path: web::Path<Uuid>) -> HttpResponse {
    let listing_id = path.into_inner();
    let (mut conn, admin) = admin_conn!(&req);

    match diesel::delete(listings::table.find(listing_id)).execute(&mut conn) {
        Ok(0) => HttpResponse::NotFound().json(json!({"error": "Listing not found"})),
        Ok(_) => {
            info!("Admin {} deleted listing {}", admin.id, listing_id);
            HttpResponse::Ok().json(json!({"status": "Listing deleted"}))
        }
        Err(e) => {
            error!("Failed to delete listing {}: {}", listing_id, e);
            HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to delete listing"}))
        }
    }
}

/// Pushes the expiry out for every active listing.
pub async fn bulk_renew_listings(req: HttpRequest) -> HttpResponse {
    let (mut conn, admin) = admin_conn!(&req);

    let now = Utc::now().naive_utc();
    match diesel::update(listings::table.filter(listings::status.eq("active")))
        .set((
            listings::expires_at.eq(now + Duration::days(LISTING_TTL_DAYS)),
            listings::updated_at.eq(now),
        ))
        .execute(&mut conn)
    {
        Ok(n) => {
            info!("Admin {} bulk-renewed {} listings", admin.id, n);
            HttpResponse::Ok().json(json!({"renewed": n}))
        }
        Err(e) => {
            error!("Failed to bulk renew listings: {}", e);
            HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to renew listings"}))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_target_message_matches_the_action() {
        assert_eq!(self_target_error(true), "Cannot ban yourself");
        assert_eq!(self_target_error(false), "Cannot unban yourself");
    }
}
