use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth;
use crate::db;
use crate::models::Report;
use crate::schema::reports;

#[derive(Deserialize)]
pub struct CreateReportRequest {
    pub reported_user_id: Option<Uuid>,
    pub listing_id: Option<Uuid>,
    pub reason: String,
    #[serde(default)]
    pub details: String,
}

/// Files a report against a user or a listing; resolution happens through
/// the admin endpoints.
pub async fn create_report(
    req: HttpRequest,
    data: web::Json<CreateReportRequest>,
) -> HttpResponse {
    let mut conn = match db::establish_connection() {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Database connection failed"}));
        }
    };

    let reporter = match auth::authed_user(&req, &mut conn) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    if data.reported_user_id.is_none() && data.listing_id.is_none() {
        return HttpResponse::BadRequest()
            .json(json!({"error": "Report must name a user or a listing"}));
    }
    if data.reason.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({"error": "Reason is required"}));
    }

    let now = Utc::now().naive_utc();
    let report = Report {
        id: Uuid::new_v4(),
        reporter_id: reporter.id,
        reported_user_id: data.reported_user_id,
        listing_id: data.listing_id,
        reason: data.reason.trim().to_string(),
        details: data.details.clone(),
        status: "open".to_string(),
        resolved_by: None,
        created_at: now,
        updated_at: now,
    };

    match diesel::insert_into(reports::table)
        .values(&report)
        .execute(&mut conn)
    {
        Ok(_) => {
            info!("User {} filed report {}", reporter.id, report.id);
            HttpResponse::Created().json(report)
        }
        Err(e) => {
            error!("Failed to create report: {}", e);
            HttpResponse::InternalServerError().json(json!({"error": "Failed to create report"}))
        }
    }
}
