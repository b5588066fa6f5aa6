use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::auth;
use crate::db;
use crate::models::Review;
use crate::schema::reviews;

#[derive(Deserialize)]
pub struct ReviewListQuery {
    pub user_id: Option<Uuid>,
}

/// Public: reviews left for a given user.
pub async fn get_reviews(query: web::Query<ReviewListQuery>) -> HttpResponse {
    let subject_id = match query.user_id {
        Some(id) => id,
        None => {
            return HttpResponse::BadRequest().json(json!({"error": "user_id is required"}));
        }
    };

    let mut conn = match db::establish_connection() {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Database connection failed"}));
        }
    };

    match reviews::table
        .filter(reviews::subject_id.eq(subject_id))
        .order(reviews::created_at.desc())
        .load::<Review>(&mut conn)
    {
        Ok(rows) => HttpResponse::Ok().json(rows),
        Err(e) => {
            error!("Failed to fetch reviews: {}", e);
            HttpResponse::InternalServerError().json(json!({"error": "Failed to fetch reviews"}))
        }
    }
}

#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub subject_id: Uuid,
    pub listing_id: Option<Uuid>,
    pub rating: i16,
    pub comment: String,
}

pub async fn create_review(
    req: HttpRequest,
    data: web::Json<CreateReviewRequest>,
) -> HttpResponse {
    let mut conn = match db::establish_connection() {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Database connection failed"}));
        }
    };

    let reviewer = match auth::authed_user(&req, &mut conn) {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    if !(1..=5).contains(&data.rating) {
        return HttpResponse::BadRequest()
            .json(json!({"error": "Rating must be between 1 and 5"}));
    }
    if data.subject_id == reviewer.id {
        return HttpResponse::BadRequest().json(json!({"error": "Cannot review yourself"}));
    }

    // One review per (reviewer, subject, listing)
    let existing: i64 = match reviews::table
        .filter(reviews::reviewer_id.eq(reviewer.id))
        .filter(reviews::subject_id.eq(data.subject_id))
        .filter(reviews::listing_id.is_not_distinct_from(data.listing_id))
        .count()
        .get_result(&mut conn)
    {
        Ok(count) => count,
        Err(e) => {
            error!("Failed to check existing reviews: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to create review"}));
        }
    };
    if existing > 0 {
        return HttpResponse::Conflict()
            .json(json!({"error": "You have already reviewed this user"}));
    }

    let review = Review {
        id: Uuid::new_v4(),
        reviewer_id: reviewer.id,
        subject_id: data.subject_id,
        listing_id: data.listing_id,
        rating: data.rating,
        comment: data.comment.clone(),
        created_at: Utc::now().naive_utc(),
    };

    match diesel::insert_into(reviews::table)
        .values(&review)
        .execute(&mut conn)
    {
        Ok(_) => HttpResponse::Created().json(review),
        Err(e) => {
            error!("Failed to create review: {}", e);
            HttpResponse::InternalServerError().json(json!({"error": "Failed to create review"}))
        }
    }
}
