use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{
    categories, listings, message_notifications, messages, notification_preferences, offers,
    real_estate_details, reports, reviews, saved_listings, subcategories, users,
};

#[derive(Serialize, Deserialize, Queryable, Insertable, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub is_admin: bool,
    pub is_banned: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = categories)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = subcategories)]
pub struct Subcategory {
    pub id: i32,
    pub category_id: i32,
    pub name: String,
    pub slug: String,
}

#[derive(Serialize, Deserialize, Queryable, Insertable, Clone)]
#[diesel(table_name = listings)]
pub struct Listing {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: i32,
    pub subcategory_id: Option<i32>,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub listing_type: String,
    pub location: Option<String>,
    pub zip_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub images: Vec<String>,
    pub status: String,
    pub views: i64,
    pub expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = real_estate_details)]
pub struct RealEstateDetails {
    pub listing_id: Uuid,
    pub property_type: String,
    pub bedrooms: i16,
    pub bathrooms: i16,
    pub square_feet: i64,
}

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = saved_listings)]
pub struct SavedListing {
    pub id: Uuid,
    pub user_id: Uuid,
    pub listing_id: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Queryable, Insertable, Clone)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: String,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub listing_id: Uuid,
    pub body: String,
    pub read: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Queryable, Insertable, Clone)]
#[diesel(table_name = offers)]
pub struct Offer {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub amount: i64,
    pub counter_amount: Option<i64>,
    pub status: String,
    pub expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = reviews)]
pub struct Review {
    pub id: Uuid,
    pub reviewer_id: Uuid,
    pub subject_id: Uuid,
    pub listing_id: Option<Uuid>,
    pub rating: i16,
    pub comment: String,
    pub created_at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = reports)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reported_user_id: Option<Uuid>,
    pub listing_id: Option<Uuid>,
    pub reason: String,
    pub details: String,
    pub status: String,
    pub resolved_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = message_notifications)]
pub struct MessageNotification {
    pub id: Uuid,
    pub message_id: Uuid,
    pub sent_at: NaiveDateTime,
}

#[derive(Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = notification_preferences)]
pub struct NotificationPreferences {
    pub user_id: Uuid,
    pub email_messages: bool,
    pub email_offers: bool,
}
