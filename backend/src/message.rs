use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tracing::{error, warn};
use uuid::Uuid;

use crate::auth;
use crate::db;
use crate::models::Message;
use crate::schema::messages;

#[derive(Serialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub listing_id: Uuid,
    pub other_user_id: Uuid,
    pub last_message: Message,
    pub unread: i64,
}

/// Latest message and unread count per conversation the caller is part of.
/// Conversation identity is the client-derived composite key stored on each
/// message row; the server never parses it.
pub async fn get_conversations(req: HttpRequest) -> HttpResponse {
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

    let rows = match messages::table
        .filter(
            messages::sender_id
                .eq(user.id)
                .or(messages::recipient_id.eq(user.id)),
        )
        .order(messages::created_at.desc())
        .load::<Message>(&mut conn)
    {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to fetch conversations: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to fetch conversations"}));
        }
    };

    // Rows are newest-first, so the first row seen per conversation is the
    // latest message.
    let mut order: Vec<String> = Vec::new();
    let mut summaries: HashMap<String, ConversationSummary> = HashMap::new();
    for message in rows {
        let unread = (message.recipient_id == user.id && !message.read) as i64;
        match summaries.get_mut(&message.conversation_id) {
            Some(summary) => summary.unread += unread,
            None => {
                let other_user_id = if message.sender_id == user.id {
                    message.recipient_id
                } else {
                    message.sender_id
                };
                order.push(message.conversation_id.clone());
                summaries.insert(
                    message.conversation_id.clone(),
                    ConversationSummary {
                        conversation_id: message.conversation_id.clone(),
                        listing_id: message.listing_id,
                        other_user_id,
                        last_message: message,
                        unread,
                    },
                );
            }
        }
    }

    let conversations: Vec<ConversationSummary> = order
        .into_iter()
        .filter_map(|id| summaries.remove(&id))
        .collect();

    HttpResponse::Ok().json(conversations)
}

pub async fn unread_count(req: HttpRequest) -> HttpResponse {
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

    match messages::table
        .filter(messages::recipient_id.eq(user.id))
        .filter(messages::read.eq(false))
        .count()
        .get_result::<i64>(&mut conn)
    {
        Ok(count) => HttpResponse::Ok().json(json!({"unread": count})),
        Err(e) => {
            error!("Failed to count unread messages: {}", e);
            HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to count unread messages"}))
        }
    }
}

/// Returns a conversation's messages and marks the caller's received
/// messages read.
pub async fn get_conversation_messages(
    req: HttpRequest,
    path: web::Path<String>,
) -> HttpResponse {
    let conversation_id = path.into_inner();

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

    let rows = match messages::table
        .filter(messages::conversation_id.eq(&conversation_id))
        .filter(
            messages::sender_id
                .eq(user.id)
                .or(messages::recipient_id.eq(user.id)),
        )
        .order(messages::created_at.asc())
        .load::<Message>(&mut conn)
    {
        Ok(rows) => rows,
        Err(e) => {
            error!("Failed to fetch messages: {}", e);
            return HttpResponse::InternalServerError()
                .json(json!({"error": "Failed to fetch messages"}));
        }
    };

    if let Err(e) = diesel::update(
        messages::table
            .filter(messages::conversation_id.eq(&conversation_id))
            .filter(messages::recipient_id.eq(user.id))
            .filter(messages::read.eq(false)),
    )
    .set(messages::read.eq(true))
    .execute(&mut conn)
    {
        warn!("Failed to mark conversation {} read: {}", conversation_id, e);
    }

    HttpResponse::Ok().json(rows)
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub conversation_id: String,
    pub recipient_id: Uuid,
    pub listing_id: Uuid,
    pub body: String,
}

pub async fn send_message(req: HttpRequest, data: web::Json<SendMessageRequest>) -> HttpResponse {
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

    if data.body.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({"error": "Message body is required"}));
    }
    if data.conversation_id.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({"error": "Conversation id is required"}));
    }
    if data.recipient_id == user.id {
        return HttpResponse::BadRequest()
            .json(json!({"error": "Cannot send a message to yourself"}));
    }

    let message = Message {
        id: Uuid::new_v4(),
        conversation_id: data.conversation_id.clone(),
        sender_id: user.id,
        recipient_id: data.recipient_id,
        listing_id: data.listing_id,
        body: data.body.clone(),
        read: false,
        created_at: Utc::now().naive_utc(),
    };

    match diesel::insert_into(messages::table)
        .values(&message)
        .execute(&mut conn)
    {
        Ok(_) => HttpResponse::Created().json(message),
        Err(e) => {
            error!("Failed to send message: {}", e);
            HttpResponse::InternalServerError().json(json!({"error": "Failed to send message"}))
        }
    }
}
