use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db;
use crate::email;
use crate::models::User;
use crate::schema::users;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User id issued by the identity provider
    pub exp: usize,  // Expiration time
}

/// Extracts and validates the bearer token, returning the subject user id.
pub fn verify_token(req: &HttpRequest) -> Result<String, HttpResponse> {
    let auth_header = match req.headers().get("Authorization") {
        Some(header) => header,
        None => {
            return Err(HttpResponse::Unauthorized()
                .json(json!({"error": "Missing Authorization header"})))
        }
    };

    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(_) => {
            return Err(HttpResponse::Unauthorized()
                .json(json!({"error": "Invalid Authorization header"})))
        }
    };

    if !auth_str.starts_with("Bearer ") {
        return Err(HttpResponse::Unauthorized().json(json!({"error": "Invalid token format"})));
    }

    let token = &auth_str[7..];
    let jwt_secret = match std::env::var("JWT_SECRET") {
        Ok(secret) => secret,
        Err(_) => {
            error!("JWT_SECRET is not set");
            return Err(HttpResponse::InternalServerError()
                .json(json!({"error": "Server misconfiguration"})));
        }
    };

    match jsonwebtoken::decode::<Claims>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(jwt_secret.as_bytes()),
        &jsonwebtoken::Validation::default(),
    ) {
        Ok(data) => Ok(data.claims.sub),
        Err(e) => {
            Err(HttpResponse::Unauthorized().json(json!({"error": format!("Invalid token: {}", e)})))
        }
    }
}

/// Token check plus profile load. Banned users are rejected here so every
/// authenticated write gets the check for free.
pub fn authed_user(req: &HttpRequest, conn: &mut PgConnection) -> Result<User, HttpResponse> {
    let subject = verify_token(req)?;

    let user_id = match Uuid::parse_str(&subject) {
        Ok(id) => id,
        Err(_) => {
            return Err(
                HttpResponse::Unauthorized().json(json!({"error": "Invalid token subject"}))
            )
        }
    };

    let user = match users::table.find(user_id).first::<User>(conn) {
        Ok(user) => user,
        Err(diesel::result::Error::NotFound) => {
            return Err(HttpResponse::Unauthorized().json(json!({"error": "Unknown user"})))
        }
        Err(e) => {
            error!("Failed to load user {}: {}", user_id, e);
            return Err(
                HttpResponse::InternalServerError().json(json!({"error": "Database error"}))
            );
        }
    };

    if user.is_banned {
        return Err(HttpResponse::Forbidden().json(json!({"error": "Account is banned"})));
    }

    Ok(user)
}

pub fn require_admin(req: &HttpRequest, conn: &mut PgConnection) -> Result<User, HttpResponse> {
    let user = authed_user(req, conn)?;
    if !user.is_admin {
        return Err(HttpResponse::Forbidden().json(json!({"error": "Admin access required"})));
    }
    Ok(user)
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub captcha_token: String,
}

#[derive(Deserialize)]
struct CaptchaVerdict {
    success: bool,
}

#[derive(Deserialize)]
struct ProviderUser {
    id: Uuid,
    #[serde(default)]
    confirmation_token: Option<String>,
}

/// Creates the identity at the provider, the profile row, and sends the
/// verification email. Captcha and email failures abort the signup.
pub async fn signup(
    config: web::Data<AppConfig>,
    data: web::Json<SignupRequest>,
) -> HttpResponse {
    if data.email.trim().is_empty() || !data.email.contains('@') {
        return HttpResponse::BadRequest().json(json!({"error": "Invalid email address"}));
    }
    if data.password.len() < 8 {
        return HttpResponse::BadRequest()
            .json(json!({"error": "Password must be at least 8 characters"}));
    }
    if data.name.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({"error": "Name is required"}));
    }

    let client = reqwest::Client::new();

    // Captcha gates signup: a verification failure is fatal
    let verdict = match client
        .post(&config.captcha_verify_url)
        .form(&[
            ("secret", config.captcha_secret.as_str()),
            ("response", data.captcha_token.as_str()),
        ])
        .send()
        .await
    {
        Ok(res) => match res.json::<CaptchaVerdict>().await {
            Ok(v) => v,
            Err(e) => {
                error!("Malformed captcha verification response: {}", e);
                return HttpResponse::BadGateway()
                    .json(json!({"error": "Captcha verification unavailable"}));
            }
        },
        Err(e) => {
            error!("Captcha verification request failed: {}", e);
            return HttpResponse::BadGateway()
                .json(json!({"error": "Captcha verification unavailable"}));
        }
    };
    if !verdict.success {
        return HttpResponse::BadRequest().json(json!({"error": "Captcha verification failed"}));
    }

    // Create the identity at the provider
    let created = match client
        .post(format!("{}/signup", config.auth_url))
        .bearer_auth(&config.auth_service_key)
        .json(&json!({"email": data.email, "password": data.password}))
        .send()
        .await
    {
        Ok(res) if res.status().is_success() => match res.json::<ProviderUser>().await {
            Ok(user) => user,
            Err(e) => {
                error!("Malformed identity provider response: {}", e);
                return HttpResponse::BadGateway()
                    .json(json!({"error": "Identity provider unavailable"}));
            }
        },
        Ok(res) => {
            let status = res.status();
            error!("Identity provider rejected signup: {}", status);
            if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
                || status == reqwest::StatusCode::CONFLICT
            {
                return HttpResponse::BadRequest()
                    .json(json!({"error": "Email is already registered"}));
            }
            return HttpResponse::BadGateway()
                .json(json!({"error": "Identity provider unavailable"}));
        }
        Err(e) => {
            error!("Identity provider request failed: {}", e);
            return HttpResponse::BadGateway()
                .json(json!({"error": "Identity provider unavailable"}));
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

    let now = Utc::now().naive_utc();
    let profile = User {
        id: created.id,
        email: data.email.clone(),
        name: data.name.trim().to_string(),
        avatar_url: None,
        is_admin: false,
        is_banned: false,
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = diesel::insert_into(users::table)
        .values(&profile)
        .on_conflict(users::id)
        .do_nothing()
        .execute(&mut conn)
    {
        error!("Failed to insert profile row: {}", e);
        return HttpResponse::InternalServerError().json(json!({"error": "Database error"}));
    }

    // Verification email gates the signup response
    let verify_link = format!(
        "{}/auth/verify?token={}",
        config.app_base_url,
        created.confirmation_token.unwrap_or_default()
    );
    let body = format!(
        "Welcome to the marketplace, {}!\n\nPlease verify your email address:\n{}\n",
        profile.name, verify_link
    );
    if let Err(e) =
        email::send_email(&config, &profile.email, "Verify your email address", &body).await
    {
        error!("Failed to send verification email to {}: {}", profile.email, e);
        return HttpResponse::BadGateway()
            .json(json!({"error": "Failed to send verification email"}));
    }

    info!("Created account {} for {}", profile.id, profile.email);
    HttpResponse::Created().json(json!({"id": profile.id}))
}
