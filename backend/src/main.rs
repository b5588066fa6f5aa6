use actix_web::{web, App, HttpServer};
use diesel::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use classifieds_backend::{
    admin, auth, category, config, db, listing, message, offer, report, review, saved, sweep,
    upload, user,
};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = config::AppConfig::load()?;
    info!("Loaded config, listening on port {}", config.port);

    // Fail fast if the database is unreachable
    let mut conn = db::establish_connection()
        .map_err(|e| format!("Failed to connect to database: {}", e))?;
    let test_query: i32 = diesel::select(diesel::dsl::sql::<diesel::sql_types::Integer>("1"))
        .get_result(&mut conn)?;
    info!("Database test query result: {}", test_query);

    sweep::spawn_sweeps(config.clone());

    let port = config.port;
    let data = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            // auth
            .route("/auth/signup", web::post().to(auth::signup))
            // profiles
            .route("/users/me", web::put().to(user::update_profile))
            .route("/users/{id}", web::get().to(user::get_profile))
            .route(
                "/notification-preferences",
                web::get().to(user::get_notification_preferences),
            )
            .route(
                "/notification-preferences",
                web::put().to(user::update_notification_preferences),
            )
            // listings
            .route("/listings", web::get().to(listing::get_listings))
            .route("/listings", web::post().to(listing::create_listing))
            .route("/listings/{id}", web::get().to(listing::get_listing))
            .route("/listings/{id}", web::put().to(listing::update_listing))
            .route("/listings/{id}", web::delete().to(listing::delete_listing))
            .route("/listings/{id}/renew", web::post().to(listing::renew_listing))
            .route(
                "/listings/{id}/archive",
                web::post().to(listing::archive_listing),
            )
            // saved listings
            .route("/saved-listings", web::get().to(saved::get_saved_listings))
            .route("/saved-listings", web::post().to(saved::save_listing))
            .route(
                "/saved-listings/{listing_id}",
                web::delete().to(saved::unsave_listing),
            )
            // categories
            .route("/categories", web::get().to(category::get_categories))
            // messaging
            .route("/conversations", web::get().to(message::get_conversations))
            .route("/messages/unread-count", web::get().to(message::unread_count))
            .route(
                "/messages/{conversation_id}",
                web::get().to(message::get_conversation_messages),
            )
            .route("/messages", web::post().to(message::send_message))
            // offers
            .route("/offers", web::get().to(offer::get_offers))
            .route("/offers", web::post().to(offer::create_offer))
            .route("/offers/{id}/accept", web::post().to(offer::accept_offer))
            .route("/offers/{id}/decline", web::post().to(offer::decline_offer))
            .route("/offers/{id}/counter", web::post().to(offer::counter_offer))
            // reviews + reports
            .route("/reviews", web::get().to(review::get_reviews))
            .route("/reviews", web::post().to(review::create_review))
            .route("/reports", web::post().to(report::create_report))
            // admin
            .route("/admin/analytics", web::get().to(admin::analytics))
            .route("/admin/reports", web::get().to(admin::list_reports))
            .route(
                "/admin/reports/{id}/resolve",
                web::post().to(admin::resolve_report),
            )
            .route(
                "/admin/reports/{id}/dismiss",
                web::post().to(admin::dismiss_report),
            )
            .route("/admin/users/{id}/ban", web::post().to(admin::ban_user))
            .route("/admin/users/{id}/unban", web::post().to(admin::unban_user))
            .route(
                "/admin/listings/renew",
                web::post().to(admin::bulk_renew_listings),
            )
            .route(
                "/admin/listings/{id}/enable",
                web::post().to(admin::enable_listing),
            )
            .route(
                "/admin/listings/{id}/disable",
                web::post().to(admin::disable_listing),
            )
            .route(
                "/admin/listings/{id}",
                web::delete().to(admin::delete_listing),
            )
            // uploads
            .route("/upload-image", web::post().to(upload::upload_image))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    Ok(())
}
