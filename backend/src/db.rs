use diesel::pg::PgConnection;
use diesel::prelude::*;
use dotenv::dotenv;
use std::env;
use tracing::error;

pub fn establish_connection() -> Result<PgConnection, ConnectionError> {
    // .env may not have been loaded yet when a sweep task calls in first
    dotenv().ok();

    let database_url = match env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            error!("DATABASE_URL environment variable not found");
            return Err(ConnectionError::BadConnection(
                "DATABASE_URL environment variable not set".to_string(),
            ));
        }
    };

    match PgConnection::establish(&database_url) {
        Ok(conn) => Ok(conn),
        Err(e) => {
            error!("Failed to establish database connection: {}", e);
            Err(e)
        }
    }
}
