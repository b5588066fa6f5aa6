use dotenv::dotenv;
use std::env;

// DATABASE_URL and JWT_SECRET are read where they are used (`db.rs` and
// `auth.rs`), not carried here.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    /// Base URL the verification link in signup emails points at.
    pub app_base_url: String,
    pub auth_url: String,
    pub auth_service_key: String,
    pub captcha_verify_url: String,
    pub captcha_secret: String,
    pub geocoding_api_url: String,
    pub email_api_url: String,
    pub email_api_key: String,
    pub email_from: String,
    pub storage_url: String,
    pub storage_bucket: String,
    pub storage_api_key: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv().ok(); // Load .env file if present
        Ok(Self {
            port: env::var("PORT")?.parse()?,
            app_base_url: env::var("APP_BASE_URL")?,
            auth_url: env::var("AUTH_URL")?,
            auth_service_key: env::var("AUTH_SERVICE_KEY")?,
            captcha_verify_url: env::var("CAPTCHA_VERIFY_URL")
                .unwrap_or_else(|_| "https://hcaptcha.com/siteverify".to_string()),
            captcha_secret: env::var("CAPTCHA_SECRET")?,
            geocoding_api_url: env::var("GEOCODING_API_URL")
                .unwrap_or_else(|_| "https://api.zippopotam.us/us".to_string()),
            email_api_url: env::var("EMAIL_API_URL")?,
            email_api_key: env::var("EMAIL_API_KEY")?,
            email_from: env::var("EMAIL_FROM")?,
            storage_url: env::var("STORAGE_URL")?,
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| "listing-images".to_string()),
            storage_api_key: env::var("STORAGE_API_KEY")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_reads_only_service_settings() {
        for (key, value) in [
            ("PORT", "8080"),
            ("APP_BASE_URL", "http://localhost:8080"),
            ("AUTH_URL", "http://localhost:9001"),
            ("AUTH_SERVICE_KEY", "service-key"),
            ("CAPTCHA_SECRET", "captcha-secret"),
            ("EMAIL_API_URL", "http://localhost:9002"),
            ("EMAIL_API_KEY", "email-key"),
            ("EMAIL_FROM", "noreply@example.com"),
            ("STORAGE_URL", "http://localhost:9003"),
            ("STORAGE_API_KEY", "storage-key"),
        ] {
            env::set_var(key, value);
        }
        // The connection and token secrets belong to db.rs and auth.rs
        env::remove_var("DATABASE_URL");
        env::remove_var("JWT_SECRET");

        let config = AppConfig::load().expect("config should load");
        assert_eq!(config.port, 8080);
        assert_eq!(config.storage_bucket, "listing-images");
        assert_eq!(
            config.geocoding_api_url,
            "https://api.zippopotam.us/us"
        );
    }
}
