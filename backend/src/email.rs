use thiserror::Error;

use crate::config::AppConfig;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("email request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("email API returned {0}")]
    Api(reqwest::StatusCode),
}

/// Sends one transactional email. Callers decide whether a failure is fatal
/// (signup verification) or just logged (offer notifications, sweeps).
pub async fn send_email(
    config: &AppConfig,
    to: &str,
    subject: &str,
    text: &str,
) -> Result<(), EmailError> {
    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/emails", config.email_api_url))
        .bearer_auth(&config.email_api_key)
        .json(&serde_json::json!({
            "from": config.email_from,
            "to": [to],
            "subject": subject,
            "text": text,
        }))
        .send()
        .await?;

    if !res.status().is_success() {
        return Err(EmailError::Api(res.status()));
    }
    Ok(())
}
