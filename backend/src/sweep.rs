use chrono::Utc;
use diesel::prelude::*;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db;
use crate::email;
use crate::models::{Message, MessageNotification, NotificationPreferences, User};
use crate::schema::{message_notifications, messages, notification_preferences, offers, users};

const EMAIL_SWEEP_SECS: u64 = 30 * 60;
const OFFER_SWEEP_SECS: u64 = 10 * 60;

type SweepError = Box<dyn std::error::Error + Send + Sync>;

/// Scheduled background work. Runs are independent; overlap safety comes
/// from the idempotent ledger and status updates, not coordination.
pub fn spawn_sweeps(config: AppConfig) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(EMAIL_SWEEP_SECS));
        loop {
            ticker.tick().await;
            if let Err(e) = run_email_sweep(&config).await {
                error!("Email sweep failed: {}", e);
            }
        }
    });

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(OFFER_SWEEP_SECS));
        loop {
            ticker.tick().await;
            if let Err(e) = run_offer_expiry_sweep() {
                error!("Offer expiry sweep failed: {}", e);
            }
        }
    });
}

/// Emails recipients of unread messages that have no ledger row yet. The
/// ledger row is written only after a successful send, so a failed send is
/// retried on the next run.
pub async fn run_email_sweep(config: &AppConfig) -> Result<(), SweepError> {
    let mut conn = db::establish_connection()?;

    let pending: Vec<Message> = messages::table
        .left_outer_join(message_notifications::table)
        .filter(messages::read.eq(false))
        .filter(message_notifications::id.is_null())
        .select(messages::all_columns)
        .order(messages::created_at.asc())
        .load(&mut conn)?;

    if pending.is_empty() {
        return Ok(());
    }
    info!("Email sweep: {} messages to notify", pending.len());

    for message in pending {
        let wants_email = notification_preferences::table
            .find(message.recipient_id)
            .first::<NotificationPreferences>(&mut conn)
            .map(|p| p.email_messages)
            .unwrap_or(true);

        if wants_email {
            let recipient = match users::table
                .find(message.recipient_id)
                .first::<User>(&mut conn)
            {
                Ok(user) => user,
                Err(e) => {
                    warn!("Failed to load recipient {}: {}", message.recipient_id, e);
                    continue;
                }
            };

            let body = format!(
                "You have a new message waiting:\n\n{}\n",
                message.body
            );
            if let Err(e) =
                email::send_email(config, &recipient.email, "You have a new message", &body).await
            {
                warn!("Failed to notify {}: {}", recipient.email, e);
                continue; // no ledger row, retried next run
            }
        }

        // Opt-outs get a ledger row too so they are not rescanned forever
        let ledger = MessageNotification {
            id: Uuid::new_v4(),
            message_id: message.id,
            sent_at: Utc::now().naive_utc(),
        };
        if let Err(e) = diesel::insert_into(message_notifications::table)
            .values(&ledger)
            .on_conflict(message_notifications::message_id)
            .do_nothing()
            .execute(&mut conn)
        {
            warn!("Failed to record notification for {}: {}", message.id, e);
        }
    }

    Ok(())
}

/// Flips pending and countered offers past their window to `expired`.
pub fn run_offer_expiry_sweep() -> Result<usize, SweepError> {
    let mut conn = db::establish_connection()?;

    let now = Utc::now().naive_utc();
    let expired = diesel::update(
        offers::table
            .filter(offers::status.eq_any(vec!["pending", "countered"]))
            .filter(offers::expires_at.lt(now)),
    )
    .set((offers::status.eq("expired"), offers::updated_at.eq(now)))
    .execute(&mut conn)?;

    if expired > 0 {
        info!("Offer expiry sweep: {} offers expired", expired);
    }
    Ok(expired)
}
