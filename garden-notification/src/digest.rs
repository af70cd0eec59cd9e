//! Scheduled alert check: evaluate every subscribed user, then mail a digest
//! of recent notifications to those who asked for email.

use std::sync::Arc;

use serde::Serialize;

use garden_shared::clients::email::Mailer;
use garden_shared::errors::AppResult;

use crate::alerts::AlertEvaluator;
use crate::models::{AlertSubscriber, Notification};
use crate::service::{NotificationDeps, NotificationStore};

/// Notifications listed in one digest email.
pub const DIGEST_SIZE: i64 = 5;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertCheckReport {
    pub users_checked: usize,
    pub alerts_created: usize,
    pub emails_sent: usize,
    pub emails_failed: usize,
}

pub struct AlertCheckJob {
    deps: NotificationDeps,
    evaluator: AlertEvaluator,
    mailer: Arc<dyn Mailer>,
    app_url: String,
}

impl AlertCheckJob {
    pub fn new(deps: NotificationDeps, mailer: Arc<dyn Mailer>, app_url: &str) -> Self {
        Self {
            evaluator: AlertEvaluator::new(deps.clone()),
            deps,
            mailer,
            app_url: app_url.trim_end_matches('/').to_string(),
        }
    }

    /// Users are processed one after another. A store error stops the run but
    /// keeps the notifications already created for earlier users.
    pub async fn run(&self) -> AppResult<AlertCheckReport> {
        let subscribers = self.deps.settings.alert_subscribers().await?;
        let mut report = AlertCheckReport::default();

        for subscriber in &subscribers {
            let summary = self.evaluator.check_alerts(subscriber.user_id).await?;
            report.users_checked += 1;
            report.alerts_created += summary.total();

            if !subscriber.settings.email_notifications {
                continue;
            }

            match self.send_digest(subscriber).await? {
                Some(true) => report.emails_sent += 1,
                Some(false) => report.emails_failed += 1,
                None => {}
            }
        }

        Ok(report)
    }

    /// `None` when there is nothing unread, otherwise whether the mail went out.
    async fn send_digest(&self, subscriber: &AlertSubscriber) -> AppResult<Option<bool>> {
        let store = NotificationStore::new(self.deps.clone(), subscriber.user_id);
        let unread = store.unread_count().await?;
        if unread == 0 {
            return Ok(None);
        }

        let recent = store.notifications(DIGEST_SIZE, 0).await?;
        let (subject, body) = compose_digest(unread, &recent, &self.app_url);

        match self.mailer.send_text(&subscriber.email, &subject, &body).await {
            Ok(()) => {
                tracing::info!(
                    user_id = %subscriber.user_id,
                    email = %subscriber.email,
                    notification_count = unread,
                    "alert email sent"
                );
                Ok(Some(true))
            }
            Err(e) => {
                tracing::error!(
                    user_id = %subscriber.user_id,
                    email = %subscriber.email,
                    error = %e,
                    "failed to send alert email"
                );
                Ok(Some(false))
            }
        }
    }
}

pub fn compose_digest(unread: i64, recent: &[Notification], app_url: &str) -> (String, String) {
    let subject = format!("Garden Sensors Alert - {unread} New Notifications");

    let mut body = format!("You have {unread} new notifications:\n\n");
    for n in recent.iter().take(DIGEST_SIZE as usize) {
        body.push_str(&format!(
            "- {}\n  Time: {}\n\n",
            n.message,
            n.created_at.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    body.push_str(&format!("\nView all notifications at: {app_url}/notifications"));

    (subject, body)
}
