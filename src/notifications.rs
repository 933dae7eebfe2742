//! Push notification delivery over FCM.
//!
//! Pushes are strictly fire-and-forget: a failed or skipped delivery is
//! logged and swallowed, never propagated into the state transition that
//! triggered it.

use std::sync::Arc;

use log::{debug, warn};
use sea_orm::{DatabaseConnection, EntityTrait};
use uuid::Uuid;

use crate::entity::user_fcm_tokens;

const FCM_SEND_URL: &str = "https://fcm.googleapis.com/fcm/send";

pub struct NotificationService {
    client: reqwest::Client,
    server_key: Option<String>,
}

impl NotificationService {
    pub fn new(server_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            server_key,
        }
    }

    /// A service that drops every push. Used when FCM is not configured and
    /// in tests.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Best-effort push delivery to a single device token.
    pub async fn send_push(&self, token: &str, title: &str, body: &str, data: serde_json::Value) {
        let Some(key) = &self.server_key else {
            debug!("push suppressed, no FCM server key configured: {title}");
            return;
        };

        let payload = serde_json::json!({
            "to": token,
            "notification": { "title": title, "body": body },
            "data": data,
        });

        match self
            .client
            .post(FCM_SEND_URL)
            .header("Authorization", format!("key={key}"))
            .json(&payload)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                debug!("push delivered: {title}");
            }
            Ok(response) => warn!("push rejected with status {}", response.status()),
            Err(e) => warn!("push delivery failed: {e}"),
        }
    }
}

/// Look up the client's device token and spawn the push. The token read
/// happens before the spawn so the state-changing caller never awaits
/// delivery.
pub(crate) async fn notify_client(
    db: &DatabaseConnection,
    notifications: &Arc<NotificationService>,
    client_id: Uuid,
    walk_id: Uuid,
    title: &str,
    body: &str,
    event: &str,
) {
    let token = match user_fcm_tokens::Entity::find_by_id(client_id).one(db).await {
        Ok(Some(row)) => row.fcm_token,
        Ok(None) => {
            debug!("client {client_id} has no FCM token registered");
            return;
        }
        Err(e) => {
            warn!("failed to load FCM token for client {client_id}: {e}");
            return;
        }
    };

    let notifications = Arc::clone(notifications);
    let title = title.to_owned();
    let body = body.to_owned();
    let data = serde_json::json!({ "type": event, "walkId": walk_id });
    tokio::spawn(async move {
        notifications.send_push(&token, &title, &body, data).await;
    });
}
