use std::sync::Arc;

use sqlx::{postgres::PgListener, PgPool};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::hub::SubscriptionChangeHub;
use super::models::SubscriptionChange;

/// key: subscription-listener -> NOTIFY payloads from the subscriptions trigger
pub fn spawn_subscription_listener(
    pool: PgPool,
    channel: String,
    hub: Arc<SubscriptionChangeHub>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(err) = listen(pool, &channel, hub).await {
            error!(?err, %channel, "subscription change listener terminated");
        }
    })
}

async fn listen(
    pool: PgPool,
    channel: &str,
    hub: Arc<SubscriptionChangeHub>,
) -> Result<(), sqlx::Error> {
    let mut listener = PgListener::connect_with(&pool).await?;
    listener.listen(channel).await?;

    loop {
        let notification = listener.recv().await?;
        dispatch_payload(&hub, notification.payload());
    }
}

/// Publishes one notification payload. Malformed payloads are logged and dropped.
pub fn dispatch_payload(hub: &SubscriptionChangeHub, payload: &str) -> Option<SubscriptionChange> {
    match serde_json::from_str::<SubscriptionChange>(payload) {
        Ok(change) => {
            let receivers = hub.publish(change);
            debug!(user_id = %change.user_id, receivers, "subscription change received");
            Some(change)
        }
        Err(err) => {
            warn!(?err, payload, "ignoring malformed subscription notification");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn payload_is_forwarded_to_watchers() {
        let hub = SubscriptionChangeHub::new();
        let user_id = Uuid::new_v4();
        let mut rx = hub.subscribe(user_id);
        let payload = format!(r#"{{"user_id":"{}","op":"UPDATE"}}"#, user_id);

        let change = dispatch_payload(&hub, &payload).unwrap();
        assert_eq!(change.user_id, user_id);
        assert_eq!(rx.recv().await.unwrap().user_id, user_id);
    }

    #[test]
    fn malformed_payload_is_dropped() {
        let hub = SubscriptionChangeHub::new();
        assert!(dispatch_payload(&hub, "not json").is_none());
        assert!(dispatch_payload(&hub, r#"{"user_id":"nope"}"#).is_none());
    }
}
