use tokio::sync::broadcast;

/// Auth-state change pushed to the process-wide channel.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn { user_id: String },
    SignedOut { user_id: String },
    Refreshed { user_id: String },
}

/// Process-wide auth-event channel. One subscription is owned by the
/// composition root and torn down at shutdown; publishing with no subscriber
/// is a no-op.
#[derive(Clone)]
pub struct AuthEvents {
    tx: broadcast::Sender<AuthEvent>,
}

impl AuthEvents {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: AuthEvent) {
        let _ = self.tx.send(event);
    }

    pub fn signed_in(&self, user_id: &str) {
        self.publish(AuthEvent::SignedIn {
            user_id: user_id.to_string(),
        });
    }

    pub fn signed_out(&self, user_id: &str) {
        self.publish(AuthEvent::SignedOut {
            user_id: user_id.to_string(),
        });
    }

    pub fn refreshed(&self, user_id: &str) {
        self.publish(AuthEvent::Refreshed {
            user_id: user_id.to_string(),
        });
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_reach_subscriber() {
        let events = AuthEvents::new();
        let mut rx = events.subscribe();

        events.signed_in("u1");
        events.signed_out("u1");

        assert!(matches!(
            rx.recv().await.unwrap(),
            AuthEvent::SignedIn { user_id } if user_id == "u1"
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            AuthEvent::SignedOut { user_id } if user_id == "u1"
        ));
    }

    #[test]
    fn test_publish_without_subscriber_is_noop() {
        let events = AuthEvents::new();
        events.refreshed("u2");
    }
}
