//! # Integration Test Flows
//!
//! Tests that pg-01-credentials, pg-02-heartbeat and the pg-03 subscription
//! manager work together through the shared bus.
//!
//! ## Flows Tested:
//!
//! 1. **Registration (01) → Bus → Subscription (03)**: one "new-user" event per registration
//! 2. **Authenticator (01) → Bus**: successful logins reach "login-success" subscribers
//! 3. **Heartbeat (02) → Bus → Subscription (03)**: strictly increasing ping timestamps
//! 4. **Detach**: closing a subscription releases its bus receiver

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use pg_01_credentials::{
        AuthenticatorApi, CredentialError, CredentialService, Credentials, HashingCost,
        InMemoryCredentialStore, RegistrationApi, SecretHasher, SeedUser,
    };
    use pg_02_heartbeat::{HeartbeatConfig, PingEmitter};
    use pg_03_api_gateway::domain::ConnectionId;
    use pg_03_api_gateway::{SubscriptionManager, SubscriptionNotification};
    use shared_bus::{EventSubscriber, EventTopic, GatewayEvent, InMemoryEventBus};
    use shared_types::UserId;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    type Service = CredentialService<InMemoryCredentialStore>;

    async fn seeded_service(bus: &Arc<InMemoryEventBus>) -> Arc<Service> {
        let service = Arc::new(CredentialService::new(
            Arc::new(InMemoryCredentialStore::new()),
            SecretHasher::new(HashingCost::MINIMAL).unwrap(),
            bus.clone(),
        ));
        service
            .seed(&[
                SeedUser::new("Pero", "pero-correct-horse", true),
                SeedUser::new("user2", "user2-secret", false),
            ])
            .await
            .unwrap();
        service
    }

    fn creds(identity: &str, secret: &str) -> Credentials {
        Credentials::new(Some(identity), Some(secret)).unwrap()
    }

    async fn next_notification(
        rx: &mut mpsc::Receiver<SubscriptionNotification>,
    ) -> SubscriptionNotification {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("notification timed out")
            .expect("sink closed")
    }

    async fn wait_for_subscribers(bus: &InMemoryEventBus, topic: EventTopic, expected: usize) {
        timeout(Duration::from_secs(2), async {
            while bus.subscriber_count(topic) != expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("subscriber count did not settle");
    }

    // =============================================================================
    // REGISTRATION → NEW-USER
    // =============================================================================

    #[tokio::test]
    async fn test_registration_reaches_every_open_subscription() {
        let bus = Arc::new(InMemoryEventBus::new());
        let service = seeded_service(&bus).await;
        let manager = SubscriptionManager::new(bus.clone(), 16);

        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        let sub_a = manager
            .open(ConnectionId::new(), EventTopic::NewUser, tx_a)
            .unwrap();
        let sub_b = manager
            .open(ConnectionId::new(), EventTopic::NewUser, tx_b)
            .unwrap();

        let record = service.register(&creds("newuser", "pw123")).await.unwrap();
        assert_eq!(record.id, UserId(3));
        assert!(!record.is_privileged);

        for (rx, sub_id) in [(&mut rx_a, &sub_a), (&mut rx_b, &sub_b)] {
            let notification = next_notification(rx).await;
            assert_eq!(&notification.params.subscription, sub_id);
            assert_eq!(
                notification.params.result,
                serde_json::json!({
                    "id": 3,
                    "username": "newuser",
                    "admin": false,
                    "firstLetterOfUsername": "n",
                })
            );
        }

        // Exactly one event per registration.
        assert!(timeout(Duration::from_millis(100), rx_a.recv()).await.is_err());

        // The new user can log in right away.
        assert!(service.verify(&creds("newuser", "pw123")).await);
        assert_eq!(service.user_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_registration_publishes_nothing() {
        let bus = Arc::new(InMemoryEventBus::new());
        let service = seeded_service(&bus).await;
        let mut sub = bus.subscribe(EventTopic::NewUser).unwrap();

        let err = service.register(&creds("Pero", "other")).await.unwrap_err();
        assert_eq!(err, CredentialError::IdentityTaken("Pero".into()));
        assert_eq!(service.user_count(), 2);
        assert!(matches!(sub.try_recv(), Ok(None)));
    }

    // =============================================================================
    // AUTHENTICATOR
    // =============================================================================

    #[tokio::test]
    async fn test_login_outcomes() {
        let bus = Arc::new(InMemoryEventBus::new());
        let service = seeded_service(&bus).await;
        let mut logins = bus.subscribe(EventTopic::LoginSuccess).unwrap();

        assert!(service.verify(&creds("Pero", "pero-correct-horse")).await);
        assert!(!service.verify(&creds("Pero", "wrong")).await);
        assert!(!service.verify(&creds("pero", "pero-correct-horse")).await);
        assert!(!service.verify(&creds("ghost", "anything")).await);

        let wrong = service.login(&creds("Pero", "wrong")).await.unwrap_err();
        let ghost = service.login(&creds("ghost", "wrong")).await.unwrap_err();
        assert_eq!(wrong, ghost);

        let user = service.login(&creds("user2", "user2-secret")).await.unwrap();
        assert_eq!(user.id, UserId(2));

        let event = timeout(Duration::from_secs(1), logins.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            GatewayEvent::LoginSucceeded(login) => assert_eq!(login.username, "user2"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_missing_fields_rejected_before_lookup() {
        assert_eq!(
            Credentials::new(None, Some("x")).unwrap_err(),
            CredentialError::AuthenticationDataMissing
        );
        assert_eq!(
            Credentials::new(Some("Pero"), None).unwrap_err(),
            CredentialError::AuthenticationDataMissing
        );
    }

    // =============================================================================
    // HEARTBEAT → PING
    // =============================================================================

    #[tokio::test]
    async fn test_heartbeat_pings_reach_subscription() {
        let bus = Arc::new(InMemoryEventBus::new());
        let manager = SubscriptionManager::new(bus.clone(), 16);
        let (tx, mut rx) = mpsc::channel(8);
        manager
            .open(ConnectionId::new(), EventTopic::Ping, tx)
            .unwrap();

        let emitter = PingEmitter::new(
            bus.clone(),
            &HeartbeatConfig::with_interval(Duration::from_millis(20)),
        )
        .unwrap();
        let handle = emitter.spawn();

        let mut last = 0i64;
        for _ in 0..3 {
            let notification = next_notification(&mut rx).await;
            let timestamp: i64 = notification.params.result["timestamp"]
                .as_str()
                .unwrap()
                .parse()
                .unwrap();
            assert!(timestamp > last);
            last = timestamp;
        }

        assert!(handle.shutdown().await.unwrap() >= 3);
    }

    // =============================================================================
    // DETACH
    // =============================================================================

    #[tokio::test]
    async fn test_connection_teardown_detaches_from_bus() {
        let bus = Arc::new(InMemoryEventBus::new());
        let manager = SubscriptionManager::new(bus.clone(), 16);
        let conn = ConnectionId::new();

        let (tx, _rx) = mpsc::channel(8);
        manager.open(conn, EventTopic::Ping, tx.clone()).unwrap();
        manager.open(conn, EventTopic::NewUser, tx).unwrap();
        assert_eq!(bus.total_subscriber_count(), 2);

        assert_eq!(manager.remove_connection(&conn), 2);
        wait_for_subscribers(&bus, EventTopic::Ping, 0).await;
        wait_for_subscribers(&bus, EventTopic::NewUser, 0).await;
        assert_eq!(manager.total_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_dropped_sink_detaches_on_next_event() {
        let bus = Arc::new(InMemoryEventBus::new());
        let service = seeded_service(&bus).await;
        let manager = SubscriptionManager::new(bus.clone(), 16);

        let (tx, rx) = mpsc::channel(8);
        manager
            .open(ConnectionId::new(), EventTopic::NewUser, tx)
            .unwrap();
        drop(rx);

        service.register(&creds("anna", "pw")).await.unwrap();
        wait_for_subscribers(&bus, EventTopic::NewUser, 0).await;
    }

    #[tokio::test]
    async fn test_bus_close_ends_subscriptions() {
        let bus = Arc::new(InMemoryEventBus::new());
        let manager = SubscriptionManager::new(bus.clone(), 16);
        let (tx, mut rx) = mpsc::channel(8);
        manager
            .open(ConnectionId::new(), EventTopic::Ping, tx)
            .unwrap();

        assert_eq!(bus.close(), 1);

        // The forwarder ends and drops its sink.
        let end = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert!(end.is_none());
        assert!(manager
            .open(ConnectionId::new(), EventTopic::Ping, mpsc::channel(1).0)
            .is_err());
    }
}
