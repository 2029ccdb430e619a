//! # End-to-End Registration Tests
//!
//! The registry behind the withdraw relay, observed through its feed:
//!
//! ```text
//! [Registrants] ──register──→ [Registry] ──EventRecord──→ [Feed]
//!                                  ↑
//! [HTTP client] ──POST /withdraw──→ [Relay] ──withdraw()──┘
//! ```
//!
//! Top-level proceeds credit the administrator, so the scenario's "B earns
//! 100 for shop" holds when B is the administrator. The companion test runs
//! the same script with a separate administrator.

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use dr_01_registry::prelude::*;
    use dr_02_withdraw_relay::prelude::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;
    use tower::ServiceExt;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    const ADMIN: Address = Address::repeat_byte(0xAD);
    const B: Address = Address::repeat_byte(0xB0);
    const C: Address = Address::repeat_byte(0xC0);
    const MALLORY: Address = Address::repeat_byte(0x66);

    fn eth(raw: u64) -> NativeAmount {
        NativeAmount::from(raw)
    }

    fn usdc(raw: u64) -> StableAmount {
        StableAmount::from(raw)
    }

    fn registry_administered_by(admin: Address) -> Arc<InMemoryRegistry> {
        let registry = create_test_service(admin, StableAmount::ZERO).unwrap();
        for account in [B, C] {
            registry.vault().fund(account, eth(1_000));
        }
        Arc::new(registry)
    }

    fn relay_for(registry: &Arc<InMemoryRegistry>) -> Router {
        let config = RelayConfig::with_accounts([ADMIN, B, C]);
        let registry: Arc<dyn DomainRegistryApi> = Arc::clone(registry) as _;
        WithdrawRelay::new(config, registry).unwrap().router()
    }

    async fn post_withdraw(
        relay: &Router,
        account: Address,
        currency: &str,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(format!("/withdraw/{account}?currency={currency}"))
            .body(Body::empty())
            .unwrap();
        let response = relay.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Steps shared by both scenarios: price 100, "shop" bought for 100,
    /// its child price cut to 50, "a.shop" bought for 50.
    async fn run_shop_script(registry: &InMemoryRegistry, admin: Address) {
        registry.update_domain_price(admin, usdc(100)).await.unwrap();

        registry.register_domain(B, "shop", eth(100)).await.unwrap();
        assert_eq!(registry.domain_owner("shop").await, Some(B));

        registry
            .update_subdomain_price(B, usdc(50), "shop")
            .await
            .unwrap();
        assert_eq!(registry.subdomain_price_wei("shop").await.unwrap(), eth(50));

        registry.register_domain(C, "a.shop", eth(50)).await.unwrap();
        assert_eq!(registry.domain_owner("a.shop").await, Some(C));
    }

    // =========================================================================
    // SCENARIOS
    // =========================================================================

    #[tokio::test]
    async fn test_shop_scenario_through_relay() {
        let registry = registry_administered_by(B);
        let relay = relay_for(&registry);
        let mut feed = registry.open_feed(EventFilter::all(), 0).await;

        run_shop_script(&registry, B).await;
        assert_eq!(registry.domain_owner_earnings_eth(B).await, eth(150));

        let (status, receipt) = post_withdraw(&relay, B, "eth").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["amount"], "150");
        assert_eq!(receipt["currency"], "eth");
        assert_eq!(registry.domain_owner_earnings_eth(B).await, NativeAmount::ZERO);
        assert_eq!(registry.vault().paid_out_to(&B), eth(150));

        // A second withdrawal pays nothing.
        let (status, receipt) = post_withdraw(&relay, B, "eth").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["amount"], "0");

        let mut topics = Vec::new();
        for _ in 0..4 {
            let record = timeout(Duration::from_secs(2), feed.next())
                .await
                .expect("feed stalled")
                .unwrap();
            topics.push(record.event.topic());
        }
        assert_eq!(
            topics,
            vec![
                EventTopic::Pricing,
                EventTopic::Registration,
                EventTopic::Pricing,
                EventTopic::Registration,
            ]
        );
        assert!(registry.is_solvent().await);
    }

    #[tokio::test]
    async fn test_shop_scenario_with_separate_administrator() {
        let registry = registry_administered_by(ADMIN);
        let relay = relay_for(&registry);

        run_shop_script(&registry, ADMIN).await;

        assert_eq!(registry.domain_owner_earnings_eth(ADMIN).await, eth(100));
        assert_eq!(registry.domain_owner_earnings_eth(B).await, eth(50));

        let (status, receipt) = post_withdraw(&relay, B, "eth").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["amount"], "50");

        let (status, receipt) = post_withdraw(&relay, ADMIN, "eth").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["amount"], "100");
        assert_eq!(registry.vault().held(), NativeAmount::ZERO);
    }

    #[tokio::test]
    async fn test_stablecoin_withdrawal_through_relay() {
        let registry = registry_administered_by(ADMIN);
        registry.update_domain_price(ADMIN, usdc(40)).await.unwrap();
        registry.token().mint(C, usdc(40));
        registry.token().approve(C, usdc(40));
        registry
            .register_domain_usdc(C, "mall", usdc(5))
            .await
            .unwrap();

        let relay = relay_for(&registry);
        let (status, receipt) = post_withdraw(&relay, ADMIN, "usdc").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["amount"], "40");
        assert_eq!(receipt["formatted"], "0.000040");
        assert_eq!(registry.token().balance_of(&ADMIN), usdc(40));
        assert_eq!(registry.token().balance_of(&C), StableAmount::ZERO);
    }

    // =========================================================================
    // FAILURE MAPPING
    // =========================================================================

    #[tokio::test]
    async fn test_relay_rejects_unknown_account_and_currency() {
        let registry = registry_administered_by(B);
        run_shop_script(&registry, B).await;
        let relay = relay_for(&registry);

        let (status, _) = post_withdraw(&relay, MALLORY, "eth").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_withdraw(&relay, B, "dai").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(registry.domain_owner_earnings_eth(B).await, eth(150));
    }

    #[tokio::test]
    async fn test_failed_payout_is_server_error_and_keeps_balance() {
        let registry = registry_administered_by(B);
        run_shop_script(&registry, B).await;
        registry.vault().refuse_payouts_to(B, true);
        let relay = relay_for(&registry);

        let (status, body) = post_withdraw(&relay, B, "eth").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().is_some_and(|m| !m.is_empty()));
        assert_eq!(registry.domain_owner_earnings_eth(B).await, eth(150));

        registry.vault().refuse_payouts_to(B, false);
        let (status, receipt) = post_withdraw(&relay, B, "eth").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["amount"], "150");
    }
}
