//! # Integration Test Flows
//!
//! Registry, event bus, feed and snapshots working together:
//!
//! 1. **Replay**: the event log alone rebuilds the ownership table
//! 2. **Feed**: replay plus live delivery, each event exactly once
//! 3. **Races**: concurrent registrations of one name
//! 4. **Currencies**: native and stablecoin books stay apart
//! 5. **Oracle**: a refreshed rate reprices native quotes only
//! 6. **Migration**: first-version state keeps its quotes at parity

#[cfg(test)]
mod tests {
    use dr_01_registry::domain::snapshot::{
        BookSnapshot, DomainV1, EventRecordV1, EventV1, SNAPSHOT_V1_VERSION,
    };
    use dr_01_registry::prelude::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    const ADMIN: Address = Address::repeat_byte(0xAD);
    const ALICE: Address = Address::repeat_byte(0xA1);
    const BOB: Address = Address::repeat_byte(0xB0);
    const CAROL: Address = Address::repeat_byte(0xC0);

    fn eth(raw: u64) -> NativeAmount {
        NativeAmount::from(raw)
    }

    fn usdc(raw: u64) -> StableAmount {
        StableAmount::from(raw)
    }

    fn funded_registry(price: u64) -> InMemoryRegistry {
        let registry = create_test_service(ADMIN, usdc(price)).unwrap();
        for account in [ADMIN, ALICE, BOB, CAROL] {
            registry.vault().fund(account, eth(10_000));
            registry.token().mint(account, usdc(10_000));
            registry.token().approve(account, usdc(10_000));
        }
        registry
    }

    // =========================================================================
    // REPLAY
    // =========================================================================

    /// Folding the log from the start reproduces the owner of every domain
    /// and each owner's domains in registration order.
    #[tokio::test]
    async fn test_event_replay_reconstructs_ownership() {
        let registry = funded_registry(10);

        registry.register_domain(ALICE, "com", eth(10)).await.unwrap();
        registry.register_domain(BOB, "org", eth(10)).await.unwrap();
        registry
            .update_subdomain_price(ALICE, usdc(4), "com")
            .await
            .unwrap();
        registry.register_domain(ALICE, "pay.com", eth(4)).await.unwrap();
        registry
            .register_domain_usdc(CAROL, "shop.org", usdc(2))
            .await
            .unwrap();
        registry.register_domain(BOB, "x.pay.com", eth(10)).await.unwrap();
        registry.update_domain_price(ADMIN, usdc(20)).await.unwrap();
        registry.register_domain(ALICE, "net", eth(20)).await.unwrap();

        // Rejected operations leave no trace in the log.
        assert!(registry.register_domain(BOB, "com", eth(20)).await.is_err());
        assert!(registry.register_domain(BOB, "a.b", eth(20)).await.is_err());
        assert!(registry
            .update_subdomain_price(BOB, usdc(1), "com")
            .await
            .is_err());

        let events = registry.events_from(0).await;
        assert_eq!(events.len(), 8);
        for (expected, record) in events.iter().enumerate() {
            assert_eq!(record.sequence, expected as u64);
        }

        let projection = OwnershipProjection::replay(&events);
        let table: HashMap<String, Address> = registry
            .snapshot()
            .await
            .domains
            .into_iter()
            .map(|d| (d.name.as_str().to_string(), d.owner))
            .collect();
        assert_eq!(projection.owners, table);

        assert_eq!(
            projection.domains_by_owner[&ALICE],
            vec!["com", "pay.com", "net"]
        );
        assert_eq!(projection.domains_by_owner[&BOB], vec!["org", "x.pay.com"]);
        assert_eq!(projection.domains_by_owner[&CAROL], vec!["shop.org"]);

        let alice_registrations: Vec<String> = registry
            .registrations_by_owner(ALICE, 0)
            .await
            .into_iter()
            .filter_map(|r| match r.event {
                RegistryEvent::DomainRegistered { domain, .. } => Some(domain),
                RegistryEvent::PriceChanged { .. } => None,
            })
            .collect();
        assert_eq!(alice_registrations, projection.domains_by_owner[&ALICE]);
    }

    // =========================================================================
    // FEED
    // =========================================================================

    /// Events committed before and after the feed opens arrive once each,
    /// in order.
    #[tokio::test]
    async fn test_feed_replays_then_follows() {
        let registry = Arc::new(funded_registry(1));
        registry.register_domain(ALICE, "a", eth(1)).await.unwrap();
        registry.register_domain(BOB, "b", eth(1)).await.unwrap();

        let mut feed = registry.open_feed(EventFilter::all(), 0).await;

        let writer = Arc::clone(&registry);
        let producer = tokio::spawn(async move {
            for name in ["c", "d", "e"] {
                writer.register_domain(CAROL, name, eth(1)).await.unwrap();
            }
        });

        let mut seen = Vec::new();
        while seen.len() < 5 {
            let record = timeout(Duration::from_secs(2), feed.next())
                .await
                .expect("feed stalled")
                .unwrap();
            seen.push(record.sequence);
        }
        producer.await.unwrap();

        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert_eq!(feed.try_next().await.unwrap(), None);
    }

    /// A feed filtered to one owner only sees that owner's registrations.
    #[tokio::test]
    async fn test_feed_filter_by_owner() {
        let registry = funded_registry(1);
        registry.register_domain(ALICE, "a", eth(1)).await.unwrap();

        let mut feed = registry
            .open_feed(EventFilter::registrations_of(BOB), 0)
            .await;
        registry.register_domain(ALICE, "b", eth(1)).await.unwrap();
        registry.register_domain(BOB, "c", eth(1)).await.unwrap();

        let record = timeout(Duration::from_secs(2), feed.next())
            .await
            .expect("feed stalled")
            .unwrap();
        assert_eq!(record.event.owner(), Some(BOB));
        assert_eq!(record.sequence, 2);
        assert_eq!(feed.try_next().await.unwrap(), None);
    }

    // =========================================================================
    // RACES
    // =========================================================================

    /// Of many concurrent claims on one name exactly one wins and only the
    /// winner pays.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_of_one_name() {
        let registry = Arc::new(create_test_service(ADMIN, usdc(5)).unwrap());
        let claimants: Vec<Address> = (1..=8u8).map(Address::repeat_byte).collect();
        for account in &claimants {
            registry.vault().fund(*account, eth(5));
        }

        let handles: Vec<_> = claimants
            .iter()
            .map(|account| {
                let registry = Arc::clone(&registry);
                let account = *account;
                tokio::spawn(async move {
                    registry.register_domain(account, "race", eth(5)).await
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(err) => assert_eq!(err, RegistryError::DuplicateDomain("race".into())),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(registry.events_from(0).await.len(), 1);
        assert_eq!(registry.domain_owner_earnings_eth(ADMIN).await, eth(5));
        assert_eq!(registry.vault().held(), eth(5));

        let owner = registry.domain_owner("race").await.unwrap();
        for account in claimants.iter().filter(|a| **a != owner) {
            assert_eq!(registry.vault().wallet_balance(account), eth(5));
        }
        assert!(registry.is_solvent().await);
    }

    // =========================================================================
    // CURRENCIES
    // =========================================================================

    /// Native and stablecoin proceeds accrue and drain independently.
    #[tokio::test]
    async fn test_currency_books_are_separate() {
        let registry = funded_registry(10);

        registry.register_domain(BOB, "shop", eth(12)).await.unwrap();
        registry
            .register_domain_usdc(CAROL, "mall", usdc(3))
            .await
            .unwrap();

        // Native overpayment is kept in full.
        assert_eq!(registry.domain_owner_earnings_eth(ADMIN).await, eth(12));
        assert_eq!(registry.domain_owner_earnings_usdc(ADMIN).await, usdc(10));

        assert_eq!(registry.withdraw_usdc(ADMIN).await.unwrap(), usdc(10));
        assert_eq!(registry.domain_owner_earnings_eth(ADMIN).await, eth(12));
        assert_eq!(registry.withdraw(ADMIN).await.unwrap(), eth(12));

        assert_eq!(registry.token().balance_of(&ADMIN), usdc(10_010));
        assert_eq!(registry.vault().paid_out_to(&ADMIN), eth(12));
        assert_eq!(registry.withdraw(ADMIN).await.unwrap(), NativeAmount::ZERO);
        assert!(registry.is_solvent().await);
    }

    // =========================================================================
    // ORACLE
    // =========================================================================

    /// A refreshed rate changes what native payers owe; stable prices hold.
    #[tokio::test]
    async fn test_rate_refresh_reprices_native_quotes() {
        let registry = funded_registry(10);
        assert_eq!(registry.subdomain_price_wei("").await.unwrap(), eth(10));

        registry
            .oracle()
            .set_rate(ConversionRate::new(U256::from(2_500_000u64)));
        registry.update_usdc2eth_rate(CAROL).await.unwrap();

        assert_eq!(registry.subdomain_price_usdc("").await.unwrap(), usdc(10));
        assert_eq!(registry.subdomain_price_wei("").await.unwrap(), eth(25));
        assert!(matches!(
            registry.register_domain(BOB, "shop", eth(24)).await,
            Err(RegistryError::NotEnoughFunds { .. })
        ));
        registry.register_domain(BOB, "shop", eth(25)).await.unwrap();

        // Stablecoin payers are unaffected by the rate.
        registry
            .register_domain_usdc(ALICE, "mall", usdc(1))
            .await
            .unwrap();
        assert_eq!(registry.domain_owner_earnings_usdc(ADMIN).await, usdc(10));
    }

    // =========================================================================
    // MIGRATION
    // =========================================================================

    fn first_version_state() -> SnapshotV1 {
        SnapshotV1 {
            version: SNAPSHOT_V1_VERSION,
            administrator: ADMIN,
            domain_price: eth(7),
            domains: vec![
                DomainV1 {
                    name: "com".into(),
                    owner: ALICE,
                    subdomain_price: eth(3),
                },
                DomainV1 {
                    name: "pay.com".into(),
                    owner: BOB,
                    subdomain_price: eth(7),
                },
            ],
            earnings: BookSnapshot {
                balances: vec![(ADMIN, eth(7)), (ALICE, eth(3))],
                received: eth(10),
                paid_out: NativeAmount::ZERO,
            },
            events: vec![
                EventRecordV1 {
                    sequence: 0,
                    committed_at: 100,
                    event: EventV1::DomainRegistered {
                        registrant: ALICE,
                        owner: ALICE,
                        domain: "com".into(),
                    },
                },
                EventRecordV1 {
                    sequence: 1,
                    committed_at: 200,
                    event: EventV1::PriceChanged {
                        new_price: eth(3),
                        old_price: eth(7),
                    },
                },
                EventRecordV1 {
                    sequence: 2,
                    committed_at: 300,
                    event: EventV1::DomainRegistered {
                        registrant: BOB,
                        owner: BOB,
                        domain: "pay.com".into(),
                    },
                },
            ],
        }
    }

    fn restore(snapshot: RegistrySnapshot) -> InMemoryRegistry {
        let vault = Arc::new(InMemoryNativeVault::new());
        if let Some(owed) = snapshot.native_ledger.outstanding() {
            vault.deposit_custody(owed);
        }
        DomainRegistryService::from_snapshot(
            snapshot,
            16,
            Arc::new(FixedRateOracle::default()),
            Arc::new(InMemoryStablecoin::new(IN_MEMORY_REGISTRY_ACCOUNT)),
            vault,
        )
        .unwrap()
    }

    /// First-version state migrated at parity quotes exactly what it did
    /// before, and its earnings stay withdrawable.
    #[tokio::test]
    async fn test_first_version_migration_keeps_quotes() {
        let json = serde_json::to_string(&first_version_state()).unwrap();
        let snapshot = decode_snapshot(&json, ConversionRate::parity()).unwrap();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);

        let registry = restore(snapshot);

        assert_eq!(registry.subdomain_price_wei("").await.unwrap(), eth(7));
        assert_eq!(registry.subdomain_price_wei("com").await.unwrap(), eth(3));
        assert_eq!(registry.subdomain_price_usdc("com").await.unwrap(), usdc(3));
        assert_eq!(registry.domain_owner("pay.com").await, Some(BOB));
        assert_eq!(registry.domain_owner_earnings_eth(ALICE).await, eth(3));
        assert_eq!(
            registry.domain_owner_earnings_usdc(ALICE).await,
            StableAmount::ZERO
        );

        let events = registry.events_from(0).await;
        assert_eq!(events.len(), 3);
        match &events[0].event {
            RegistryEvent::DomainRegistered {
                child_price_stable, ..
            } => assert_eq!(*child_price_stable, usdc(3)),
            other => panic!("unexpected event {other:?}"),
        }

        assert_eq!(registry.withdraw(ALICE).await.unwrap(), eth(3));
        // Sequence numbers continue after the migrated history.
        registry.vault().fund(CAROL, eth(3));
        let record = registry.register_domain(CAROL, "x.com", eth(3)).await.unwrap();
        assert_eq!(record.sequence, 3);
    }

    /// Migrating at a different rate keeps stable figures and moves native
    /// quotes with the rate.
    #[tokio::test]
    async fn test_first_version_migration_at_market_rate() {
        let json = serde_json::to_string(&first_version_state()).unwrap();
        let rate = ConversionRate::new(U256::from(2_000_000u64));
        let registry = restore(decode_snapshot(&json, rate).unwrap());

        assert_eq!(registry.subdomain_price_usdc("").await.unwrap(), usdc(7));
        assert_eq!(registry.subdomain_price_wei("").await.unwrap(), eth(14));
        assert_eq!(registry.rate().await, rate);
    }
}
