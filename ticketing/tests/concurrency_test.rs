//! Concurrent access to one event never oversells it.
//!
//! Run with: `cargo test --test concurrency_test -- --nocapture`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

mod common;

use common::Harness;
use futures::future::join_all;
use std::sync::Arc;
use ticket_waitlist::{
    ErrorKind,
    types::{JoinStatus, Money, UserId},
};

/// 50 fans race for a single ticket: exactly one offer goes out.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_for_last_ticket() {
    println!("🧪 50 concurrent joins, 1 ticket");
    let h = Arc::new(Harness::new());
    let event_id = h.event(1);

    let joins = (0..50).map(|i| {
        let service = h.service.clone();
        tokio::spawn(async move {
            service
                .join_waiting_list(event_id, UserId::new(format!("fan-{i}")))
                .await
                .unwrap()
        })
    });
    let receipts: Vec<_> = join_all(joins)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let offered = receipts
        .iter()
        .filter(|receipt| receipt.status == JoinStatus::Offered)
        .count();
    assert_eq!(offered, 1);

    let availability = h.availability(event_id).await;
    assert_eq!(availability.active_offers, 1);
    assert_eq!(availability.remaining, 0);

    let mut ranks = Vec::new();
    for i in 0..50 {
        ranks.push(h.rank(event_id, &format!("fan-{i}")).await.unwrap());
    }
    ranks.sort_unstable();
    assert_eq!(ranks, (1..=50).collect::<Vec<u32>>());
    println!("  ✅ One offer, 49 ranked waiters");
}

/// The same user joining many times at once gets exactly one entry.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_joins() {
    let h = Harness::new();
    let event_id = h.event(5);

    let joins = (0..10).map(|_| {
        let service = h.service.clone();
        tokio::spawn(async move { service.join_waiting_list(event_id, UserId::new("eager")).await })
    });
    let results: Vec<_> = join_all(joins)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let accepted = results.iter().filter(|result| result.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|result| {
            result
                .as_ref()
                .is_err_and(|error| error.kind() == ErrorKind::DuplicateEntry)
        })
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(rejected, 9);
    assert_eq!(h.availability(event_id).await.active_offers, 1);
}

/// Two events filled in parallel stay independent.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_events_fill_independently() {
    let h = Harness::new();
    let small = h.event(2);
    let large = h.event(10);

    let joins = (0..20).flat_map(|i| {
        [small, large].map(|event_id| {
            let service = h.service.clone();
            tokio::spawn(async move {
                service
                    .join_waiting_list(event_id, UserId::new(format!("fan-{i}")))
                    .await
                    .unwrap()
            })
        })
    });
    for joined in join_all(joins).await {
        joined.unwrap();
    }

    let small_view = h.availability(small).await;
    let large_view = h.availability(large).await;
    assert_eq!(small_view.active_offers, 2);
    assert_eq!(large_view.active_offers, 10);
    assert!(small_view.is_sold_out && large_view.is_sold_out);
}

/// Buying and releasing the same offer at once: exactly one wins.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_purchase_release_race() {
    for _ in 0..20 {
        let h = Harness::new();
        let event_id = h.event(1);
        let holder = h
            .service
            .join_waiting_list(event_id, UserId::new("holder"))
            .await
            .unwrap();
        h.service
            .join_waiting_list(event_id, UserId::new("next"))
            .await
            .unwrap();

        let buyer = h.service.clone();
        let releaser = h.service.clone();
        let entry_id = holder.entry_id;
        let purchase = tokio::spawn(async move {
            buyer
                .purchase(
                    event_id,
                    UserId::new("holder"),
                    entry_id,
                    "pi_race",
                    Money::from_dollars(50),
                )
                .await
        });
        let release = tokio::spawn(async move { releaser.release_ticket(event_id, entry_id).await });

        let bought = purchase.await.unwrap().is_ok();
        let released = release.await.unwrap().is_ok();
        assert!(bought ^ released, "bought={bought} released={released}");

        let availability = h.availability(event_id).await;
        assert!(availability.purchased_count + availability.active_offers <= 1);
        if released {
            assert_eq!(availability.active_offers, 1, "next in line was not promoted");
        } else {
            assert_eq!(availability.purchased_count, 1);
        }
    }
}
