//! Waiting List Demo
//!
//! Runs a sold-out event end to end:
//! - Alice takes the only ticket offer
//! - Bob joins the waiting list
//! - Alice lets her offer lapse; Bob is promoted
//! - Bob buys the ticket
//!
//! # Usage
//!
//! ```bash
//! OFFER_TTL_SECS=2 cargo run --bin waitlist-demo
//! ```

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use ticket_waitlist::{
    Config, WaitlistApp,
    metrics::register_waitlist_metrics,
    types::{EntryStatus, Money, UserId},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let mut config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.observability.log_level)
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if std::env::var("OFFER_TTL_SECS").is_err() {
        // Keep the demo short
        config.offers.ttl_secs = 2;
    }

    if let Some(port) = config.observability.metrics_port {
        let host: IpAddr = config.observability.metrics_host.parse()?;
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(host, port))
            .install()?;
        tracing::info!(%host, port, "Prometheus exporter listening");
    }
    register_waitlist_metrics();

    let ttl = Duration::from_secs(config.offers.ttl_secs);
    let app = WaitlistApp::start(config);
    let service = app.service().clone();

    println!("\n🎫 Waiting List Demo\n");

    // Step 1: one ticket, two fans
    let event_id = app.catalog().create_event(1)?;
    let alice = UserId::new("alice");
    let bob = UserId::new("bob");
    println!("1️⃣  Event {event_id} created with 1 ticket");

    let offer = service.join_waiting_list(event_id, alice.clone()).await?;
    println!("2️⃣  Alice joins: {:?} - {}", offer.status, offer.message);

    let availability = service.availability(event_id).await?;
    println!(
        "    Availability: {} remaining, sold out: {}",
        availability.remaining, availability.is_sold_out
    );

    let queued = service.join_waiting_list(event_id, bob.clone()).await?;
    println!("3️⃣  Bob joins: {:?} - {}", queued.status, queued.message);
    if let Some(position) = service.position(event_id, &bob).await {
        println!("    Bob's rank: {}", position.rank);
    }

    // Step 2: Alice never pays; her offer lapses
    println!("4️⃣  Waiting {}s for Alice's offer to lapse...", ttl.as_secs());
    tokio::time::sleep(ttl + Duration::from_millis(500)).await;

    let bob_entry = service.entry(event_id, queued.entry_id).await;
    match bob_entry.map(|entry| entry.status) {
        Some(EntryStatus::Offered { expires_at }) => {
            println!("    Bob was promoted; offer open until {expires_at}");
        }
        other => {
            println!("    Bob was not promoted (status {other:?})");
            app.shutdown().await;
            return Ok(());
        }
    }

    // Step 3: Bob buys
    let ticket_id = service
        .purchase(event_id, bob.clone(), queued.entry_id, "pi_demo_001", Money::from_dollars(50))
        .await?;
    println!("5️⃣  Bob bought ticket {ticket_id}");

    let availability = service.availability(event_id).await?;
    println!(
        "    Availability: {} purchased, {} remaining",
        availability.purchased_count, availability.remaining
    );
    for ticket in service.tickets_for_user(&bob).await {
        println!("    Bob holds {} ({})", ticket.id, ticket.amount);
    }

    app.shutdown().await;
    println!("\n✓ Demo complete\n");
    Ok(())
}
