//! Typed routing demo.
//!
//! Three unrelated payload types share one bus; each gets its own
//! channel and its own callback-driven listen worker.
//!
//! What it shows:
//! - Implementing `Handler` and registering plain closures
//! - Per-type channels created on first publish
//! - Byte-budget reclamation with `dynamic_free`
//!
//! Run with:
//! `cargo run --example typed_routing`

use async_trait::async_trait;

use typebus::{Event, EventBus, Handler};

#[derive(Debug)]
struct OrderPlaced {
    order_id: u64,
}

#[derive(Debug)]
struct StockDepleted {
    sku: &'static str,
}

struct OrderAudit;

#[async_trait]
impl Handler<OrderPlaced> for OrderAudit {
    async fn on_event(&self, event: Event<OrderPlaced>) {
        println!("[audit] order {} recorded", event.data().order_id);
    }

    fn name(&self) -> &'static str {
        "order-audit"
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "typebus=debug".into()),
        )
        .init();

    let bus = EventBus::new();
    let publisher = bus.create_publisher();
    let listener = bus.create_listener();

    listener.listen(OrderAudit);
    listener.listen(|event: Event<StockDepleted>| {
        println!("[stock] {} ran out", event.data().sku);
    });

    for order_id in 1..=5 {
        publisher
            .publish(OrderPlaced { order_id })
            .expect("channel open");
    }
    publisher
        .publish(StockDepleted { sku: "TB-1042" })
        .expect("channel open");
    publisher.publish(String::from("free-form note")).expect("channel open");

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let load = bus.load();
    println!(
        "[bus] channels={} events={} bytes={}",
        load.channel_count, load.event_count, load.data_size
    );

    // Keep roughly half the retained bytes, split evenly per channel.
    bus.dynamic_free(load.data_size / 2);
    println!("[bus] after reclaim: events={}", bus.load().event_count);

    publisher.close_channel::<OrderPlaced>();
    publisher.close_channel::<StockDepleted>();
    listener.shutdown().await;
}
