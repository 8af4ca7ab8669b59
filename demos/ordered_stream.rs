//! Ordered stream demo.
//!
//! One publisher pushes a numbered stream; one listener drives a
//! `wait` loop in a separate task and prints everything in order.
//!
//! What it shows:
//! - Creating a bus, a publisher, and a listener
//! - Blocking consumption with `Listener::wait`
//! - `close_channel` as the end-of-stream signal
//! - Load snapshots before and after reclamation
//!
//! Run with:
//! `cargo run --example ordered_stream`

use typebus::EventBus;

#[derive(Debug)]
struct Reading {
    sample: u64,
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

    let consumer = tokio::spawn(async move {
        let mut count = 0_u64;
        while let Some(event) = listener.wait::<Reading>().await {
            println!(
                "[consumer] sample={} position={} publisher={}",
                event.data().sample,
                event.position(),
                event.publisher()
            );
            count += 1;
        }
        println!("[consumer] stream closed after {count} events");
        count
    });

    for sample in 0..20 {
        publisher
            .publish(Reading { sample })
            .expect("channel accepts while open");
        if sample % 5 == 4 {
            tokio::task::yield_now().await;
        }
    }

    let load = bus.load();
    println!(
        "[bus] channels={} events={} bytes={}",
        load.channel_count, load.event_count, load.data_size
    );

    // Let the consumer drain before the close discards the tail.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    publisher.close_channel::<Reading>();

    let count = consumer.await.expect("consumer finished");
    println!("[bus] delivered {count} events, {} channels left", bus.channel_count());
}
