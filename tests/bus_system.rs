//! End-to-end scenarios across the public API.
//!
//! Each test builds an isolated bus; nothing is shared between tests.
//! Where a scenario involves closing a channel, delivery is confirmed
//! first: closing discards whatever the channel still retains.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use typebus::{BusConfig, EventBus};

#[derive(Debug)]
struct Temperature {
    celsius: f64,
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn single_producer_single_consumer_ordered_delivery() {
    let bus = EventBus::new();
    let publisher = bus.create_publisher();
    let listener = bus.create_listener();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let consumer = tokio::spawn(async move {
        while let Some(event) = listener.wait::<u32>().await {
            tx.send(*event.data()).expect("collector alive");
        }
    });

    for n in 1..=100_u32 {
        publisher.publish(n).expect("channel open");
    }

    let mut seen = Vec::with_capacity(100);
    while seen.len() < 100 {
        seen.push(rx.recv().await.expect("event delivered"));
    }
    assert_eq!(seen, (1..=100).collect::<Vec<_>>());

    // Close is the end-of-stream signal: the waiter terminates.
    assert!(publisher.close_channel::<u32>());
    consumer.await.expect("consumer finished");

    assert_eq!(bus.load().event_count, 0);
    assert_eq!(bus.channel_count(), 0);
}

#[tokio::test]
async fn events_are_routed_by_type() {
    let bus = EventBus::new();
    let publisher = bus.create_publisher();
    let listener = bus.create_listener();

    publisher.publish(7_i32).expect("channel open");
    publisher.publish(String::from("seven")).expect("channel open");
    publisher
        .publish(Temperature { celsius: 7.0 })
        .expect("channel open");

    assert_eq!(bus.channel_count(), 3);

    assert_eq!(*listener.read::<i32>().expect("int event").data(), 7);
    assert_eq!(listener.read::<String>().expect("string event").data(), "seven");
    assert_eq!(
        listener
            .read::<Temperature>()
            .expect("struct event")
            .data()
            .celsius,
        7.0
    );

    // Each channel held exactly one event; nothing leaked across types.
    assert!(listener.read::<i32>().is_none());
    assert!(listener.read::<String>().is_none());
    assert!(listener.read::<Temperature>().is_none());
}

#[tokio::test]
async fn late_subscriber_sees_only_new_events() {
    let bus = EventBus::new();
    let publisher = bus.create_publisher();

    for n in 1..=10_u32 {
        publisher.publish(n).expect("channel open");
    }
    bus.free_events(0);

    let listener = bus.create_listener();
    assert!(listener.read::<u32>().is_none());

    publisher.publish(11_u32).expect("channel open");
    assert_eq!(*listener.read::<u32>().expect("fresh event").data(), 11);
    assert!(listener.read::<u32>().is_none());
}

#[tokio::test]
async fn multiple_listeners_observe_the_same_stream() {
    let bus = EventBus::new();
    let publisher = bus.create_publisher();
    let listeners = [
        bus.create_listener(),
        bus.create_listener(),
        bus.create_listener(),
    ];

    for n in 0..50_u32 {
        publisher.publish(n).expect("channel open");
    }

    for listener in &listeners {
        let seen: Vec<u32> = std::iter::from_fn(|| listener.read::<u32>())
            .map(|event| *event.data())
            .collect();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn close_wakes_a_waiting_listener() {
    let bus = EventBus::new();
    let publisher = bus.create_publisher();
    let listener = bus.create_listener();

    // Materialize the channel so the waiter and the closer race on the
    // same one.
    publisher.publish(0_u64).expect("channel open");
    listener.read::<u64>().expect("warm-up event");

    let closer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        publisher.close_channel::<u64>()
    });

    let outcome = tokio::time::timeout(Duration::from_secs(2), listener.wait::<u64>())
        .await
        .expect("woke within bounded latency");
    assert!(outcome.is_none());
    assert!(closer.await.expect("closer finished"));
}

#[tokio::test]
async fn dynamic_free_divides_the_budget_across_channels() {
    #[derive(Debug)]
    struct Small([u8; 4]);
    #[derive(Debug)]
    struct Medium([u8; 8]);
    #[derive(Debug)]
    struct Large([u8; 16]);

    let bus = EventBus::new();
    let publisher = bus.create_publisher();
    for n in 0..100_u8 {
        publisher.publish(Small([n; 4])).expect("channel open");
        publisher.publish(Medium([n; 8])).expect("channel open");
        publisher.publish(Large([n; 16])).expect("channel open");
    }

    // 240 bytes over 3 channels = 80 each: 20 Small, 10 Medium, 5 Large.
    bus.dynamic_free(240);
    let load = bus.load();
    assert_eq!(load.channel_count, 3);
    assert_eq!(load.event_count, 20 + 10 + 5);
    assert_eq!(load.data_size, 20 * 4 + 10 * 8 + 5 * 16);

    // Monotonically non-increasing under a repeated identical budget.
    bus.dynamic_free(240);
    assert_eq!(bus.load().event_count, 35);

    let listener = bus.create_listener();
    let survivors: Vec<u8> = std::iter::from_fn(|| listener.read::<Small>())
        .map(|event| event.data().0[0])
        .collect();
    assert_eq!(survivors, (80..100).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_publishers_keep_per_channel_order() {
    let bus = Arc::new(EventBus::new());
    let mut producers = Vec::new();
    for p in 0..4_u64 {
        let bus = Arc::clone(&bus);
        producers.push(tokio::spawn(async move {
            let publisher = bus.create_publisher();
            for n in 0..250_u64 {
                publisher.publish(p * 1_000 + n).expect("channel open");
            }
        }));
    }
    for producer in producers {
        producer.await.expect("producer finished");
    }

    let listener = bus.create_listener();
    let events: Vec<_> = std::iter::from_fn(|| listener.read::<u64>()).collect();
    assert_eq!(events.len(), 1_000);

    // Positions are contiguous and strictly increasing: no duplicates,
    // no gaps, no re-orderings.
    for (expected, event) in events.iter().enumerate() {
        assert_eq!(event.position(), expected as u64);
    }

    // Each producer's own values appear in its publication order.
    for p in 0..4_u64 {
        let published: Vec<u64> = events
            .iter()
            .map(|event| *event.data())
            .filter(|v| v / 1_000 == p)
            .collect();
        assert_eq!(published, (0..250).map(|n| p * 1_000 + n).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn publisher_ids_are_stamped_and_stable() {
    let bus = EventBus::new();
    let first = bus.create_publisher();
    let second = bus.create_publisher();
    let listener = bus.create_listener();

    first.publish(1_u16).expect("channel open");
    second.publish(2_u16).expect("channel open");

    let a = listener.read::<u16>().expect("first event");
    let b = listener.read::<u16>().expect("second event");
    assert_eq!(a.publisher(), first.id());
    assert_eq!(b.publisher(), second.id());

    // Re-reading the retained event yields the same attribution.
    let snapshot = listener.read_latest::<u16>().expect("tail event");
    assert_eq!(snapshot.publisher(), second.id());
    assert_eq!(snapshot.id(), b.id());
}

#[tokio::test]
async fn republish_after_remove_starts_a_fresh_stream() {
    let bus = EventBus::new();
    let publisher = bus.create_publisher();
    let listener = bus.create_listener();

    publisher.publish(1_i8).expect("channel open");
    let channel_before_close = listener.read::<i8>().expect("event");
    assert_eq!(*channel_before_close.data(), 1);

    assert!(publisher.close_channel::<i8>());

    // The old channel is gone; the registry creates a fresh one on the
    // next publish, and the listener follows it from the start.
    publisher.publish(2_i8).expect("fresh channel open");
    assert_eq!(*listener.read::<i8>().expect("fresh event").data(), 2);
}

#[tokio::test]
async fn blocked_channel_rejects_writes_but_serves_reads() {
    let bus = EventBus::new();
    let publisher = bus.create_publisher();
    let listener = bus.create_listener();

    publisher.publish(1_u32).expect("channel open");
    assert!(publisher.block_channel::<u32>());

    assert!(publisher.publish(2_u32).is_err());
    assert_eq!(*listener.read::<u32>().expect("reads still work").data(), 1);
    assert!(listener.read_latest::<u32>().is_some());

    assert!(publisher.unblock_channel::<u32>());
    publisher.publish(3_u32).expect("accepted after unblock");
    assert_eq!(*listener.read::<u32>().expect("next event").data(), 3);
}

#[tokio::test]
async fn reclaim_applies_the_configured_budget() {
    let bus = EventBus::with_config(BusConfig {
        memory_limit: Some(8 * std::mem::size_of::<u64>()),
    });
    let publisher = bus.create_publisher();
    for n in 0..32_u64 {
        publisher.publish(n).expect("channel open");
    }

    assert!(bus.reclaim());
    assert_eq!(bus.load().event_count, 8);

    let listener = bus.create_listener();
    assert_eq!(*listener.read::<u64>().expect("retained head").data(), 24);
}
