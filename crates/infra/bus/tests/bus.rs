//! Cross-thread delivery through the message bus

use std::{sync::Arc, thread};

use bus::MessageBus;

#[derive(Clone, Debug, PartialEq)]
enum Event {
    Quote { seq: u64 },
    Stop,
}

#[test]
fn test_fan_out_preserves_publish_order_across_threads() {
    let bus = Arc::new(MessageBus::<Event>::new());
    let (_, rx) = bus.subscribe("events.data.quote.SIM.AUD/USD");

    let consumer = thread::spawn(move || {
        let mut seen = Vec::new();
        while let Some(event) = rx.recv() {
            match event {
                Event::Quote { seq } => seen.push(seq),
                Event::Stop => break,
            }
        }
        seen
    });

    let publisher = Arc::clone(&bus);
    thread::spawn(move || {
        for seq in 0..100 {
            publisher.publish("events.data.quote.SIM.AUD/USD", Event::Quote { seq });
        }
        publisher.publish("events.data.quote.SIM.AUD/USD", Event::Stop);
    })
    .join()
    .unwrap();

    assert_eq!(consumer.join().unwrap(), (0..100).collect::<Vec<_>>());
}

#[test]
fn test_endpoint_shared_by_many_senders() {
    let bus = Arc::new(MessageBus::<Event>::new());
    let rx = bus.register_endpoint("data_engine_execute").unwrap();

    let senders: Vec<_> = (0..4)
        .map(|t| {
            let bus = Arc::clone(&bus);
            thread::spawn(move || {
                for i in 0..25 {
                    bus.send("data_engine_execute", Event::Quote { seq: t * 100 + i })
                        .unwrap();
                }
            })
        })
        .collect();
    for sender in senders {
        sender.join().unwrap();
    }

    assert_eq!(rx.drain().len(), 100);
}
