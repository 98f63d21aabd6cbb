//! Integration tests for fieldhand-bus
//!
//! Tests cover:
//! - Publishing through the bus and receiving in order
//! - Sharing cloned senders
//! - Behaviour once the receiver is gone

use fieldhand_bus::{drain, Notice, NoticeBus, NoticeLevel};

// ============================================================================
// Publishing
// ============================================================================

#[tokio::test]
async fn test_notices_arrive_in_order() {
    let (bus, mut rx) = NoticeBus::channel();

    assert!(bus.info("Farming started"));
    assert!(bus.warn("No seeds in storage"));
    assert!(bus.error("No space in granary. Stopping."));

    let first = rx.recv().await.expect("Should receive");
    assert_eq!(first.level, NoticeLevel::Info);
    assert_eq!(first.text, "Farming started");

    let rest = drain(&mut rx);
    assert_eq!(rest.len(), 2);
    assert_eq!(rest[0].level, NoticeLevel::Warning);
    assert!(rest[1].is_error());
}

#[tokio::test]
async fn test_cloned_bus_shares_receiver() {
    let (bus, mut rx) = NoticeBus::channel();
    let clone = bus.clone();

    let handle = tokio::spawn(async move {
        clone.publish(Notice::info("from task").for_field(3));
    });
    handle.await.expect("Task should finish");
    bus.info("from caller");

    let notices = drain(&mut rx);
    assert_eq!(notices.len(), 2);
    assert_eq!(notices[0].field, Some(3));
    assert_eq!(notices[1].field, None);
}

#[test]
fn test_drain_on_empty_channel() {
    let (_bus, mut rx) = NoticeBus::channel();
    assert!(drain(&mut rx).is_empty());
}

// ============================================================================
// Closed Receiver
// ============================================================================

#[test]
fn test_publish_after_receiver_dropped() {
    let (bus, rx) = NoticeBus::channel();
    assert!(!bus.is_closed());

    drop(rx);

    assert!(bus.is_closed());
    assert!(!bus.error("nobody hears this"));
}

#[test]
fn test_timestamps_do_not_go_backwards() {
    let (bus, mut rx) = NoticeBus::channel();
    for i in 0..5 {
        bus.info(format!("tick {}", i));
    }

    let notices = drain(&mut rx);
    assert!(notices
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));
}
