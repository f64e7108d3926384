//! End-to-end connection lifecycle over the in-memory transport.

use std::time::Duration;

use assert_matches::assert_matches;
use bytes::Bytes;
use duplex_connection::{
    CloseReason, Connection, ConnectionConfig, ConnectionError, TransportError, memory_pair,
};
use duplex_core::logging::capture_logs;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tracing::Level;

const TIMEOUT: Duration = Duration::from_secs(5);
const BLOCKED: Duration = Duration::from_millis(100);

#[tokio::test]
async fn ping_echo_then_receive_error() {
    let (transport, mut peer) = memory_pair(8);
    let conn = Connection::create(transport).unwrap();

    conn.send("ping").await.unwrap();
    let on_wire = timeout(TIMEOUT, peer.next_sent()).await.unwrap().unwrap();
    assert_eq!(on_wire, Bytes::from_static(b"ping"));

    assert!(peer.deliver(on_wire).await);
    let echoed = timeout(TIMEOUT, conn.read()).await.unwrap().unwrap();
    assert_eq!(echoed, Bytes::from_static(b"ping"));

    assert!(peer.fail(TransportError::Io("connection reset".into())).await);
    timeout(TIMEOUT, conn.closed()).await.unwrap();

    assert_matches!(conn.read().await, Err(ConnectionError::Closed));
    assert_matches!(conn.send("pong").await, Err(ConnectionError::Closed));
    assert_eq!(conn.close_reason(), Some(CloseReason::ReceiveFailed));
    assert!(peer.is_closed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_closes_signal_once() {
    let (transport, peer) = memory_pair(8);
    let conn = Connection::create(transport).unwrap();

    let closers: Vec<_> = (0..32)
        .map(|_| {
            let conn = conn.clone();
            tokio::spawn(async move { conn.close() })
        })
        .collect();
    for closer in closers {
        closer.await.unwrap();
    }
    timeout(TIMEOUT, conn.terminated()).await.unwrap();

    assert_eq!(conn.stats().shutdown_signals, 1);
    assert_eq!(conn.close_reason(), Some(CloseReason::Local));
    assert!(peer.close_calls() >= 32);
}

#[tokio::test]
async fn operations_fail_fast_after_close() {
    let (transport, _peer) = memory_pair(8);
    let conn = Connection::create(transport).unwrap();
    conn.close();

    assert_matches!(conn.send("a").await, Err(ConnectionError::Closed));
    assert_matches!(conn.try_send("b"), Err(ConnectionError::Closed));
    assert_matches!(conn.read().await, Err(ConnectionError::Closed));

    conn.close();
    assert_eq!(conn.stats().shutdown_signals, 1);
}

#[tokio::test]
async fn payloads_keep_order_both_ways() {
    let (transport, mut peer) = memory_pair(16);
    let conn = Connection::create(transport).unwrap();

    for i in 0..100 {
        conn.send(format!("out-{i}")).await.unwrap();
    }
    for i in 0..100 {
        let got = timeout(TIMEOUT, peer.next_sent()).await.unwrap().unwrap();
        assert_eq!(got, Bytes::from(format!("out-{i}")));
    }

    let delivering = tokio::spawn(async move {
        for i in 0..100 {
            assert!(peer.deliver(format!("in-{i}")).await);
        }
        peer
    });
    for i in 0..100 {
        let got = timeout(TIMEOUT, conn.read()).await.unwrap().unwrap();
        assert_eq!(got, Bytes::from(format!("in-{i}")));
    }
    let _peer = delivering.await.unwrap();

    let stats = conn.stats();
    assert_eq!(stats.sent, 100);
    assert_eq!(stats.received, 100);
}

#[tokio::test]
async fn close_unblocks_pending_read() {
    let (transport, _peer) = memory_pair(8);
    let conn = Connection::create(transport).unwrap();

    let reader = conn.clone();
    let pending = tokio::spawn(async move { reader.read().await });
    sleep(Duration::from_millis(20)).await;
    assert!(!pending.is_finished());

    conn.close();
    let result = timeout(TIMEOUT, pending).await.unwrap().unwrap();
    assert_matches!(result, Err(ConnectionError::Closed));
}

#[tokio::test]
async fn close_unblocks_pending_send() {
    let (transport, _peer) = memory_pair(1);
    let conn = Connection::with_config(transport, ConnectionConfig::with_capacity(1)).unwrap();

    // peer buffer, the pump's in-progress send and the outbound queue
    for i in 0..3 {
        timeout(TIMEOUT, conn.send(format!("{i}"))).await.unwrap().unwrap();
    }

    let sender = conn.clone();
    let pending = tokio::spawn(async move { sender.send("blocked").await });
    sleep(Duration::from_millis(20)).await;
    assert!(!pending.is_finished());

    conn.close();
    let result = timeout(TIMEOUT, pending).await.unwrap().unwrap();
    assert_matches!(result, Err(ConnectionError::Closed));
}

#[tokio::test]
async fn overflow_blocks_then_drains_in_order() {
    let (transport, mut peer) = memory_pair(1);
    let config = ConnectionConfig {
        inbound_capacity: 4,
        outbound_capacity: 4,
    };
    let conn = Connection::with_config(transport, config).unwrap();

    // 4 queued, 1 held by the pump, 1 buffered at the peer
    for i in 0..6 {
        timeout(TIMEOUT, conn.send(format!("m{i}"))).await.unwrap().unwrap();
    }
    assert!(timeout(BLOCKED, conn.send("m6")).await.is_err());

    assert_matches!(conn.try_send("m7"), Err(ConnectionError::QueueFull));
    assert_eq!(conn.stats().dropped, 1);

    for i in 0..6 {
        let got = timeout(TIMEOUT, peer.next_sent()).await.unwrap().unwrap();
        assert_eq!(got, Bytes::from(format!("m{i}")));
    }
    assert!(!conn.is_closed());
}

#[tokio::test]
async fn each_payload_goes_to_one_reader() {
    let (transport, peer) = memory_pair(8);
    let conn = Connection::create(transport).unwrap();
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let conn = conn.clone();
            let seen = seen_tx.clone();
            tokio::spawn(async move {
                while let Ok(payload) = conn.read().await {
                    let _ = seen.send(payload);
                }
            })
        })
        .collect();
    drop(seen_tx);

    for i in 0..50 {
        assert!(peer.deliver(format!("{i}")).await);
    }

    let mut seen = Vec::new();
    for _ in 0..50 {
        let payload = timeout(TIMEOUT, seen_rx.recv()).await.unwrap().unwrap();
        seen.push(String::from_utf8(payload.to_vec()).unwrap());
    }
    conn.close();
    for reader in readers {
        timeout(TIMEOUT, reader).await.unwrap().unwrap();
    }

    assert!(seen_rx.try_recv().is_err());
    let mut numbers: Vec<u32> = seen.iter().map(|s| s.parse().unwrap()).collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (0..50).collect::<Vec<_>>());
}

#[tokio::test]
async fn dropping_every_handle_releases_transport() {
    let (transport, mut peer) = memory_pair(8);
    let conn = Connection::create(transport).unwrap();
    drop(conn);

    assert!(peer.is_closed());
    // the transport is released once both pumps have exited
    let end = timeout(TIMEOUT, peer.next_sent()).await.unwrap();
    assert!(end.is_none());
}

#[tokio::test]
async fn peer_hangup_closes_with_peer_closed() {
    let (transport, mut peer) = memory_pair(8);
    let conn = Connection::create(transport).unwrap();
    assert!(peer.deliver("last words").await);
    peer.disconnect();

    timeout(TIMEOUT, conn.closed()).await.unwrap();
    timeout(TIMEOUT, conn.terminated()).await.unwrap();
    assert_eq!(conn.close_reason(), Some(CloseReason::PeerClosed));
    assert_matches!(conn.read().await, Err(ConnectionError::Closed));
}

#[tokio::test]
async fn send_error_tears_down_both_directions() {
    let (transport, peer) = memory_pair(8);
    let conn = Connection::create(transport).unwrap();
    peer.fail_sends(TransportError::Io("broken pipe".into()));

    let reader = conn.clone();
    let pending = tokio::spawn(async move { reader.read().await });
    sleep(Duration::from_millis(20)).await;
    assert!(!pending.is_finished());

    conn.send("x").await.unwrap();

    let result = timeout(TIMEOUT, pending).await.unwrap().unwrap();
    assert_matches!(result, Err(ConnectionError::Closed));
    assert_eq!(conn.close_reason(), Some(CloseReason::SendFailed));
    timeout(TIMEOUT, conn.terminated()).await.unwrap();
    assert!(peer.is_closed());
    assert_eq!(conn.stats().sent, 0);
}

#[tokio::test]
async fn lifecycle_is_logged() {
    let (logs, _guard) = capture_logs();
    let (transport, _peer) = memory_pair(1);
    let conn = Connection::with_config(transport, ConnectionConfig::with_capacity(1)).unwrap();
    let id = conn.id().to_owned();

    conn.close();
    timeout(TIMEOUT, conn.terminated()).await.unwrap();

    assert!(logs.has_span("inbound_pump"));
    assert!(logs.has_span("outbound_pump"));
    assert!(logs.has_message("connection opened"));
    assert!(logs.has_message("inbound pump exited"));
    assert!(logs.has_message("outbound pump exited"));

    let closed = logs.find("connection closed").unwrap();
    assert_eq!(closed.field("connection_id"), Some(id.as_str()));
    assert_eq!(closed.field("reason"), Some("local"));
}

#[tokio::test]
async fn queue_full_is_logged_at_warn() {
    let (logs, _guard) = capture_logs();
    let (transport, _peer) = memory_pair(1);
    let conn = Connection::with_config(transport, ConnectionConfig::with_capacity(1)).unwrap();

    let mut rejected = 0;
    for i in 0..10 {
        if conn.try_send(format!("{i}")).is_err() {
            rejected += 1;
        }
    }
    assert!(rejected > 0);
    assert_eq!(conn.stats().dropped, rejected);
    assert!(logs.has_event(Level::WARN, "outbound queue full"));
}
