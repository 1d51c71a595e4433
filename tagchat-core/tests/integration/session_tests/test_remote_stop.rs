use tagchat_core::Phase;
use tagchat_core::traits::PeerEvent;
use tagchat_core::traits::DataConnection;

use crate::integration::init_tracing;
use crate::utils::*;

#[tokio::test]
async fn test_remote_stop() {
    init_tracing();

    run_local(async {
        let t = TestSession::new();
        t.start().await;
        let (call, connection, remote) = t.establish_outbound_call().await;

        assert!(connection.receive(r#"{"type":"STOP"}"#));

        let session = t.session.clone();
        settle_until(64, || session.phase() == Phase::Idle).await;

        let snapshot = t.session.snapshot();
        assert!(snapshot.call_stream.is_none());
        assert!(!snapshot.has_connection);
        assert!(remote.is_stopped());
        assert!(call.is_closed());
        assert!(connection.is_closed());

        // No STOP is echoed back.
        assert!(connection.sent().is_empty());
        assert!(!t.media.last_stream().unwrap().is_stopped());
    })
    .await;
}

#[tokio::test]
async fn test_reconnect_after_remote_stop() {
    init_tracing();

    run_local(async {
        let t = TestSession::new();
        t.start().await;
        let (_call, connection, _remote) = t.establish_outbound_call().await;

        connection.receive(r#"{"type":"STOP"}"#);
        let session = t.session.clone();
        settle_until(64, || session.phase() == Phase::Idle).await;

        t.establish_outbound_call().await;
        assert_eq!(t.peer.calls().len(), 2);
        assert_eq!(t.session.phase(), Phase::InCall);
    })
    .await;
}

#[tokio::test]
async fn test_closed_connection_ends_call() {
    init_tracing();

    run_local(async {
        let t = TestSession::new();
        t.start().await;
        let (call, connection, remote) = t.establish_outbound_call().await;

        // The STOP never made it; the channel just went away.
        connection.close();

        let session = t.session.clone();
        settle_until(64, || session.phase() == Phase::Idle).await;

        let snapshot = t.session.snapshot();
        assert_eq!(snapshot.phase, Phase::Idle);
        assert!(!snapshot.has_connection);
        assert!(remote.is_stopped());
        assert!(call.is_closed());
        assert!(connection.sent().is_empty());
        assert!(!t.media.last_stream().unwrap().is_stopped());
    })
    .await;
}

#[tokio::test]
async fn test_replaced_connection_closing_keeps_call() {
    init_tracing();

    run_local(async {
        let t = TestSession::new();
        t.start().await;
        let (call, first_connection, _remote) = t.establish_outbound_call().await;

        // An inbound connection from someone else takes over.
        let second = MockConnection::new("someone-else");
        t.peer.emit(PeerEvent::Connection(second.clone()));
        let replaced = first_connection.clone();
        settle_until(64, || replaced.is_closed()).await;

        settle().await;
        assert_eq!(t.session.phase(), Phase::InCall);
        assert!(!call.is_closed());
        assert!(t.session.snapshot().has_connection);
    })
    .await;
}
