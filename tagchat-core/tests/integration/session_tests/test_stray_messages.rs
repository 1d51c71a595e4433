use std::rc::Rc;
use tagchat_core::Phase;
use tagchat_core::error::{ProtocolError, SessionError};
use tagchat_core::traits::{DataConnection, PeerEvent};

use crate::integration::init_tracing;
use crate::utils::*;

#[tokio::test]
async fn test_malformed_messages_are_ignored() {
    init_tracing();

    run_local(async {
        let t = TestSession::new();
        t.start().await;
        let (_call, connection, remote) = t.establish_outbound_call().await;

        connection.receive("STOP");
        connection.receive(r#"{"type":"PAUSE"}"#);
        connection.receive("");
        settle().await;

        assert_eq!(t.session.phase(), Phase::InCall);
        assert!(!remote.is_stopped());

        let current: Rc<dyn DataConnection> = connection.clone();
        let err = t.session.handle_message(&current, "{not json").unwrap_err();
        assert!(matches!(
            err,
            SessionError::Protocol(ProtocolError::Malformed { .. })
        ));
        assert_eq!(t.session.phase(), Phase::InCall);
    })
    .await;
}

#[tokio::test]
async fn test_stop_from_stale_connection_is_ignored() {
    init_tracing();

    run_local(async {
        let t = TestSession::new();
        t.start().await;
        let (_call, old_connection, remote) = t.establish_outbound_call().await;

        let newer = MockConnection::new("someone-else");
        t.peer.emit(PeerEvent::Connection(newer.clone()));
        settle().await;
        assert!(old_connection.is_closed());

        let stale: Rc<dyn DataConnection> = old_connection.clone();
        t.session.handle_message(&stale, r#"{"type":"STOP"}"#).unwrap();

        assert_eq!(t.session.phase(), Phase::InCall);
        assert!(!remote.is_stopped());
        assert!(t.session.snapshot().has_connection);

        // The current connection still controls the call.
        newer.receive(r#"{"type":"STOP"}"#);
        let session = t.session.clone();
        settle_until(64, || session.phase() == Phase::Idle).await;
        assert!(remote.is_stopped());
    })
    .await;
}
