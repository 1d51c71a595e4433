use tagchat_core::error::{PeerError, SessionError};
use tagchat_core::session::CallOutcome;
use tagchat_core::{ConnectOutcome, PeerId, Phase};

use crate::integration::init_tracing;
use crate::utils::*;

#[tokio::test]
async fn test_call_not_established() {
    init_tracing();

    run_local(async {
        let t = TestSession::new();
        t.start().await;
        t.matchmaker.set_partner(Some(PARTNER_ID));

        let session = t.session.clone();
        let connect = tokio::task::spawn_local(async move { session.connect().await });

        let peer = t.peer.clone();
        settle_until(64, || peer.last_call().is_some()).await;
        let call = t.peer.last_call().unwrap();
        let connection = t.peer.last_connection().unwrap();

        call.hang_up();

        let outcome = connect.await.unwrap().unwrap();
        assert_eq!(outcome, ConnectOutcome::NotEstablished);
        assert!(call.is_closed());
        assert!(connection.is_closed());

        let snapshot = t.session.snapshot();
        assert_eq!(snapshot.phase, Phase::Idle);
        assert!(!snapshot.loading);
        assert!(!snapshot.has_connection);
    })
    .await;
}

#[tokio::test]
async fn test_start_call_refused_closes_connection() {
    init_tracing();

    run_local(async {
        let t = TestSession::new();
        t.start().await;
        t.peer.set_refuse_calls(true);

        let err = match t.session.start_call(&PeerId::from(PARTNER_ID), None).await {
            Err(e) => e,
            Ok(CallOutcome::Established(_)) => panic!("call should not be established"),
            Ok(CallOutcome::NotEstablished) => panic!("expected an error"),
        };
        assert!(matches!(err, SessionError::Peer(PeerError::Rtc(_))));
        assert!(t.peer.last_connection().unwrap().is_closed());
        assert_eq!(t.session.phase(), Phase::Idle);
    })
    .await;
}
