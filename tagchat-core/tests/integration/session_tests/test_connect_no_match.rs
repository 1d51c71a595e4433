use tagchat_core::error::{MatchmakingError, SessionError};
use tagchat_core::{ConnectOutcome, Phase};

use crate::integration::init_tracing;
use crate::utils::*;

#[tokio::test]
async fn test_connect_no_match() {
    init_tracing();

    run_local(async {
        let t = TestSession::new();
        t.start().await;
        t.matchmaker.set_partner(None);
        t.clear_snapshots();

        let outcome = t.session.connect().await.unwrap();
        assert_eq!(outcome, ConnectOutcome::NoMatch);

        let snapshot = t.session.snapshot();
        assert_eq!(snapshot.phase, Phase::Idle);
        assert!(!snapshot.loading);
        assert!(snapshot.call_stream.is_none());
        assert!(t.peer.calls().is_empty());
        assert!(t.peer.connections().is_empty());
        assert_eq!(t.phases(), vec![Phase::Connecting, Phase::Idle]);
    })
    .await;
}

#[tokio::test]
async fn test_connect_matchmaker_failure_clears_loading() {
    init_tracing();

    run_local(async {
        let t = TestSession::new();
        t.start().await;
        t.matchmaker.set_fail_find(true);

        let err = t.session.connect().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Matchmaking(MatchmakingError::Network(_))
        ));
        assert!(!t.session.snapshot().loading);
        assert_eq!(t.session.phase(), Phase::Idle);

        // The button works again once the matchmaker recovers.
        t.matchmaker.set_fail_find(false);
        t.matchmaker.set_partner(None);
        assert_eq!(t.session.connect().await.unwrap(), ConnectOutcome::NoMatch);
    })
    .await;
}

#[tokio::test]
async fn test_connect_before_registration_fails() {
    init_tracing();

    run_local(async {
        let t = TestSession::new();
        t.matchmaker.set_partner(Some(PARTNER_ID));

        let err = t.session.connect().await.unwrap_err();
        assert_eq!(err, SessionError::NoIdentity);
        assert!(!t.session.snapshot().loading);
        assert!(t.matchmaker.find_requests().is_empty());
        assert!(t.snapshots.borrow().is_empty());
    })
    .await;
}
