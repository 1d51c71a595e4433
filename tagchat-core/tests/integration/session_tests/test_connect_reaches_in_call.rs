use std::rc::Rc;
use tagchat_core::traits::{MediaCall, MediaStream};
use tagchat_core::{ConnectOutcome, PeerId, Phase, Tag};

use crate::integration::init_tracing;
use crate::utils::*;

#[tokio::test]
async fn test_connect_reaches_in_call() {
    init_tracing();

    run_local(async {
        let t = TestSession::new();
        t.start().await;
        assert_eq!(t.session.phase(), Phase::Idle);

        t.matchmaker.set_partner(Some(PARTNER_ID));
        t.session.toggle_tag(Tag::from("music"));
        t.session.toggle_tag(Tag::from("art"));
        t.clear_snapshots();

        let session = t.session.clone();
        let connect = tokio::task::spawn_local(async move { session.connect().await });

        let peer = t.peer.clone();
        settle_until(64, || peer.last_call().is_some()).await;
        assert_eq!(t.session.phase(), Phase::Connecting);
        assert!(t.session.snapshot().loading);

        // A second press while loading does nothing.
        assert_eq!(t.session.connect().await.unwrap(), ConnectOutcome::Busy);
        assert_eq!(t.matchmaker.find_requests().len(), 1);

        let call = t.peer.last_call().unwrap();
        assert_eq!(call.peer(), &PeerId::from(PARTNER_ID));
        assert_eq!(call.offered(), Some("local-1".to_string()));
        assert_eq!(t.peer.connections().len(), 1);

        let remote = MockStream::new("remote-1");
        assert!(call.deliver(remote.clone()));

        let outcome = connect.await.unwrap().unwrap();
        assert_eq!(outcome, ConnectOutcome::Connected(PeerId::from(PARTNER_ID)));

        let snapshot = t.session.snapshot();
        assert_eq!(snapshot.phase, Phase::InCall);
        assert!(!snapshot.loading);
        assert!(snapshot.has_connection);
        assert_eq!(snapshot.partner, Some(PeerId::from(PARTNER_ID)));

        let bound = snapshot.call_stream.expect("remote stream bound");
        let remote: Rc<dyn MediaStream> = remote;
        assert!(Rc::ptr_eq(&bound, &remote));

        assert_eq!(t.phases(), vec![Phase::Connecting, Phase::InCall]);
        assert_eq!(
            t.matchmaker.find_requests(),
            vec![(
                PeerId::from(OWN_ID),
                vec![Tag::from("music"), Tag::from("art")]
            )]
        );
        // Media was already acquired at startup.
        assert_eq!(t.media.requests(), 1);
    })
    .await;
}

#[tokio::test]
async fn test_connect_while_in_call_is_busy() {
    init_tracing();

    run_local(async {
        let t = TestSession::new();
        t.start().await;
        t.establish_outbound_call().await;

        assert_eq!(t.session.connect().await.unwrap(), ConnectOutcome::Busy);
        assert_eq!(t.peer.calls().len(), 1);
        assert_eq!(t.session.phase(), Phase::InCall);
    })
    .await;
}

#[tokio::test]
async fn test_connect_without_media_places_receive_only_call() {
    init_tracing();

    run_local(async {
        let t = TestSession::new();
        t.media.set_deny(true);
        t.start_without_media().await;
        assert!(t.session.snapshot().local_stream.is_none());

        let (call, _connection, _remote) = t.establish_outbound_call().await;
        assert_eq!(call.offered(), None);
        assert_eq!(t.media.requests(), 2);
    })
    .await;
}
