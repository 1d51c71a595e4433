use std::rc::Rc;
use tagchat_core::traits::MediaStream;
use tagchat_core::{MediaAcquirer, MediaConstraints};

use crate::integration::init_tracing;
use crate::utils::MockMediaSource;

#[tokio::test]
async fn test_media_acquired_once() {
    init_tracing();

    let source = MockMediaSource::new();
    let acquirer = MediaAcquirer::new(source.clone(), MediaConstraints::default());
    assert!(acquirer.cached().is_none());

    let first = acquirer.get().await.expect("first request should succeed");
    let second = acquirer.get().await.expect("cached stream expected");

    assert_eq!(source.requests(), 1, "the prompt must be shown once");
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(acquirer.cached().map(|s| s.id()), Some(first.id()));
}

#[tokio::test]
async fn test_concurrent_callers_share_one_request() {
    init_tracing();

    let source = MockMediaSource::new();
    let release = source.hold_next();
    let acquirer = MediaAcquirer::new(source.clone(), MediaConstraints::default());

    let (a, b) = futures::join!(acquirer.get(), async {
        tokio::task::yield_now().await;
        release.fire(());
        acquirer.get().await
    });

    let (a, b) = (a.expect("stream for first caller"), b.expect("stream for second caller"));
    assert_eq!(source.requests(), 1);
    assert!(Rc::ptr_eq(&a, &b));
}
