//! End-to-end against drand quicknet. Needs network access:
//! `cargo test -p timevault-core --test quicknet -- --ignored`

use std::sync::Arc;
use std::time::Duration;

use timevault_core::{
    decrypt_when_unlocked, ChainConfig, ChainParameters, DrandLock, LockErrorKind, PollOptions,
    UnlockSpec,
};

fn quicknet_lock() -> DrandLock {
    let chain = ChainParameters::from_config(&ChainConfig::quicknet()).expect("quicknet config");
    DrandLock::drand(Arc::new(chain))
}

#[tokio::test]
#[ignore = "requires network access to api.drand.sh"]
async fn hello_p1_p2_against_quicknet() {
    let lock = quicknet_lock();
    let bundle = lock
        .encrypt(b"Hello", "p1", UnlockSpec::AfterMillis(10_000))
        .await
        .expect("encrypt");

    let early = lock.decrypt(&bundle, "p1").await.unwrap_err();
    assert_eq!(early.kind(), LockErrorKind::TimeLockNotYetAvailable);

    let options = PollOptions {
        interval: None,
        deadline: Some(Duration::from_secs(60)),
    };
    let opened = decrypt_when_unlocked(&lock, &bundle, "p1", options)
        .await
        .expect("decrypt after unlock");
    assert_eq!(opened, b"Hello");

    let err = lock.decrypt(&bundle, "p2").await.unwrap_err();
    assert_eq!(err.kind(), LockErrorKind::Password);
}

#[tokio::test]
#[ignore = "requires network access to api.drand.sh"]
async fn past_round_opens_against_quicknet() {
    let lock = quicknet_lock();
    let minute_ago = chrono::Utc::now() - chrono::Duration::seconds(60);
    let bundle = lock
        .encrypt(b"already open", "pw", UnlockSpec::At(minute_ago))
        .await
        .expect("encrypt");
    assert_eq!(lock.decrypt(&bundle, "pw").await.expect("decrypt"), b"already open");
}
