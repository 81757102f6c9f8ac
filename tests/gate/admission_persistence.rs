use std::sync::Arc;
use std::thread;

use tonegate::GateError;
use tonegate::Rejection;
use tonegate::admission::{QuotaDecision, QuotaStore, RequestKind, ResetPolicy};
use tonegate::identity::{ClientAttributes, ClientIdentity};
use tonegate::store::{SqliteStateStore, StateStore};

use super::backend::{admission, manual_clock};

fn sqlite(path: &std::path::Path) -> Arc<dyn StateStore> {
    Arc::new(SqliteStateStore::open(path).unwrap())
}

#[test]
fn cooldown_and_quota_survive_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");
    let clock = manual_clock();

    {
        let controller = admission(sqlite(&path), clock.clone());
        let admitted = controller.admit(RequestKind::Text).unwrap();
        assert_eq!(admitted.remaining_quota, 99);
    }

    clock.advance_secs(2);
    let reopened = admission(sqlite(&path), clock.clone());
    match reopened.admit(RequestKind::Text) {
        Err(GateError::Rejected(Rejection::Cooldown {
            seconds_remaining, ..
        })) => assert_eq!(seconds_remaining, 3),
        other => panic!("expected cooldown rejection, got {other:?}"),
    }

    clock.advance_secs(3);
    let admitted = reopened.admit(RequestKind::Text).unwrap();
    assert_eq!(admitted.remaining_quota, 98);
}

#[test]
fn concurrent_handles_never_overshoot_the_limit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");
    let clock = manual_clock();
    let client = ClientIdentity::from("shared-client");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let quota = QuotaStore::new(sqlite(&path), clock.clone(), ResetPolicy::CalendarDay);
            let client = client.clone();
            thread::spawn(move || {
                (0..20)
                    .filter(|_| {
                        matches!(
                            quota
                                .check_and_consume(&client, RequestKind::Audio, 50, true)
                                .unwrap(),
                            QuotaDecision::Allowed { .. }
                        )
                    })
                    .count()
            })
        })
        .collect();

    let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(allowed, 50);
}

#[test]
fn quota_denies_until_the_next_local_day() {
    let dir = tempfile::tempdir().unwrap();
    let clock = manual_clock();
    let quota = QuotaStore::new(
        sqlite(&dir.path().join("state.db")),
        clock.clone(),
        ResetPolicy::CalendarDay,
    );
    let client = ClientIdentity::from("daily");

    for _ in 0..3 {
        quota
            .check_and_consume(&client, RequestKind::Text, 3, true)
            .unwrap();
    }
    let QuotaDecision::Denied { reset_at } = quota
        .check_and_consume(&client, RequestKind::Text, 3, true)
        .unwrap()
    else {
        panic!("fourth request should be denied");
    };

    clock.set(reset_at);
    assert_eq!(
        quota
            .check_and_consume(&client, RequestKind::Text, 3, true)
            .unwrap(),
        QuotaDecision::Allowed { remaining: 2 }
    );
}

#[test]
fn client_identity_is_stable_once_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite(&dir.path().join("state.db"));
    let attributes = ClientAttributes {
        user_agent: "tonegate/test".into(),
        screen: "1920x1080".into(),
        timezone: "120".into(),
        language: "en-US".into(),
    };
    let first = ClientIdentity::resolve(store.as_ref(), &attributes).unwrap();

    let changed = ClientAttributes {
        language: "de-DE".into(),
        ..attributes
    };
    let second = ClientIdentity::resolve(store.as_ref(), &changed).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.as_str().len(), 64);
}
