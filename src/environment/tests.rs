//! Unit tests for environment scopes.

use super::*;
use crate::test_support::MemoryEnv;
use rstest::{fixture, rstest};
use std::sync::Barrier;
use std::thread;

fn overrides(pairs: &[(&str, &str)]) -> EnvOverrides {
    pairs.iter().copied().collect()
}

#[fixture]
fn table() -> MemoryEnv {
    MemoryEnv::with_vars(&[("EXISTING", "before")])
}

#[rstest]
fn scope_applies_and_restores_values(table: MemoryEnv) {
    let lock = EnvLock::new(table.clone());
    let scoped = overrides(&[("EXISTING", "during"), ("FRESH", "new")]);

    let guard = lock.enter(&scoped).expect("scope should apply");
    assert!(guard.is_active());
    assert!(lock.is_locked());
    assert_eq!(table.var("EXISTING").as_deref(), Some("during"));
    assert_eq!(table.var("FRESH").as_deref(), Some("new"));

    guard.exit().expect("scope should restore");
    assert!(!lock.is_locked());
    assert_eq!(table.var("EXISTING").as_deref(), Some("before"));
    assert_eq!(table.get("FRESH"), None, "absent keys stay absent");
}

#[rstest]
fn dropping_the_guard_restores(table: MemoryEnv) {
    let lock = EnvLock::new(table.clone());
    {
        let _guard = lock
            .enter(&overrides(&[("EXISTING", "during")]))
            .expect("scope should apply");
        assert_eq!(table.var("EXISTING").as_deref(), Some("during"));
    }
    assert_eq!(table.var("EXISTING").as_deref(), Some("before"));
    assert!(!lock.is_locked());
}

#[rstest]
fn empty_overrides_skip_the_lock(table: MemoryEnv) {
    let lock = EnvLock::new(table.clone());
    let held = lock
        .enter(&overrides(&[("EXISTING", "during")]))
        .expect("scope should apply");

    let noop = lock
        .enter_timeout(&EnvOverrides::new(), Duration::from_millis(50))
        .expect("empty scope never waits");
    assert!(!noop.is_active());
    noop.exit().expect("inactive guard exits cleanly");

    let (sender, receiver) = std::sync::mpsc::channel();
    thread::scope(|scope| {
        scope.spawn(|| {
            let unbounded = lock
                .enter(&EnvOverrides::new())
                .map(|guard| guard.is_active());
            sender.send(unbounded).expect("receiver should be waiting");
        });
        let unbounded = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("empty scope should not wait for the lock");
        held.exit().expect("scope should restore");
        assert_eq!(unbounded, Ok(false));
    });

    assert_eq!(table.snapshot().len(), 1);
}

#[rstest]
fn empty_prior_value_is_restored_as_empty() {
    let table = MemoryEnv::with_vars(&[("BLANK", "")]);
    let lock = EnvLock::new(table.clone());

    let guard = lock
        .enter(&overrides(&[("BLANK", "filled")]))
        .expect("scope should apply");
    assert_eq!(table.var("BLANK").as_deref(), Some("filled"));
    guard.exit().expect("scope should restore");

    assert_eq!(table.var("BLANK").as_deref(), Some(""));
    assert_eq!(table.get("BLANK"), Some(OsString::new()));
}

#[rstest]
fn bounded_wait_times_out_while_held(table: MemoryEnv) {
    let lock = EnvLock::new(table);
    let held = lock
        .enter(&overrides(&[("EXISTING", "during")]))
        .expect("scope should apply");

    let err = lock
        .enter_timeout(&overrides(&[("OTHER", "x")]), Duration::from_millis(20))
        .expect_err("second scope should time out");
    assert!(matches!(err, EnvError::LockTimeout { .. }), "unexpected error: {err}");

    held.exit().expect("scope should restore");
    let again = lock
        .enter_timeout(&overrides(&[("OTHER", "x")]), Duration::from_millis(20))
        .expect("lock is free again");
    again.exit().expect("scope should restore");
}

#[rstest]
#[case("")]
#[case("Z=BAD")]
#[case("Z\0BAD")]
fn invalid_key_rolls_back_earlier_keys(table: MemoryEnv, #[case] bad_key: &str) {
    let lock = EnvLock::new(table.clone());
    let scoped = overrides(&[("A_FIRST", "applied"), ("EXISTING", "during"), (bad_key, "x")]);

    let err = lock.enter(&scoped).expect_err("invalid key should fail");
    assert_eq!(
        err,
        EnvError::InvalidKey {
            key: bad_key.to_owned()
        }
    );
    assert!(!lock.is_locked(), "lock must be released after a failed apply");
    assert_eq!(table.get("A_FIRST"), None);
    assert_eq!(table.var("EXISTING").as_deref(), Some("before"));
}

#[rstest]
fn invalid_value_is_rejected_without_echoing_it(table: MemoryEnv) {
    let lock = EnvLock::new(table.clone());
    let err = lock
        .enter(&overrides(&[("SECRET", "top\0secret")]))
        .expect_err("NUL value should fail");
    assert_eq!(
        err,
        EnvError::InvalidValue {
            key: String::from("SECRET")
        }
    );
    assert!(!err.to_string().contains("top"));
    assert_eq!(table.get("SECRET"), None);
}

#[rstest]
fn restore_failure_is_reported_and_lock_released(table: MemoryEnv) {
    table.fail_unset("FRESH");
    let lock = EnvLock::new(table.clone());
    let guard = lock
        .enter(&overrides(&[("EXISTING", "during"), ("FRESH", "new")]))
        .expect("scope should apply");

    let err = guard.exit().expect_err("unset failure should surface");
    assert!(matches!(err, EnvError::Table { ref key, .. } if key == "FRESH"));
    assert!(!lock.is_locked());
    assert_eq!(
        table.var("EXISTING").as_deref(),
        Some("before"),
        "remaining keys are still restored"
    );
}

#[rstest]
fn scopes_never_overlap_across_threads() {
    let table = MemoryEnv::new();
    let lock = Arc::new(EnvLock::new(table.clone()));
    let barrier = Arc::new(Barrier::new(2));
    let pairs = [
        ("SENTINEL_LEFT", "SENTINEL_RIGHT"),
        ("SENTINEL_RIGHT", "SENTINEL_LEFT"),
    ];

    let handles = pairs
        .into_iter()
        .map(|(own, other)| {
            let shared = Arc::clone(&lock);
            let start = Arc::clone(&barrier);
            let view = table.clone();
            thread::spawn(move || {
                start.wait();
                for _ in 0..200 {
                    let guard = shared
                        .enter(&overrides(&[(own, "set")]))
                        .expect("scope should apply");
                    assert_eq!(view.var(own).as_deref(), Some("set"));
                    assert_eq!(view.get(other), None, "{other} leaked into {own}");
                    guard.exit().expect("scope should restore");
                }
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        handle.join().expect("worker thread should not panic");
    }
    assert!(table.snapshot().is_empty());
}

#[rstest]
fn lock_reads_through_to_the_table(table: MemoryEnv) {
    let lock = EnvLock::new(table);
    assert_eq!(lock.var("EXISTING").as_deref(), Some("before"));
    assert_eq!(lock.var("MISSING"), None);
}

#[rstest]
fn process_lock_scopes_the_real_environment() {
    let key = "DNSSCOPE_TEST_PROCESS_SCOPE";
    let lock = EnvLock::process();
    assert!(Arc::ptr_eq(&lock, &EnvLock::process()));

    let before = env::var_os(key);
    let guard = lock
        .enter(&overrides(&[(key, "scoped")]))
        .expect("scope should apply");
    assert_eq!(env::var(key).as_deref(), Ok("scoped"));
    guard.exit().expect("scope should restore");
    assert_eq!(env::var_os(key), before);
}
