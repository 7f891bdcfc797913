use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

use appsight::enablement::EnablementLedger;
use appsight::session::{ActivityOutcome, SessionHistory, SessionTracker};
use appsight::store::MemoryKeyValueStore;

use crate::integration::test_utils::GatedStore;

const THREADS: usize = 16;

#[test]
fn concurrent_activity_in_one_window_mints_one_session() {
    let tracker = Arc::new(SessionTracker::new(Arc::new(SessionHistory::default()), 10_000));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let tracker = Arc::clone(&tracker);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                tracker.on_activity(1_000 + i as u64).unwrap()
            })
        })
        .collect();

    let outcomes: Vec<ActivityOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let started = outcomes
        .iter()
        .filter(|o| matches!(o, ActivityOutcome::Started(_)))
        .count();

    assert_eq!(started, 1);
    assert_eq!(tracker.history().len(), 1);
    let current = tracker.current_session_id().into_option().unwrap();
    for outcome in outcomes {
        match outcome {
            ActivityOutcome::Started(record) => assert_eq!(record.session_id, current),
            ActivityOutcome::Continued(id) => assert_eq!(id, current),
            ActivityOutcome::Ignored => panic!("tracker should be running"),
        }
    }
}

#[test]
fn lookups_run_alongside_activity() {
    let tracker = Arc::new(SessionTracker::new(Arc::new(SessionHistory::new(3)), 100));
    tracker.on_activity(0).unwrap();

    let writer = {
        let tracker = Arc::clone(&tracker);
        thread::spawn(move || {
            for step in 1..=50u64 {
                tracker.on_activity(step * 100).unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || {
                for _ in 0..500 {
                    let snapshot = tracker.history().snapshot();
                    assert!(snapshot.len() <= 3);
                    assert!(snapshot
                        .windows(2)
                        .all(|w| w[0].start_offset <= w[1].start_offset));
                    let _ = tracker.session_id(2_500);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(tracker.history().len(), 3);
}

#[test]
fn concurrent_toggles_settle_on_a_durable_value() {
    let store = Arc::new(MemoryKeyValueStore::new());
    let ledger = Arc::new(EnablementLedger::new(store.clone(), "appsight"));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                let service = if i % 2 == 0 { "Analytics" } else { "Crashes" };
                for round in 0..50 {
                    ledger.set_enabled(service, (round + i) % 3 != 0).unwrap();
                    let _ = ledger.is_enabled(service).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let restarted = EnablementLedger::new(store, "appsight");
    for service in ["Analytics", "Crashes"] {
        assert_eq!(
            ledger.is_enabled(service).unwrap(),
            restarted.is_enabled(service).unwrap(),
            "cache and store disagree for {}",
            service
        );
    }
}

#[test]
fn slow_service_creation_does_not_block_registered_services() {
    let (store, entered, release) = GatedStore::new("Slow");
    let ledger = Arc::new(EnablementLedger::new(store, "appsight"));
    ledger.set_enabled("Analytics", false).unwrap();

    let creator = {
        let ledger = Arc::clone(&ledger);
        thread::spawn(move || ledger.is_enabled("Slow").unwrap())
    };
    entered.recv_timeout(Duration::from_secs(5)).unwrap();

    let (tx, rx) = mpsc::channel();
    let reader = {
        let ledger = Arc::clone(&ledger);
        thread::spawn(move || {
            let _ = tx.send(ledger.is_enabled("Analytics").unwrap());
        })
    };
    let seen = rx.recv_timeout(Duration::from_secs(2));
    release.send(()).unwrap();

    assert_eq!(seen, Ok(false));
    assert!(creator.join().unwrap());
    reader.join().unwrap();
}
