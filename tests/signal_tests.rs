//! Completion signal tests across threads

use nnhal_vts::signal::{CompletionSignal, Outcome, SignalStatus};
use nnhal_vts::VtsError;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_waiters_on_many_threads_see_one_outcome() {
    let signal = CompletionSignal::shared();
    let waiters: Vec<_> = (0..8)
        .map(|_| {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.wait())
        })
        .collect();

    thread::sleep(Duration::from_millis(10));
    signal.notify(Outcome::Success).unwrap();

    for waiter in waiters {
        assert_eq!(waiter.join().unwrap(), SignalStatus::Success);
    }
}

#[test]
fn test_notify_before_wait_is_not_lost() {
    let signal = CompletionSignal::shared();
    let producer = {
        let signal = Arc::clone(&signal);
        thread::spawn(move || signal.notify(Outcome::Failure))
    };
    producer.join().unwrap().unwrap();

    assert_eq!(signal.wait(), SignalStatus::Failure);
    assert_eq!(signal.wait_timeout(Duration::ZERO), SignalStatus::Failure);
}

#[test]
fn test_timeout_leaves_signal_pending() {
    let signal = CompletionSignal::shared();
    let started = Instant::now();
    assert_eq!(
        signal.wait_timeout(Duration::from_millis(20)),
        SignalStatus::Timeout
    );
    assert!(started.elapsed() >= Duration::from_millis(20));
    assert!(signal.is_pending());

    // A late producer still resolves the signal.
    signal.notify(Outcome::Success).unwrap();
    assert_eq!(signal.wait_for(None), SignalStatus::Success);
}

#[test]
fn test_second_notify_is_misuse_and_first_outcome_wins() {
    let signal = CompletionSignal::shared();
    signal.notify(Outcome::Success).unwrap();

    let err = signal.notify(Outcome::Failure).unwrap_err();
    assert!(matches!(err, VtsError::SignalMisuse(_)));
    assert!(err.is_fatal());
    assert_eq!(signal.misuse_count(), 1);
    assert_eq!(signal.wait(), SignalStatus::Success);
}

#[test]
fn test_racing_producers_notify_exactly_once() {
    let signal = CompletionSignal::shared();
    let producers: Vec<_> = (0..4)
        .map(|i| {
            let signal = Arc::clone(&signal);
            thread::spawn(move || {
                let outcome = if i % 2 == 0 {
                    Outcome::Success
                } else {
                    Outcome::Failure
                };
                signal.notify(outcome).is_ok()
            })
        })
        .collect();

    let accepted = producers
        .into_iter()
        .map(|p| p.join().unwrap())
        .filter(|&ok| ok)
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(signal.misuse_count(), 3);
    assert!(signal.wait().is_terminal());
}
