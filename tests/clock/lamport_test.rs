// Lamport Clock Tests

use microledger::clock::LamportClock;

#[test]
fn test_starts_initial() {
    let clock = LamportClock::new();
    assert_eq!(clock.current(), 0);
    assert!(clock.is_initial());
}

#[test]
fn test_tick_increments() {
    let mut clock = LamportClock::new();
    assert_eq!(clock.tick(), 1);
    assert_eq!(clock.tick(), 2);
    assert_eq!(clock.current(), 2);
    assert!(!clock.is_initial());
}

#[test]
fn test_observe_takes_max_plus_one() {
    let mut clock = LamportClock::new();
    assert_eq!(clock.observe(5), 6);
    // Older remote value still moves us forward by one
    assert_eq!(clock.observe(2), 7);
    assert_eq!(clock.observe(7), 8);
}

#[test]
fn test_observe_sequence_is_monotonic_and_dominates() {
    let remotes = [3u64, 0, 17, 17, 4, 100, 99, 1, 250, 0];
    let mut clock = LamportClock::new();
    let mut previous = clock.current();
    let mut highest_remote = 0;

    for remote in remotes {
        let value = clock.observe(remote);
        highest_remote = highest_remote.max(remote);

        assert!(value > previous);
        assert!(value > highest_remote);
        previous = value;
    }
}

#[test]
fn test_current_has_no_side_effect() {
    let mut clock = LamportClock::new();
    clock.tick();
    assert_eq!(clock.current(), clock.current());
    assert_eq!(clock.current(), 1);
}

#[test]
fn test_saturates_at_max() {
    let mut clock = LamportClock::new();
    assert_eq!(clock.observe(u64::MAX), u64::MAX);
    assert_eq!(clock.tick(), u64::MAX);
    assert_eq!(clock.observe(u64::MAX - 1), u64::MAX);
}

#[test]
fn test_pairwise_convergence() {
    // A sends 0, B observes and replies with its new value, A observes that
    let mut a = LamportClock::new();
    let mut b = LamportClock::new();

    let reply = b.observe(a.current());
    a.observe(reply);

    assert_eq!(a.current(), 2);
    assert_eq!(b.current(), 1);
}
