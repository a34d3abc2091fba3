//! A bounded queue coordinating one producer and one consumer through two
//! counting semaphores and a buffer lock.

pub mod config;
pub mod consumer;
pub mod delay;
pub mod error;
pub mod item;
pub mod observe;
pub mod producer;
pub mod queue;
pub mod semaphore;
pub mod session;
pub mod task;

pub use self::config::Config;
pub use self::error::{Cancelled, Error, Result};
pub use self::item::{Item, TRICKS};
pub use self::observe::{Event, Observer};
pub use self::queue::{BoundedQueue, QueueStats, Snapshot};
pub use self::session::{Report, Session};
pub use self::task::{Role, TaskState};

#[test]
fn best_trick_session() {
    use self::delay::NoDelay;
    use self::observe::Recorder;

    let config = Config {
        seed: Some(2025),
        ..Config::default()
    };
    let session = Session::new(config.capacity, config.items).unwrap();
    let recorder = Recorder::new();
    let report = session
        .run(TRICKS, config.rng(), NoDelay, NoDelay, &recorder)
        .unwrap();

    let ids = |items: &[Item]| items.iter().map(Item::sequence_id).collect::<Vec<_>>();
    assert_eq!(ids(&report.produced), (1..=10).collect::<Vec<_>>());
    assert_eq!(ids(&report.consumed), (1..=10).collect::<Vec<_>>());
    assert_eq!(report.consumed, report.produced);
    assert!(report.consumed.iter().all(|i| TRICKS.contains(&i.payload())));

    let mut snapshots = recorder
        .into_events()
        .into_iter()
        .filter_map(|e| match e {
            Event::Produced { snapshot, .. } | Event::Released { snapshot, .. } => Some(snapshot),
            _ => None,
        })
        .collect::<Vec<_>>();
    snapshots.sort_by_key(|s| s.version);
    assert_eq!(snapshots.len(), 20);
    // Replaying mutations in order never leaves the valid range.
    let mut occupied = 0usize;
    for (n, s) in snapshots.iter().enumerate() {
        assert_eq!(s.version, n as u64 + 1);
        assert!(s.occupied <= s.capacity && s.capacity == 5);
        assert!(s.occupied.abs_diff(occupied) == 1);
        occupied = s.occupied;
    }
    assert_eq!(occupied, 0);
    assert!(session.queue().is_empty());
}
