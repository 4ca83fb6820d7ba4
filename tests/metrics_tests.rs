use std::thread;

use habitust::config::Config;
use habitust::error::TrackerError;
use habitust::metrics::{summarize, Summary};
use habitust::models::{EventType, MetricType, Task};
use habitust::storage::Store;
use habitust::tasks::{create_task, delete_task, log_event, NewEvent, NewTask};

fn with_test_store<F>(f: F)
where
    F: FnOnce(&Store),
{
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&Config::with_data_dir(dir.path())).unwrap();
    f(&store);
}

fn new_task(store: &Store, metric: MetricType, goal: Option<u32>) -> Task {
    create_task(store, NewTask { name: "Habit".into(), color: None, metric, goal }).unwrap()
}

fn log(store: &Store, id: &str, kind: EventType, value: Option<u32>) {
    log_event(store, id, NewEvent { kind, value }).unwrap();
}

#[test]
fn test_count_sums_increments_with_default_one() {
    with_test_store(|store| {
        let task = new_task(store, MetricType::Count, Some(10));
        let count = |total| Summary::Count { total, goal: Some(10) };
        assert_eq!(summarize(store, &task.id).unwrap(), count(0));

        log(store, &task.id, EventType::Increment, None);
        log(store, &task.id, EventType::Increment, Some(4));
        assert_eq!(summarize(store, &task.id).unwrap(), count(5));

        log(store, &task.id, EventType::Increment, Some(7));
        assert_eq!(summarize(store, &task.id).unwrap(), count(12));
    });
}

#[test]
fn test_count_zero_increment_is_not_defaulted() {
    with_test_store(|store| {
        let task = new_task(store, MetricType::Count, None);
        log(store, &task.id, EventType::Increment, Some(0));
        assert_eq!(summarize(store, &task.id).unwrap(), Summary::Count { total: 0, goal: None });
    });
}

#[test]
fn test_timer_sums_stops_and_ignores_starts() {
    with_test_store(|store| {
        let task = new_task(store, MetricType::Timer, Some(3600));
        log(store, &task.id, EventType::TimerStart, None);
        log(store, &task.id, EventType::TimerStop, Some(600));
        // Unpaired stop still counts, extra starts never do.
        log(store, &task.id, EventType::TimerStop, Some(300));
        log(store, &task.id, EventType::TimerStart, None);
        log(store, &task.id, EventType::TimerStart, None);

        assert_eq!(
            summarize(store, &task.id).unwrap(),
            Summary::Timer { total_sec: 900, goal: Some(3600) }
        );
    });
}

#[test]
fn test_check_is_idempotent() {
    with_test_store(|store| {
        let task = new_task(store, MetricType::Check, None);
        assert_eq!(summarize(store, &task.id).unwrap(), Summary::Check { done: false });

        log(store, &task.id, EventType::Check, None);
        assert_eq!(summarize(store, &task.id).unwrap(), Summary::Check { done: true });

        log(store, &task.id, EventType::Check, None);
        assert_eq!(summarize(store, &task.id).unwrap(), Summary::Check { done: true });
    });
}

#[test]
fn test_summary_only_counts_own_events() {
    with_test_store(|store| {
        let a = new_task(store, MetricType::Count, None);
        let b = new_task(store, MetricType::Count, None);
        log(store, &a.id, EventType::Increment, Some(3));
        log(store, &b.id, EventType::Increment, Some(8));

        assert_eq!(summarize(store, &a.id).unwrap(), Summary::Count { total: 3, goal: None });
        assert_eq!(summarize(store, &b.id).unwrap(), Summary::Count { total: 8, goal: None });
    });
}

#[test]
fn test_unknown_metric_yields_distinguished_summary() {
    let dir = tempfile::tempdir().unwrap();
    let raw = serde_json::json!([{
        "id": "legacy",
        "name": "Old habit",
        "color": "#6366F1",
        "metric": "streak",
        "goal": null,
        "created_at": "2024-01-01T00:00:00Z",
    }]);
    std::fs::write(dir.path().join("tasks.json"), raw.to_string()).unwrap();
    let store = Store::open(&Config::with_data_dir(dir.path())).unwrap();

    assert_eq!(
        summarize(&store, "legacy").unwrap(),
        Summary::Unknown { message: "Unknown metric".into() }
    );
}

#[test]
fn test_missing_task_is_not_found() {
    with_test_store(|store| {
        let err = summarize(store, "nope").unwrap_err();
        assert!(matches!(err, TrackerError::NotFound { kind: "task", .. }));
    });
}

#[test]
fn test_delete_cascades_then_summary_not_found() {
    with_test_store(|store| {
        let task = new_task(store, MetricType::Count, None);
        let other = new_task(store, MetricType::Count, None);
        log(store, &task.id, EventType::Increment, Some(2));
        log(store, &other.id, EventType::Increment, Some(5));

        delete_task(store, &task.id).unwrap();

        assert!(store.find_events(|e| e.task_id == task.id).unwrap().is_empty());
        assert_eq!(store.find_events(|_| true).unwrap().len(), 1);
        assert!(matches!(summarize(store, &task.id), Err(TrackerError::NotFound { .. })));
    });
}

#[test]
fn test_delete_racing_log_leaves_no_orphans() {
    with_test_store(|store| {
        let mut orphans_total = 0;
        for _ in 0..200 {
            let task = new_task(store, MetricType::Count, None);
            thread::scope(|s| {
                s.spawn(|| loop {
                    let new = NewEvent { kind: EventType::Increment, value: None };
                    match log_event(store, &task.id, new) {
                        Ok(_) => continue,
                        Err(TrackerError::NotFound { .. }) => break,
                        Err(e) => panic!("unexpected error while logging: {}", e),
                    }
                });
                delete_task(store, &task.id).unwrap();
            });
            orphans_total += store.find_events(|e| e.task_id == task.id).unwrap().len();
        }
        assert_eq!(orphans_total, 0);
    });
}
