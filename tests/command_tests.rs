use habitust::commands::*;
use habitust::config::Config;
use habitust::models::{EventType, MetricType};
use habitust::scheduler::parse_date;
use habitust::storage::Store;
use habitust::tasks::{list_events, list_tasks, log_event, open_timer, NewEvent};
use habitust::templates::list_templates;
use habitust::error::TrackerError;

fn with_test_store<F>(f: F)
where
    F: FnOnce(&Store),
{
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&Config::with_data_dir(dir.path())).unwrap();
    f(&store);
}

#[test]
fn test_add_and_list() {
    with_test_store(|store| {
        cmd_add(store, "Water".into(), Some("#0EA5E9".into()), MetricType::Count, Some(8)).unwrap();

        let tasks = list_tasks(store, None).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "Water");
        assert_eq!(tasks[0].color, "#0EA5E9");
        assert_eq!(tasks[0].goal, Some(8));
        assert_eq!(tasks[0].scheduled_date, None);

        cmd_list(store, None, false).unwrap();
        cmd_list(store, None, true).unwrap();
    });
}

#[test]
fn test_add_rejects_bad_input() {
    with_test_store(|store| {
        let err = cmd_add(store, "   ".into(), None, MetricType::Count, None).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidInput(_)));
        let blue = Some("blue".into());
        let err = cmd_add(store, "Water".into(), blue, MetricType::Count, None).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidInput(_)));
        let err = cmd_add(store, "Water".into(), None, MetricType::Count, Some(0)).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidInput(_)));
        assert!(list_tasks(store, None).unwrap().is_empty());
    });
}

#[test]
fn test_log_rejects_mismatched_events() {
    with_test_store(|store| {
        cmd_add(store, "Vitamins".into(), None, MetricType::Check, None).unwrap();
        let id = list_tasks(store, None).unwrap()[0].id.clone();

        assert!(cmd_log(store, &id, EventType::Increment, None).is_err());
        assert!(cmd_log(store, &id, EventType::Check, Some(1)).is_err());
        cmd_log(store, &id, EventType::Check, None).unwrap();

        assert_eq!(list_events(store, &id).unwrap().len(), 1);
        assert!(matches!(
            cmd_log(store, "missing", EventType::Check, None),
            Err(TrackerError::NotFound { .. })
        ));
    });
}

#[test]
fn test_timer_start_stop() {
    with_test_store(|store| {
        cmd_add(store, "Read".into(), None, MetricType::Timer, Some(1800)).unwrap();
        let id = list_tasks(store, None).unwrap()[0].id.clone();

        assert!(cmd_stop(store, &id).is_err());
        cmd_start(store, &id).unwrap();
        assert!(open_timer(store, &id).unwrap().is_some());
        assert!(cmd_start(store, &id).is_err());
        cmd_stop(store, &id).unwrap();
        assert!(open_timer(store, &id).unwrap().is_none());

        let events = list_events(store, &id).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, EventType::TimerStop);
        assert!(events[1].value.is_some());

        cmd_summary(store, &id, false).unwrap();
    });
}

#[test]
fn test_template_generate_report_flow() {
    with_test_store(|store| {
        let days = vec![4, 0, 0];
        cmd_template_add(store, "Pushups".into(), days, None, MetricType::Count, Some(50)).unwrap();
        let templates = list_templates(store).unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].active_days, vec![0, 4]);

        let monday = parse_date("2024-06-03").unwrap();
        cmd_generate(store, monday, false).unwrap();
        cmd_generate(store, monday, true).unwrap();
        let tasks = list_tasks(store, Some(monday)).unwrap();
        assert_eq!(tasks.len(), 1);

        let twenty = NewEvent { kind: EventType::Increment, value: Some(20) };
        log_event(store, &tasks[0].id, twenty).unwrap();
        cmd_report(store, monday, false).unwrap();
        cmd_report(store, monday, true).unwrap();
    });
}

#[test]
fn test_template_add_rejects_bad_days() {
    with_test_store(|store| {
        let add = |days: Vec<u8>| {
            cmd_template_add(store, "Nope".into(), days, None, MetricType::Count, None)
        };
        assert!(add(vec![]).is_err());
        assert!(add(vec![7]).is_err());
        assert!(list_templates(store).unwrap().is_empty());
    });
}

#[test]
fn test_remove_missing() {
    with_test_store(|store| {
        assert!(matches!(cmd_remove(store, "missing"), Err(TrackerError::NotFound { .. })));
        assert!(matches!(
            cmd_template_remove(store, "missing"),
            Err(TrackerError::NotFound { .. })
        ));
    });
}

#[test]
fn test_health() {
    with_test_store(|store| {
        cmd_health(store).unwrap();
    });
}
