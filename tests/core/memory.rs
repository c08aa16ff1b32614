use noxis::core::broker::read_audit_log;
use noxis::core::memory::{LAST_SCAN_KEY, MemoryStore};
use serde_json::json;
use std::thread;
use tempfile::tempdir;

fn open_store(dir: &std::path::Path) -> MemoryStore {
    MemoryStore::open(&dir.join("memory.db")).expect("open memory store")
}

#[test]
fn set_state_overwrites_without_merging() {
    let tmp = tempdir().expect("tempdir");
    let store = open_store(tmp.path());

    store
        .set_state(LAST_SCAN_KEY, &json!({"a": 1, "b": 2}))
        .expect("first write");
    store
        .set_state(LAST_SCAN_KEY, &json!({"c": 3}))
        .expect("second write");

    let value = store.get_state(LAST_SCAN_KEY).expect("read").expect("present");
    assert_eq!(value, json!({"c": 3}));
}

#[test]
fn get_state_is_absent_for_unknown_keys() {
    let tmp = tempdir().expect("tempdir");
    let store = open_store(tmp.path());
    assert!(store.get_state("never_written").expect("read").is_none());
}

#[test]
fn record_run_is_append_only_and_recent_runs_are_newest_first() {
    let tmp = tempdir().expect("tempdir");
    let store = open_store(tmp.path());

    let first = store.record_run("scan", &json!({"n": 1})).expect("run 1");
    let second = store.record_run("scan", &json!({"n": 2})).expect("run 2");
    store.record_run("doctor", &json!({"results": []})).expect("doctor run");
    let third = store.record_run("scan", &json!({"n": 3})).expect("run 3");
    assert!(first < second && second < third);

    let recent = store.get_recent_runs("scan", 2).expect("recent");
    assert_eq!(recent, vec![json!({"n": 3}), json!({"n": 2})]);

    let all = store.get_recent_runs("scan", 10).expect("all");
    assert_eq!(all.len(), 3);
    assert_eq!(all[2], json!({"n": 1}));

    assert!(store.get_recent_runs("scan", 0).expect("zero").is_empty());
    assert_eq!(store.get_recent_runs("doctor", 10).expect("doctor").len(), 1);
}

#[test]
fn run_records_carry_ids_and_timestamps() {
    let tmp = tempdir().expect("tempdir");
    let store = open_store(tmp.path());

    store.record_run("scan", &json!({"same": true})).expect("run 1");
    store.record_run("scan", &json!({"same": true})).expect("run 2");

    let records = store.recent_run_records("scan", 5).expect("records");
    assert_eq!(records.len(), 2);
    assert!(records[0].id > records[1].id);
    assert!(records[0].created_at > records[1].created_at);
    assert_eq!(records[0].payload, records[1].payload);
    assert!(records[0].created_at.ends_with('Z'));
}

#[test]
fn back_to_back_runs_get_strictly_increasing_timestamps() {
    let tmp = tempdir().expect("tempdir");
    let store = open_store(tmp.path());

    for n in 0..20 {
        store.record_run("scan", &json!({ "n": n })).expect("run");
    }

    let records = store.recent_run_records("scan", 20).expect("records");
    assert_eq!(records.len(), 20);
    for pair in records.windows(2) {
        assert!(pair[0].created_at > pair[1].created_at, "{:?}", pair);
    }
}

#[test]
fn explanations_are_appended() {
    let tmp = tempdir().expect("tempdir");
    let store = open_store(tmp.path());

    store.record_ai_explanation("abc", "first").expect("first");
    store.record_ai_explanation("abc", "second").expect("second");
    assert_eq!(store.count_ai_explanations().expect("count"), 2);
}

#[test]
fn concurrent_initialization_is_tolerated() {
    let tmp = tempdir().expect("tempdir");
    let db_path = tmp.path().join("memory.db");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let db_path = db_path.clone();
            thread::spawn(move || MemoryStore::open(&db_path).map(|_| ()))
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread").expect("initialize");
    }

    let store = open_store(tmp.path());
    store.record_run("scan", &json!({})).expect("write after init");
}

#[test]
fn every_store_call_is_audited() {
    let tmp = tempdir().expect("tempdir");
    let store = open_store(tmp.path());
    store.record_run("scan", &json!({})).expect("run");
    store.get_state(LAST_SCAN_KEY).expect("read");

    let events = read_audit_log(tmp.path()).expect("audit log");
    let ops: Vec<&str> = events.iter().map(|e| e.op.as_str()).collect();
    assert!(ops.contains(&"memory.record_run"));
    assert!(ops.contains(&"memory.get_state"));
    assert!(events.iter().all(|e| e.status == "success"));
}
