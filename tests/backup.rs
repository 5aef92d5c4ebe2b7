use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use snapkv::snapshot::decode;
use snapkv::{backup_cycle, BackupScheduler, KvStore, KvsEngine, KvsError, SchedulerState, StoreState};
use tempfile::TempDir;
use walkdir::WalkDir;

const INTERVAL: Duration = Duration::from_millis(20);
const TIMEOUT: Duration = Duration::from_secs(5);

fn state(pairs: &[(&str, &str)]) -> StoreState {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// polls `cond` until it holds or the timeout expires
fn wait_until<F: FnMut() -> bool>(mut cond: F) -> bool {
    let start = Instant::now();
    while start.elapsed() < TIMEOUT {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

/// the snapshot at `path` if one exists and is complete
fn on_disk(path: &Path) -> Option<StoreState> {
    fs::read(path).ok().and_then(|bytes| decode(&bytes).ok())
}

#[test]
fn cycle_writes_current_state() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let path = temp_dir.path().join("db.json");
    let store = KvStore::with_state(state(&[("a", "1"), ("b", "2")]));

    assert_eq!(backup_cycle(&store, &path).unwrap(), 2);
    assert_eq!(on_disk(&path).unwrap(), state(&[("a", "1"), ("b", "2")]));
}

#[test]
fn scheduler_writes_fresh_snapshots() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let path = temp_dir.path().join("db.json");
    let store = KvStore::new();

    let handle = BackupScheduler::new(store.clone(), &path, INTERVAL)
        .start()
        .unwrap();

    store.upsert(state(&[("a", "1")]));
    assert!(wait_until(|| on_disk(&path) == Some(state(&[("a", "1")]))));

    // later writes show up in later cycles
    store.upsert(state(&[("b", "2")]));
    store.delete("a").unwrap();
    assert!(wait_until(|| on_disk(&path) == Some(state(&[("b", "2")]))));

    handle.join().unwrap();
}

#[test]
fn no_writes_after_cancel() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let path = temp_dir.path().join("db.json");
    let store = KvStore::with_state(state(&[("before", "cancel")]));

    let handle = BackupScheduler::new(store.clone(), &path, INTERVAL)
        .start()
        .unwrap();
    assert!(wait_until(|| on_disk(&path).is_some()));

    handle.cancel();
    assert!(handle.is_cancelled());
    assert!(wait_until(|| handle.state() == SchedulerState::Stopped));

    store.upsert(state(&[("after", "cancel")]));
    thread::sleep(INTERVAL * 5);
    assert_eq!(on_disk(&path).unwrap(), state(&[("before", "cancel")]));

    handle.join().unwrap();
}

#[test]
fn cancel_is_idempotent() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let handle = BackupScheduler::new(KvStore::new(), temp_dir.path().join("db.json"), INTERVAL)
        .start()
        .unwrap();

    handle.cancel();
    handle.cancel();
    handle.cancel();
    assert!(handle.is_cancelled());
    handle.join().unwrap();
}

#[test]
fn dropping_the_handle_stops_backups() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let path = temp_dir.path().join("db.json");
    let store = KvStore::with_state(state(&[("a", "1")]));

    let handle = BackupScheduler::new(store.clone(), &path, INTERVAL)
        .start()
        .unwrap();
    assert!(wait_until(|| on_disk(&path).is_some()));
    drop(handle);

    // give an in-flight cycle time to finish, then the file must stay as it is
    thread::sleep(INTERVAL * 3);
    store.upsert(state(&[("a", "2")]));
    thread::sleep(INTERVAL * 5);
    assert_eq!(on_disk(&path).unwrap(), state(&[("a", "1")]));
}

#[test]
fn failed_cycles_are_retried() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let dir = temp_dir.path().join("later");
    let path = dir.join("db.json");
    let store = KvStore::with_state(state(&[("a", "1")]));

    assert!(matches!(backup_cycle(&store, &path), Err(KvsError::Io(_))));

    let handle = BackupScheduler::new(store.clone(), &path, INTERVAL)
        .start()
        .unwrap();

    // every cycle fails while the directory is missing, but the scheduler keeps running
    thread::sleep(INTERVAL * 4);
    assert_ne!(handle.state(), SchedulerState::Stopped);
    assert!(!path.exists());

    fs::create_dir(&dir).unwrap();
    assert!(wait_until(|| on_disk(&path) == Some(state(&[("a", "1")]))));
    handle.join().unwrap();
}

#[test]
fn snapshot_file_is_never_partial() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let path = temp_dir.path().join("db.json");
    let store = KvStore::new();
    let big: StoreState = (0..2000)
        .map(|i| (format!("key{}", i), "v".repeat(64)))
        .collect();
    store.upsert(big.clone());

    let handle = BackupScheduler::new(store.clone(), &path, Duration::from_millis(1))
        .start()
        .unwrap();
    assert!(wait_until(|| path.exists()));

    // once the file exists it is always a complete snapshot, even while being replaced
    for _ in 0..200 {
        assert_eq!(decode(&fs::read(&path).unwrap()).unwrap(), big);
    }
    handle.join().unwrap();

    // only the snapshot itself is left in the directory
    let files: Vec<_> = WalkDir::new(temp_dir.path())
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files, vec!["db.json".to_string()]);
}

#[test]
fn zero_interval_is_rejected() {
    let result = BackupScheduler::new(KvStore::new(), "db.json", Duration::from_millis(0)).start();
    assert!(matches!(result, Err(KvsError::Parsing(_))));
}

#[test]
fn restart_from_backup() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let path = temp_dir.path().join("db.json");

    let store = KvStore::open(&path, true).unwrap();
    store.upsert(state(&[("x", "y"), ("k", "v")]));
    let handle = BackupScheduler::new(store.clone(), &path, INTERVAL)
        .start()
        .unwrap();
    assert!(wait_until(|| on_disk(&path).map_or(false, |s| s.len() == 2)));
    handle.join().unwrap();
    drop(store);

    let reopened = KvStore::open(&path, false).unwrap();
    assert_eq!(reopened.get("x").unwrap(), "y");
    assert_eq!(reopened.list(), state(&[("x", "y"), ("k", "v")]));
}
