use std::fs;
use std::path::Path;

use snapkv::snapshot::{decode, encode, load, write_atomic};
use snapkv::{KvsError, StoreState};
use tempfile::TempDir;
use walkdir::WalkDir;

fn state(pairs: &[(&str, &str)]) -> StoreState {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// names of every file left in `dir`
fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn decode_of_encode_is_identity() {
    let states = vec![
        StoreState::new(),
        state(&[("a", "1")]),
        state(&[("", ""), ("quote\"key", "line\nbreak"), ("ключ", "значение ✓")]),
        (0..200).map(|i| (format!("k{}", i), "x".repeat(i))).collect(),
    ];
    for s in states {
        assert_eq!(decode(&encode(&s).unwrap()).unwrap(), s);
    }
}

#[test]
fn encode_is_a_flat_sorted_object() {
    let bytes = encode(&state(&[("b", "2"), ("a", "1")])).unwrap();
    assert_eq!(String::from_utf8(bytes).unwrap(), "{\"a\":\"1\",\"b\":\"2\"}\n");
    assert_eq!(encode(&StoreState::new()).unwrap(), b"{}\n");
}

#[test]
fn decode_empty_object() {
    assert!(decode(b"{}").unwrap().is_empty());
    assert!(decode(b"  {}\n").unwrap().is_empty());
}

#[test]
fn decode_rejects_malformed_input() {
    let inputs = [
        "",
        "null",
        "[]",
        "[\"a\",\"b\"]",
        "\"a\"",
        "42",
        "{\"a\":1}",
        "{\"a\":null}",
        "{\"a\":{\"b\":\"c\"}}",
        "{\"a\":\"1\"",
        "{\"a\":\"1\"} trailing",
    ];
    for input in &inputs {
        assert!(
            matches!(decode(input.as_bytes()), Err(KvsError::Parse(_))),
            "expected a parse error for {:?}",
            input
        );
    }

    // not UTF-8
    assert!(matches!(decode(b"{\"a\":\"\xff\"}"), Err(KvsError::Parse(_))));
}

#[test]
fn load_existing_file() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let path = temp_dir.path().join("db.json");
    fs::write(&path, "{\"x\":\"y\"}\n").unwrap();

    for allow_empty in &[true, false] {
        assert_eq!(load(&path, *allow_empty).unwrap(), state(&[("x", "y")]));
    }
}

#[test]
fn load_missing_file_allowed() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let state = load(&temp_dir.path().join("db.json"), true).unwrap();
    assert!(state.is_empty());
}

#[test]
fn load_missing_file_disallowed() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let path = temp_dir.path().join("db.json");

    match load(&path, false) {
        Err(KvsError::Startup { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected a startup error, got {:?}", other),
    }
}

#[test]
fn load_unreadable_path_allowed() {
    // a directory exists at the path but cannot be read as a file
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    assert!(load(temp_dir.path(), true).unwrap().is_empty());
    assert!(matches!(
        load(temp_dir.path(), false),
        Err(KvsError::Startup { .. })
    ));
}

#[test]
fn load_corrupt_file_is_fatal() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let path = temp_dir.path().join("db.json");

    for contents in &["", "{\"x\":", "not json", "{\"x\":5}"] {
        fs::write(&path, contents).unwrap();
        assert!(matches!(load(&path, true), Err(KvsError::Parse(_))));
        assert!(matches!(load(&path, false), Err(KvsError::Parse(_))));
    }
}

#[test]
fn write_atomic_replaces_contents() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let path = temp_dir.path().join("db.json");

    write_atomic(&path, &state(&[("a", "1"), ("b", "2")])).unwrap();
    assert_eq!(load(&path, false).unwrap(), state(&[("a", "1"), ("b", "2")]));

    // fully overwritten, nothing from the previous snapshot survives
    write_atomic(&path, &state(&[("c", "3")])).unwrap();
    assert_eq!(load(&path, false).unwrap(), state(&[("c", "3")]));

    write_atomic(&path, &StoreState::new()).unwrap();
    assert!(load(&path, false).unwrap().is_empty());

    // no temporary files are left behind
    assert_eq!(files_in(temp_dir.path()), vec!["db.json".to_string()]);
}

#[test]
fn failed_write_keeps_previous_snapshot() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let path = temp_dir.path().join("db.json");
    write_atomic(&path, &state(&[("a", "1")])).unwrap();

    // the target is now a non-empty directory, the rename over it must fail
    let blocked = temp_dir.path().join("blocked");
    fs::create_dir(&blocked).unwrap();
    fs::write(blocked.join("inner"), "x").unwrap();
    assert!(matches!(
        write_atomic(&blocked, &state(&[("b", "2")])),
        Err(KvsError::Io(_))
    ));

    // a missing parent directory fails before anything is written
    let orphan = temp_dir.path().join("missing").join("db.json");
    assert!(matches!(
        write_atomic(&orphan, &state(&[("b", "2")])),
        Err(KvsError::Io(_))
    ));

    assert_eq!(load(&path, false).unwrap(), state(&[("a", "1")]));
    assert_eq!(
        files_in(temp_dir.path()),
        vec!["db.json".to_string(), "inner".to_string()]
    );
}

#[cfg(unix)]
#[test]
fn write_atomic_keeps_file_mode() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let path = temp_dir.path().join("db.json");
    write_atomic(&path, &state(&[("a", "1")])).unwrap();

    for mode in &[0o644, 0o640, 0o600] {
        fs::set_permissions(&path, fs::Permissions::from_mode(*mode)).unwrap();
        write_atomic(&path, &StoreState::new()).unwrap();
        let after = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(after, *mode);
    }
}

// temp files of an interrupted write are cleared when the snapshot is loaded
#[test]
fn load_removes_stale_temp_files() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let path = temp_dir.path().join("db.json");
    write_atomic(&path, &state(&[("a", "1")])).unwrap();
    fs::write(temp_dir.path().join(".db.json.Xy12ab.tmp"), "{\"half\":").unwrap();
    fs::write(temp_dir.path().join(".db.json.Q9zz00.tmp"), "").unwrap();
    fs::write(temp_dir.path().join(".other.json.Xy12ab.tmp"), "{}").unwrap();
    fs::write(temp_dir.path().join("notes.tmp"), "keep").unwrap();

    assert_eq!(load(&path, false).unwrap(), state(&[("a", "1")]));
    assert_eq!(
        files_in(temp_dir.path()),
        vec![
            ".other.json.Xy12ab.tmp".to_string(),
            "db.json".to_string(),
            "notes.tmp".to_string()
        ]
    );

    // also on a first run, before any snapshot exists
    fs::remove_file(&path).unwrap();
    fs::write(temp_dir.path().join(".db.json.first0.tmp"), "{").unwrap();
    assert!(load(&path, true).unwrap().is_empty());
    assert!(!temp_dir.path().join(".db.json.first0.tmp").exists());
}
