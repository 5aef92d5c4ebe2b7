use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::Builder;
use tracing::{debug, info, instrument, warn};

use super::codec::{decode, encode};
use crate::engine::StoreState;
use crate::error::{KvsError, Result};

// suffix of the temporary files a snapshot is first written to
const TEMP_SUFFIX: &str = ".tmp";

/// reads the snapshot file at `path` and returns the state it holds.
///
/// A missing or unreadable file is the normal first-run case when `allow_empty_on_missing` is
/// set, and yields an empty state. A file that exists but cannot be decoded always fails: that
/// is corruption, not absence.
///
/// Temporary files left next to the snapshot by a write that never completed are removed first.
///
/// # Errors
/// `KvsError::Startup` if the file could not be read and `allow_empty_on_missing` is `false`,
/// `KvsError::Parse` if the file contents are not a valid snapshot
#[instrument]
pub fn load(path: &Path, allow_empty_on_missing: bool) -> Result<StoreState> {
    remove_stale_temp_files(path);

    match fs::read(path) {
        Ok(bytes) => {
            let state = decode(&bytes)?;
            info!("loaded {} keys from snapshot {:?}", state.len(), path);
            Ok(state)
        }
        Err(e) if allow_empty_on_missing => {
            warn!("could not read snapshot {:?} ({}), starting with an empty store", path, e);
            Ok(StoreState::new())
        }
        Err(source) => Err(KvsError::Startup {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// replaces the contents of the snapshot file at `path` with the encoded `state`.
///
/// The data is written to a temporary file in the same directory, synced, and then renamed over
/// `path`. Until the rename, the previous snapshot stays in place untouched. If any step fails
/// the temporary file is removed. An existing snapshot keeps its permissions.
///
/// # Errors
/// returns `KvsError::Io` if the temporary file could not be created, written or renamed
pub fn write_atomic(path: &Path, state: &StoreState) -> Result<()> {
    let bytes = encode(state)?;
    let dir = parent_dir(path);

    let mut tmp = Builder::new()
        .prefix(&temp_prefix(path))
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)?;
    tmp.write_all(&bytes)?;
    // the temp file is created private to its owner, carry over the mode of the file it replaces
    if let Ok(metadata) = fs::metadata(path) {
        tmp.as_file().set_permissions(metadata.permissions())?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| KvsError::Io(e.error))?;
    sync_dir(dir)?;

    debug!("wrote {} bytes to {:?}", bytes.len(), path);
    Ok(())
}

/// the directory holding `path`, `.` for a bare file name
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// file name prefix of the temporary files written for the snapshot at `path`
fn temp_prefix(path: &Path) -> String {
    match path.file_name() {
        Some(name) => format!(".{}.", name.to_string_lossy()),
        None => ".snapshot.".to_string(),
    }
}

/// makes the rename of a snapshot into `dir` durable
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

/// deletes temporary files of the snapshot at `path` left behind by an interrupted write.
/// Failures are only logged, they never prevent the snapshot from loading.
fn remove_stale_temp_files(path: &Path) {
    let prefix = temp_prefix(path);
    let entries = match fs::read_dir(parent_dir(path)) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(&prefix) || !name.ends_with(TEMP_SUFFIX) {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => info!("removed stale snapshot temp file {:?}", entry.path()),
            Err(e) => warn!("could not remove stale temp file {:?}: {}", entry.path(), e),
        }
    }
}
