// ============================================================
// Layer 6 — Atomic Object Persistence
// ============================================================
// Writes a serializable artifact to disk so that no reader can
// ever observe a half-written file at the destination path.
//
// Write sequence:
//   1. create the destination's parent directory (mkdir -p)
//   2. create a uniquely named temp file IN THAT SAME directory
//        out/.model.bin.Xq3f9a.tmp
//   3. stream the full serialized payload into it, flush, fsync
//   4. rename it over the destination in one step
//
// If any of 2-4 fails the NamedTempFile is dropped, which removes
// it (errors during that removal are ignored), and the original
// error is returned. The destination is then exactly what it was
// before the call: absent, or the previous complete artifact.
//
// Writers to the same destination are not coordinated; the last
// rename wins. Nothing here retries.
//
// Formats:
//   persist_object / load_object — bincode (standard config)
//   persist_json   / load_json   — pretty JSON, for metadata
//                                  people read by hand
//
// Reference: rename(2) — atomic replacement within a filesystem
//            tempfile crate documentation (NamedTempFile::persist)

use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Suffix shared by every staging file this module creates
pub const TEMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot serialize artifact: {0}")]
    Serialize(String),

    #[error("cannot deserialize artifact '{}': {msg}", .path.display())]
    Deserialize { path: PathBuf, msg: String },
}

impl PersistError {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PersistError::Io { path: path.into(), source }
    }
}

// ─── Writing ──────────────────────────────────────────────────────────────────

/// Serialize `artifact` with bincode and atomically place it at `path`.
pub fn persist_object<T>(artifact: &T, path: impl AsRef<Path>) -> Result<(), PersistError>
where
    T: Serialize + ?Sized,
{
    write_atomically(path.as_ref(), |writer, tmp_path| {
        bincode::serde::encode_into_std_write(artifact, writer, bincode::config::standard())
            .map(|_| ())
            .map_err(|e| match e {
                bincode::error::EncodeError::Io { inner, .. } => PersistError::io(tmp_path, inner),
                other => PersistError::Serialize(other.to_string()),
            })
    })
}

/// Serialize `value` as pretty JSON and atomically place it at `path`.
pub fn persist_json<T>(value: &T, path: impl AsRef<Path>) -> Result<(), PersistError>
where
    T: Serialize + ?Sized,
{
    write_atomically(path.as_ref(), |writer, tmp_path| {
        serde_json::to_writer_pretty(&mut *writer, value).map_err(|e| {
            if e.is_io() {
                PersistError::io(tmp_path, io::Error::from(e))
            } else {
                PersistError::Serialize(e.to_string())
            }
        })?;
        writer
            .write_all(b"\n")
            .map_err(|e| PersistError::io(tmp_path, e))
    })
}

/// Staging-file-then-rename core shared by every format.
fn write_atomically<F>(path: &Path, encode: F) -> Result<(), PersistError>
where
    F: FnOnce(&mut BufWriter<&File>, &Path) -> Result<(), PersistError>,
{
    let file_name = path.file_name().ok_or_else(|| {
        PersistError::io(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "destination has no file name"),
        )
    })?;

    // "obj.bin" has an empty parent; stage next to it in the cwd
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    // ── Step 1: parent directories ───────────────────────────────────────────
    fs::create_dir_all(dir).map_err(|e| PersistError::io(dir, e))?;

    // ── Step 2: sibling staging file ──────────────────────────────────────────
    let prefix = format!(".{}.", file_name.to_string_lossy());
    let tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)
        .map_err(|e| PersistError::io(dir, e))?;
    let tmp_path = tmp.path().to_path_buf();

    // ── Step 3: full payload, flushed and synced ──────────────────────────────
    {
        let mut writer = BufWriter::new(tmp.as_file());
        encode(&mut writer, &tmp_path)?;
        writer.flush().map_err(|e| PersistError::io(&tmp_path, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| PersistError::io(&tmp_path, e))?;

    // ── Step 4: promote ───────────────────────────────────────────────────────
    // On failure the returned PersistError owns the temp file and
    // deletes it when dropped.
    tmp.persist(path).map_err(|e| PersistError::io(path, e.error))?;

    sync_dir(dir);
    tracing::debug!("Persisted '{}'", path.display());
    Ok(())
}

/// Make the rename itself durable. Best-effort: the artifact is already
/// visible and complete at this point.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(d) = File::open(dir) {
        let _ = d.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

// ─── Reading ──────────────────────────────────────────────────────────────────

/// Read back an artifact written by [`persist_object`].
pub fn load_object<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, PersistError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PersistError::io(path, e))?;
    let mut reader = BufReader::new(file);
    bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard()).map_err(|e| {
        PersistError::Deserialize { path: path.to_path_buf(), msg: e.to_string() }
    })
}

/// Read back a value written by [`persist_json`].
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, PersistError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PersistError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| PersistError::Deserialize {
        path: path.to_path_buf(),
        msg:  e.to_string(),
    })
}
