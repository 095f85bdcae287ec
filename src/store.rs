//! Storage of materialized derivatives, addressed by identifier.
//!
//! The [`AssetStore`] trait is the collaborator contract the orchestrators
//! depend on. Its load-bearing operation is [`AssetStore::get_or_create`],
//! which must provide **at-most-one concurrent materialization per
//! identifier**: when N callers race on an identifier absent from the store,
//! exactly one producer runs and every caller observes a complete artifact.
//! A store must also never expose a partial artifact — `exists` on a valid
//! identifier implies the full bytes are readable.
//!
//! [`FileStore`] is the shipped implementation:
//!
//! - **Layout**: `root/<first two hex chars>/<rest>`, so directories stay
//!   small under content-hash identifiers.
//! - **Visibility**: producers write to a dot-prefixed `.part` temp path in
//!   the destination directory; the artifact becomes visible only through an
//!   atomic rename. A failed producer's temp file is removed before the
//!   error propagates.
//! - **Single flight**: an in-process table of per-identifier gates
//!   serializes racing producers; losers re-check existence under the gate
//!   and return a hit. The guarantee is per-process — concurrent *processes*
//!   are tolerated because identifiers are content-derived, so competing
//!   writers produce identical bytes and rename keeps visibility atomic.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::CacheError;

/// Whether `get_or_create` found the artifact or had to produce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Hit,
    Created,
}

/// Contract for a key → bytes store with path/URL resolution.
pub trait AssetStore {
    /// True when a complete artifact is stored under `identifier`.
    fn exists(&self, identifier: &str) -> bool;

    /// Filesystem location for `identifier` (whether or not it exists yet).
    fn path(&self, identifier: &str) -> PathBuf;

    /// Public URL for `identifier`.
    fn url(&self, identifier: &str) -> String;

    /// Ensure an artifact exists under `identifier`, invoking `producer` to
    /// write it if absent. The producer receives a private destination path;
    /// the store owns making the result visible (or cleaning up on failure).
    fn get_or_create(
        &self,
        identifier: &str,
        producer: &mut dyn FnMut(&Path) -> Result<(), CacheError>,
    ) -> Result<StoreOutcome, CacheError>;
}

type FlightTable = Mutex<HashMap<String, Arc<Mutex<()>>>>;

/// Filesystem-backed store.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    base_url: String,
    in_flight: FlightTable,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            root: root.into(),
            base_url,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Shard an identifier into (subdirectory, file name).
    fn shard(identifier: &str) -> (&str, &str) {
        if identifier.len() > 2 {
            identifier.split_at(2)
        } else {
            ("", identifier)
        }
    }

    fn gate_for(&self, identifier: &str) -> Arc<Mutex<()>> {
        let mut flights = lock(&self.in_flight);
        flights.entry(identifier.to_owned()).or_default().clone()
    }

    fn release_gate(&self, identifier: &str, gate: &Arc<Mutex<()>>) {
        let mut flights = lock(&self.in_flight);
        // Two strong refs means nobody else is waiting: the table's and ours
        if Arc::strong_count(gate) <= 2 {
            flights.remove(identifier);
        }
    }

    fn write_new(
        &self,
        final_path: &Path,
        producer: &mut dyn FnMut(&Path) -> Result<(), CacheError>,
    ) -> Result<(), CacheError> {
        if let Some(dir) = final_path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file_name = final_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("artifact");
        let temp_path = final_path.with_file_name(format!(".{file_name}.part"));

        match producer(&temp_path) {
            Ok(()) => fs::rename(&temp_path, final_path).map_err(|e| {
                let _ = fs::remove_file(&temp_path);
                CacheError::from(e)
            }),
            Err(err) => {
                let _ = fs::remove_file(&temp_path);
                Err(err)
            }
        }
    }
}

impl AssetStore for FileStore {
    fn exists(&self, identifier: &str) -> bool {
        self.path(identifier).exists()
    }

    fn path(&self, identifier: &str) -> PathBuf {
        let (dir, file) = Self::shard(identifier);
        if dir.is_empty() {
            self.root.join(file)
        } else {
            self.root.join(dir).join(file)
        }
    }

    fn url(&self, identifier: &str) -> String {
        let (dir, file) = Self::shard(identifier);
        if dir.is_empty() {
            format!("{}/{file}", self.base_url)
        } else {
            format!("{}/{dir}/{file}", self.base_url)
        }
    }

    fn get_or_create(
        &self,
        identifier: &str,
        producer: &mut dyn FnMut(&Path) -> Result<(), CacheError>,
    ) -> Result<StoreOutcome, CacheError> {
        let final_path = self.path(identifier);
        if final_path.exists() {
            return Ok(StoreOutcome::Hit);
        }

        let gate = self.gate_for(identifier);
        let result = {
            let _guard = gate.lock().unwrap_or_else(PoisonError::into_inner);
            if final_path.exists() {
                // A racing caller finished while we waited on the gate
                Ok(StoreOutcome::Hit)
            } else {
                self.write_new(&final_path, producer)
                    .map(|()| StoreOutcome::Created)
            }
        };
        self.release_gate(identifier, &gate);

        if let Ok(outcome) = &result {
            tracing::debug!(identifier, ?outcome, "artifact resolved");
        }
        result
    }
}

fn lock(table: &FlightTable) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> FileStore {
        FileStore::new(tmp.path(), "https://cdn.example.com/assets")
    }

    // =========================================================================
    // Layout
    // =========================================================================

    #[test]
    fn paths_are_sharded_by_prefix() {
        let tmp = TempDir::new().unwrap();
        let s = store(&tmp);
        assert_eq!(
            s.path("abcdef.js"),
            tmp.path().join("ab").join("cdef.js")
        );
    }

    #[test]
    fn urls_mirror_the_sharded_layout() {
        let tmp = TempDir::new().unwrap();
        let s = store(&tmp);
        assert_eq!(
            s.url("abcdef.js"),
            "https://cdn.example.com/assets/ab/cdef.js"
        );
    }

    #[test]
    fn trailing_slash_in_base_url_is_normalized() {
        let tmp = TempDir::new().unwrap();
        let s = FileStore::new(tmp.path(), "https://cdn.example.com/");
        assert_eq!(s.url("abcd"), "https://cdn.example.com/ab/cd");
    }

    #[test]
    fn tiny_identifiers_skip_sharding() {
        let tmp = TempDir::new().unwrap();
        let s = store(&tmp);
        assert_eq!(s.path("ab"), tmp.path().join("ab"));
    }

    // =========================================================================
    // get_or_create
    // =========================================================================

    #[test]
    fn creates_then_hits() {
        let tmp = TempDir::new().unwrap();
        let s = store(&tmp);
        let runs = AtomicU32::new(0);
        let mut producer = |dest: &Path| {
            runs.fetch_add(1, Ordering::SeqCst);
            fs::write(dest, b"artifact bytes")?;
            Ok(())
        };

        assert_eq!(
            s.get_or_create("deadbeef.bin", &mut producer).unwrap(),
            StoreOutcome::Created
        );
        assert_eq!(
            s.get_or_create("deadbeef.bin", &mut producer).unwrap(),
            StoreOutcome::Hit
        );
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(fs::read(s.path("deadbeef.bin")).unwrap(), b"artifact bytes");
    }

    #[test]
    fn failed_producer_leaves_nothing_visible() {
        let tmp = TempDir::new().unwrap();
        let s = store(&tmp);
        let mut producer = |dest: &Path| {
            // Simulate a partial write before the failure
            fs::write(dest, b"partial")?;
            Err(CacheError::Transformation("encode blew up".into()))
        };

        let err = s.get_or_create("cafebabe.bin", &mut producer).unwrap_err();
        assert!(matches!(err, CacheError::Transformation(_)));
        assert!(!s.exists("cafebabe.bin"));

        // No stray temp file either
        let shard_dir = tmp.path().join("ca");
        let leftovers: Vec<_> = fs::read_dir(&shard_dir)
            .map(|entries| entries.filter_map(|e| e.ok()).collect())
            .unwrap_or_default();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    }

    #[test]
    fn failure_does_not_poison_the_identifier() {
        let tmp = TempDir::new().unwrap();
        let s = store(&tmp);

        let mut failing = |dest: &Path| {
            fs::write(dest, b"partial")?;
            Err(CacheError::Transformation("first attempt fails".into()))
        };
        s.get_or_create("0123abcd", &mut failing).unwrap_err();

        let mut working = |dest: &Path| {
            fs::write(dest, b"good")?;
            Ok(())
        };
        assert_eq!(
            s.get_or_create("0123abcd", &mut working).unwrap(),
            StoreOutcome::Created
        );
        assert_eq!(fs::read(s.path("0123abcd")).unwrap(), b"good");
    }

    #[test]
    fn concurrent_callers_produce_exactly_once() {
        let tmp = TempDir::new().unwrap();
        let s = std::sync::Arc::new(store(&tmp));
        let runs = std::sync::Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = s.clone();
                let runs = runs.clone();
                std::thread::spawn(move || {
                    s.get_or_create("feedface.js", &mut |dest: &Path| {
                        runs.fetch_add(1, Ordering::SeqCst);
                        // Widen the race window so losers really do wait
                        std::thread::sleep(std::time::Duration::from_millis(20));
                        fs::write(dest, b"bundle")?;
                        Ok(())
                    })
                    .unwrap()
                })
            })
            .collect();

        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(runs.load(Ordering::SeqCst), 1, "producer ran more than once");
        assert_eq!(
            outcomes.iter().filter(|o| **o == StoreOutcome::Created).count(),
            1
        );
        assert!(s.exists("feedface.js"));
        assert_eq!(fs::read(s.path("feedface.js")).unwrap(), b"bundle");
    }

    #[test]
    fn flight_table_drains_after_completion() {
        let tmp = TempDir::new().unwrap();
        let s = store(&tmp);
        let mut producer = |dest: &Path| {
            fs::write(dest, b"x")?;
            Ok(())
        };
        s.get_or_create("a1b2c3", &mut producer).unwrap();
        assert!(lock(&s.in_flight).is_empty());
    }
}
