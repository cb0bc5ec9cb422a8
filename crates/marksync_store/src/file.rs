//! File-based store for persistent state.

use crate::error::{StoreError, StoreResult};
use crate::store::{validate_account, AccountState, ManifestStore};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Name of the lock file inside the store directory.
const LOCK_FILE: &str = "LOCK";

/// Extension of per-account state files.
const STATE_EXT: &str = "cbor";

/// A directory of CBOR-encoded account states.
///
/// Each account lives in `<dir>/<account>.cbor`. Saves go through a
/// temporary file and a rename, so a crash leaves either the old or the new
/// state on disk, never a torn one.
///
/// # Locking
///
/// The directory is locked exclusively for the lifetime of the store, so two
/// processes cannot run sync passes over the same state.
///
/// # Example
///
/// ```no_run
/// use marksync_store::{AccountState, FileStore, ManifestStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("state")).unwrap();
/// store.save(&AccountState::new("alice")).unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    /// Held open for the lock.
    _lock_file: File,
    /// Serializes writers within the process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens or creates a store in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Locked`] if another process holds the directory,
    /// or an I/O error if it cannot be created.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir)?;

        let lock_path = dir.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked(dir.display().to_string()));
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            _lock_file: lock_file,
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn state_path(&self, account: &str) -> PathBuf {
        self.dir.join(format!("{account}.{STATE_EXT}"))
    }
}

impl ManifestStore for FileStore {
    fn load(&self, account: &str) -> StoreResult<Option<AccountState>> {
        validate_account(account)?;

        let file = match File::open(self.state_path(account)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let state: AccountState = ciborium::from_reader(BufReader::new(file))
            .map_err(|e| StoreError::Corrupted(format!("{account}: {e}")))?;

        if state.account != account {
            return Err(StoreError::Corrupted(format!(
                "{account}: file holds state of {:?}",
                state.account
            )));
        }

        Ok(Some(state))
    }

    fn save(&self, state: &AccountState) -> StoreResult<()> {
        validate_account(&state.account)?;
        let _guard = self.write_lock.lock();

        let path = self.state_path(&state.account);
        let tmp_path = path.with_extension(format!("{STATE_EXT}.tmp"));

        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            ciborium::into_writer(state, &mut writer)
                .map_err(|e| StoreError::Encode(e.to_string()))?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        fs::rename(&tmp_path, &path)?;
        tracing::debug!(
            account = %state.account,
            entries = state.manifest.len(),
            "saved account state"
        );
        Ok(())
    }

    fn accounts(&self) -> StoreResult<Vec<String>> {
        let mut accounts = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(STATE_EXT) {
                continue;
            }
            // Skip stray files that could never be loaded back
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if validate_account(stem).is_ok() => accounts.push(stem.to_string()),
                _ => tracing::debug!(path = %path.display(), "ignoring non-account state file"),
            }
        }
        accounts.sort();
        Ok(accounts)
    }
}
