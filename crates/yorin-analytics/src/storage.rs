// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Best-effort key/value persistence for identifiers, dedup state and
//! cached settings.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

/// Key written and removed by [`FallbackStorage`] to check the primary works.
pub const PROBE_KEY: &str = "__yorin_test__";

#[derive(Debug, Error)]
pub enum StorageError {
	#[error("storage I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("storage serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("storage unavailable: {0}")]
	Unavailable(String),
}

/// A string key/value store.
pub trait Storage: Send + Sync + std::fmt::Debug {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

	fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

	fn remove(&self, key: &str) -> Result<(), StorageError>;

	/// Blocks until buffered writes reach the backing medium.
	fn flush(&self) -> Result<(), StorageError> {
		Ok(())
	}
}

/// In-memory storage scoped to the lifetime of the value.
#[derive(Debug, Default)]
pub struct MemoryStorage {
	entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}
}

impl Storage for MemoryStorage {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		Ok(self.entries.lock().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
		self.entries.lock().insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StorageError> {
		self.entries.lock().remove(key);
		Ok(())
	}
}

/// File-backed storage holding every entry in one JSON object.
///
/// The file is read once by [`FileStorage::open`] and reads are served from
/// memory afterwards. Writes update memory and are persisted on the blocking
/// thread pool when called inside a tokio runtime, inline otherwise. Handles
/// opened on the same path within a process share one map, and each write
/// goes through a uniquely named temporary file renamed into place with 0600
/// permissions on Unix.
#[derive(Debug, Clone)]
pub struct FileStorage {
	shared: Arc<SharedFile>,
}

#[derive(Debug)]
struct SharedFile {
	path: PathBuf,
	entries: Mutex<HashMap<String, String>>,
	/// Serializes writers to the file.
	write_lock: Mutex<()>,
	/// Set while memory holds changes the file does not.
	dirty: AtomicBool,
	disk_reads: AtomicUsize,
	disk_writes: AtomicUsize,
}

static OPEN_FILES: OnceLock<Mutex<HashMap<PathBuf, Weak<SharedFile>>>> = OnceLock::new();

impl FileStorage {
	/// Opens the store at `path`, creating its directory. A missing or blank
	/// file is an empty store; unreadable or malformed contents are an error.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
		let path = path.into();
		let mut open_files = OPEN_FILES.get_or_init(Default::default).lock();
		if let Some(shared) = open_files.get(&path).and_then(Weak::upgrade) {
			return Ok(Self { shared });
		}

		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			std::fs::create_dir_all(parent)?;
		}
		let entries = read_entries(&path)?;
		debug!(path = ?path, entries = entries.len(), "Storage file loaded");

		let shared = Arc::new(SharedFile {
			path: path.clone(),
			entries: Mutex::new(entries),
			write_lock: Mutex::new(()),
			dirty: AtomicBool::new(false),
			disk_reads: AtomicUsize::new(1),
			disk_writes: AtomicUsize::new(0),
		});
		open_files.retain(|_, handle| handle.strong_count() > 0);
		open_files.insert(path, Arc::downgrade(&shared));
		Ok(Self { shared })
	}

	/// Location under the platform data directory (`<data_dir>/yorin/storage.json`).
	pub fn default_path() -> Option<PathBuf> {
		dirs::data_dir().map(|dir| dir.join("yorin").join("storage.json"))
	}

	/// Marks memory ahead of the file and arranges a write. Inside a runtime
	/// at most one write is queued at a time; later changes ride along with it.
	fn schedule_write(&self) -> Result<(), StorageError> {
		let queued = self.shared.dirty.swap(true, Ordering::SeqCst);
		match tokio::runtime::Handle::try_current() {
			Ok(handle) => {
				if !queued {
					let shared = Arc::clone(&self.shared);
					handle.spawn_blocking(move || {
						if let Err(e) = shared.write_if_dirty() {
							warn!(path = ?shared.path, error = %e, "Failed to write storage file");
						}
					});
				}
				Ok(())
			}
			Err(_) => self.shared.write_if_dirty(),
		}
	}
}

impl SharedFile {
	fn write_if_dirty(&self) -> Result<(), StorageError> {
		let _writer = self.write_lock.lock();
		if !self.dirty.swap(false, Ordering::SeqCst) {
			return Ok(());
		}

		let snapshot = self.entries.lock().clone();
		if let Err(e) = write_entries(&self.path, &snapshot) {
			self.dirty.store(true, Ordering::SeqCst);
			return Err(e);
		}
		self.disk_writes.fetch_add(1, Ordering::SeqCst);
		debug!(path = ?self.path, "Storage file written");
		Ok(())
	}
}

impl Drop for SharedFile {
	fn drop(&mut self) {
		if let Err(e) = self.write_if_dirty() {
			warn!(path = ?self.path, error = %e, "Failed to write storage file on close");
		}
	}
}

fn read_entries(path: &Path) -> Result<HashMap<String, String>, StorageError> {
	let contents = match std::fs::read_to_string(path) {
		Ok(contents) => contents,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
		Err(e) => return Err(e.into()),
	};
	if contents.trim().is_empty() {
		return Ok(HashMap::new());
	}
	Ok(serde_json::from_str(&contents)?)
}

fn write_entries(path: &Path, entries: &HashMap<String, String>) -> Result<(), StorageError> {
	let dir = match path.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => parent,
		_ => Path::new("."),
	};
	let contents = serde_json::to_string_pretty(entries)?;

	let mut temp = NamedTempFile::new_in(dir)?;
	temp.write_all(contents.as_bytes())?;
	temp.as_file().sync_all()?;

	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		let perms = std::fs::Permissions::from_mode(0o600);
		if let Err(e) = temp.as_file().set_permissions(perms) {
			warn!(path = ?temp.path(), error = %e, "Failed to set file permissions to 0600");
		}
	}

	temp.persist(path).map_err(|e| e.error)?;
	Ok(())
}

impl Storage for FileStorage {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		Ok(self.shared.entries.lock().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
		{
			let mut entries = self.shared.entries.lock();
			if entries.get(key).map(String::as_str) == Some(value) {
				return Ok(());
			}
			entries.insert(key.to_string(), value.to_string());
		}
		self.schedule_write()
	}

	fn remove(&self, key: &str) -> Result<(), StorageError> {
		if self.shared.entries.lock().remove(key).is_none() {
			return Ok(());
		}
		self.schedule_write()
	}

	fn flush(&self) -> Result<(), StorageError> {
		self.shared.write_if_dirty()
	}
}

/// Wraps a primary store and switches to an in-memory map the first time
/// the primary fails. Never returns an error.
#[derive(Debug)]
pub struct FallbackStorage {
	primary: Arc<dyn Storage>,
	memory: MemoryStorage,
	degraded: AtomicBool,
}

impl FallbackStorage {
	/// Checks `primary` by writing, removing and flushing [`PROBE_KEY`].
	pub fn new(primary: Arc<dyn Storage>) -> Self {
		let check = primary
			.set(PROBE_KEY, PROBE_KEY)
			.and_then(|()| primary.remove(PROBE_KEY))
			.and_then(|()| primary.flush());

		let degraded = match check {
			Ok(()) => false,
			Err(e) => {
				warn!(error = %e, "Storage unavailable, using in-memory storage");
				true
			}
		};

		Self {
			primary,
			memory: MemoryStorage::new(),
			degraded: AtomicBool::new(degraded),
		}
	}

	pub fn memory_only() -> Self {
		Self {
			primary: Arc::new(MemoryStorage::new()),
			memory: MemoryStorage::new(),
			degraded: AtomicBool::new(true),
		}
	}

	/// Returns true once the store has fallen back to memory.
	pub fn is_degraded(&self) -> bool {
		self.degraded.load(Ordering::SeqCst)
	}

	fn degrade(&self, operation: &str, error: &StorageError) {
		if !self.degraded.swap(true, Ordering::SeqCst) {
			warn!(operation, error = %error, "Storage failed, using in-memory storage");
		}
	}

	pub fn get(&self, key: &str) -> Option<String> {
		if !self.is_degraded() {
			match self.primary.get(key) {
				Ok(value) => return value,
				Err(e) => self.degrade("get", &e),
			}
		}
		self.memory.get(key).ok().flatten()
	}

	pub fn set(&self, key: &str, value: &str) {
		if !self.is_degraded() {
			match self.primary.set(key, value) {
				Ok(()) => return,
				Err(e) => self.degrade("set", &e),
			}
		}
		let _ = self.memory.set(key, value);
	}

	pub fn remove(&self, key: &str) {
		if !self.is_degraded() {
			match self.primary.remove(key) {
				Ok(()) => return,
				Err(e) => self.degrade("remove", &e),
			}
		}
		let _ = self.memory.remove(key);
	}

	/// Writes anything the primary still buffers. Blocking; call from a
	/// blocking context.
	pub fn flush(&self) {
		if self.is_degraded() {
			return;
		}
		if let Err(e) = self.primary.flush() {
			warn!(error = %e, "Failed to flush storage");
		}
	}
}
