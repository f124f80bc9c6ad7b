//! JSON-file [`KeyValueStore`] for desktop builds and field tooling.
//!
//! The whole map is rewritten on each mutation: a sibling `*.tmp` file is written and synced,
//! then renamed over the target, so a crash never leaves a half-written store behind. The
//! in-memory map only changes once the write has landed.

// std
use std::{
	fs::{self, File},
	io::{self, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{KeyValueStore, StoreError, StoreFuture},
};

/// Key/value store persisted as a single JSON object.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: Arc<PathBuf>,
	entries: Arc<Mutex<BTreeMap<String, String>>>,
}
impl FileStore {
	/// Opens the store at `path`, creating parent directories and loading existing entries.
	///
	/// A missing or empty file is an empty store.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| io_failure("create", parent, e))?;
		}

		let entries = match fs::read(&path) {
			Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
			Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("{} is not a JSON string map: {e}", path.display()),
			})?,
			Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
			Err(e) => return Err(io_failure("read", &path, e)),
		};

		Ok(Self { path: Arc::new(path), entries: Arc::new(Mutex::new(entries)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn write_through(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
		let bytes = serde_json::to_vec_pretty(entries)
			.map_err(|e| StoreError::Serialization { message: e.to_string() })?;
		let tmp = self.path.with_extension("tmp");
		let mut file = File::create(&tmp).map_err(|e| io_failure("create", &tmp, e))?;

		file.write_all(&bytes).map_err(|e| io_failure("write", &tmp, e))?;
		file.sync_all().map_err(|e| io_failure("sync", &tmp, e))?;
		drop(file);

		fs::rename(&tmp, self.path.as_path()).map_err(|e| io_failure("replace", &self.path, e))
	}
}
impl KeyValueStore for FileStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move { Ok(self.entries.lock().get(key).cloned()) })
	}

	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut entries = self.entries.lock();

			if entries.get(key) == Some(&value) {
				return Ok(());
			}

			let mut next = entries.clone();

			next.insert(key.to_owned(), value);
			self.write_through(&next)?;
			*entries = next;

			Ok(())
		})
	}

	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut entries = self.entries.lock();

			if !entries.contains_key(key) {
				return Ok(());
			}

			let mut next = entries.clone();

			next.remove(key);
			self.write_through(&next)?;
			*entries = next;

			Ok(())
		})
	}
}

fn io_failure(action: &str, path: &Path, e: io::Error) -> StoreError {
	StoreError::Backend { message: format!("failed to {action} {}: {e}", path.display()) }
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;
	use crate::{
		auth::{Session, Token},
		store::{TokenStore, USER_TOKEN_KEY},
	};

	fn scratch_path(label: &str) -> PathBuf {
		env::temp_dir().join(format!(
			"sitewatch_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos()
		))
	}

	#[tokio::test]
	async fn login_state_survives_reopen() {
		let path = scratch_path("reopen");
		let tokens = TokenStore::new(Arc::new(FileStore::open(&path).expect("Store should open.")));

		tokens
			.save_login(&Token::new("h.p.s"), &Session::new("42", "Ana"))
			.await
			.expect("Saving a login should succeed.");

		let reopened =
			TokenStore::new(Arc::new(FileStore::open(&path).expect("Store should reopen.")));
		let token = reopened
			.load_token()
			.await
			.expect("Loading the token should succeed.")
			.expect("Token should survive a reopen.");

		assert_eq!(token.secret().expose(), "h.p.s");
		assert_eq!(reopened.load_session().await, Ok(Session::new("42", "Ana")));

		reopened.clear().await.expect("Clearing should succeed.");

		let cleared = FileStore::open(&path).expect("Cleared store should reopen.");

		assert_eq!(cleared.get(USER_TOKEN_KEY).await, Ok(None));

		fs::remove_file(&path).expect("Scratch file should be removable.");
	}

	#[test]
	fn corrupt_file_is_a_serialization_error() {
		let path = scratch_path("corrupt");

		fs::write(&path, b"[1, 2, 3]").expect("Scratch file should be writable.");

		let err = FileStore::open(&path).expect_err("A JSON array is not a store.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		fs::remove_file(&path).expect("Scratch file should be removable.");
	}

	#[tokio::test]
	async fn failed_write_keeps_memory_in_step_with_disk() {
		let path = scratch_path("blocked");
		let store = FileStore::open(&path).expect("Store should open.");

		store.set(USER_TOKEN_KEY, "h.p.s".into()).await.expect("First write should land.");
		// A directory in the temp file's place makes every later write fail.
		fs::create_dir(path.with_extension("tmp")).expect("Blocking directory should be created.");

		let err = store
			.set(USER_TOKEN_KEY, "x.y.z".into())
			.await
			.expect_err("Blocked write should fail.");

		assert!(matches!(err, StoreError::Backend { .. }));
		assert_eq!(store.get(USER_TOKEN_KEY).await, Ok(Some("h.p.s".into())));

		store.remove(USER_TOKEN_KEY).await.expect_err("Blocked removal should fail.");

		assert_eq!(store.get(USER_TOKEN_KEY).await, Ok(Some("h.p.s".into())));

		fs::remove_dir(path.with_extension("tmp")).expect("Blocking directory should be removable.");
		fs::remove_file(&path).expect("Scratch file should be removable.");
	}
}
