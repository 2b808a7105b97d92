//! The bot's reminder store and its persistence backend.

use std::{
	collections::{BTreeMap, HashMap},
	io::ErrorKind,
	path::PathBuf,
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::reminder::{ReminderEntry, UserId};

/// The external store could not be read or written. Mutations that hit this
/// are rejected and leave the in-memory state untouched.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
	/// Reading the reminder file failed.
	#[error("failed to read reminder file: {0}")]
	Read(#[source] std::io::Error),
	/// Writing the reminder file failed.
	#[error("failed to write reminder file: {0}")]
	Write(#[source] std::io::Error),
	/// The reminder file contents could not be (de)serialized.
	#[error("invalid reminder file contents: {0}")]
	Format(#[from] serde_json::Error),
}

/// External persistence for the registration set. The store saves the full
/// set on every mutation and loads it once at startup.
#[async_trait]
pub trait PersistenceBackend: Send + Sync + 'static {
	/// Load all persisted registrations.
	async fn load(&self) -> Result<Vec<(UserId, ReminderEntry)>, PersistenceError>;

	/// Persist the full registration set, replacing previous contents.
	async fn save_all(&self, entries: &[(UserId, ReminderEntry)]) -> Result<(), PersistenceError>;
}

/// JSON file backend, one object keyed by user ID. A missing file is an
/// empty registration set.
#[derive(Debug, Clone)]
pub struct JsonFile {
	/// Path of the reminder file.
	path: PathBuf,
}

impl JsonFile {
	/// Create a backend reading and writing the given path.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

#[async_trait]
impl PersistenceBackend for JsonFile {
	async fn load(&self) -> Result<Vec<(UserId, ReminderEntry)>, PersistenceError> {
		let bytes = match tokio::fs::read(&self.path).await {
			Ok(bytes) => bytes,
			Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
			Err(err) => return Err(PersistenceError::Read(err)),
		};
		let entries: BTreeMap<UserId, ReminderEntry> = serde_json::from_slice(&bytes)?;
		Ok(entries.into_iter().collect())
	}

	async fn save_all(&self, entries: &[(UserId, ReminderEntry)]) -> Result<(), PersistenceError> {
		let entries: BTreeMap<&UserId, &ReminderEntry> =
			entries.iter().map(|(user, entry)| (user, entry)).collect();
		let json = serde_json::to_vec_pretty(&entries)?;
		tokio::fs::write(&self.path, json).await.map_err(PersistenceError::Write)
	}
}

/// In-memory registration set, kept in sync with the persistence backend.
/// At most one entry per user; setting again overwrites.
pub struct ReminderStore {
	/// Backend every mutation is persisted to before it is committed.
	backend: Box<dyn PersistenceBackend>,
	/// Current registrations.
	entries: Mutex<HashMap<UserId, ReminderEntry>>,
}

impl ReminderStore {
	/// Load the registration set from the backend.
	pub async fn load(backend: impl PersistenceBackend) -> Result<Self, PersistenceError> {
		let entries = backend.load().await?.into_iter().collect();
		Ok(Self { backend: Box::new(backend), entries: Mutex::new(entries) })
	}

	/// Get a user's registration.
	pub async fn get(&self, user: &UserId) -> Option<ReminderEntry> {
		self.entries.lock().await.get(user).cloned()
	}

	/// Register a reminder for a user, replacing any previous registration.
	/// The new set is persisted before the change becomes visible; on
	/// persistence failure the store is left unchanged.
	pub async fn set(&self, user: UserId, entry: ReminderEntry) -> Result<(), PersistenceError> {
		let mut entries = self.entries.lock().await;
		let mut next = entries.clone();
		next.insert(user, entry);
		self.persist(&next).await?;
		*entries = next;
		Ok(())
	}

	/// Remove a user's registration. Returns whether one existed. Removing
	/// an unknown user does not touch the backend.
	pub async fn remove(&self, user: &UserId) -> Result<bool, PersistenceError> {
		let mut entries = self.entries.lock().await;
		if !entries.contains_key(user) {
			return Ok(false);
		}
		let mut next = entries.clone();
		next.remove(user);
		self.persist(&next).await?;
		*entries = next;
		Ok(true)
	}

	/// Snapshot of all registrations, in no particular order.
	pub async fn all(&self) -> Vec<(UserId, ReminderEntry)> {
		self.entries
			.lock()
			.await
			.iter()
			.map(|(user, entry)| (user.clone(), entry.clone()))
			.collect()
	}

	/// Write the given set to the backend.
	async fn persist(&self, entries: &HashMap<UserId, ReminderEntry>) -> Result<(), PersistenceError> {
		let snapshot: Vec<(UserId, ReminderEntry)> =
			entries.iter().map(|(user, entry)| (user.clone(), entry.clone())).collect();
		self.backend.save_all(&snapshot).await
	}
}
