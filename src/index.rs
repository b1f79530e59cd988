//! Reconciliation index for generated pointer files
//!
//! Remembers which relative media paths produced a pointer file in the last
//! successful run, so paths that disappear from the tree can have their
//! pointer files removed. Backed by a redb database.

use redb::{ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::detect::path_fingerprint;
use crate::error::SyncError;
use crate::generate::{pointer_path, CurrentScan};
use crate::logging::*;

/// Table definition for pointer file records
/// Key: fingerprint of the relative media path
/// Value: relative media path
const POINTERS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("pointer_files");

/// Result of one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
	/// Records dropped because their path vanished from the tree
	pub removed: usize,
	/// Pointer files actually found and deleted on disk
	pub files_deleted: usize,
	/// Records present after commit
	pub total: usize,
}

/// Persistent fingerprint → path record set
pub struct ReconciliationIndex {
	db: redb::Database,
	db_path: PathBuf,
}

impl ReconciliationIndex {
	/// Open or create the index database
	pub fn open(db_path: &Path) -> Result<Self, SyncError> {
		if let Some(parent) = db_path.parent() {
			if !parent.as_os_str().is_empty() {
				std::fs::create_dir_all(parent)?;
			}
		}
		let db = redb::Database::create(db_path)?;
		// Ensure the table exists so read transactions can open it
		{
			let write_txn = db.begin_write()?;
			let _ = write_txn.open_table(POINTERS_TABLE)?;
			write_txn.commit()?;
		}
		Ok(ReconciliationIndex { db, db_path: db_path.to_path_buf() })
	}

	pub fn path(&self) -> &Path {
		&self.db_path
	}

	/// All records, keyed by fingerprint
	pub fn entries(&self) -> Result<BTreeMap<String, String>, SyncError> {
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(POINTERS_TABLE)?;
		let mut entries = BTreeMap::new();
		for item in table.iter()? {
			let (key, value) = item?;
			entries.insert(key.value().to_string(), value.value().to_string());
		}
		Ok(entries)
	}

	pub fn len(&self) -> Result<usize, SyncError> {
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(POINTERS_TABLE)?;
		Ok(table.len()? as usize)
	}

	pub fn is_empty(&self) -> Result<bool, SyncError> {
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(POINTERS_TABLE)?;
		Ok(table.is_empty()?)
	}

	/// Is `rel_path` recorded?
	pub fn contains(&self, rel_path: &str) -> Result<bool, SyncError> {
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(POINTERS_TABLE)?;
		Ok(table.get(path_fingerprint(rel_path).as_str())?.is_some())
	}

	/// Replace the record set with the current scan
	///
	/// With `clean`, records missing from `scan` are dropped and their pointer
	/// files under `root` deleted. Every scan entry is then upserted. Removals
	/// and upserts commit in a single write transaction.
	pub fn reconcile(
		&self,
		scan: &CurrentScan,
		root: &Path,
		clean: bool,
	) -> Result<ReconcileReport, SyncError> {
		let mut report = ReconcileReport::default();

		let write_txn = self.db.begin_write()?;
		{
			let mut table = write_txn.open_table(POINTERS_TABLE)?;

			if clean {
				let mut stale = Vec::new();
				for item in table.iter()? {
					let (key, value) = item?;
					if !scan.contains_key(key.value()) {
						stale.push((key.value().to_string(), value.value().to_string()));
					}
				}

				for (key, rel_path) in &stale {
					if remove_pointer(root, rel_path)? {
						report.files_deleted += 1;
					}
					table.remove(key.as_str())?;
					debug!("Removed stale pointer {}", rel_path);
				}
				report.removed = stale.len();
			}

			for (key, rel_path) in scan.iter() {
				table.insert(key, rel_path)?;
			}
			report.total = table.len()? as usize;
		}
		write_txn.commit()?;

		Ok(report)
	}
}

/// Delete a pointer file if present; returns whether a file was removed
fn remove_pointer(root: &Path, rel_path: &str) -> Result<bool, SyncError> {
	let target = pointer_path(root, rel_path);
	match std::fs::remove_file(&target) {
		Ok(()) => Ok(true),
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
		Err(e) => {
			Err(SyncError::storage(format!("cannot delete {}: {}", target.display(), e)))
		}
	}
}


// vim: ts=4
