//! Ledger persistence
//!
//! The ledger is stored as one pretty-printed JSON document. Saves go to a
//! temporary file that is renamed over the live file, and the previous
//! version is kept in a small ring of numbered backups.

use crate::core::Ledger;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Ledger file not found: {0}")]
    NotFound(PathBuf),
    #[error("Backup {0} not found")]
    BackupNotFound(usize),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub ledger_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".custody_data"),
            ledger_file: "ledger.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

impl StorageConfig {
    /// Default configuration rooted at `data_dir`
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Directory holding the identity keystore
    pub fn keys_dir(&self) -> PathBuf {
        self.data_dir.join("keys")
    }
}

/// Ledger storage manager
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    pub fn with_defaults() -> Result<Self, StorageError> {
        Self::new(StorageConfig::default())
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    fn ledger_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.ledger_file)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.ledger_file, index))
    }

    /// Write the ledger, keeping the previous version as backup 0
    pub fn save(&self, ledger: &Ledger) -> Result<(), StorageError> {
        let path = self.ledger_path();

        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        let temp_path = self
            .config
            .data_dir
            .join(format!("{}.tmp", self.config.ledger_file));
        write_json(&temp_path, ledger)?;
        fs::rename(&temp_path, &path)?;

        log::debug!("Ledger saved to {}", path.display());
        Ok(())
    }

    pub fn load(&self) -> Result<Ledger, StorageError> {
        let path = self.ledger_path();
        if !path.exists() {
            return Err(StorageError::NotFound(path));
        }
        read_json(&path)
    }

    /// Saved ledger, or an empty one on first run
    pub fn load_or_default(&self) -> Result<Ledger, StorageError> {
        if self.exists() {
            self.load()
        } else {
            Ok(Ledger::new())
        }
    }

    pub fn exists(&self) -> bool {
        self.ledger_path().exists()
    }

    pub fn delete(&self) -> Result<(), StorageError> {
        let path = self.ledger_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Shift backup `i` to `i + 1`, dropping the oldest
    fn rotate_backups(&self) -> Result<(), StorageError> {
        let last = self.config.max_backups - 1;
        let oldest = self.backup_path(last);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        for i in (0..last).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    /// Load a backup (0 is the most recent)
    pub fn restore_backup(&self, index: usize) -> Result<Ledger, StorageError> {
        let path = self.backup_path(index);
        if !path.exists() {
            return Err(StorageError::BackupNotFound(index));
        }
        read_json(&path)
    }

    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|&i| self.backup_path(i).exists())
            .collect()
    }

    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        let path = self.ledger_path();
        let file_size = if path.exists() {
            fs::metadata(&path)?.len()
        } else {
            0
        };

        Ok(StorageStats {
            file_size,
            backup_count: self.list_backups().len(),
            data_dir: self.config.data_dir.clone(),
        })
    }
}

/// Storage statistics
#[derive(Debug)]
pub struct StorageStats {
    pub file_size: u64,
    pub backup_count: usize,
    pub data_dir: PathBuf,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let reader = BufReader::new(fs::File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Export the ledger to an arbitrary path
pub fn save_to_file(ledger: &Ledger, path: &Path) -> Result<(), StorageError> {
    write_json(path, ledger)
}

/// Import a ledger from an arbitrary path
pub fn load_from_file(path: &Path) -> Result<Ledger, StorageError> {
    read_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Address, Clock};
    use crate::multisig::{Asset, MultisigProgram};

    fn storage_in(dir: &Path, max_backups: usize) -> Storage {
        Storage::new(StorageConfig {
            data_dir: dir.to_path_buf(),
            max_backups,
            ..Default::default()
        })
        .unwrap()
    }

    /// A ledger with a funded 1-of-1 multisig and one proposal
    fn populated_ledger() -> (Ledger, Address) {
        let program = MultisigProgram::default();
        let clock = Clock::new(1_000);
        let owner = Address::new([1u8; 32]);
        let mut ledger = Ledger::new();

        program.initialize_user(&mut ledger, &owner, &clock).unwrap();
        let multisig = program
            .initialize_multisig(&mut ledger, &owner, vec![owner], 1, &clock)
            .unwrap();
        ledger.credit(&owner, 100).unwrap();
        program
            .deposit(&mut ledger, &owner, &multisig, Asset::Native, 60, &clock)
            .unwrap();
        program
            .create_transaction(
                &mut ledger,
                &owner,
                &multisig,
                &Address::new([2u8; 32]),
                Asset::Native,
                10,
                2_000,
                &clock,
            )
            .unwrap();

        (ledger, multisig)
    }

    #[test]
    fn test_save_load_ledger() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage_in(temp_dir.path(), 5);
        let (ledger, multisig) = populated_ledger();

        storage.save(&ledger).unwrap();
        assert!(storage.exists());

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.account_count(), ledger.account_count());
        assert_eq!(loaded.lamports(&multisig), 60);
        assert_eq!(loaded.multisig(&multisig).unwrap().tx_count, 1);
        assert_eq!(loaded.transactions_for(&multisig).len(), 1);
        assert_eq!(loaded.events().len(), ledger.events().len());
    }

    #[test]
    fn test_missing_ledger() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage_in(temp_dir.path(), 5);

        assert!(matches!(storage.load(), Err(StorageError::NotFound(_))));
        assert_eq!(storage.load_or_default().unwrap().account_count(), 0);
    }

    #[test]
    fn test_backup_rotation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage_in(temp_dir.path(), 3);
        let mut ledger = Ledger::new();

        for i in 0..5u64 {
            ledger.credit(&Address::new([9u8; 32]), 1).unwrap();
            storage.save(&ledger).unwrap();
            assert!(storage.list_backups().len() <= 3, "after save {}", i);
        }

        assert_eq!(storage.list_backups(), vec![0, 1, 2]);
        let previous = storage.restore_backup(0).unwrap();
        assert_eq!(previous.lamports(&Address::new([9u8; 32])), 4);
        assert!(matches!(
            storage.restore_backup(7),
            Err(StorageError::BackupNotFound(7))
        ));
        assert_eq!(storage.stats().unwrap().backup_count, 3);
    }

    #[test]
    fn test_export_import() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("export.json");
        let (ledger, multisig) = populated_ledger();

        save_to_file(&ledger, &path).unwrap();
        let imported = load_from_file(&path).unwrap();
        assert_eq!(imported.multisig(&multisig), ledger.multisig(&multisig));
    }
}
