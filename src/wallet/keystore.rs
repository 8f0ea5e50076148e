//! Local identity keystore
//!
//! Each identity is one JSON file named after its address, holding the
//! private key and an optional label. Identities sign instructions for the
//! CLI; the ledger itself never sees private keys.

use crate::core::{Address, AddressError};
use crate::crypto::{KeyError, KeyPair};
use crate::multisig::{Instruction, ProcessError, SignedInstruction};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Keystore errors
#[derive(Error, Debug)]
pub enum KeystoreError {
    #[error("Identity not found: {0}")]
    NotFound(String),
    #[error("Label already in use: {0}")]
    DuplicateLabel(String),
    #[error("Address error: {0}")]
    Address(#[from] AddressError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
}

/// On-disk identity record
#[derive(Debug, Serialize, Deserialize)]
struct IdentityFile {
    private_key_hex: String,
    address: Address,
    label: Option<String>,
}

/// A signing identity
#[derive(Clone)]
pub struct Identity {
    key_pair: KeyPair,
    pub label: Option<String>,
}

impl Identity {
    pub fn generate(label: Option<&str>) -> Self {
        Self {
            key_pair: KeyPair::generate(),
            label: label.map(str::to_string),
        }
    }

    pub fn from_private_key(private_key_hex: &str, label: Option<&str>) -> Result<Self, KeystoreError> {
        Ok(Self {
            key_pair: KeyPair::from_private_key_hex(private_key_hex)?,
            label: label.map(str::to_string),
        })
    }

    pub fn address(&self) -> Address {
        self.key_pair.address()
    }

    pub fn public_key(&self) -> String {
        self.key_pair.public_key_hex()
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    /// Sign an instruction as this identity
    pub fn sign(&self, instruction: Instruction, nonce: u64) -> Result<SignedInstruction, ProcessError> {
        SignedInstruction::sign(instruction, nonce, &self.key_pair)
    }

    /// Label if set, otherwise the short address
    pub fn display_name(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.address().short())
    }

    pub fn info(&self) -> IdentityInfo {
        IdentityInfo {
            address: self.address(),
            public_key: self.public_key(),
            label: self.label.clone(),
        }
    }

    fn save(&self, path: &Path) -> Result<(), KeystoreError> {
        let data = IdentityFile {
            private_key_hex: self.key_pair.private_key_hex(),
            address: self.address(),
            label: self.label.clone(),
        };
        fs::write(path, serde_json::to_string_pretty(&data)?)?;
        Ok(())
    }

    fn load(path: &Path) -> Result<Self, KeystoreError> {
        let data: IdentityFile = serde_json::from_str(&fs::read_to_string(path)?)?;
        Self::from_private_key(&data.private_key_hex, data.label.as_deref())
    }
}

/// Public identity information (safe to share)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityInfo {
    pub address: Address,
    pub public_key: String,
    pub label: Option<String>,
}

/// Directory of identity files
pub struct Keystore {
    dir: PathBuf,
}

impl Keystore {
    pub fn new(dir: &Path) -> Result<Self, KeystoreError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, address: &Address) -> PathBuf {
        self.dir.join(format!("{}.json", address))
    }

    /// Generate and store a new identity; labels must be unique
    pub fn create(&self, label: Option<&str>) -> Result<Identity, KeystoreError> {
        self.ensure_label_free(label)?;
        let identity = Identity::generate(label);
        identity.save(&self.path_for(&identity.address()))?;
        log::info!("Identity created: {}", identity.address());
        Ok(identity)
    }

    /// Store an existing private key
    pub fn import(&self, private_key_hex: &str, label: Option<&str>) -> Result<Identity, KeystoreError> {
        self.ensure_label_free(label)?;
        let identity = Identity::from_private_key(private_key_hex, label)?;
        identity.save(&self.path_for(&identity.address()))?;
        Ok(identity)
    }

    fn ensure_label_free(&self, label: Option<&str>) -> Result<(), KeystoreError> {
        if let Some(label) = label {
            if self.find_by_label(label)?.is_some() {
                return Err(KeystoreError::DuplicateLabel(label.to_string()));
            }
        }
        Ok(())
    }

    /// All identities, labelled ones first
    pub fn list(&self) -> Result<Vec<Identity>, KeystoreError> {
        let mut identities = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match Identity::load(&path) {
                    Ok(identity) => identities.push(identity),
                    Err(e) => log::warn!("Skipping unreadable key file {}: {}", path.display(), e),
                }
            }
        }

        identities.sort_by_key(|i| (i.label.is_none(), i.label.clone(), i.address()));
        Ok(identities)
    }

    pub fn load(&self, address: &Address) -> Result<Identity, KeystoreError> {
        let path = self.path_for(address);
        if !path.exists() {
            return Err(KeystoreError::NotFound(address.to_string()));
        }
        Identity::load(&path)
    }

    pub fn find_by_label(&self, label: &str) -> Result<Option<Identity>, KeystoreError> {
        Ok(self
            .list()?
            .into_iter()
            .find(|i| i.label.as_deref() == Some(label)))
    }

    /// Look up an identity by label, falling back to its address
    pub fn resolve(&self, label_or_address: &str) -> Result<Identity, KeystoreError> {
        if let Some(identity) = self.find_by_label(label_or_address)? {
            return Ok(identity);
        }
        match label_or_address.parse::<Address>() {
            Ok(address) => self.load(&address),
            Err(_) => Err(KeystoreError::NotFound(label_or_address.to_string())),
        }
    }

    /// Resolve a label to an address, or parse a literal address
    pub fn resolve_address(&self, label_or_address: &str) -> Result<Address, KeystoreError> {
        if let Some(identity) = self.find_by_label(label_or_address)? {
            return Ok(identity.address());
        }
        Ok(label_or_address.parse()?)
    }

    pub fn delete(&self, address: &Address) -> Result<(), KeystoreError> {
        fs::remove_file(self.path_for(address))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_import() {
        let first = Identity::generate(None);
        let key = first.key_pair().private_key_hex();

        let second = Identity::from_private_key(&key, Some("copy")).unwrap();
        assert_eq!(first.address(), second.address());
        assert_eq!(second.display_name(), "copy");
    }

    #[test]
    fn test_create_and_list() {
        let temp_dir = tempfile::tempdir().unwrap();
        let keystore = Keystore::new(temp_dir.path()).unwrap();

        let alice = keystore.create(Some("alice")).unwrap();
        let anon = keystore.create(None).unwrap();

        let listed = keystore.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].address(), alice.address());
        assert_eq!(listed[1].address(), anon.address());

        let loaded = keystore.load(&alice.address()).unwrap();
        assert_eq!(loaded.label.as_deref(), Some("alice"));
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let keystore = Keystore::new(temp_dir.path()).unwrap();

        keystore.create(Some("alice")).unwrap();
        assert!(matches!(
            keystore.create(Some("alice")),
            Err(KeystoreError::DuplicateLabel(_))
        ));
    }

    #[test]
    fn test_resolve() {
        let temp_dir = tempfile::tempdir().unwrap();
        let keystore = Keystore::new(temp_dir.path()).unwrap();
        let bob = keystore.create(Some("bob")).unwrap();

        assert_eq!(keystore.resolve("bob").unwrap().address(), bob.address());
        assert_eq!(
            keystore.resolve(&bob.address().to_string()).unwrap().address(),
            bob.address()
        );
        assert!(matches!(
            keystore.resolve("carol"),
            Err(KeystoreError::NotFound(_))
        ));

        let outside = KeyPair::generate().address();
        assert_eq!(
            keystore.resolve_address(&outside.to_string()).unwrap(),
            outside
        );
        assert_eq!(keystore.resolve_address("bob").unwrap(), bob.address());
    }

    #[test]
    fn test_import_and_delete() {
        let temp_dir = tempfile::tempdir().unwrap();
        let keystore = Keystore::new(temp_dir.path()).unwrap();
        let outside = Identity::generate(None);

        let imported = keystore
            .import(&outside.key_pair().private_key_hex(), Some("imported"))
            .unwrap();
        assert_eq!(imported.address(), outside.address());
        assert_eq!(imported.info().label.as_deref(), Some("imported"));

        keystore.delete(&imported.address()).unwrap();
        assert!(matches!(
            keystore.load(&imported.address()),
            Err(KeystoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_signed_by_identity_verifies() {
        let identity = Identity::generate(Some("signer"));
        let signed = identity.sign(Instruction::InitializeUser, 3).unwrap();
        assert_eq!(signed.verify().unwrap(), identity.address());
    }
}
