//! Signed program instructions
//!
//! An instruction is authorized by a secp256k1 ECDSA signature over
//! `SHA-256(json(instruction, nonce))`. The signer's x-only key is the
//! identity that acts as creator, payer or owner for the operation.

use crate::core::Address;
use crate::crypto::{public_key_from_hex, public_key_to_address, sha256, verify_signature, KeyPair};
use crate::multisig::processor::ProcessError;
use crate::multisig::state::Asset;
use serde::{Deserialize, Serialize};

/// One variant per ledger operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
    InitializeUser,
    InitializeMultisig {
        owners: Vec<Address>,
        threshold: u8,
    },
    Deposit {
        multisig: Address,
        asset: Asset,
        amount: u64,
    },
    CreateTransaction {
        multisig: Address,
        receiver: Address,
        asset: Asset,
        amount: u64,
        expire_at: i64,
    },
    ApproveTransaction {
        transaction: Address,
    },
    CancelTransaction {
        transaction: Address,
    },
    ExecuteTransaction {
        transaction: Address,
        multisig: Address,
        receiver: Address,
        asset: Asset,
    },
    CreateToken {
        name: String,
        symbol: String,
        decimals: u8,
        total_supply: u64,
    },
    TransferToken {
        mint: Address,
        to: Address,
        amount: u64,
    },
}

impl Instruction {
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::InitializeUser => "initialize_user",
            Instruction::InitializeMultisig { .. } => "initialize_multisig",
            Instruction::Deposit { .. } => "deposit",
            Instruction::CreateTransaction { .. } => "create_transaction",
            Instruction::ApproveTransaction { .. } => "approve_transaction",
            Instruction::CancelTransaction { .. } => "cancel_transaction",
            Instruction::ExecuteTransaction { .. } => "execute_transaction",
            Instruction::CreateToken { .. } => "create_token",
            Instruction::TransferToken { .. } => "transfer_token",
        }
    }
}

/// An instruction together with its signer and signature
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedInstruction {
    pub instruction: Instruction,
    /// Caller-chosen value that makes otherwise identical instructions distinct
    pub nonce: u64,
    /// Compressed public key of the signer (hex)
    pub signer_pubkey: String,
    /// Compact ECDSA signature (hex)
    pub signature: String,
}

impl SignedInstruction {
    /// Hash that is signed for an instruction and nonce
    pub fn message_hash(instruction: &Instruction, nonce: u64) -> Result<Vec<u8>, ProcessError> {
        let encoded = serde_json::to_vec(&(instruction, nonce))?;
        Ok(sha256(&encoded))
    }

    pub fn sign(instruction: Instruction, nonce: u64, keypair: &KeyPair) -> Result<Self, ProcessError> {
        let hash = Self::message_hash(&instruction, nonce)?;
        let signature = keypair.sign(&hash)?;

        Ok(Self {
            instruction,
            nonce,
            signer_pubkey: keypair.public_key_hex(),
            signature: hex::encode(signature),
        })
    }

    /// Address of the claimed signer, without checking the signature
    pub fn signer(&self) -> Result<Address, ProcessError> {
        let public_key = public_key_from_hex(&self.signer_pubkey)?;
        Ok(public_key_to_address(&public_key))
    }

    /// Check the signature and return the signer's address
    pub fn verify(&self) -> Result<Address, ProcessError> {
        let public_key = public_key_from_hex(&self.signer_pubkey)?;
        let signature = hex::decode(&self.signature).map_err(|_| ProcessError::InvalidSignature)?;
        let hash = Self::message_hash(&self.instruction, self.nonce)?;

        match verify_signature(&public_key, &hash, &signature) {
            Ok(true) => Ok(public_key_to_address(&public_key)),
            _ => Err(ProcessError::InvalidSignature),
        }
    }

    /// Replay-protection key: the signer's address and the signed message.
    /// Any hex spelling or point encoding of the same key yields the same digest.
    pub fn digest(&self) -> Result<String, ProcessError> {
        let mut data = self.signer()?.to_bytes().to_vec();
        data.extend(Self::message_hash(&self.instruction, self.nonce)?);
        Ok(hex::encode(sha256(&data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approve(byte: u8) -> Instruction {
        Instruction::ApproveTransaction {
            transaction: Address::new([byte; 32]),
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = KeyPair::generate();
        let signed = SignedInstruction::sign(approve(1), 7, &keypair).unwrap();

        assert_eq!(signed.verify().unwrap(), keypair.address());
        assert_eq!(signed.signer().unwrap(), keypair.address());
    }

    #[test]
    fn test_tampered_instruction_fails() {
        let keypair = KeyPair::generate();
        let mut signed = SignedInstruction::sign(approve(1), 7, &keypair).unwrap();
        signed.instruction = approve(2);
        assert!(matches!(signed.verify(), Err(ProcessError::InvalidSignature)));

        let mut signed = SignedInstruction::sign(approve(1), 7, &keypair).unwrap();
        signed.nonce = 8;
        assert!(matches!(signed.verify(), Err(ProcessError::InvalidSignature)));
    }

    #[test]
    fn test_foreign_key_fails() {
        let keypair = KeyPair::generate();
        let other = KeyPair::generate();
        let mut signed = SignedInstruction::sign(approve(1), 7, &keypair).unwrap();
        signed.signer_pubkey = other.public_key_hex();

        assert!(matches!(signed.verify(), Err(ProcessError::InvalidSignature)));
    }

    #[test]
    fn test_digest_depends_on_nonce_and_signer() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();

        let first = SignedInstruction::sign(approve(1), 1, &a).unwrap();
        let again = SignedInstruction::sign(approve(1), 1, &a).unwrap();
        let bumped = SignedInstruction::sign(approve(1), 2, &a).unwrap();
        let other = SignedInstruction::sign(approve(1), 1, &b).unwrap();

        assert_eq!(first.digest().unwrap(), again.digest().unwrap());
        assert_ne!(first.digest().unwrap(), bumped.digest().unwrap());
        assert_ne!(first.digest().unwrap(), other.digest().unwrap());
    }

    #[test]
    fn test_digest_ignores_key_encoding() {
        let keypair = KeyPair::generate();
        let signed = SignedInstruction::sign(approve(1), 1, &keypair).unwrap();

        let mut upper = signed.clone();
        upper.signer_pubkey = signed.signer_pubkey.to_uppercase();
        let mut uncompressed = signed.clone();
        uncompressed.signer_pubkey = hex::encode(keypair.public_key.serialize_uncompressed());

        for variant in [&upper, &uncompressed] {
            assert_eq!(variant.verify().unwrap(), keypair.address());
            assert_eq!(variant.digest().unwrap(), signed.digest().unwrap());
        }
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(Instruction::Deposit {
            multisig: Address::new([1u8; 32]),
            asset: Asset::Native,
            amount: 5,
        })
        .unwrap();

        assert_eq!(json["type"], "deposit");
        assert_eq!(json["amount"], 5);
        assert_eq!(json["asset"]["type"], "native");
    }
}
