//! Program records: users, multisig groups and transaction proposals
//!
//! Every record lives at an address derived from its seeds, so clients can
//! locate a record from public data alone:
//!
//! | Record      | Seeds                                  |
//! |-------------|----------------------------------------|
//! | User        | `creator`, `"user"`                    |
//! | Multisig    | `creator`, `count` (u64 LE), `"multisig"` |
//! | Transaction | `multisig`, `tx_count` (u64 LE), `"transaction"` |

use crate::core::{Address, AddressError};
use crate::crypto::{find_program_address, DeriveError};
use crate::multisig::error::MultisigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const USER_SEED: &[u8] = b"user";
pub const MULTISIG_SEED: &[u8] = b"multisig";
pub const TRANSACTION_SEED: &[u8] = b"transaction";

/// Maximum number of owners in a multisig group
pub const MAX_OWNERS: usize = 20;

/// What a proposal moves out of custody
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "mint", rename_all = "snake_case")]
pub enum Asset {
    /// Lamports held directly by the multisig account
    Native,
    /// Units of a token mint held under the multisig address
    Token(Address),
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => write!(f, "native"),
            Asset::Token(mint) => write!(f, "{}", mint),
        }
    }
}

impl FromStr for Asset {
    type Err = AddressError;

    /// `native` (case-insensitive) or a mint address
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("native") {
            Ok(Asset::Native)
        } else {
            Ok(Asset::Token(s.parse()?))
        }
    }
}

/// Per-creator registry of multisig groups
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub creator: Address,
    /// Number of multisig groups created so far; the next group's id
    pub count: u64,
    pub bump: u8,
}

impl User {
    pub fn address(creator: &Address, program_id: &Address) -> Result<(Address, u8), DeriveError> {
        find_program_address(&[creator.as_ref(), USER_SEED], program_id)
    }
}

/// A multisig group: a fixed owner set and an approval threshold
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multisig {
    pub creator: Address,
    /// Sequence number among the creator's groups
    pub id: u64,
    pub owners: Vec<Address>,
    pub threshold: u8,
    /// Number of proposals created; the next proposal's sequence number
    pub tx_count: u64,
    pub bump: u8,
}

impl Multisig {
    pub fn address(
        creator: &Address,
        id: u64,
        program_id: &Address,
    ) -> Result<(Address, u8), DeriveError> {
        find_program_address(
            &[creator.as_ref(), &id.to_le_bytes(), MULTISIG_SEED],
            program_id,
        )
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        self.owners.contains(address)
    }

    /// "2-of-3" style summary
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.owners.len())
    }
}

/// Lifecycle state of a proposal, derived from its flags and the clock
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Collecting approvals
    Pending,
    /// Threshold reached, ready to execute
    Approved,
    Executed,
    Expired,
    Canceled,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Approved => "approved",
            TransactionStatus::Executed => "executed",
            TransactionStatus::Expired => "expired",
            TransactionStatus::Canceled => "canceled",
        };
        write!(f, "{}", label)
    }
}

/// A proposal to move funds out of a multisig's custody
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub multisig: Address,
    /// Owner who proposed the transfer
    pub creator: Address,
    pub receiver: Address,
    pub asset: Asset,
    pub amount: u64,
    /// Sequence number within the multisig
    pub tx_count: u64,
    /// Owner set at proposal time
    pub owners: Vec<Address>,
    /// Approval marks, index-aligned with `owners`
    pub signs: Vec<bool>,
    pub threshold: u8,
    /// Unix time after which the proposal can no longer be approved or executed
    pub expire_at: i64,
    pub is_executed: bool,
    #[serde(default)]
    pub is_canceled: bool,
    pub bump: u8,
}

impl Transaction {
    pub fn address(
        multisig: &Address,
        tx_count: u64,
        program_id: &Address,
    ) -> Result<(Address, u8), DeriveError> {
        find_program_address(
            &[multisig.as_ref(), &tx_count.to_le_bytes(), TRANSACTION_SEED],
            program_id,
        )
    }

    /// Position of an address in the owner snapshot
    pub fn owner_index(&self, address: &Address) -> Option<usize> {
        self.owners.iter().position(|owner| owner == address)
    }

    pub fn approval_count(&self) -> usize {
        self.signs.iter().filter(|&&signed| signed).count()
    }

    pub fn is_approved(&self) -> bool {
        self.approval_count() >= self.threshold as usize
    }

    /// Expiry is inclusive: a proposal is still live at exactly `expire_at`
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expire_at
    }

    pub fn status(&self, now: i64) -> TransactionStatus {
        if self.is_executed {
            TransactionStatus::Executed
        } else if self.is_canceled {
            TransactionStatus::Canceled
        } else if self.is_expired(now) {
            TransactionStatus::Expired
        } else if self.is_approved() {
            TransactionStatus::Approved
        } else {
            TransactionStatus::Pending
        }
    }

    /// Fails unless the proposal can still be approved, executed or canceled
    pub fn ensure_active(&self, now: i64) -> Result<(), MultisigError> {
        if self.is_executed {
            return Err(MultisigError::AlreadyExecuted);
        }
        if self.is_canceled {
            return Err(MultisigError::Canceled);
        }
        if self.is_expired(now) {
            return Err(MultisigError::Expired {
                expire_at: self.expire_at,
                now,
            });
        }
        Ok(())
    }

    /// Owners who have approved so far
    pub fn approvers(&self) -> Vec<Address> {
        self.owners
            .iter()
            .zip(&self.signs)
            .filter(|(_, &signed)| signed)
            .map(|(owner, _)| *owner)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program_id() -> Address {
        Address::new([7u8; 32])
    }

    fn proposal(signs: Vec<bool>, threshold: u8) -> Transaction {
        let owners: Vec<Address> = (1..=signs.len() as u8)
            .map(|b| Address::new([b; 32]))
            .collect();
        Transaction {
            multisig: Address::new([50u8; 32]),
            creator: owners[0],
            receiver: Address::new([60u8; 32]),
            asset: Asset::Native,
            amount: 100,
            tx_count: 0,
            owners,
            signs,
            threshold,
            expire_at: 1_000,
            is_executed: false,
            is_canceled: false,
            bump: 255,
        }
    }

    #[test]
    fn test_record_addresses_are_distinct() {
        let creator = Address::new([1u8; 32]);
        let (user, _) = User::address(&creator, &program_id()).unwrap();
        let (first, _) = Multisig::address(&creator, 0, &program_id()).unwrap();
        let (second, _) = Multisig::address(&creator, 1, &program_id()).unwrap();
        let (tx, _) = Transaction::address(&first, 0, &program_id()).unwrap();

        let all = [user, first, second, tx];
        for (i, a) in all.iter().enumerate() {
            assert!(!a.is_on_curve());
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_asset_parse() {
        assert_eq!("native".parse::<Asset>().unwrap(), Asset::Native);
        assert_eq!("NATIVE".parse::<Asset>().unwrap(), Asset::Native);

        let mint = Address::new([3u8; 32]);
        let parsed: Asset = mint.to_string().parse().unwrap();
        assert_eq!(parsed, Asset::Token(mint));
        assert_eq!(parsed.to_string(), mint.to_string());

        assert!("not-an-address".parse::<Asset>().is_err());
    }

    #[test]
    fn test_status_transitions() {
        let mut tx = proposal(vec![true, false, false], 2);
        assert_eq!(tx.status(500), TransactionStatus::Pending);

        tx.signs[2] = true;
        assert_eq!(tx.approval_count(), 2);
        assert_eq!(tx.status(500), TransactionStatus::Approved);
        assert_eq!(tx.status(1_000), TransactionStatus::Approved);
        assert_eq!(tx.status(1_001), TransactionStatus::Expired);

        tx.is_executed = true;
        assert_eq!(tx.status(1_001), TransactionStatus::Executed);
    }

    #[test]
    fn test_ensure_active_order() {
        let mut tx = proposal(vec![false, false], 1);
        assert!(tx.ensure_active(1_000).is_ok());
        assert_eq!(
            tx.ensure_active(1_001),
            Err(MultisigError::Expired {
                expire_at: 1_000,
                now: 1_001
            })
        );

        tx.is_canceled = true;
        assert_eq!(tx.ensure_active(0), Err(MultisigError::Canceled));

        tx.is_executed = true;
        assert_eq!(tx.ensure_active(0), Err(MultisigError::AlreadyExecuted));
    }

    #[test]
    fn test_approvers_follow_owner_order() {
        let tx = proposal(vec![false, true, true, false], 3);
        assert_eq!(
            tx.approvers(),
            vec![Address::new([2u8; 32]), Address::new([3u8; 32])]
        );
        assert_eq!(tx.owner_index(&Address::new([4u8; 32])), Some(3));
        assert_eq!(tx.owner_index(&Address::new([9u8; 32])), None);
    }
}
