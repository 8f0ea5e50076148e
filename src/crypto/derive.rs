//! Derived account addresses
//!
//! A derived address is `SHA-256(seeds || bump || program_id || marker)`
//! chosen so that the result is *not* a valid x-only secp256k1 public key.
//! No private key can sign for such an address, which is what lets the
//! program hold custody under it.
//!
//! The search walks the bump from 255 down to 0 and returns the first
//! off-curve candidate together with the bump that produced it.

use crate::core::Address;
use crate::crypto::hash::hashv;
use thiserror::Error;

/// Maximum number of seeds (including the bump) per derivation
pub const MAX_SEEDS: usize = 16;
/// Maximum length of a single seed in bytes
pub const MAX_SEED_LEN: usize = 32;

const DERIVED_ADDRESS_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Derivation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeriveError {
    #[error("Too many seeds: {count} (max 16)")]
    TooManySeeds { count: usize },
    #[error("Seed {index} is {len} bytes (max 32)")]
    SeedTooLong { index: usize, len: usize },
    #[error("Candidate address lies on the curve")]
    OnCurve,
    #[error("No off-curve address found for any bump")]
    Exhausted,
}

/// Compute the derived address for an exact seed list (bump included)
pub fn create_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<Address, DeriveError> {
    if seeds.len() > MAX_SEEDS {
        return Err(DeriveError::TooManySeeds { count: seeds.len() });
    }
    if let Some((index, seed)) = seeds
        .iter()
        .enumerate()
        .find(|(_, seed)| seed.len() > MAX_SEED_LEN)
    {
        return Err(DeriveError::SeedTooLong {
            index,
            len: seed.len(),
        });
    }

    let mut parts: Vec<&[u8]> = seeds.to_vec();
    parts.push(program_id.as_ref());
    parts.push(DERIVED_ADDRESS_MARKER);

    let candidate = Address::new(hashv(&parts));
    if candidate.is_on_curve() {
        return Err(DeriveError::OnCurve);
    }

    Ok(candidate)
}

/// Find the derived address and bump for a seed list
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<(Address, u8), DeriveError> {
    search_bumps(seeds, program_id, (0..=u8::MAX).rev())
}

fn search_bumps(
    seeds: &[&[u8]],
    program_id: &Address,
    bumps: impl Iterator<Item = u8>,
) -> Result<(Address, u8), DeriveError> {
    if seeds.len() >= MAX_SEEDS {
        return Err(DeriveError::TooManySeeds {
            count: seeds.len() + 1,
        });
    }

    for bump in bumps {
        let bump_seed = [bump];
        let mut seeds_with_bump: Vec<&[u8]> = seeds.to_vec();
        seeds_with_bump.push(&bump_seed);

        match create_program_address(&seeds_with_bump, program_id) {
            Ok(address) => {
                log::debug!("Derived {} with bump {}", address, bump);
                return Ok((address, bump));
            }
            Err(DeriveError::OnCurve) => continue,
            Err(e) => return Err(e),
        }
    }

    Err(DeriveError::Exhausted)
}
