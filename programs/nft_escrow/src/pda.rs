//! Address derivation shared by the program and off-chain clients.
//!
//! Every address the escrow touches is a pure function of public keys and
//! fixed seeds, so clients compute them locally instead of asking the cluster.
use anchor_lang::prelude::*;
use anchor_lang::solana_program::pubkey;
use anchor_spl::associated_token::get_associated_token_address;

pub const ESCROW_SEED: &[u8] = b"escrow_account";
pub const VAULT_SEED: &[u8] = b"escrow_vault";
pub const METADATA_SEED: &[u8] = b"metadata";

/// Metaplex token metadata program.
pub const METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// Escrow state PDA for `owner`. One escrow per owner.
pub fn escrow_address(owner: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[ESCROW_SEED, owner.as_ref()], program_id)
}

/// PDA that owns the vault token accounts of `escrow`.
pub fn vault_authority_address(escrow: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED, escrow.as_ref()], program_id)
}

pub fn metadata_address(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[METADATA_SEED, METADATA_PROGRAM_ID.as_ref(), mint.as_ref()],
        &METADATA_PROGRAM_ID,
    )
    .0
}

/// Associated token account holding `mint` on behalf of `owner`.
pub fn token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(owner, mint)
}
