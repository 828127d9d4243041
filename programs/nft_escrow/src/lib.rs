//! Custody program for NFTs.
//!
//! An owner opens a single escrow, deposits NFTs into token accounts held by a
//! program-derived vault authority, and a designated authority later releases
//! them to any recipient. The escrow keeps a ledger of what it holds:
//! - Standard NFTs are moved into the vault's associated token accounts.
//! - Compressed NFTs are only recorded; their custody lives off this program.
//! - Every state transition emits an event for off-chain monitoring.
#![allow(unexpected_cfgs)]
use anchor_lang::prelude::*;
use anchor_spl::associated_token::{self, AssociatedToken};
use anchor_spl::token::{self, Mint, Token, TokenAccount, Transfer};

pub mod pda;

use pda::{ESCROW_SEED, VAULT_SEED};

declare_id!("CDrWxJK6t2cLsCp7RjB6jiEVx2z5v8DUxxo7FfeBi4tW");

/// Upper bound on NFTs an escrow records, standard and compressed combined.
pub const MAX_NFTS: usize = 100;

/// Remaining accounts consumed per standard NFT in `deposit_nfts`:
/// metadata, user token account, vault token account, mint.
pub const ACCOUNTS_PER_NFT: usize = 4;

#[program]
pub mod nft_escrow {
    use super::*;

    /// Opens the owner's escrow and names the authority allowed to withdraw.
    pub fn initialize_escrow(ctx: Context<InitializeEscrow>) -> Result<()> {
        let escrow_key = ctx.accounts.escrow_account.key();
        let (_, vault_bump) = pda::vault_authority_address(&escrow_key, ctx.program_id);

        let escrow_account = &mut ctx.accounts.escrow_account;
        escrow_account.authority = ctx.accounts.authority.key();
        escrow_account.owner = ctx.accounts.owner.key();
        escrow_account.bump = ctx.bumps.escrow_account;
        escrow_account.vault_bump = vault_bump;
        escrow_account.is_active = true;
        escrow_account.nft_count = 0;
        escrow_account.standard_nfts = Vec::new();
        escrow_account.compressed_nfts = Vec::new();

        emit!(EscrowInitialized {
            escrow: escrow_key,
            owner: escrow_account.owner,
            authority: escrow_account.authority,
        });

        Ok(())
    }

    /// Deposits a batch of NFTs into the escrow.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The context of accounts for the instruction. Each standard NFT
    ///   consumes `ACCOUNTS_PER_NFT` remaining accounts, in batch order.
    /// * `nft_mints` - Mint (or asset id, for compressed NFTs) of each entry.
    /// * `is_compressed` - Parallel to `nft_mints`.
    pub fn deposit_nfts<'info>(
        ctx: Context<'_, '_, '_, 'info, DepositNfts<'info>>,
        nft_mints: Vec<Pubkey>,
        is_compressed: Vec<bool>,
    ) -> Result<()> {
        require!(
            nft_mints.len() == is_compressed.len(),
            EscrowError::InvalidInputLength
        );
        require!(
            ctx.accounts.escrow_account.is_active,
            EscrowError::EscrowInactive
        );
        require!(
            ctx.accounts.escrow_account.held() + nft_mints.len() <= MAX_NFTS,
            EscrowError::EscrowFull
        );

        let standard_count = is_compressed.iter().filter(|compressed| !**compressed).count();
        require!(
            ctx.remaining_accounts.len() >= standard_count * ACCOUNTS_PER_NFT,
            EscrowError::InsufficientAccounts
        );

        let mut standard_index = 0;
        for (nft_mint, compressed) in nft_mints.iter().zip(is_compressed.iter()) {
            require!(
                !ctx.accounts.escrow_account.contains(nft_mint),
                EscrowError::NftAlreadyEscrowed
            );

            if *compressed {
                ctx.accounts.escrow_account.compressed_nfts.push(*nft_mint);
            } else {
                let start = standard_index * ACCOUNTS_PER_NFT;
                let accounts = &ctx.remaining_accounts[start..start + ACCOUNTS_PER_NFT];
                ctx.accounts.move_into_vault(nft_mint, accounts)?;
                ctx.accounts.escrow_account.standard_nfts.push(*nft_mint);
                standard_index += 1;
            }
            ctx.accounts.escrow_account.nft_count += 1;
        }

        msg!(
            "Deposited {} NFT(s), escrow now holds {}",
            nft_mints.len(),
            ctx.accounts.escrow_account.nft_count
        );

        emit!(NftsDeposited {
            escrow: ctx.accounts.escrow_account.key(),
            owner: ctx.accounts.owner.key(),
            nft_mints,
            nft_count: ctx.accounts.escrow_account.nft_count,
        });

        Ok(())
    }

    /// Releases one NFT from the escrow to `recipient`. Authority only.
    pub fn withdraw_nft(
        ctx: Context<WithdrawNft>,
        nft_mint: Pubkey,
        is_compressed: bool,
        recipient: Pubkey,
    ) -> Result<()> {
        require_keys_eq!(
            ctx.accounts.recipient.key(),
            recipient,
            EscrowError::InvalidRecipient
        );

        ctx.accounts.escrow_account.release(&nft_mint, is_compressed)?;

        if !is_compressed {
            require_keys_eq!(ctx.accounts.mint.key(), nft_mint, EscrowError::MintMismatch);

            let escrow_key = ctx.accounts.escrow_account.key();
            let signer_seeds: &[&[&[u8]]] = &[&[
                VAULT_SEED,
                escrow_key.as_ref(),
                &[ctx.accounts.escrow_account.vault_bump],
            ]];
            let cpi_accounts = Transfer {
                from: ctx.accounts.vault_nft_account.to_account_info(),
                to: ctx.accounts.recipient_nft_account.to_account_info(),
                authority: ctx.accounts.escrow_vault.to_account_info(),
            };
            let cpi_program = ctx.accounts.token_program.to_account_info();
            let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer_seeds);
            token::transfer(cpi_ctx, 1)?;
        }

        emit!(NftWithdrawn {
            escrow: ctx.accounts.escrow_account.key(),
            nft_mint,
            recipient,
            is_compressed,
        });

        Ok(())
    }
}

impl<'info> DepositNfts<'info> {
    /// Validates one standard NFT's account group and moves the token into the
    /// vault, creating the vault's token account on first use.
    fn move_into_vault(&self, nft_mint: &Pubkey, accounts: &[AccountInfo<'info>]) -> Result<()> {
        let [metadata, user_nft_account, vault_nft_account, mint] = accounts else {
            return err!(EscrowError::InsufficientAccounts);
        };

        require_keys_eq!(mint.key(), *nft_mint, EscrowError::MintMismatch);
        require_keys_eq!(
            metadata.key(),
            pda::metadata_address(nft_mint),
            EscrowError::InvalidMetadataAccount
        );
        require_keys_eq!(
            vault_nft_account.key(),
            pda::token_address(&self.escrow_vault.key(), nft_mint),
            EscrowError::InvalidVaultAccount
        );
        require_keys_eq!(
            *user_nft_account.owner,
            token::ID,
            ErrorCode::AccountOwnedByWrongProgram
        );

        let user_nft = TokenAccount::try_deserialize(&mut &user_nft_account.data.borrow()[..])?;
        require_keys_eq!(user_nft.owner, self.owner.key(), EscrowError::NotTokenOwner);
        require_keys_eq!(user_nft.mint, *nft_mint, EscrowError::MintMismatch);

        associated_token::create_idempotent(CpiContext::new(
            self.associated_token_program.to_account_info(),
            associated_token::Create {
                payer: self.owner.to_account_info(),
                associated_token: vault_nft_account.clone(),
                authority: self.escrow_vault.to_account_info(),
                mint: mint.clone(),
                system_program: self.system_program.to_account_info(),
                token_program: self.token_program.to_account_info(),
            },
        ))?;

        let cpi_accounts = Transfer {
            from: user_nft_account.clone(),
            to: vault_nft_account.clone(),
            authority: self.owner.to_account_info(),
        };
        let cpi_ctx = CpiContext::new(self.token_program.to_account_info(), cpi_accounts);
        token::transfer(cpi_ctx, 1)
    }
}

#[derive(Accounts)]
pub struct InitializeEscrow<'info> {
    #[account(
        init,
        payer = owner,
        space = EscrowAccount::SPACE,
        seeds = [ESCROW_SEED, owner.key().as_ref()],
        bump
    )]
    pub escrow_account: Account<'info, EscrowAccount>,
    /// CHECK: Recorded as the only key allowed to withdraw.
    pub authority: AccountInfo<'info>,
    #[account(mut)]
    pub owner: Signer<'info>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct DepositNfts<'info> {
    #[account(
        mut,
        seeds = [ESCROW_SEED, owner.key().as_ref()],
        bump = escrow_account.bump,
        has_one = owner @ EscrowError::InvalidOwner,
    )]
    pub escrow_account: Account<'info, EscrowAccount>,
    #[account(mut)]
    pub owner: Signer<'info>,
    /// CHECK: PDA that owns the vault token accounts; holds no data.
    #[account(
        seeds = [VAULT_SEED, escrow_account.key().as_ref()],
        bump = escrow_account.vault_bump,
    )]
    pub escrow_vault: AccountInfo<'info>,
    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
    pub rent: Sysvar<'info, Rent>,
}

#[derive(Accounts)]
pub struct WithdrawNft<'info> {
    #[account(
        mut,
        seeds = [ESCROW_SEED, escrow_account.owner.as_ref()],
        bump = escrow_account.bump,
        constraint = escrow_account.authority == authority.key() @ EscrowError::InvalidAuthority,
    )]
    pub escrow_account: Account<'info, EscrowAccount>,
    #[account(mut)]
    pub authority: Signer<'info>,
    /// CHECK: PDA that owns the vault token accounts; holds no data.
    #[account(
        seeds = [VAULT_SEED, escrow_account.key().as_ref()],
        bump = escrow_account.vault_bump,
    )]
    pub escrow_vault: AccountInfo<'info>,
    pub mint: Account<'info, Mint>,
    #[account(
        mut,
        associated_token::mint = mint,
        associated_token::authority = escrow_vault,
    )]
    pub vault_nft_account: Account<'info, TokenAccount>,
    #[account(
        mut,
        associated_token::mint = mint,
        associated_token::authority = recipient,
    )]
    pub recipient_nft_account: Account<'info, TokenAccount>,
    /// CHECK: Checked against the `recipient` instruction argument.
    pub recipient: AccountInfo<'info>,
    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
    pub rent: Sysvar<'info, Rent>,
}

#[account]
#[derive(Default)]
pub struct EscrowAccount {
    pub authority: Pubkey,
    pub owner: Pubkey,
    pub bump: u8,
    pub vault_bump: u8,
    pub is_active: bool,
    pub nft_count: u32,
    pub standard_nfts: Vec<Pubkey>,
    pub compressed_nfts: Vec<Pubkey>,
}

impl EscrowAccount {
    /// Discriminator plus fixed fields plus both vectors at full capacity.
    pub const SPACE: usize = 8 + 32 + 32 + 1 + 1 + 1 + 4 + (4 + 4) + 32 * MAX_NFTS;

    pub fn held(&self) -> usize {
        self.standard_nfts.len() + self.compressed_nfts.len()
    }

    pub fn contains(&self, nft_mint: &Pubkey) -> bool {
        self.standard_nfts.contains(nft_mint) || self.compressed_nfts.contains(nft_mint)
    }

    /// Drops `nft_mint` from the matching ledger.
    pub fn release(&mut self, nft_mint: &Pubkey, is_compressed: bool) -> Result<()> {
        let ledger = if is_compressed {
            &mut self.compressed_nfts
        } else {
            &mut self.standard_nfts
        };
        let index = ledger
            .iter()
            .position(|mint| mint == nft_mint)
            .ok_or(EscrowError::NftNotFound)?;
        ledger.remove(index);
        self.nft_count -= 1;
        Ok(())
    }
}

#[error_code]
pub enum EscrowError {
    #[msg("Invalid authority")]
    InvalidAuthority,
    #[msg("Invalid owner")]
    InvalidOwner,
    #[msg("NFT not found in escrow")]
    NftNotFound,
    #[msg("Not the token owner")]
    NotTokenOwner,
    #[msg("Invalid input length")]
    InvalidInputLength,
    #[msg("Insufficient accounts provided")]
    InsufficientAccounts,
    #[msg("The escrow is not active")]
    EscrowInactive,
    #[msg("The escrow cannot hold any more NFTs")]
    EscrowFull,
    #[msg("The NFT is already held by this escrow")]
    NftAlreadyEscrowed,
    #[msg("The mint account does not match the NFT")]
    MintMismatch,
    #[msg("The metadata account is not the NFT's metadata PDA")]
    InvalidMetadataAccount,
    #[msg("The vault token account is not the vault's associated token account")]
    InvalidVaultAccount,
    #[msg("The recipient account does not match the requested recipient")]
    InvalidRecipient,
}

#[event]
pub struct EscrowInitialized {
    pub escrow: Pubkey,
    pub owner: Pubkey,
    pub authority: Pubkey,
}

#[event]
pub struct NftsDeposited {
    pub escrow: Pubkey,
    pub owner: Pubkey,
    pub nft_mints: Vec<Pubkey>,
    pub nft_count: u32,
}

#[event]
pub struct NftWithdrawn {
    pub escrow: Pubkey,
    pub nft_mint: Pubkey,
    pub recipient: Pubkey,
    pub is_compressed: bool,
}
