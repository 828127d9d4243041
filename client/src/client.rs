use std::rc::Rc;

use anchor_client::solana_sdk::signature::{Keypair, Signature, Signer};
use anchor_client::solana_sdk::{system_program, sysvar};
use anchor_client::{Client, Program};
use anchor_lang::prelude::{AccountMeta, Pubkey};
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::{InstructionData, ToAccountMetas};
use anchor_spl::associated_token::{self, spl_associated_token_account};
use anchor_spl::token;
use log::{error, info, warn};
use nft_escrow::{pda, EscrowAccount};

use crate::config::{load_keypair, Config};
use crate::error::{EscrowClientError, Result};

/// Every address one NFT's escrow round trip touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscrowAddresses {
    pub owner: Pubkey,
    pub mint: Pubkey,
    pub escrow: Pubkey,
    pub escrow_vault: Pubkey,
    pub owner_token_account: Pubkey,
    pub vault_token_account: Pubkey,
    pub metadata: Pubkey,
}

impl EscrowAddresses {
    pub fn derive(owner: &Pubkey, mint: &Pubkey, program_id: &Pubkey) -> Self {
        let (escrow, _) = pda::escrow_address(owner, program_id);
        let (escrow_vault, _) = pda::vault_authority_address(&escrow, program_id);
        Self {
            owner: *owner,
            mint: *mint,
            escrow,
            escrow_vault,
            owner_token_account: pda::token_address(owner, mint),
            vault_token_account: pda::token_address(&escrow_vault, mint),
            metadata: pda::metadata_address(mint),
        }
    }

    /// Remaining accounts for depositing this NFT as a standard token, in the
    /// order the program consumes them.
    pub fn deposit_remaining_accounts(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new_readonly(self.metadata, false),
            AccountMeta::new(self.owner_token_account, false),
            AccountMeta::new(self.vault_token_account, false),
            AccountMeta::new_readonly(self.mint, false),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Created(Pubkey),
    AlreadyExists(Pubkey),
}

/// Drives the escrow program on behalf of the wallet loaded from `Config`.
///
/// The wallet is both the escrow owner and its withdraw authority.
pub struct EscrowClient {
    program: Program<Rc<Keypair>>,
    owner: Pubkey,
}

impl EscrowClient {
    pub fn new(config: &Config) -> Result<Self> {
        let payer = Rc::new(load_keypair(&config.keypair_path)?);
        let owner = payer.pubkey();
        let client = Client::new_with_options(config.cluster.clone(), payer, config.commitment);
        let program = client.program(config.program_id)?;

        info!(
            "wallet {} on {} (program {})",
            owner,
            config.rpc_url(),
            config.program_id
        );
        Ok(Self { program, owner })
    }

    pub fn owner(&self) -> Pubkey {
        self.owner
    }

    pub fn escrow_address(&self) -> Pubkey {
        pda::escrow_address(&self.owner, &self.program.id()).0
    }

    pub fn addresses(&self, mint: &Pubkey) -> EscrowAddresses {
        EscrowAddresses::derive(&self.owner, mint, &self.program.id())
    }

    /// Creates the wallet's escrow. An escrow left by an earlier run is reused.
    pub fn initialize_escrow(&self) -> Result<InitOutcome> {
        let escrow = self.escrow_address();

        let sent = self
            .program
            .request()
            .accounts(nft_escrow::accounts::InitializeEscrow {
                escrow_account: escrow,
                authority: self.owner,
                owner: self.owner,
                system_program: system_program::ID,
            })
            .args(nft_escrow::instruction::InitializeEscrow {})
            .send()
            .map_err(EscrowClientError::from);

        match sent {
            Ok(signature) => {
                info!("fresh escrow {escrow} ({signature})");
                Ok(InitOutcome::Created(escrow))
            }
            Err(err) if err.is_already_in_use() => {
                info!("escrow already exists: {escrow}");
                Ok(InitOutcome::AlreadyExists(escrow))
            }
            Err(err) => {
                error!("initialize failed: {}", err.detail());
                Err(err)
            }
        }
    }

    /// Moves one standard NFT from the wallet into the escrow vault.
    pub fn deposit_nft(&self, mint: Pubkey) -> Result<Signature> {
        let addresses = self.addresses(&mint);
        info!(
            "user token account balance before: {}",
            self.token_balance(&addresses.owner_token_account)
        );

        let mut accounts = nft_escrow::accounts::DepositNfts {
            escrow_account: addresses.escrow,
            owner: self.owner,
            escrow_vault: addresses.escrow_vault,
            token_program: token::ID,
            associated_token_program: associated_token::ID,
            system_program: system_program::ID,
            rent: sysvar::rent::ID,
        }
        .to_account_metas(None);
        accounts.extend(addresses.deposit_remaining_accounts());

        let deposit = Instruction {
            program_id: self.program.id(),
            accounts,
            data: nft_escrow::instruction::DepositNfts {
                nft_mints: vec![mint],
                is_compressed: vec![false],
            }
            .data(),
        };

        let sent = self
            .program
            .request()
            .instruction(deposit)
            .send()
            .map_err(EscrowClientError::from);

        match sent {
            Ok(signature) => {
                info!("NFT {mint} deposited ({signature})");
                info!(
                    "vault token account balance after: {}",
                    self.token_balance(&addresses.vault_token_account)
                );
                Ok(signature)
            }
            Err(err) => {
                error!("deposit failed: {}", err.detail());
                if err.is_missing_vault_account() {
                    warn!(
                        "vault token account {} might not exist yet",
                        addresses.vault_token_account
                    );
                }
                Err(err)
            }
        }
    }

    /// Returns one NFT from the vault to the wallet.
    pub fn withdraw_nft(&self, mint: Pubkey) -> Result<Signature> {
        let addresses = self.addresses(&mint);
        info!(
            "recipient balance before: {}",
            self.token_balance(&addresses.owner_token_account)
        );

        let vault_balance = self.token_balance(&addresses.vault_token_account);
        info!("vault balance before withdrawal: {vault_balance}");
        if vault_balance == 0 {
            let err = EscrowClientError::VaultEmpty { mint };
            error!("withdraw failed: {err}");
            return Err(err);
        }

        // The recipient's token account may have been closed after the deposit.
        let create_recipient_account =
            spl_associated_token_account::instruction::create_associated_token_account_idempotent(
                &self.owner,
                &self.owner,
                &mint,
                &token::ID,
            );

        let sent = self
            .program
            .request()
            .instruction(create_recipient_account)
            .accounts(nft_escrow::accounts::WithdrawNft {
                escrow_account: addresses.escrow,
                authority: self.owner,
                escrow_vault: addresses.escrow_vault,
                mint,
                vault_nft_account: addresses.vault_token_account,
                recipient_nft_account: addresses.owner_token_account,
                recipient: self.owner,
                token_program: token::ID,
                associated_token_program: associated_token::ID,
                system_program: system_program::ID,
                rent: sysvar::rent::ID,
            })
            .args(nft_escrow::instruction::WithdrawNft {
                nft_mint: mint,
                is_compressed: false,
                recipient: self.owner,
            })
            .send()
            .map_err(EscrowClientError::from);

        match sent {
            Ok(signature) => {
                info!(
                    "withdraw done ({signature}), recipient balance now: {}",
                    self.token_balance(&addresses.owner_token_account)
                );
                Ok(signature)
            }
            Err(err) => {
                error!("withdraw failed: {}", err.detail());
                Err(err)
            }
        }
    }

    /// Raw token amount held by a token account; a missing account reads as zero.
    pub fn token_balance(&self, token_account: &Pubkey) -> u64 {
        self.program
            .rpc()
            .get_token_account_balance(token_account)
            .ok()
            .and_then(|balance| raw_amount(&balance.amount))
            .unwrap_or(0)
    }

    pub fn escrow_state(&self) -> Result<Option<EscrowAccount>> {
        match self.program.account::<EscrowAccount>(self.escrow_address()) {
            Ok(escrow) => Ok(Some(escrow)),
            Err(anchor_client::ClientError::AccountNotFound) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Token balances arrive as base-unit integer strings.
fn raw_amount(amount: &str) -> Option<u64> {
    amount.parse().ok()
}
