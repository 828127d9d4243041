use std::path::PathBuf;

use anchor_client::solana_client::client_error::ClientErrorKind as RpcClientErrorKind;
use anchor_client::solana_client::rpc_request::{RpcError, RpcResponseErrorData};
use anchor_lang::prelude::Pubkey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EscrowClientError {
    /// The secret key file is missing or malformed.
    #[error("failed to read keypair {}: {reason}", .path.display())]
    Keypair { path: PathBuf, reason: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Client(#[from] anchor_client::ClientError),
    /// Checked before withdrawing so no transaction is sent for an empty vault.
    #[error("vault doesn't hold mint {mint}, deposit may have failed")]
    VaultEmpty { mint: Pubkey },
}

pub type Result<T> = std::result::Result<T, EscrowClientError>;

impl EscrowClientError {
    /// Error text including any simulation logs the cluster attached.
    ///
    /// Preflight failures only carry the runtime's reason ("already in use",
    /// missing accounts, ...) in their logs, not in the top-level message.
    pub fn detail(&self) -> String {
        let rpc = match self {
            Self::Client(anchor_client::ClientError::SolanaClientError(err)) => err,
            other => return other.to_string(),
        };

        let mut text = rpc.to_string();
        if let RpcClientErrorKind::RpcError(RpcError::RpcResponseError {
            data: RpcResponseErrorData::SendTransactionPreflightFailure(simulation),
            ..
        }) = rpc.kind()
        {
            for line in simulation.logs.iter().flatten() {
                text.push('\n');
                text.push_str(line);
            }
        }
        text
    }

    /// The escrow PDA was already allocated by an earlier initialize.
    pub fn is_already_in_use(&self) -> bool {
        mentions_already_in_use(&self.detail())
    }

    /// The vault token account the deposit names could not be read.
    pub fn is_missing_vault_account(&self) -> bool {
        mentions_missing_account(&self.detail())
    }
}

fn mentions_already_in_use(text: &str) -> bool {
    text.contains("already in use")
}

fn mentions_missing_account(text: &str) -> bool {
    text.contains("AccountNotInitialized") || text.contains("invalid account data")
}
