//! Runtime configuration, read from the environment.
//!
//! | Variable            | Default                          |
//! |---------------------|----------------------------------|
//! | `ESCROW_RPC_URL`    | `https://api.devnet.solana.com`  |
//! | `ESCROW_WS_URL`     | derived from the RPC URL         |
//! | `ESCROW_KEYPAIR`    | `temp.json`                      |
//! | `ESCROW_COMMITMENT` | `confirmed`                      |
//! | `ESCROW_PROGRAM_ID` | the escrow program's id          |
//! | `ESCROW_MINT`       | none; required to deposit/withdraw |
//!
//! `ESCROW_RPC_URL` also accepts cluster monikers such as `devnet` or `localnet`.
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anchor_client::solana_sdk::commitment_config::CommitmentConfig;
use anchor_client::solana_sdk::signature::{read_keypair_file, Keypair};
use anchor_client::Cluster;
use anchor_lang::prelude::Pubkey;

use crate::error::{EscrowClientError, Result};

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_KEYPAIR_PATH: &str = "temp.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub cluster: Cluster,
    pub keypair_path: PathBuf,
    pub commitment: CommitmentConfig,
    pub program_id: Pubkey,
    pub mint: Option<Pubkey>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let rpc_url = lookup("ESCROW_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
        let cluster = match lookup("ESCROW_WS_URL") {
            Some(ws_url) => Cluster::Custom(rpc_url, ws_url),
            None => Cluster::from_str(&rpc_url).map_err(|err| {
                EscrowClientError::Config(format!("ESCROW_RPC_URL: {rpc_url:?}: {err}"))
            })?,
        };
        let keypair_path = lookup("ESCROW_KEYPAIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_KEYPAIR_PATH));

        let commitment = match lookup("ESCROW_COMMITMENT") {
            Some(level) => CommitmentConfig::from_str(&level).map_err(|_| {
                EscrowClientError::Config(format!("unknown commitment level {level:?}"))
            })?,
            None => CommitmentConfig::confirmed(),
        };
        let program_id = match lookup("ESCROW_PROGRAM_ID") {
            Some(id) => parse_pubkey("ESCROW_PROGRAM_ID", &id)?,
            None => nft_escrow::ID,
        };
        let mint = lookup("ESCROW_MINT")
            .map(|mint| parse_pubkey("ESCROW_MINT", &mint))
            .transpose()?;

        Ok(Self {
            cluster,
            keypair_path,
            commitment,
            program_id,
            mint,
        })
    }

    pub fn rpc_url(&self) -> &str {
        self.cluster.url()
    }

    /// The NFT mint the deposit and withdraw steps operate on.
    pub fn mint(&self) -> Result<Pubkey> {
        self.mint
            .ok_or_else(|| EscrowClientError::Config("ESCROW_MINT is not set".to_string()))
    }
}

/// Reads a JSON array secret key, as written by `solana-keygen`.
pub fn load_keypair(path: &Path) -> Result<Keypair> {
    read_keypair_file(path).map_err(|err| EscrowClientError::Keypair {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

fn parse_pubkey(name: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value)
        .map_err(|err| EscrowClientError::Config(format!("{name}: {value:?} is not a pubkey: {err}")))
}
