//! Off-chain driver for the `nft_escrow` program.
//!
//! Loads a wallet, binds it to a cluster and runs the escrow round trip:
//! initialize the wallet's escrow, deposit an NFT, withdraw it again.
pub mod client;
pub mod config;
pub mod error;
pub mod step;

pub use client::{EscrowAddresses, EscrowClient, InitOutcome};
pub use config::{load_keypair, Config};
pub use error::{EscrowClientError, Result};
pub use step::Step;
