use std::process::ExitCode;

use log::error;
use nft_escrow_client::{Config, EscrowClient, Result, Step};

fn run() -> Result<()> {
    let steps = Step::parse_all(std::env::args().skip(1))?;
    let config = Config::from_env()?;
    let client = EscrowClient::new(&config)?;

    for step in steps {
        step.run(&client, &config)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    solana_logger::setup_with_default("info");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
