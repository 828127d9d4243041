use std::fmt;
use std::str::FromStr;

use log::info;

use crate::client::EscrowClient;
use crate::config::Config;
use crate::error::{EscrowClientError, Result};

/// One stage of the escrow round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Init,
    Deposit,
    Withdraw,
}

impl Step {
    pub const ALL: [Step; 3] = [Step::Init, Step::Deposit, Step::Withdraw];

    /// Parses step names in the order given; no names means the full round trip.
    pub fn parse_all<I, S>(names: I) -> Result<Vec<Step>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let steps = names
            .into_iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<Step>>>()?;
        if steps.is_empty() {
            return Ok(Self::ALL.to_vec());
        }
        Ok(steps)
    }

    pub fn run(self, client: &EscrowClient, config: &Config) -> Result<()> {
        info!("== {self}");
        match self {
            Step::Init => {
                client.initialize_escrow()?;
            }
            Step::Deposit => {
                client.deposit_nft(config.mint()?)?;
            }
            Step::Withdraw => {
                client.withdraw_nft(config.mint()?)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Step {
    type Err = EscrowClientError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "init" | "initialize" => Ok(Step::Init),
            "deposit" => Ok(Step::Deposit),
            "withdraw" => Ok(Step::Withdraw),
            other => Err(EscrowClientError::Config(format!(
                "unknown step {other:?}, expected init, deposit or withdraw"
            ))),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Init => "initialize escrow",
            Step::Deposit => "deposit NFT",
            Step::Withdraw => "withdraw NFT",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_names_runs_everything_in_order() {
        let steps = Step::parse_all(Vec::<String>::new()).unwrap();
        assert_eq!(steps, vec![Step::Init, Step::Deposit, Step::Withdraw]);
    }

    #[test]
    fn named_steps_keep_their_order() {
        let steps = Step::parse_all(["withdraw", "initialize", "deposit"]).unwrap();
        assert_eq!(steps, vec![Step::Withdraw, Step::Init, Step::Deposit]);
    }

    #[test]
    fn unknown_step_is_a_config_error() {
        let err = Step::parse_all(["init", "refund"]).unwrap_err();
        assert!(matches!(err, EscrowClientError::Config(message) if message.contains("refund")));
    }
}
