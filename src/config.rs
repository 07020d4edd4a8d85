//! Simulation plan: which accounts exist, how they are funded, and which
//! bundled contracts are deployed at start.
//!
//! Plans are JSON files:
//!
//! ```json
//! {
//!   "accounts": [
//!     { "name": "deployer", "address": "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM", "balance": 10000 }
//!   ],
//!   "contracts": [
//!     { "name": "token-stx-v-1-2", "kind": "stx-token" }
//!   ]
//! }
//! ```

use std::{collections::BTreeSet, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    contracts::BUILTIN_KINDS,
    principal::{validate_contract_name, Principal},
};

pub const DEPLOYER: &str = "deployer";
/// Default devnet funding per account, in micro-STX.
pub const DEVNET_BALANCE: u64 = 100_000_000_000_000;

const DEVNET_ACCOUNTS: &[(&str, &str)] = &[
    (DEPLOYER, "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM"),
    ("wallet_1", "ST1SJ3DTE5DN7X54YDH5D64R3BCB6A2AG2ZQ8YPD5"),
    ("wallet_2", "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG"),
    ("wallet_3", "ST2JHG361ZXG51QTKY2NQCVBPPRRE2KZB1HR05NNC"),
    ("faucet", "STNHKEPYEPJ8ET55ZZ0M5A34J0R3N5FM2CMMMAZ6"),
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("account {0:?} is defined more than once")]
    DuplicateAccount(String),
    #[error("no account named {DEPLOYER:?}")]
    MissingDeployer,
    #[error("account {0:?} must use a standard principal")]
    ContractAccount(String),
    #[error("deployment {name:?} names unknown account {account:?}")]
    UnknownDeployer { name: String, account: String },
    #[error("deployment {name:?} has unknown kind {kind:?} (expected one of {})", BUILTIN_KINDS.join(", "))]
    UnknownKind { name: String, kind: String },
    #[error("invalid contract name {0:?}")]
    InvalidContractName(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountConfig {
    pub name: String,
    pub address: Principal,
    #[serde(default)]
    pub balance: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentConfig {
    pub name: String,
    pub kind: String,
    /// Account name; defaults to the deployer.
    #[serde(default)]
    pub deployer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimnetConfig {
    pub accounts: Vec<AccountConfig>,
    #[serde(default)]
    pub contracts: Vec<DeploymentConfig>,
}

impl Default for SimnetConfig {
    fn default() -> Self {
        Self::devnet()
    }
}

impl SimnetConfig {
    /// The standard devnet accounts, each funded with [`DEVNET_BALANCE`].
    pub fn devnet() -> Self {
        let accounts = DEVNET_ACCOUNTS
            .iter()
            .filter_map(|(name, address)| {
                Some(AccountConfig {
                    name: name.to_string(),
                    address: Principal::standard(address).ok()?,
                    balance: DEVNET_BALANCE,
                })
            })
            .collect();
        Self {
            accounts,
            contracts: Vec::new(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = fs::read(path)?;
        let config: Self = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_uniform_balance(mut self, balance: u64) -> Self {
        for account in &mut self.accounts {
            account.balance = balance;
        }
        self
    }

    /// Sets the starting balance of an existing account; unknown names are
    /// ignored.
    pub fn fund(mut self, name: &str, balance: u64) -> Self {
        if let Some(account) = self.accounts.iter_mut().find(|a| a.name == name) {
            account.balance = balance;
        }
        self
    }

    pub fn deploy(mut self, name: &str, kind: &str) -> Self {
        self.contracts.push(DeploymentConfig {
            name: name.to_string(),
            kind: kind.to_string(),
            deployer: None,
        });
        self
    }

    pub fn deployer_address(&self) -> Result<Principal, ConfigError> {
        self.accounts
            .iter()
            .find(|a| a.name == DEPLOYER)
            .map(|a| a.address.clone())
            .ok_or(ConfigError::MissingDeployer)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = BTreeSet::new();
        for account in &self.accounts {
            if !names.insert(account.name.as_str()) {
                return Err(ConfigError::DuplicateAccount(account.name.clone()));
            }
            if !account.address.is_standard() {
                return Err(ConfigError::ContractAccount(account.name.clone()));
            }
        }
        if !names.contains(DEPLOYER) {
            return Err(ConfigError::MissingDeployer);
        }
        for deployment in &self.contracts {
            if validate_contract_name(&deployment.name).is_err() {
                return Err(ConfigError::InvalidContractName(deployment.name.clone()));
            }
            if !BUILTIN_KINDS.contains(&deployment.kind.as_str()) {
                return Err(ConfigError::UnknownKind {
                    name: deployment.name.clone(),
                    kind: deployment.kind.clone(),
                });
            }
            if let Some(account) = &deployment.deployer {
                if !names.contains(account.as_str()) {
                    return Err(ConfigError::UnknownDeployer {
                        name: deployment.name.clone(),
                        account: account.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
