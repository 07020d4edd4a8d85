use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

const C32_ALPHABET: &str = "0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const NETWORK_CHARS: &str = "PMTN";
const MIN_ADDRESS_LEN: usize = 28;
const MAX_ADDRESS_LEN: usize = 41;
pub const MAX_CONTRACT_NAME_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrincipalError {
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
    #[error("invalid contract name {0:?}")]
    InvalidContractName(String),
}

/// A fully qualified contract identifier: `ISSUER.name`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContractId {
    issuer: String,
    name: String,
}

impl ContractId {
    pub fn new(issuer: &Principal, name: &str) -> Result<Self, PrincipalError> {
        let issuer = match issuer {
            Principal::Standard(address) => address.clone(),
            Principal::Contract(id) => id.issuer.clone(),
        };
        validate_contract_name(name)?;
        Ok(Self {
            issuer,
            name: name.to_string(),
        })
    }

    pub fn issuer(&self) -> Principal {
        Principal::Standard(self.issuer.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.issuer, self.name)
    }
}

impl FromStr for ContractId {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (issuer, name) = s
            .split_once('.')
            .ok_or_else(|| PrincipalError::InvalidContractName(s.to_string()))?;
        validate_address(issuer)?;
        validate_contract_name(name)?;
        Ok(Self {
            issuer: issuer.to_string(),
            name: name.to_string(),
        })
    }
}

impl TryFrom<String> for ContractId {
    type Error = PrincipalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContractId> for String {
    fn from(id: ContractId) -> Self {
        id.to_string()
    }
}

/// An account address or a contract address.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Principal {
    Standard(String),
    Contract(ContractId),
}

impl Principal {
    pub fn standard(address: &str) -> Result<Self, PrincipalError> {
        validate_address(address)?;
        Ok(Principal::Standard(address.to_string()))
    }

    pub fn is_standard(&self) -> bool {
        matches!(self, Principal::Standard(_))
    }

    pub fn as_contract(&self) -> Option<&ContractId> {
        match self {
            Principal::Contract(id) => Some(id),
            Principal::Standard(_) => None,
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Standard(address) => f.write_str(address),
            Principal::Contract(id) => id.fmt(f),
        }
    }
}

impl FromStr for Principal {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains('.') {
            s.parse().map(Principal::Contract)
        } else {
            Principal::standard(s)
        }
    }
}

impl TryFrom<String> for Principal {
    type Error = PrincipalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Principal> for String {
    fn from(p: Principal) -> Self {
        p.to_string()
    }
}

impl From<ContractId> for Principal {
    fn from(id: ContractId) -> Self {
        Principal::Contract(id)
    }
}

// Checksums are not verified; only the shape of the c32 encoding.
fn validate_address(address: &str) -> Result<(), PrincipalError> {
    let invalid = || PrincipalError::InvalidAddress(address.to_string());
    if !(MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&address.len()) {
        return Err(invalid());
    }
    let mut chars = address.chars();
    if chars.next() != Some('S') {
        return Err(invalid());
    }
    match chars.next() {
        Some(c) if NETWORK_CHARS.contains(c) => {}
        _ => return Err(invalid()),
    }
    if !chars.all(|c| C32_ALPHABET.contains(c)) {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_contract_name(name: &str) -> Result<(), PrincipalError> {
    let invalid = || PrincipalError::InvalidContractName(name.to_string());
    if name.is_empty() || name.len() > MAX_CONTRACT_NAME_LEN {
        return Err(invalid());
    }
    let mut chars = name.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOYER: &str = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM";

    #[test]
    fn parses_standard_and_contract_principals() {
        let standard: Principal = DEPLOYER.parse().unwrap();
        assert!(standard.is_standard());
        assert_eq!(standard.to_string(), DEPLOYER);

        let contract: Principal = "SP3FBR2AGK5H9QBDH3EEN6DF8EK8JY7RX8QJ5SVTE.some-contract"
            .parse()
            .unwrap();
        assert!(!contract.is_standard());
        let id = contract.as_contract().unwrap();
        assert_eq!(id.name(), "some-contract");
        assert_eq!(
            id.issuer(),
            Principal::standard("SP3FBR2AGK5H9QBDH3EEN6DF8EK8JY7RX8QJ5SVTE").unwrap()
        );
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!("".parse::<Principal>().is_err());
        assert!("XT1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM".parse::<Principal>().is_err());
        // 'I', 'L', 'O' and 'U' are not part of the c32 alphabet.
        assert!("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGO".parse::<Principal>().is_err());
        assert!("ST1".parse::<Principal>().is_err());
    }

    #[test]
    fn contract_names_follow_identifier_rules() {
        assert!(validate_contract_name("token-stx-v-1-2").is_ok());
        assert!(validate_contract_name("a_b").is_ok());
        assert!(validate_contract_name("1token").is_err());
        assert!(validate_contract_name("tok.en").is_err());
        assert!(validate_contract_name(&"a".repeat(41)).is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let p: Principal = format!("{DEPLOYER}.counter").parse().unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, format!("\"{DEPLOYER}.counter\""));
        let back: Principal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
