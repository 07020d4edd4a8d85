use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::principal::Principal;

pub type AssetId = String;
pub type Amount = u128;
pub type Balances = BTreeMap<AssetId, Amount>;
pub type AssetsMap = BTreeMap<Principal, Balances>;

/// Asset identifier of the native currency.
pub const STX: &str = "STX";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient {asset} balance for {principal}: have {balance}, need {amount}")]
    InsufficientFunds {
        principal: Principal,
        asset: AssetId,
        balance: Amount,
        amount: Amount,
    },
    #[error("sender and recipient are both {0}")]
    SameSenderRecipient(Principal),
    #[error("amount must be positive")]
    NonPositiveAmount,
    #[error("{asset} balance of {principal} would overflow")]
    Overflow { principal: Principal, asset: AssetId },
    #[error("minting {amount} {asset} exceeds max supply {max}")]
    SupplyExceeded {
        asset: AssetId,
        amount: Amount,
        max: Amount,
    },
    #[error("duplicate receipt {}", hex::encode(.0))]
    DuplicateReceipt([u8; 32]),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SnapshotMetadata {
    pub height: u64,
    pub previous_receipt: Option<[u8; 32]>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub meta: SnapshotMetadata,
    pub balances: AssetsMap,
    pub supplies: BTreeMap<AssetId, Amount>,
    pub state_root: [u8; 32],
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    Emission {
        asset: AssetId,
        to: Principal,
        amount: Amount,
    },
    Transfer {
        asset: AssetId,
        from: Principal,
        to: Principal,
        amount: Amount,
        #[serde(with = "crate::value::serde_bytes")]
        memo: Vec<u8>,
    },
    Mint {
        asset: AssetId,
        to: Principal,
        amount: Amount,
    },
    Burn {
        asset: AssetId,
        from: Principal,
        amount: Amount,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerMutation {
    /// Genesis funding; not subject to supply caps.
    Emit {
        asset: AssetId,
        to: Principal,
        amount: Amount,
    },
    Transfer {
        asset: AssetId,
        from: Principal,
        to: Principal,
        amount: Amount,
        memo: Vec<u8>,
    },
    Mint {
        asset: AssetId,
        to: Principal,
        amount: Amount,
    },
    Burn {
        asset: AssetId,
        from: Principal,
        amount: Amount,
    },
}

#[derive(Clone, Debug, Default)]
pub struct LedgerState {
    pub meta: SnapshotMetadata,
    balances: AssetsMap,
    supplies: BTreeMap<AssetId, Amount>,
    max_supplies: BTreeMap<AssetId, Amount>,
    nonces: BTreeMap<Principal, u64>,
    applied_receipts: BTreeSet<[u8; 32]>,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, principal: &Principal, asset: &str) -> Amount {
        self.balances
            .get(principal)
            .and_then(|b| b.get(asset))
            .copied()
            .unwrap_or(0)
    }

    pub fn supply(&self, asset: &str) -> Amount {
        self.supplies.get(asset).copied().unwrap_or(0)
    }

    pub fn max_supply(&self, asset: &str) -> Option<Amount> {
        self.max_supplies.get(asset).copied()
    }

    pub fn set_max_supply(&mut self, asset: &str, max: Amount) {
        self.max_supplies.insert(asset.to_string(), max);
    }

    pub fn nonce(&self, principal: &Principal) -> u64 {
        self.nonces.get(principal).copied().unwrap_or(0)
    }

    pub fn bump_nonce(&mut self, principal: &Principal) {
        *self.nonces.entry(principal.clone()).or_default() += 1;
    }

    pub fn assets_map(&self) -> AssetsMap {
        self.balances.clone()
    }

    pub fn advance_block(&mut self) {
        self.meta.height += 1;
    }

    pub fn record_receipt(&mut self, receipt_id: [u8; 32]) -> Result<(), LedgerError> {
        if !self.applied_receipts.insert(receipt_id) {
            return Err(LedgerError::DuplicateReceipt(receipt_id));
        }
        self.meta.previous_receipt = Some(receipt_id);
        Ok(())
    }

    fn credit(&mut self, principal: &Principal, asset: &str, amount: Amount) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let next = self
            .balance(principal, asset)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow {
                principal: principal.clone(),
                asset: asset.to_string(),
            })?;
        self.balances
            .entry(principal.clone())
            .or_default()
            .insert(asset.to_string(), next);
        Ok(())
    }

    fn debit(&mut self, principal: &Principal, asset: &str, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.balance(principal, asset);
        if balance < amount {
            return Err(LedgerError::InsufficientFunds {
                principal: principal.clone(),
                asset: asset.to_string(),
                balance,
                amount,
            });
        }
        if let Some(entry) = self
            .balances
            .get_mut(principal)
            .and_then(|b| b.get_mut(asset))
        {
            *entry = balance - amount;
        }
        Ok(())
    }

    fn grow_supply(&mut self, asset: &str, amount: Amount, capped: bool) -> Result<(), LedgerError> {
        let next = self
            .supply(asset)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::SupplyExceeded {
                asset: asset.to_string(),
                amount,
                max: Amount::MAX,
            })?;
        if capped {
            if let Some(max) = self.max_supply(asset) {
                if next > max {
                    return Err(LedgerError::SupplyExceeded {
                        asset: asset.to_string(),
                        amount,
                        max,
                    });
                }
            }
        }
        self.supplies.insert(asset.to_string(), next);
        Ok(())
    }

    /// Applies a single mutation. Either every check passes and the mutation
    /// is applied in full, or nothing changes.
    pub fn apply(&mut self, mutation: &LedgerMutation) -> Result<LedgerEvent, LedgerError> {
        let event = match mutation {
            LedgerMutation::Emit { asset, to, amount } => {
                self.grow_supply(asset, *amount, false)?;
                self.credit(to, asset, *amount)?;
                LedgerEvent::Emission {
                    asset: asset.clone(),
                    to: to.clone(),
                    amount: *amount,
                }
            }
            LedgerMutation::Transfer {
                asset,
                from,
                to,
                amount,
                memo,
            } => {
                if *amount == 0 {
                    return Err(LedgerError::NonPositiveAmount);
                }
                if from == to {
                    return Err(LedgerError::SameSenderRecipient(from.clone()));
                }
                // Supply bounds every balance, so the credit cannot overflow
                // once the debit succeeds.
                self.debit(from, asset, *amount)?;
                self.credit(to, asset, *amount)?;
                LedgerEvent::Transfer {
                    asset: asset.clone(),
                    from: from.clone(),
                    to: to.clone(),
                    amount: *amount,
                    memo: memo.clone(),
                }
            }
            LedgerMutation::Mint { asset, to, amount } => {
                if *amount == 0 {
                    return Err(LedgerError::NonPositiveAmount);
                }
                self.grow_supply(asset, *amount, true)?;
                self.credit(to, asset, *amount)?;
                LedgerEvent::Mint {
                    asset: asset.clone(),
                    to: to.clone(),
                    amount: *amount,
                }
            }
            LedgerMutation::Burn { asset, from, amount } => {
                if *amount == 0 {
                    return Err(LedgerError::NonPositiveAmount);
                }
                self.debit(from, asset, *amount)?;
                let supply = self.supply(asset);
                self.supplies.insert(asset.clone(), supply.saturating_sub(*amount));
                LedgerEvent::Burn {
                    asset: asset.clone(),
                    from: from.clone(),
                    amount: *amount,
                }
            }
        };
        Ok(event)
    }

    /// Applies a batch under one receipt id. The batch is all-or-nothing.
    pub fn apply_mutations(
        &mut self,
        mutations: &[LedgerMutation],
        receipt_id: [u8; 32],
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        if self.applied_receipts.contains(&receipt_id) {
            return Err(LedgerError::DuplicateReceipt(receipt_id));
        }

        let mut staged = self.clone();
        let mut events = Vec::with_capacity(mutations.len());
        for mutation in mutations {
            events.push(staged.apply(mutation)?);
        }
        staged.record_receipt(receipt_id)?;
        *self = staged;
        Ok(events)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            meta: self.meta.clone(),
            balances: self.balances.clone(),
            supplies: self.supplies.clone(),
            state_root: compute_state_root(&self.balances),
        }
    }
}

fn compute_state_root(balances: &AssetsMap) -> [u8; 32] {
    let mut leaves: Vec<[u8; 32]> = Vec::new();
    for (principal, assets) in balances {
        for (asset, amount) in assets {
            let mut hasher = Sha256::new();
            hasher.update(b"bal");
            hasher.update(principal.to_string().as_bytes());
            hasher.update([0u8]);
            hasher.update(asset.as_bytes());
            hasher.update(amount.to_le_bytes());
            leaves.push(hasher.finalize().into());
        }
    }
    build_merkle(leaves)
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"simnet-ledger-empty").into();
    }
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity((leaves.len() + 1) / 2);
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            hasher.update(chunk.get(1).unwrap_or(&chunk[0]));
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}
