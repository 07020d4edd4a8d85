use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::{
    error::RuntimeError,
    ledger::{Amount, LedgerError, LedgerEvent, LedgerMutation, LedgerState, STX},
    principal::{ContractId, Principal},
    value::Value,
};

/// Data variables, data maps and token definitions owned by one contract.
#[derive(Clone, Debug, Default)]
pub struct ContractStorage {
    vars: BTreeMap<String, Value>,
    maps: BTreeMap<String, BTreeMap<Value, Value>>,
    tokens: BTreeSet<String>,
}

impl ContractStorage {
    pub(crate) fn with_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            tokens: tokens.into_iter().map(str::to_string).collect(),
            ..Self::default()
        }
    }

    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn map_entry(&self, map: &str, key: &Value) -> Option<&Value> {
        self.maps.get(map).and_then(|m| m.get(key))
    }
}

/// Everything a call can change. Calls run against a clone and the clone
/// replaces the live state only when the call commits.
#[derive(Clone, Debug, Default)]
pub(crate) struct WorldState {
    pub ledger: LedgerState,
    pub storage: BTreeMap<ContractId, ContractStorage>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ContractEvent {
    Asset {
        contract: Option<ContractId>,
        detail: LedgerEvent,
    },
    Print {
        contract: ContractId,
        value: Value,
    },
}

pub fn token_asset_id(contract: &ContractId, token: &str) -> String {
    format!("{contract}::{token}")
}

/// The view a contract gets of the chain while one of its functions runs.
pub struct CallContext<'a> {
    state: &'a mut WorldState,
    contract: ContractId,
    tx_sender: Principal,
    read_only: bool,
    events: Vec<ContractEvent>,
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(
        state: &'a mut WorldState,
        contract: ContractId,
        tx_sender: Principal,
        read_only: bool,
    ) -> Self {
        Self {
            state,
            contract,
            tx_sender,
            read_only,
            events: Vec::new(),
        }
    }

    pub(crate) fn into_events(self) -> Vec<ContractEvent> {
        self.events
    }

    pub fn contract_id(&self) -> &ContractId {
        &self.contract
    }

    pub fn contract_principal(&self) -> Principal {
        Principal::Contract(self.contract.clone())
    }

    pub fn tx_sender(&self) -> &Principal {
        &self.tx_sender
    }

    pub fn block_height(&self) -> u64 {
        self.state.ledger.meta.height
    }

    fn ensure_writable(&self, op: &'static str) -> Result<(), RuntimeError> {
        if self.read_only {
            return Err(RuntimeError::WriteInReadOnly(op));
        }
        Ok(())
    }

    fn storage(&self) -> Option<&ContractStorage> {
        self.state.storage.get(&self.contract)
    }

    fn storage_mut(&mut self) -> &mut ContractStorage {
        self.state.storage.entry(self.contract.clone()).or_default()
    }

    fn token_asset(&self, token: &str) -> Result<String, RuntimeError> {
        match self.storage() {
            Some(storage) if storage.tokens.contains(token) => {
                Ok(token_asset_id(&self.contract, token))
            }
            _ => Err(RuntimeError::UnknownToken(token.to_string())),
        }
    }

    fn record(&mut self, event: LedgerEvent) {
        self.events.push(ContractEvent::Asset {
            contract: Some(self.contract.clone()),
            detail: event,
        });
    }

    // Applies one ledger mutation; ledger rejections become `(err u<code>)`.
    fn apply_native(
        &mut self,
        mutation: LedgerMutation,
        code: fn(&LedgerError) -> Option<u128>,
    ) -> Result<Value, RuntimeError> {
        match self.state.ledger.apply(&mutation) {
            Ok(event) => {
                self.record(event);
                Ok(Value::ok(Value::bool(true)))
            }
            Err(err) => match code(&err) {
                Some(code) => Ok(Value::err(Value::uint(code))),
                None => Err(RuntimeError::Ledger(err)),
            },
        }
    }

    //---- native currency ----//

    pub fn stx_get_balance(&self, owner: &Principal) -> Amount {
        self.state.ledger.balance(owner, STX)
    }

    pub fn stx_liquid_supply(&self) -> Amount {
        self.state.ledger.supply(STX)
    }

    /// Returns `(ok true)`, or `(err u1)` insufficient balance, `(err u2)`
    /// sender is recipient, `(err u3)` non-positive amount, `(err u4)` sender
    /// is not the transaction sender.
    pub fn stx_transfer(
        &mut self,
        amount: Amount,
        sender: &Principal,
        recipient: &Principal,
        memo: Option<&[u8]>,
    ) -> Result<Value, RuntimeError> {
        self.ensure_writable("stx-transfer")?;
        if sender != &self.tx_sender {
            return Ok(Value::err(Value::uint(4)));
        }
        self.apply_native(
            LedgerMutation::Transfer {
                asset: STX.to_string(),
                from: sender.clone(),
                to: recipient.clone(),
                amount,
                memo: memo.map(<[u8]>::to_vec).unwrap_or_default(),
            },
            transfer_error_code,
        )
    }

    //---- fungible tokens ----//

    pub fn ft_get_balance(&self, token: &str, owner: &Principal) -> Result<Amount, RuntimeError> {
        let asset = self.token_asset(token)?;
        Ok(self.state.ledger.balance(owner, &asset))
    }

    pub fn ft_get_supply(&self, token: &str) -> Result<Amount, RuntimeError> {
        let asset = self.token_asset(token)?;
        Ok(self.state.ledger.supply(&asset))
    }

    /// Returns `(ok true)`, or `(err u1)` for a non-positive amount or a mint
    /// past the token's max supply.
    pub fn ft_mint(
        &mut self,
        token: &str,
        amount: Amount,
        recipient: &Principal,
    ) -> Result<Value, RuntimeError> {
        self.ensure_writable("ft-mint")?;
        let asset = self.token_asset(token)?;
        self.apply_native(
            LedgerMutation::Mint {
                asset,
                to: recipient.clone(),
                amount,
            },
            |err| match err {
                LedgerError::NonPositiveAmount | LedgerError::SupplyExceeded { .. } => Some(1),
                _ => None,
            },
        )
    }

    /// Same codes as [`stx_transfer`](Self::stx_transfer) minus u4; the
    /// contract decides who may move tokens.
    pub fn ft_transfer(
        &mut self,
        token: &str,
        amount: Amount,
        sender: &Principal,
        recipient: &Principal,
    ) -> Result<Value, RuntimeError> {
        self.ensure_writable("ft-transfer")?;
        let asset = self.token_asset(token)?;
        self.apply_native(
            LedgerMutation::Transfer {
                asset,
                from: sender.clone(),
                to: recipient.clone(),
                amount,
                memo: Vec::new(),
            },
            transfer_error_code,
        )
    }

    /// Returns `(ok true)`, or `(err u1)` for a non-positive amount or an
    /// insufficient balance.
    pub fn ft_burn(
        &mut self,
        token: &str,
        amount: Amount,
        owner: &Principal,
    ) -> Result<Value, RuntimeError> {
        self.ensure_writable("ft-burn")?;
        let asset = self.token_asset(token)?;
        self.apply_native(
            LedgerMutation::Burn {
                asset,
                from: owner.clone(),
                amount,
            },
            |err| match err {
                LedgerError::NonPositiveAmount | LedgerError::InsufficientFunds { .. } => Some(1),
                _ => None,
            },
        )
    }

    //---- contract storage ----//

    pub fn var_get(&self, name: &str) -> Option<Value> {
        self.storage().and_then(|s| s.var(name)).cloned()
    }

    pub fn var_set(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        self.ensure_writable("var-set")?;
        self.storage_mut().vars.insert(name.to_string(), value);
        Ok(())
    }

    pub fn map_get(&self, map: &str, key: &Value) -> Option<Value> {
        self.storage().and_then(|s| s.map_entry(map, key)).cloned()
    }

    pub fn map_set(&mut self, map: &str, key: Value, value: Value) -> Result<(), RuntimeError> {
        self.ensure_writable("map-set")?;
        self.storage_mut()
            .maps
            .entry(map.to_string())
            .or_default()
            .insert(key, value);
        Ok(())
    }

    /// Inserts only when `key` is absent. Returns whether it inserted.
    pub fn map_insert(&mut self, map: &str, key: Value, value: Value) -> Result<bool, RuntimeError> {
        self.ensure_writable("map-insert")?;
        let entries = self.storage_mut().maps.entry(map.to_string()).or_default();
        if entries.contains_key(&key) {
            return Ok(false);
        }
        entries.insert(key, value);
        Ok(true)
    }

    pub fn map_delete(&mut self, map: &str, key: &Value) -> Result<bool, RuntimeError> {
        self.ensure_writable("map-delete")?;
        Ok(self
            .storage_mut()
            .maps
            .get_mut(map)
            .is_some_and(|entries| entries.remove(key).is_some()))
    }

    pub fn print(&mut self, value: Value) -> Value {
        self.events.push(ContractEvent::Print {
            contract: self.contract.clone(),
            value: value.clone(),
        });
        value
    }
}

pub(crate) fn transfer_error_code(err: &LedgerError) -> Option<u128> {
    match err {
        LedgerError::InsufficientFunds { .. } => Some(1),
        LedgerError::SameSenderRecipient(_) => Some(2),
        LedgerError::NonPositiveAmount => Some(3),
        _ => None,
    }
}
