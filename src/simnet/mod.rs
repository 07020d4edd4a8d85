//! The contract-call simulator.
//!
//! A [`Simnet`] owns one world state: the asset ledger plus the storage of
//! every deployed contract. Calls are single-threaded and atomic. Each call
//! runs against a staged copy of the state, and only an `(ok ...)` result from
//! a public function replaces the live state with it. Malformed calls fail
//! with a [`SimnetError`] before any contract code runs; application failures
//! come back as ordinary `(err ...)` values in the receipt.

mod context;

use std::{collections::BTreeMap, sync::Arc};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::{
    config::SimnetConfig,
    contracts::{self, Contract, ContractInterface, FunctionAccess},
    error::SimnetError,
    ledger::{Amount, AssetsMap, LedgerMutation, LedgerSnapshot, STX},
    principal::{validate_contract_name, ContractId, Principal},
    value::Value,
};

pub use context::{token_asset_id, CallContext, ContractEvent, ContractStorage};
use context::{transfer_error_code, WorldState};

/// Outcome of one completed call.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct CallReceipt {
    /// Hex transaction id. Read-only calls are not transactions and carry none.
    pub txid: Option<String>,
    pub block_height: u64,
    pub result: Value,
    pub events: Vec<ContractEvent>,
}

#[derive(Clone)]
struct Deployed {
    contract: Arc<dyn Contract>,
    interface: ContractInterface,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CallMode {
    Public,
    ReadOnly,
}

/// A call that ran against a copy of the world state.
struct StagedCall {
    contract: ContractId,
    sender: Principal,
    state: WorldState,
    result: Value,
    events: Vec<ContractEvent>,
}

#[derive(Clone)]
struct Genesis {
    state: WorldState,
    contracts: BTreeMap<ContractId, Deployed>,
}

pub struct Simnet {
    accounts: BTreeMap<String, Principal>,
    deployer: Principal,
    contracts: BTreeMap<ContractId, Deployed>,
    state: WorldState,
    genesis: Option<Genesis>,
}

impl Simnet {
    /// Registers the configured accounts, funds them, and deploys the
    /// configured contracts. [`reset`](Self::reset) returns to this point.
    pub fn new(config: SimnetConfig) -> Result<Self, SimnetError> {
        config.validate()?;

        let accounts: BTreeMap<String, Principal> = config
            .accounts
            .iter()
            .map(|a| (a.name.clone(), a.address.clone()))
            .collect();
        let deployer = config.deployer_address()?;

        let mut simnet = Self {
            accounts,
            deployer,
            contracts: BTreeMap::new(),
            state: WorldState::default(),
            genesis: None,
        };

        let funding: Vec<LedgerMutation> = config
            .accounts
            .iter()
            .filter(|a| a.balance > 0)
            .map(|a| LedgerMutation::Emit {
                asset: STX.to_string(),
                to: a.address.clone(),
                amount: Amount::from(a.balance),
            })
            .collect();
        simnet
            .state
            .ledger
            .apply_mutations(&funding, Sha256::digest(b"simnet-genesis").into())?;

        for deployment in &config.contracts {
            let contract = contracts::builtin(&deployment.kind)
                .ok_or_else(|| SimnetError::UnknownContract(deployment.kind.clone()))?;
            let deployer = deployment.deployer.as_deref().unwrap_or("deployer");
            simnet.deploy_arc(&deployment.name, contract, deployer)?;
        }

        info!(
            accounts = simnet.accounts.len(),
            contracts = simnet.contracts.len(),
            height = simnet.block_height(),
            "simnet initialized"
        );
        simnet.genesis = Some(Genesis {
            state: simnet.state.clone(),
            contracts: simnet.contracts.clone(),
        });
        Ok(simnet)
    }

    /// Restores the state right after [`new`](Self::new). Contracts deployed
    /// afterwards are dropped.
    pub fn reset(&mut self) {
        if let Some(genesis) = &self.genesis {
            self.state = genesis.state.clone();
            self.contracts = genesis.contracts.clone();
            info!(height = self.block_height(), "simnet reset");
        }
    }

    pub fn get_accounts(&self) -> &BTreeMap<String, Principal> {
        &self.accounts
    }

    pub fn account(&self, name: &str) -> Result<&Principal, SimnetError> {
        self.accounts
            .get(name)
            .ok_or_else(|| SimnetError::UnknownAccount(name.to_string()))
    }

    pub fn deployer(&self) -> &Principal {
        &self.deployer
    }

    pub fn block_height(&self) -> u64 {
        self.state.ledger.meta.height
    }

    pub fn mine_empty_blocks(&mut self, count: u64) -> u64 {
        for _ in 0..count {
            self.state.ledger.advance_block();
        }
        self.block_height()
    }

    pub fn get_assets_map(&self) -> AssetsMap {
        self.state.ledger.assets_map()
    }

    pub fn balance(&self, owner: &Principal, asset: &str) -> Amount {
        self.state.ledger.balance(owner, asset)
    }

    pub fn nonce(&self, principal: &Principal) -> u64 {
        self.state.ledger.nonce(principal)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.ledger.snapshot()
    }

    /// Accepts an account name from the registry or a principal literal.
    pub fn resolve_principal(&self, name_or_address: &str) -> Result<Principal, SimnetError> {
        if let Some(principal) = self.accounts.get(name_or_address) {
            return Ok(principal.clone());
        }
        let literal = name_or_address.strip_prefix('\'').unwrap_or(name_or_address);
        literal
            .parse()
            .map_err(|_| SimnetError::UnknownAccount(name_or_address.to_string()))
    }

    /// A bare name resolves against the deployer; `ADDRESS.name` is taken as is.
    pub fn resolve_contract(&self, contract: &str) -> Result<ContractId, SimnetError> {
        let id = if contract.contains('.') {
            contract.parse::<ContractId>()?
        } else {
            ContractId::new(&self.deployer, contract)?
        };
        if !self.contracts.contains_key(&id) {
            return Err(SimnetError::UnknownContract(id.to_string()));
        }
        Ok(id)
    }

    pub fn contract_interface(&self, contract: &str) -> Result<&ContractInterface, SimnetError> {
        let id = self.resolve_contract(contract)?;
        Ok(&self.contracts[&id].interface)
    }

    pub fn get_data_var(&self, contract: &str, name: &str) -> Result<Option<Value>, SimnetError> {
        let id = self.resolve_contract(contract)?;
        Ok(self
            .state
            .storage
            .get(&id)
            .and_then(|s| s.var(name))
            .cloned())
    }

    pub fn get_map_entry(
        &self,
        contract: &str,
        map: &str,
        key: &Value,
    ) -> Result<Option<Value>, SimnetError> {
        let id = self.resolve_contract(contract)?;
        Ok(self
            .state
            .storage
            .get(&id)
            .and_then(|s| s.map_entry(map, key))
            .cloned())
    }

    pub fn deploy_contract<C>(
        &mut self,
        name: &str,
        contract: C,
        deployer: &str,
    ) -> Result<ContractId, SimnetError>
    where
        C: Contract + 'static,
    {
        self.deploy_arc(name, Arc::new(contract), deployer)
    }

    fn deploy_arc(
        &mut self,
        name: &str,
        contract: Arc<dyn Contract>,
        deployer: &str,
    ) -> Result<ContractId, SimnetError> {
        validate_contract_name(name)?;
        let sender = self.resolve_principal(deployer)?;
        let id = ContractId::new(&sender, name)?;
        if self.contracts.contains_key(&id) {
            return Err(SimnetError::DuplicateContract(id));
        }

        let interface = contract.interface();
        let mut staged = self.state.clone();
        for token in &interface.fungible_tokens {
            if let Some(max) = token.max_supply {
                staged
                    .ledger
                    .set_max_supply(&token_asset_id(&id, &token.name), max);
            }
        }
        staged.storage.insert(
            id.clone(),
            ContractStorage::with_tokens(interface.fungible_tokens.iter().map(|t| t.name.as_str())),
        );

        let mut ctx = CallContext::new(&mut staged, id.clone(), sender.clone(), false);
        contract
            .initialize(&mut ctx)
            .map_err(|source| SimnetError::Runtime {
                contract: id.clone(),
                function: "<initialize>".to_string(),
                source,
            })?;

        let txid = transaction_id(&sender, staged.ledger.nonce(&sender), &id, "<deploy>", &[]);
        staged.ledger.bump_nonce(&sender);
        staged.ledger.record_receipt(txid)?;
        staged.ledger.advance_block();
        self.state = staged;
        self.contracts.insert(id.clone(), Deployed { contract, interface });
        info!(contract = %id, height = self.block_height(), "contract deployed");
        Ok(id)
    }

    /// Executes a public function. On `(ok ...)` its effects are committed;
    /// on `(err ...)` they are discarded. Either way the sender's nonce and
    /// the block height advance.
    pub fn call_public_fn(
        &mut self,
        contract: &str,
        function: &str,
        args: &[Value],
        sender: &str,
    ) -> Result<CallReceipt, SimnetError> {
        self.execute_public(contract, function, args, sender)
            .inspect_err(|err| warn!(%contract, %function, %err, "public call rejected"))
    }

    /// Executes any function without committing anything.
    pub fn call_read_only_fn(
        &self,
        contract: &str,
        function: &str,
        args: &[Value],
        sender: &str,
    ) -> Result<CallReceipt, SimnetError> {
        self.execute_read_only(contract, function, args, sender)
            .inspect_err(|err| warn!(%contract, %function, %err, "read-only call rejected"))
    }

    /// Moves native currency outside of any contract. Returns `(ok true)` or
    /// the same error codes as a contract-initiated transfer.
    pub fn transfer_stx(
        &mut self,
        amount: Amount,
        recipient: &str,
        sender: &str,
    ) -> Result<CallReceipt, SimnetError> {
        let from = self.resolve_principal(sender)?;
        let to = self.resolve_principal(recipient)?;
        let nonce = self.state.ledger.nonce(&from);
        let txid = transaction_id(
            &from,
            nonce,
            &to,
            "stx-transfer",
            &[Value::uint(amount)],
        );

        let mutation = LedgerMutation::Transfer {
            asset: STX.to_string(),
            from: from.clone(),
            to,
            amount,
            memo: Vec::new(),
        };
        let (result, events) = match self.state.ledger.apply_mutations(&[mutation], txid) {
            Ok(events) => (
                Value::ok(Value::bool(true)),
                events
                    .into_iter()
                    .map(|detail| ContractEvent::Asset {
                        contract: None,
                        detail,
                    })
                    .collect(),
            ),
            Err(err) => match transfer_error_code(&err) {
                Some(code) => {
                    self.state.ledger.record_receipt(txid)?;
                    (Value::err(Value::uint(code)), Vec::new())
                }
                None => return Err(err.into()),
            },
        };
        self.state.ledger.bump_nonce(&from);
        self.state.ledger.advance_block();
        debug!(%from, amount = %amount, %result, "stx transfer");
        Ok(CallReceipt {
            txid: Some(hex::encode(txid)),
            block_height: self.block_height(),
            result,
            events,
        })
    }

    fn execute_public(
        &mut self,
        contract: &str,
        function: &str,
        args: &[Value],
        sender: &str,
    ) -> Result<CallReceipt, SimnetError> {
        let call = self.stage_call(contract, function, args, sender, CallMode::Public)?;
        if !call.result.is_response() {
            return Err(SimnetError::NotAResponse {
                contract: call.contract,
                function: function.to_string(),
                value: call.result,
            });
        }

        let StagedCall {
            contract: id,
            sender,
            state,
            result,
            events,
        } = call;
        let txid = transaction_id(&sender, self.state.ledger.nonce(&sender), &id, function, args);
        let events = if result.is_ok() {
            self.state = state;
            events
        } else {
            Vec::new()
        };
        self.state.ledger.record_receipt(txid)?;
        self.state.ledger.bump_nonce(&sender);
        self.state.ledger.advance_block();

        debug!(
            contract = %id,
            %function,
            %sender,
            %result,
            height = self.block_height(),
            "public call"
        );
        Ok(CallReceipt {
            txid: Some(hex::encode(txid)),
            block_height: self.block_height(),
            result,
            events,
        })
    }

    fn execute_read_only(
        &self,
        contract: &str,
        function: &str,
        args: &[Value],
        sender: &str,
    ) -> Result<CallReceipt, SimnetError> {
        let call = self.stage_call(contract, function, args, sender, CallMode::ReadOnly)?;
        debug!(contract = %call.contract, %function, result = %call.result, "read-only call");
        Ok(CallReceipt {
            txid: None,
            block_height: self.block_height(),
            result: call.result,
            events: call.events,
        })
    }

    /// Checks the call against the contract interface and runs it on a copy
    /// of the world state. The live state is never touched.
    fn stage_call(
        &self,
        contract: &str,
        function: &str,
        args: &[Value],
        sender: &str,
        mode: CallMode,
    ) -> Result<StagedCall, SimnetError> {
        let id = self.resolve_contract(contract)?;
        let sender = self.resolve_principal(sender)?;
        let deployed = &self.contracts[&id];
        let signature = deployed.interface.function(function).ok_or_else(|| {
            SimnetError::UnknownFunction {
                contract: id.clone(),
                function: function.to_string(),
            }
        })?;

        if mode == CallMode::Public && signature.access == FunctionAccess::ReadOnly {
            return Err(SimnetError::NotPublic {
                contract: id,
                function: function.to_string(),
            });
        }
        if signature.args.len() != args.len() {
            return Err(SimnetError::ArgumentCount {
                contract: id,
                function: function.to_string(),
                expected: signature.args.len(),
                actual: args.len(),
            });
        }
        for (index, ((name, ty), value)) in signature.args.iter().zip(args).enumerate() {
            if !ty.admits(value) {
                return Err(SimnetError::ArgumentType {
                    contract: id,
                    function: function.to_string(),
                    index,
                    name: name.clone(),
                    expected: ty.clone(),
                    found: value.clone(),
                });
            }
        }

        let mut state = self.state.clone();
        let read_only = signature.access == FunctionAccess::ReadOnly;
        let mut ctx = CallContext::new(&mut state, id.clone(), sender.clone(), read_only);
        let outcome = deployed.contract.call(&mut ctx, function, args);
        let events = ctx.into_events();
        let result = outcome.map_err(|source| SimnetError::Runtime {
            contract: id.clone(),
            function: function.to_string(),
            source,
        })?;

        Ok(StagedCall {
            contract: id,
            sender,
            state,
            result,
            events,
        })
    }
}

fn transaction_id(
    sender: &Principal,
    nonce: u64,
    target: &dyn std::fmt::Display,
    function: &str,
    args: &[Value],
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(sender.to_string().as_bytes());
    hasher.update(nonce.to_le_bytes());
    hasher.update(target.to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(function.as_bytes());
    for arg in args {
        hasher.update([0u8]);
        hasher.update(arg.to_string().as_bytes());
    }
    hasher.finalize().into()
}
