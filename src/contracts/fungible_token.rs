use crate::{
    error::RuntimeError,
    ledger::Amount,
    simnet::CallContext,
    value::{TypeSignature, Value},
};

use super::{
    memo_signature, optional_buffer_arg, principal_arg, uint_arg, Contract, ContractInterface,
    FunctionSignature, FungibleTokenDef,
};

pub const ERR_OWNER_ONLY: u128 = 100;
pub const ERR_NOT_TOKEN_OWNER: u128 = 101;

pub const TOKEN: &str = "token";
const OWNER_VAR: &str = "contract-owner";
const TOKEN_URI_VAR: &str = "token-uri";

/// SIP-010 style token backed by a native fungible asset. The deployer owns
/// the contract and is the only account allowed to mint.
#[derive(Clone, Debug)]
pub struct FungibleToken {
    name: String,
    symbol: String,
    decimals: u128,
    max_supply: Option<Amount>,
}

impl Default for FungibleToken {
    fn default() -> Self {
        Self {
            name: "Simnet Token".to_string(),
            symbol: "SIM".to_string(),
            decimals: 6,
            max_supply: None,
        }
    }
}

impl FungibleToken {
    pub fn new(name: &str, symbol: &str, decimals: u128, max_supply: Option<Amount>) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            max_supply,
        }
    }

    fn is_owner(ctx: &CallContext<'_>) -> bool {
        ctx.var_get(OWNER_VAR).as_ref().and_then(Value::as_principal) == Some(ctx.tx_sender())
    }

    fn transfer(ctx: &mut CallContext<'_>, args: &[Value]) -> Result<Value, RuntimeError> {
        let amount = uint_arg(args, 0)?;
        let sender = principal_arg(args, 1)?;
        let recipient = principal_arg(args, 2)?;
        let memo = optional_buffer_arg(args, 3)?;

        if ctx.tx_sender() != sender {
            return Ok(Value::err(Value::uint(ERR_NOT_TOKEN_OWNER)));
        }
        let outcome = ctx.ft_transfer(TOKEN, amount, sender, recipient)?;
        if outcome.is_err() {
            return Ok(outcome);
        }
        if let Some(memo) = memo {
            ctx.print(Value::buffer(memo));
        }
        Ok(outcome)
    }

    fn mint(ctx: &mut CallContext<'_>, args: &[Value]) -> Result<Value, RuntimeError> {
        let amount = uint_arg(args, 0)?;
        let recipient = principal_arg(args, 1)?;
        if !Self::is_owner(ctx) {
            return Ok(Value::err(Value::uint(ERR_OWNER_ONLY)));
        }
        ctx.ft_mint(TOKEN, amount, recipient)
    }

    fn set_token_uri(ctx: &mut CallContext<'_>, args: &[Value]) -> Result<Value, RuntimeError> {
        if !Self::is_owner(ctx) {
            return Ok(Value::err(Value::uint(ERR_OWNER_ONLY)));
        }
        let uri = args.first().cloned().ok_or(RuntimeError::BadArgument {
            index: 0,
            expected: "a string-utf8",
        })?;
        ctx.var_set(TOKEN_URI_VAR, Value::some(uri))?;
        Ok(Value::ok(Value::bool(true)))
    }
}

impl Contract for FungibleToken {
    fn interface(&self) -> ContractInterface {
        ContractInterface {
            functions: vec![
                FunctionSignature::public(
                    "transfer",
                    vec![
                        ("amount", TypeSignature::UInt),
                        ("sender", TypeSignature::Principal),
                        ("recipient", TypeSignature::Principal),
                        ("memo", memo_signature()),
                    ],
                ),
                FunctionSignature::public(
                    "mint",
                    vec![
                        ("amount", TypeSignature::UInt),
                        ("recipient", TypeSignature::Principal),
                    ],
                ),
                FunctionSignature::public(
                    "set-token-uri",
                    vec![("value", TypeSignature::StringUtf8(256))],
                ),
                FunctionSignature::read_only("get-name", vec![]),
                FunctionSignature::read_only("get-symbol", vec![]),
                FunctionSignature::read_only("get-decimals", vec![]),
                FunctionSignature::read_only("get-balance", vec![("who", TypeSignature::Principal)]),
                FunctionSignature::read_only("get-total-supply", vec![]),
                FunctionSignature::read_only("get-token-uri", vec![]),
            ],
            fungible_tokens: vec![FungibleTokenDef {
                name: TOKEN.to_string(),
                max_supply: self.max_supply,
            }],
        }
    }

    fn initialize(&self, ctx: &mut CallContext<'_>) -> Result<(), RuntimeError> {
        let owner = ctx.tx_sender().clone();
        ctx.var_set(OWNER_VAR, Value::principal(owner))?;
        ctx.var_set(TOKEN_URI_VAR, Value::none())
    }

    fn call(
        &self,
        ctx: &mut CallContext<'_>,
        function: &str,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        match function {
            "transfer" => Self::transfer(ctx, args),
            "mint" => Self::mint(ctx, args),
            "set-token-uri" => Self::set_token_uri(ctx, args),
            "get-name" => Ok(Value::ok(Value::StringAscii(self.name.clone()))),
            "get-symbol" => Ok(Value::ok(Value::StringAscii(self.symbol.clone()))),
            "get-decimals" => Ok(Value::ok(Value::uint(self.decimals))),
            "get-balance" => {
                let who = principal_arg(args, 0)?;
                Ok(Value::ok(Value::uint(ctx.ft_get_balance(TOKEN, who)?)))
            }
            "get-total-supply" => Ok(Value::ok(Value::uint(ctx.ft_get_supply(TOKEN)?))),
            "get-token-uri" => Ok(Value::ok(
                ctx.var_get(TOKEN_URI_VAR).unwrap_or_else(Value::none),
            )),
            other => Err(RuntimeError::UndefinedFunction(other.to_string())),
        }
    }
}
