use crate::{
    error::RuntimeError,
    simnet::CallContext,
    value::{TypeSignature, Value},
};

use super::{
    memo_signature, optional_buffer_arg, principal_arg, uint_arg, Contract, ContractInterface,
    FunctionSignature,
};

pub const ERR_NOT_AUTHORIZED: u128 = 4;
pub const ERR_NOT_STANDARD_PRINCIPAL: u128 = 5;
pub const ERR_STX_TRANSFER: u128 = 6;

/// A token-shaped facade over the native currency: balances and supply are
/// the STX ledger, and `transfer` moves STX.
#[derive(Clone, Debug)]
pub struct StxToken {
    name: String,
    symbol: String,
    decimals: u128,
}

impl Default for StxToken {
    fn default() -> Self {
        Self {
            name: "Stacks Token".to_string(),
            symbol: "STK".to_string(),
            decimals: 6,
        }
    }
}

impl StxToken {
    fn transfer(&self, ctx: &mut CallContext<'_>, args: &[Value]) -> Result<Value, RuntimeError> {
        let amount = uint_arg(args, 0)?;
        let sender = principal_arg(args, 1)?;
        let recipient = principal_arg(args, 2)?;
        let memo = optional_buffer_arg(args, 3)?;

        if ctx.tx_sender() != sender {
            return Ok(Value::err(Value::uint(ERR_NOT_AUTHORIZED)));
        }
        if !recipient.is_standard() {
            return Ok(Value::err(Value::uint(ERR_NOT_STANDARD_PRINCIPAL)));
        }
        // Amount is not checked here; the native transfer rejects zero.
        if ctx.stx_transfer(amount, sender, recipient, memo)?.is_err() {
            return Ok(Value::err(Value::uint(ERR_STX_TRANSFER)));
        }
        if let Some(memo) = memo {
            ctx.print(Value::buffer(memo));
        }
        Ok(Value::ok(Value::bool(true)))
    }
}

impl Contract for StxToken {
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
                FunctionSignature::read_only("get-name", vec![]),
                FunctionSignature::read_only("get-symbol", vec![]),
                FunctionSignature::read_only("get-decimals", vec![]),
                FunctionSignature::read_only("get-balance", vec![("who", TypeSignature::Principal)]),
                FunctionSignature::read_only("get-total-supply", vec![]),
                FunctionSignature::read_only("get-token-uri", vec![]),
            ],
            fungible_tokens: vec![],
        }
    }

    fn call(
        &self,
        ctx: &mut CallContext<'_>,
        function: &str,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        match function {
            "transfer" => self.transfer(ctx, args),
            "get-name" => Ok(Value::ok(Value::StringAscii(self.name.clone()))),
            "get-symbol" => Ok(Value::ok(Value::StringAscii(self.symbol.clone()))),
            "get-decimals" => Ok(Value::ok(Value::uint(self.decimals))),
            "get-balance" => {
                let who = principal_arg(args, 0)?;
                Ok(Value::ok(Value::uint(ctx.stx_get_balance(who))))
            }
            "get-total-supply" => Ok(Value::ok(Value::uint(ctx.stx_liquid_supply()))),
            "get-token-uri" => Ok(Value::ok(Value::none())),
            other => Err(RuntimeError::UndefinedFunction(other.to_string())),
        }
    }
}
