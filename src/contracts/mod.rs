//! Native contracts and the interface the simulator checks calls against.
//!
//! A contract is a Rust value implementing [`Contract`]. It declares its
//! functions and fungible tokens up front through a [`ContractInterface`];
//! the simulator validates every call against that interface before any
//! contract code runs, so `call` only ever sees well-typed arguments.

mod fungible_token;
mod stx_token;

use std::sync::Arc;

use crate::{
    error::RuntimeError,
    ledger::Amount,
    principal::Principal,
    simnet::CallContext,
    value::{TypeSignature, Value},
};

pub use fungible_token::FungibleToken;
pub use stx_token::StxToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionAccess {
    Public,
    ReadOnly,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: String,
    pub access: FunctionAccess,
    pub args: Vec<(String, TypeSignature)>,
}

impl FunctionSignature {
    pub fn public(name: &str, args: Vec<(&str, TypeSignature)>) -> Self {
        Self::new(name, FunctionAccess::Public, args)
    }

    pub fn read_only(name: &str, args: Vec<(&str, TypeSignature)>) -> Self {
        Self::new(name, FunctionAccess::ReadOnly, args)
    }

    fn new(name: &str, access: FunctionAccess, args: Vec<(&str, TypeSignature)>) -> Self {
        Self {
            name: name.to_string(),
            access,
            args: args
                .into_iter()
                .map(|(arg, ty)| (arg.to_string(), ty))
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FungibleTokenDef {
    pub name: String,
    pub max_supply: Option<Amount>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContractInterface {
    pub functions: Vec<FunctionSignature>,
    pub fungible_tokens: Vec<FungibleTokenDef>,
}

impl ContractInterface {
    pub fn function(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.iter().find(|f| f.name == name)
    }
}

pub trait Contract: Send + Sync {
    fn interface(&self) -> ContractInterface;

    /// Runs once at deployment, with the deployer as transaction sender.
    fn initialize(&self, _ctx: &mut CallContext<'_>) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn call(
        &self,
        ctx: &mut CallContext<'_>,
        function: &str,
        args: &[Value],
    ) -> Result<Value, RuntimeError>;
}

/// Kinds accepted by [`builtin`] and by the `contracts` section of a config.
pub const BUILTIN_KINDS: &[&str] = &["stx-token", "fungible-token"];

pub fn builtin(kind: &str) -> Option<Arc<dyn Contract>> {
    match kind {
        "stx-token" => Some(Arc::new(StxToken::default())),
        "fungible-token" => Some(Arc::new(FungibleToken::default())),
        _ => None,
    }
}

pub(crate) fn uint_arg(args: &[Value], index: usize) -> Result<u128, RuntimeError> {
    args.get(index)
        .and_then(Value::as_uint)
        .ok_or(RuntimeError::BadArgument {
            index,
            expected: "a uint",
        })
}

pub(crate) fn principal_arg(args: &[Value], index: usize) -> Result<&Principal, RuntimeError> {
    args.get(index)
        .and_then(Value::as_principal)
        .ok_or(RuntimeError::BadArgument {
            index,
            expected: "a principal",
        })
}

pub(crate) fn optional_buffer_arg(
    args: &[Value],
    index: usize,
) -> Result<Option<&[u8]>, RuntimeError> {
    let bad = RuntimeError::BadArgument {
        index,
        expected: "an optional buffer",
    };
    match args.get(index).and_then(Value::as_optional) {
        Some(None) => Ok(None),
        Some(Some(inner)) => inner.as_buffer().map(Some).ok_or(bad),
        None => Err(bad),
    }
}

pub(crate) fn memo_signature() -> TypeSignature {
    TypeSignature::optional(TypeSignature::Buffer(34))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_kinds_resolve() {
        for kind in BUILTIN_KINDS {
            let contract = builtin(kind).unwrap();
            assert!(contract.interface().function("transfer").is_some());
        }
        assert!(builtin("counter").is_none());
    }

    #[test]
    fn argument_helpers_check_kinds() {
        let args = vec![
            Value::uint(7),
            Value::principal("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM".parse().unwrap()),
            Value::some(Value::buffer(vec![1, 2])),
            Value::none(),
        ];
        assert_eq!(uint_arg(&args, 0), Ok(7));
        assert!(principal_arg(&args, 1).unwrap().is_standard());
        assert_eq!(optional_buffer_arg(&args, 2), Ok(Some(&[1u8, 2][..])));
        assert_eq!(optional_buffer_arg(&args, 3), Ok(None));
        assert!(matches!(
            uint_arg(&args, 1),
            Err(RuntimeError::BadArgument { index: 1, .. })
        ));
        assert!(optional_buffer_arg(&args, 0).is_err());
        assert!(uint_arg(&args, 9).is_err());
    }

    #[test]
    fn interface_lookup_by_name() {
        let iface = StxToken::default().interface();
        let transfer = iface.function("transfer").unwrap();
        assert_eq!(transfer.access, FunctionAccess::Public);
        assert_eq!(transfer.args.len(), 4);
        assert_eq!(
            iface.function("get-balance").unwrap().access,
            FunctionAccess::ReadOnly
        );
        assert!(iface.function("mint").is_none());
    }
}
