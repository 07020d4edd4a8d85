//! Step scripts for the `run` command: a JSON list of calls executed in order
//! against one simulator.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    config::ConfigError,
    error::SimnetError,
    ledger::{Amount, AssetsMap},
    simnet::{CallReceipt, Simnet},
    value::Value,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Call {
    pub contract: String,
    pub function: String,
    #[serde(default)]
    pub args: Vec<Value>,
    pub sender: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Call(Call),
    Read(Call),
    TransferStx {
        amount: u64,
        recipient: String,
        sender: String,
    },
    Mine {
        blocks: u64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Script {
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepOutcome {
    Receipt(CallReceipt),
    Mined { block_height: u64 },
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScriptReport {
    pub outcomes: Vec<StepOutcome>,
    pub assets: AssetsMap,
}

/// Stops at the first harness error; application errors are recorded in the
/// receipts and execution continues.
pub fn run_script(simnet: &mut Simnet, script: &Script) -> Result<ScriptReport, SimnetError> {
    let mut outcomes = Vec::with_capacity(script.steps.len());
    for step in &script.steps {
        let outcome = match step {
            Step::Call(call) => StepOutcome::Receipt(simnet.call_public_fn(
                &call.contract,
                &call.function,
                &call.args,
                &call.sender,
            )?),
            Step::Read(call) => StepOutcome::Receipt(simnet.call_read_only_fn(
                &call.contract,
                &call.function,
                &call.args,
                &call.sender,
            )?),
            Step::TransferStx {
                amount,
                recipient,
                sender,
            } => StepOutcome::Receipt(simnet.transfer_stx(Amount::from(*amount), recipient, sender)?),
            Step::Mine { blocks } => StepOutcome::Mined {
                block_height: simnet.mine_empty_blocks(*blocks),
            },
        };
        outcomes.push(outcome);
    }
    Ok(ScriptReport {
        outcomes,
        assets: simnet.get_assets_map(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::SimnetConfig, ledger::STX};

    #[test]
    fn runs_steps_in_order() {
        let script: Script = serde_json::from_str(
            r#"{
                "steps": [
                    { "call": { "contract": "token-stx-v-1-2", "function": "transfer",
                                "args": ["u1000", "'ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM",
                                         "'ST1SJ3DTE5DN7X54YDH5D64R3BCB6A2AG2ZQ8YPD5", "none"],
                                "sender": "deployer" } },
                    { "read": { "contract": "token-stx-v-1-2", "function": "get-balance",
                                "args": ["'ST1SJ3DTE5DN7X54YDH5D64R3BCB6A2AG2ZQ8YPD5"],
                                "sender": "deployer" } },
                    { "transfer_stx": { "amount": 50, "recipient": "wallet_2", "sender": "wallet_1" } },
                    { "mine": { "blocks": 2 } }
                ]
            }"#,
        )
        .unwrap();
        let config = SimnetConfig::devnet()
            .with_uniform_balance(0)
            .fund("deployer", 10_000)
            .deploy("token-stx-v-1-2", "stx-token");
        let mut simnet = Simnet::new(config).unwrap();
        let start = simnet.block_height();

        let report = run_script(&mut simnet, &script).unwrap();
        assert_eq!(report.outcomes.len(), 4);
        match &report.outcomes[1] {
            StepOutcome::Receipt(receipt) => {
                assert_eq!(receipt.result, Value::ok(Value::uint(1000)))
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(
            report.outcomes[3],
            StepOutcome::Mined {
                block_height: start + 4
            }
        );
        let wallet_2 = simnet.account("wallet_2").unwrap();
        assert_eq!(report.assets[wallet_2][STX], 50);
    }

    #[test]
    fn harness_errors_abort_the_script() {
        let script = Script {
            steps: vec![Step::Call(Call {
                contract: "missing".into(),
                function: "transfer".into(),
                args: vec![],
                sender: "deployer".into(),
            })],
        };
        let mut simnet = Simnet::new(SimnetConfig::devnet()).unwrap();
        assert!(matches!(
            run_script(&mut simnet, &script),
            Err(SimnetError::UnknownContract(_))
        ));
    }
}
