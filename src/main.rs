use std::{collections::BTreeMap, error::Error, path::PathBuf};

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use simnet::{
    ledger::{Amount, STX},
    script::{run_script, Script},
    telemetry, Simnet, SimnetConfig, Value,
};

#[derive(Parser)]
#[command(name = "simnet", version, about = "Deterministic contract-call simulator")]
struct Cli {
    /// Simulation plan (JSON). Defaults to the devnet accounts.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the account registry with native balances.
    Accounts,
    /// Print the full asset map.
    Assets,
    /// Execute a public function and commit its effects.
    Call(CallArgs),
    /// Execute a function without committing anything.
    Read(CallArgs),
    /// Run a JSON step script and print every receipt.
    Run { script: PathBuf },
}

#[derive(Args)]
struct CallArgs {
    contract: String,
    function: String,
    /// Arguments in value syntax, e.g. u1000 'ST1... none
    #[arg(allow_hyphen_values = true)]
    args: Vec<String>,
    /// Account name or principal.
    #[arg(long, default_value = "deployer")]
    sender: String,
}

#[derive(Serialize)]
struct AccountView {
    address: String,
    #[serde(rename = "STX")]
    balance: Amount,
    nonce: u64,
}

//==================== Commands ====================//

fn accounts_cmd(simnet: &Simnet) -> Result<(), Box<dyn Error>> {
    let view: BTreeMap<&str, AccountView> = simnet
        .get_accounts()
        .iter()
        .map(|(name, principal)| {
            (
                name.as_str(),
                AccountView {
                    address: principal.to_string(),
                    balance: simnet.balance(principal, STX),
                    nonce: simnet.nonce(principal),
                },
            )
        })
        .collect();
    print_json(&view)
}

fn call_cmd(simnet: &mut Simnet, call: &CallArgs, read_only: bool) -> Result<(), Box<dyn Error>> {
    let args = call
        .args
        .iter()
        .map(|raw| raw.parse::<Value>())
        .collect::<Result<Vec<_>, _>>()?;
    let receipt = if read_only {
        simnet.call_read_only_fn(&call.contract, &call.function, &args, &call.sender)?
    } else {
        simnet.call_public_fn(&call.contract, &call.function, &args, &call.sender)?
    };
    print_json(&receipt)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => SimnetConfig::from_path(path)?,
        None => SimnetConfig::devnet(),
    };
    let mut simnet = Simnet::new(config)?;

    match &cli.command {
        Command::Accounts => accounts_cmd(&simnet),
        Command::Assets => print_json(&simnet.get_assets_map()),
        Command::Call(call) => call_cmd(&mut simnet, call, false),
        Command::Read(call) => call_cmd(&mut simnet, call, true),
        Command::Run { script } => {
            let script = Script::from_path(script)?;
            let report = run_script(&mut simnet, &script)?;
            print_json(&report)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
