use rand::{rngs::StdRng, Rng, SeedableRng};
use simnet::{
    contracts::FungibleToken,
    ledger::{Amount, STX},
    simnet::token_asset_id,
    ContractId, Principal, Simnet, SimnetConfig, Value,
};

const WALLETS: [&str; 4] = ["deployer", "wallet_1", "wallet_2", "wallet_3"];

fn simnet_with_token(max_supply: Option<Amount>) -> (Simnet, ContractId) {
    let mut simnet = Simnet::new(SimnetConfig::devnet()).unwrap();
    let id = simnet
        .deploy_contract(
            "capped-token",
            FungibleToken::new("Capped", "CAP", 2, max_supply),
            "deployer",
        )
        .unwrap();
    (simnet, id)
}

fn principal(simnet: &Simnet, name: &str) -> Principal {
    simnet.account(name).unwrap().clone()
}

fn mint(simnet: &mut Simnet, id: &ContractId, amount: u128, to: &str, sender: &str) -> Value {
    let recipient = principal(simnet, to);
    simnet
        .call_public_fn(
            &id.to_string(),
            "mint",
            &[Value::uint(amount), Value::principal(recipient)],
            sender,
        )
        .unwrap()
        .result
}

fn transfer(simnet: &mut Simnet, id: &ContractId, amount: u128, from: &str, to: &str, sender: &str) -> Value {
    let args = [
        Value::uint(amount),
        Value::principal(principal(simnet, from)),
        Value::principal(principal(simnet, to)),
        Value::none(),
    ];
    simnet
        .call_public_fn(&id.to_string(), "transfer", &args, sender)
        .unwrap()
        .result
}

fn token_balance(simnet: &Simnet, id: &ContractId, name: &str) -> Amount {
    simnet.balance(&principal(simnet, name), &token_asset_id(id, "token"))
}

#[test]
fn only_the_owner_mints() {
    let (mut simnet, id) = simnet_with_token(None);
    assert_eq!(
        mint(&mut simnet, &id, 500, "wallet_1", "wallet_1"),
        Value::err(Value::uint(100))
    );
    assert_eq!(token_balance(&simnet, &id, "wallet_1"), 0);

    assert_eq!(
        mint(&mut simnet, &id, 500, "wallet_1", "deployer"),
        Value::ok(Value::bool(true))
    );
    assert_eq!(token_balance(&simnet, &id, "wallet_1"), 500);
}

#[test]
fn mint_respects_max_supply() {
    let (mut simnet, id) = simnet_with_token(Some(1_000));
    assert_eq!(
        mint(&mut simnet, &id, 800, "wallet_1", "deployer"),
        Value::ok(Value::bool(true))
    );
    assert_eq!(
        mint(&mut simnet, &id, 201, "wallet_2", "deployer"),
        Value::err(Value::uint(1))
    );
    assert_eq!(
        mint(&mut simnet, &id, 0, "wallet_2", "deployer"),
        Value::err(Value::uint(1))
    );
    assert_eq!(
        mint(&mut simnet, &id, 200, "wallet_2", "deployer"),
        Value::ok(Value::bool(true))
    );

    let supply = simnet
        .call_read_only_fn(&id.to_string(), "get-total-supply", &[], "wallet_3")
        .unwrap();
    assert_eq!(supply.result, Value::ok(Value::uint(1_000)));
}

#[test]
fn transfer_error_codes() {
    let (mut simnet, id) = simnet_with_token(None);
    mint(&mut simnet, &id, 100, "wallet_1", "deployer");

    assert_eq!(
        transfer(&mut simnet, &id, 10, "wallet_1", "wallet_2", "wallet_2"),
        Value::err(Value::uint(101))
    );
    assert_eq!(
        transfer(&mut simnet, &id, 101, "wallet_1", "wallet_2", "wallet_1"),
        Value::err(Value::uint(1))
    );
    assert_eq!(
        transfer(&mut simnet, &id, 10, "wallet_1", "wallet_1", "wallet_1"),
        Value::err(Value::uint(2))
    );
    assert_eq!(
        transfer(&mut simnet, &id, 0, "wallet_1", "wallet_2", "wallet_1"),
        Value::err(Value::uint(3))
    );
    assert_eq!(
        transfer(&mut simnet, &id, 40, "wallet_1", "wallet_2", "wallet_1"),
        Value::ok(Value::bool(true))
    );
    assert_eq!(token_balance(&simnet, &id, "wallet_1"), 60);
    assert_eq!(token_balance(&simnet, &id, "wallet_2"), 40);
}

#[test]
fn token_uri_is_owner_only() {
    let (mut simnet, id) = simnet_with_token(None);
    let contract = id.to_string();
    let uri = Value::string_utf8("ipfs://token");

    let denied = simnet
        .call_public_fn(&contract, "set-token-uri", &[uri.clone()], "wallet_1")
        .unwrap();
    assert_eq!(denied.result, Value::err(Value::uint(100)));

    let accepted = simnet
        .call_public_fn(&contract, "set-token-uri", &[uri.clone()], "deployer")
        .unwrap();
    assert!(accepted.result.is_ok());
    assert_eq!(
        simnet.get_data_var(&contract, "token-uri").unwrap(),
        Some(Value::some(uri))
    );
}

#[test]
fn random_transfers_conserve_supply() {
    let (mut simnet, id) = simnet_with_token(None);
    for wallet in WALLETS {
        mint(&mut simnet, &id, 1_000, wallet, "deployer");
    }
    let stx_before: Amount = WALLETS
        .iter()
        .map(|w| simnet.balance(&principal(&simnet, w), STX))
        .sum();

    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..200 {
        let from = WALLETS[rng.gen_range(0..WALLETS.len())];
        let to = WALLETS[rng.gen_range(0..WALLETS.len())];
        let amount = rng.gen_range(0..1_500u128);
        let before = simnet.get_assets_map();

        let result = transfer(&mut simnet, &id, amount, from, to, from);
        if result.is_err() {
            assert_eq!(simnet.get_assets_map(), before, "{from} -> {to} x{amount}");
        }

        let total: Amount = WALLETS
            .iter()
            .map(|w| token_balance(&simnet, &id, w))
            .sum();
        assert_eq!(total, 4_000);
    }

    let stx_after: Amount = WALLETS
        .iter()
        .map(|w| simnet.balance(&principal(&simnet, w), STX))
        .sum();
    assert_eq!(stx_before, stx_after);
}

#[test]
fn random_stx_transfers_conserve_supply() {
    let mut simnet = Simnet::new(SimnetConfig::devnet().with_uniform_balance(5_000)).unwrap();
    let total = |simnet: &Simnet| -> Amount {
        simnet
            .get_assets_map()
            .values()
            .filter_map(|assets| assets.get(STX))
            .sum()
    };
    let start = total(&simnet);
    let start_height = simnet.block_height();

    let mut rng = StdRng::seed_from_u64(42);
    let rounds = 100;
    for _ in 0..rounds {
        let from = WALLETS[rng.gen_range(0..WALLETS.len())];
        let to = WALLETS[rng.gen_range(0..WALLETS.len())];
        let amount = rng.gen_range(0..8_000u128);
        let receipt = simnet.transfer_stx(amount, to, from).unwrap();
        assert!(receipt.result.is_response());
        assert_eq!(total(&simnet), start);
    }
    assert_eq!(simnet.block_height(), start_height + rounds);
}
